use clap::Parser;
use std::time::Duration;

use crate::dal::DalConfig;
use crate::store::PgStoreConfig;
use crate::utils::RetryConfig;

/// Event ingestion gateway backed by Postgres
#[derive(Parser, Debug, Clone)]
#[command(name = "event_gateway", version, about)]
pub struct GatewayConfig {
    /// Postgres connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Address the HTTP server binds to
    #[arg(long, env = "GATEWAY_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// Pool size; also the bound on in-flight statements
    #[arg(long, env = "GATEWAY_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// How long a statement waits for a pooled connection
    #[arg(long, env = "GATEWAY_ACQUIRE_TIMEOUT_MS", default_value_t = 3000)]
    pub acquire_timeout_ms: u64,

    /// Upper bound on each prepare / execute round trip
    #[arg(long, env = "GATEWAY_STATEMENT_TIMEOUT_MS", default_value_t = 5000)]
    pub statement_timeout_ms: u64,

    /// Attempts to reach the store before giving up at startup
    #[arg(long, env = "GATEWAY_STARTUP_RETRIES", default_value_t = 5)]
    pub startup_retries: u32,
}

impl GatewayConfig {
    pub fn store(&self) -> PgStoreConfig {
        PgStoreConfig {
            max_connections: self.max_connections.max(1),
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
        }
    }

    pub fn dal(&self) -> DalConfig {
        DalConfig {
            statement_timeout: Duration::from_millis(self.statement_timeout_ms),
        }
    }

    pub fn startup_retry(&self) -> RetryConfig {
        RetryConfig::startup(self.startup_retries)
    }
}
