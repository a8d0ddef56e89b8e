use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use event_gateway::config::GatewayConfig;
use event_gateway::dal::DataAccessLayer;
use event_gateway::gateway::{gateway_catalog, start_gateway, GatewayState};
use event_gateway::metrics::Metrics;
use event_gateway::store::PgStore;
use event_gateway::utils::retry_on_transient;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,event_gateway=debug")),
        )
        .init();

    let config = GatewayConfig::parse();
    tracing::info!(bind = %config.bind, "Starting event gateway");

    // === 1. Store and table catalog ===
    let store = PgStore::connect_lazy(&config.database_url, &config.store())?;
    let catalog = Arc::new(gateway_catalog()?);

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("Metrics registry created with {} metrics", metrics.registry().gather().len());

    let dal = DataAccessLayer::new(Arc::new(store), catalog, config.dal())
        .with_metrics(metrics.clone());

    // === 3. Wait for the store ===
    retry_on_transient(config.startup_retry(), |attempt| {
        let dal = dal.clone();
        async move {
            tracing::debug!(attempt = attempt, "Pinging store");
            dal.ping().await
        }
    })
    .await
    .into_result()?;
    metrics.set_store_up(true);
    tracing::info!("Store reachable");

    // === 4. Serve ===
    start_gateway(GatewayState { dal, metrics }, &config.bind).await?;

    tracing::info!("Event gateway stopped");
    Ok(())
}
