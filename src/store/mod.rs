// ============================================================================
// Store Boundary
// ============================================================================
//
// The relational engine as the DAL sees it: prepare SQL text, execute it
// once with positional arguments, or fetch at most one row. Dropping a
// prepared statement gives its handle (for Postgres, the pooled connection)
// back, so every exit path of a caller (success, error, or a cancelled
// future) releases it. Whether the server-side statement is closed or
// cached for reuse is up to the implementation.
//
// ============================================================================

mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::dal::{ColumnType, Row, Value};

pub use postgres::{PgStore, PgStoreConfig};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("statement rejected: {0}")]
    Rejected(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("connection failure: {0}")]
    Connection(String),

    #[error("column decode failed: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Database(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, StoreError>;

    /// Cheap round trip used by health checks and startup
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PreparedStatement: Send {
    /// Executes with `args` bound to `$1..$n`, returning rows affected
    async fn exec(&mut self, args: &[Value]) -> Result<u64, StoreError>;

    /// Fetches at most one row, decoding each column as `columns` dictates
    async fn query_row(
        &mut self,
        args: &[Value],
        columns: &[ColumnType],
    ) -> Result<Option<Row>, StoreError>;
}
