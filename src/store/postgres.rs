use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Executor, Row as _};

use crate::dal::{ColumnType, Row, Value};

use super::{PreparedStatement, Store, StoreError};

// ============================================================================
// Postgres Store (sqlx)
// ============================================================================
//
// Each prepared statement pins one pooled connection for its lifetime:
// prepare and execute run on the same connection, and dropping the
// statement hands the connection back to the pool. The pool size is
// therefore the bound on in-flight statements, and `acquire_timeout`
// turns pool exhaustion into a connection error instead of a hang.
//
// Dropping a statement releases the connection, not the server-side
// statement: sqlx keeps the parsed statement in that connection's cache
// and reuses it for the same SQL text. The catalog fixes the set of SQL
// texts (four per table), so each connection caches at most that many.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct PgStoreConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PgStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Builds the pool without opening a connection; use `ping` to verify
    pub fn connect_lazy(url: &str, config: &PgStoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy(url)
            .map_err(classify)?;

        tracing::info!(
            max_connections = config.max_connections,
            acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
            "Postgres pool configured"
        );

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(classify)?;

        // Parses and caches the statement on this connection
        (&mut *conn).prepare(sql).await.map_err(classify)?;

        Ok(Box::new(PgPreparedStatement {
            sql: sql.to_string(),
            conn,
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }
}

struct PgPreparedStatement {
    sql: String,
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl PreparedStatement for PgPreparedStatement {
    async fn exec(&mut self, args: &[Value]) -> Result<u64, StoreError> {
        let query = bind_all(sqlx::query(&self.sql), args);
        let result = query.execute(&mut *self.conn).await.map_err(classify)?;
        Ok(result.rows_affected())
    }

    async fn query_row(
        &mut self,
        args: &[Value],
        columns: &[ColumnType],
    ) -> Result<Option<Row>, StoreError> {
        let query = bind_all(sqlx::query(&self.sql), args);
        let row = query.fetch_optional(&mut *self.conn).await.map_err(classify)?;

        row.map(|row| decode_row(&row, columns)).transpose()
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            Value::Int(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.clone()),
            Value::Json(v) => query.bind(v.clone()),
            Value::Bool(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
        };
    }
    query
}

fn decode_row(row: &PgRow, columns: &[ColumnType]) -> Result<Row, StoreError> {
    if row.len() != columns.len() {
        return Err(StoreError::Decode(format!(
            "expected {} columns, store returned {}",
            columns.len(),
            row.len()
        )));
    }

    columns
        .iter()
        .enumerate()
        .map(|(index, column_type)| {
            let value = match column_type {
                ColumnType::BigInt => row.try_get::<i64, _>(index).map(Value::Int),
                ColumnType::Text => row.try_get::<String, _>(index).map(Value::Text),
                ColumnType::Json => row.try_get::<serde_json::Value, _>(index).map(Value::Json),
                ColumnType::Boolean => row.try_get::<bool, _>(index).map(Value::Bool),
                ColumnType::Double => row.try_get::<f64, _>(index).map(Value::Float),
            };
            value.map_err(classify)
        })
        .collect()
}

/// Maps a driver error onto the store taxonomy
fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
            if db.is_unique_violation()
                || db.is_foreign_key_violation()
                || db.is_check_violation()
                || code == "23502"
            {
                StoreError::Constraint(db.message().to_string())
            } else if code.starts_with("42") {
                // syntax error, undefined table/column, insufficient privilege
                StoreError::Rejected(db.message().to_string())
            } else if code.starts_with("08") || code.starts_with("57") {
                StoreError::Connection(db.message().to_string())
            } else {
                StoreError::Database(db.message().to_string())
            }
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connection(err.to_string()),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. } => StoreError::Decode(err.to_string()),
        other => StoreError::Database(other.to_string()),
    }
}
