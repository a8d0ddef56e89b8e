use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::Metrics;
use crate::store::{PreparedStatement, Store, StoreError};

use super::errors::DalError;
use super::query_builder::{
    build_delete_by_id, build_insert, build_select_by_id, build_update_by_id, placeholder_count,
};
use super::schema::{Catalog, Column, TableSchema};
use super::value::{FromRow, Row, Value};

// ============================================================================
// Data Access Layer - Generic CRUD over catalog tables
// ============================================================================
//
// Every verb follows the same cycle:
//   1. resolve the table in the catalog (closed allow-list)
//   2. validate value count and types against the column descriptors
//   3. build SQL, check placeholder count == argument count
//   4. prepare, execute once, release (the statement is dropped on return)
//
// Each store call is bounded by `statement_timeout`. Dropping a DAL future
// drops the statement with it, which returns its pooled connection.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct DalConfig {
    /// Upper bound on each prepare / execute / query round trip
    pub statement_timeout: Duration,
}

impl Default for DalConfig {
    fn default() -> Self {
        Self {
            statement_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct DataAccessLayer {
    store: Arc<dyn Store>,
    catalog: Arc<Catalog>,
    config: DalConfig,
    metrics: Option<Arc<Metrics>>,
}

impl DataAccessLayer {
    pub fn new(store: Arc<dyn Store>, catalog: Arc<Catalog>, config: DalConfig) -> Self {
        Self {
            store,
            catalog,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn ping(&self) -> Result<(), DalError> {
        self.bounded("ping", self.store.ping())
            .await?
            .map_err(DalError::from_exec)
    }

    /// Insert one row; `values` must cover every column in table order
    pub async fn create(&self, table: &str, values: &[Value]) -> Result<(), DalError> {
        let started = Instant::now();
        let result = self.create_inner(table, values).await;
        self.observe("create", started, &result);
        result
    }

    async fn create_inner(&self, table: &str, values: &[Value]) -> Result<(), DalError> {
        let schema = self.schema(table)?;
        let columns: Vec<&Column> = schema.columns().iter().collect();
        check_values(schema, &columns, values)?;

        let sql = build_insert(schema.name(), values.len())?;
        let mut statement = self.prepare(&sql, values.len()).await?;
        self.bounded("exec", statement.exec(values))
            .await?
            .map_err(DalError::from_exec)?;

        tracing::debug!(table = %schema.name(), values = values.len(), "Row inserted");
        Ok(())
    }

    /// Fetch the row with `id`, columns decoded per the table descriptor
    pub async fn read(&self, table: &str, id: &Value) -> Result<Row, DalError> {
        self.read_as(table, id).await
    }

    /// Fetch the row with `id` and scan it into `T`
    pub async fn read_as<T: FromRow>(&self, table: &str, id: &Value) -> Result<T, DalError> {
        let started = Instant::now();
        let result = self
            .read_inner(table, id)
            .await
            .and_then(|row| T::from_row(row).map_err(DalError::Scan));
        self.observe("read", started, &result);
        result
    }

    async fn read_inner(&self, table: &str, id: &Value) -> Result<Row, DalError> {
        let schema = self.schema(table)?;
        check_id(schema, id)?;

        let sql = build_select_by_id(schema.name());
        let args = std::slice::from_ref(id);
        let column_types = schema.column_types();
        let mut statement = self.prepare(&sql, args.len()).await?;

        let row = self
            .bounded("query", statement.query_row(args, &column_types))
            .await?
            .map_err(DalError::from_exec)?;

        row.ok_or_else(|| DalError::NotFound {
            table: schema.name().to_string(),
            id: id.to_string(),
        })
    }

    /// Overwrite every non-`id` column of the row with `id`
    pub async fn update(&self, table: &str, id: &Value, values: &[Value]) -> Result<(), DalError> {
        let started = Instant::now();
        let result = self.update_inner(table, id, values).await;
        self.observe("update", started, &result);
        result
    }

    async fn update_inner(&self, table: &str, id: &Value, values: &[Value]) -> Result<(), DalError> {
        let schema = self.schema(table)?;
        let set_columns = schema.settable_columns();
        check_values(schema, &set_columns, values)?;
        check_id(schema, id)?;

        let sql = build_update_by_id(schema.name(), &set_columns)?;
        let mut args = values.to_vec();
        args.push(id.clone());

        let mut statement = self.prepare(&sql, args.len()).await?;
        let affected = self
            .bounded("exec", statement.exec(&args))
            .await?
            .map_err(DalError::from_exec)?;

        expect_affected(schema, id, affected)?;
        tracing::debug!(table = %schema.name(), id = %id, "Row updated");
        Ok(())
    }

    pub async fn delete(&self, table: &str, id: &Value) -> Result<(), DalError> {
        let started = Instant::now();
        let result = self.delete_inner(table, id).await;
        self.observe("delete", started, &result);
        result
    }

    async fn delete_inner(&self, table: &str, id: &Value) -> Result<(), DalError> {
        let schema = self.schema(table)?;
        check_id(schema, id)?;

        let sql = build_delete_by_id(schema.name());
        let args = std::slice::from_ref(id);
        let mut statement = self.prepare(&sql, args.len()).await?;
        let affected = self
            .bounded("exec", statement.exec(args))
            .await?
            .map_err(DalError::from_exec)?;

        expect_affected(schema, id, affected)?;
        tracing::debug!(table = %schema.name(), id = %id, "Row deleted");
        Ok(())
    }

    fn schema(&self, table: &str) -> Result<&TableSchema, DalError> {
        self.catalog
            .get(table)
            .ok_or_else(|| DalError::UnknownTable(table.to_string()))
    }

    async fn prepare(
        &self,
        sql: &str,
        arg_count: usize,
    ) -> Result<Box<dyn PreparedStatement>, DalError> {
        let expected = placeholder_count(sql);
        if expected != arg_count {
            return Err(DalError::Arity {
                expected,
                actual: arg_count,
            });
        }

        self.bounded("prepare", self.store.prepare(sql))
            .await?
            .map_err(|source| DalError::Prepare {
                sql: sql.to_string(),
                source,
            })
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<Result<T, StoreError>, DalError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let after = self.config.statement_timeout;
        tokio::time::timeout(after, fut).await.map_err(|_| {
            tracing::warn!(op = op, timeout_ms = after.as_millis() as u64, "Store call timed out");
            DalError::Timeout { op, after }
        })
    }

    fn observe<T>(&self, op: &str, started: Instant, result: &Result<T, DalError>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(e) if e.is_not_found() => "not_found",
            Err(e) => {
                tracing::debug!(op = op, error = %e, "Statement failed");
                "error"
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_statement(op, outcome, started.elapsed().as_secs_f64());
        }
    }
}

fn check_values(schema: &TableSchema, columns: &[&Column], values: &[Value]) -> Result<(), DalError> {
    if columns.len() != values.len() {
        return Err(DalError::ValueCount {
            table: schema.name().to_string(),
            expected: columns.len(),
            actual: values.len(),
        });
    }

    for (column, value) in columns.iter().zip(values) {
        if !column.column_type.accepts(value) {
            return Err(DalError::ValueType {
                table: schema.name().to_string(),
                column: column.name.clone(),
                expected: column.column_type,
                actual: value.column_type(),
            });
        }
    }
    Ok(())
}

fn check_id(schema: &TableSchema, id: &Value) -> Result<(), DalError> {
    let expected = schema.id_type();
    if !expected.accepts(id) {
        return Err(DalError::ValueType {
            table: schema.name().to_string(),
            column: super::schema::ID_COLUMN.to_string(),
            expected,
            actual: id.column_type(),
        });
    }
    Ok(())
}

fn expect_affected(schema: &TableSchema, id: &Value, affected: u64) -> Result<(), DalError> {
    if affected == 0 {
        return Err(DalError::NoRowsAffected {
            table: schema.name().to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}
