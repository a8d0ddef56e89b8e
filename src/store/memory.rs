use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::dal::query_builder::placeholder_count;
use crate::dal::{Catalog, ColumnType, Row, TableSchema, Value, ID_COLUMN};

use super::{PreparedStatement, Store, StoreError};

// ============================================================================
// In-Memory Store (tests only)
// ============================================================================
//
// Understands exactly the statement shapes the query builder emits.
// Enforces a unique `id` per table, counts every prepare/exec/release,
// and can pretend to be unreachable or slow.
//
// ============================================================================

#[derive(Default)]
struct Shared {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    unreachable: AtomicBool,
    delay_ms: AtomicU64,
    prepared: AtomicUsize,
    executed: AtomicUsize,
    released: AtomicUsize,
    open: AtomicUsize,
    peak_open: AtomicUsize,
}

#[derive(Clone)]
pub struct MemoryStore {
    catalog: Arc<Catalog>,
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.shared.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Every exec/query sleeps this long first
    pub fn set_delay(&self, delay: Duration) {
        self.shared.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        let tables = self.shared.tables.lock().unwrap();
        tables.get(table).cloned().unwrap_or_default()
    }

    pub fn prepared(&self) -> usize {
        self.shared.prepared.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> usize {
        self.shared.executed.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }

    /// Statements prepared and not yet dropped
    pub fn open(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Highest number of statements open at the same time
    pub fn peak_open(&self) -> usize {
        self.shared.peak_open.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.shared.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection refused".into()));
        }
        Ok(())
    }
}

enum Op {
    Insert,
    Select,
    Update(Vec<String>),
    Delete,
}

fn quoted_name(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

fn parse(sql: &str) -> Option<(Op, &str)> {
    if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
        return Some((Op::Insert, quoted_name(rest)?));
    }
    if let Some(rest) = sql.strip_prefix("SELECT * FROM ") {
        return Some((Op::Select, quoted_name(rest)?));
    }
    if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
        return Some((Op::Delete, quoted_name(rest)?));
    }
    if let Some(rest) = sql.strip_prefix("UPDATE ") {
        let table = quoted_name(rest)?;
        let (_, set) = rest.split_once(" SET ")?;
        let (assignments, _) = set.split_once(" WHERE ")?;
        let columns = assignments
            .split(", ")
            .map(|a| quoted_name(a).map(str::to_string))
            .collect::<Option<Vec<_>>>()?;
        return Some((Op::Update(columns), table));
    }
    None
}

#[async_trait]
impl Store for MemoryStore {
    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, StoreError> {
        self.check_reachable()?;

        let (op, table) = parse(sql)
            .ok_or_else(|| StoreError::Rejected(format!("syntax error in {:?}", sql)))?;
        let schema = self
            .catalog
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::Rejected(format!("relation \"{}\" does not exist", table)))?;

        self.shared.prepared.fetch_add(1, Ordering::SeqCst);
        let open = self.shared.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak_open.fetch_max(open, Ordering::SeqCst);

        Ok(Box::new(MemoryStatement {
            shared: self.shared.clone(),
            placeholders: placeholder_count(sql),
            op,
            schema,
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_reachable()
    }
}

struct MemoryStatement {
    shared: Arc<Shared>,
    placeholders: usize,
    op: Op,
    schema: TableSchema,
}

impl MemoryStatement {
    async fn begin(&self, args: &[Value]) -> Result<(), StoreError> {
        let delay = self.shared.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.shared.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection reset".into()));
        }
        if args.len() != self.placeholders {
            return Err(StoreError::Database(format!(
                "bind message supplies {} parameters, but prepared statement requires {}",
                args.len(),
                self.placeholders
            )));
        }
        self.shared.executed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn id_index(&self) -> usize {
        self.schema
            .columns()
            .iter()
            .position(|c| c.name == ID_COLUMN)
            .unwrap_or(0)
    }
}

#[async_trait]
impl PreparedStatement for MemoryStatement {
    async fn exec(&mut self, args: &[Value]) -> Result<u64, StoreError> {
        self.begin(args).await?;

        let id_index = self.id_index();
        let table = self.schema.name().as_str().to_string();
        let mut tables = self.shared.tables.lock().unwrap();
        let rows = tables.entry(table.clone()).or_default();

        match &self.op {
            Op::Insert => {
                if args.len() != self.schema.columns().len() {
                    return Err(StoreError::Database(format!(
                        "INSERT has {} expressions for {} columns",
                        args.len(),
                        self.schema.columns().len()
                    )));
                }
                if rows.iter().any(|row| row[id_index] == args[id_index]) {
                    return Err(StoreError::Constraint(format!(
                        "duplicate key value violates unique constraint \"{}_pkey\"",
                        table
                    )));
                }
                rows.push(args.to_vec());
                Ok(1)
            }
            Op::Update(columns) => {
                let (id, values) = args.split_last().expect("update binds id last");
                let targets: Vec<usize> = columns
                    .iter()
                    .filter_map(|name| self.schema.columns().iter().position(|c| &c.name == name))
                    .collect();
                let mut affected = 0;
                for row in rows.iter_mut().filter(|row| &row[id_index] == id) {
                    for (target, value) in targets.iter().zip(values) {
                        row[*target] = value.clone();
                    }
                    affected += 1;
                }
                Ok(affected)
            }
            Op::Delete => {
                let before = rows.len();
                rows.retain(|row| row[id_index] != args[0]);
                Ok((before - rows.len()) as u64)
            }
            Op::Select => Ok(0),
        }
    }

    async fn query_row(
        &mut self,
        args: &[Value],
        columns: &[ColumnType],
    ) -> Result<Option<Row>, StoreError> {
        self.begin(args).await?;

        let id_index = self.id_index();
        let tables = self.shared.tables.lock().unwrap();
        let found = tables
            .get(self.schema.name().as_str())
            .and_then(|rows| rows.iter().find(|row| row[id_index] == args[0]))
            .cloned();

        let Some(row) = found else {
            return Ok(None);
        };

        if row.len() != columns.len() {
            return Err(StoreError::Decode(format!(
                "expected {} columns, store returned {}",
                columns.len(),
                row.len()
            )));
        }
        for (index, (value, expected)) in row.iter().zip(columns).enumerate() {
            if !expected.accepts(value) {
                return Err(StoreError::Decode(format!(
                    "column {} is {:?}, not {:?}",
                    index,
                    value.column_type(),
                    expected
                )));
            }
        }
        Ok(Some(row))
    }
}

impl Drop for MemoryStatement {
    fn drop(&mut self) {
        self.shared.open.fetch_sub(1, Ordering::SeqCst);
        self.shared.released.fetch_add(1, Ordering::SeqCst);
    }
}
