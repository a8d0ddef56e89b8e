use std::collections::HashMap;
use std::fmt;

use super::value::Value;

// ============================================================================
// Table Catalog - Allow-list of Tables and their Column Descriptors
// ============================================================================
//
// Identifiers cannot be bound as `$n` parameters, so every table name that
// reaches SQL text goes through `TableName` (validated, double-quoted) and
// must be registered in the `Catalog`.
//
// Each registered table carries its ordered column list. Positional values
// handed to the DAL are checked against it before any SQL is built.
//
// ============================================================================

/// Postgres truncates identifiers beyond this length (NAMEDATALEN - 1)
const MAX_IDENTIFIER_LEN: usize = 63;

/// Name of the column every catalog table is keyed by
pub const ID_COLUMN: &str = "id";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SchemaError {
    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Table {0} has no `id` column")]
    MissingIdColumn(String),

    #[error("Table {table} declares column {column} twice")]
    DuplicateColumn { table: String, column: String },

    #[error("Table {0} is already registered")]
    DuplicateTable(String),
}

fn validate_identifier(raw: &str) -> Result<(), SchemaError> {
    let mut chars = raw.chars();
    let valid_head = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_head && valid_tail && raw.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(raw.to_string()))
    }
}

/// A validated table identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    pub fn new(raw: &str) -> Result<Self, SchemaError> {
        validate_identifier(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier as it appears in SQL text
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Text,
    Json,
    Boolean,
    Double,
}

impl ColumnType {
    pub fn accepts(&self, value: &Value) -> bool {
        value.column_type() == *self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.name)
    }
}

/// Ordered column list of one table. Order must match the physical table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: TableName,
    columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(name: &str, columns: &[(&str, ColumnType)]) -> Result<Self, SchemaError> {
        let name = TableName::new(name)?;
        let mut built: Vec<Column> = Vec::with_capacity(columns.len());

        for (column, column_type) in columns {
            validate_identifier(column)?;
            if built.iter().any(|c| c.name == *column) {
                return Err(SchemaError::DuplicateColumn {
                    table: name.to_string(),
                    column: column.to_string(),
                });
            }
            built.push(Column {
                name: column.to_string(),
                column_type: *column_type,
            });
        }

        if !built.iter().any(|c| c.name == ID_COLUMN) {
            return Err(SchemaError::MissingIdColumn(name.to_string()));
        }

        Ok(Self { name, columns: built })
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }

    /// Columns written by an update, i.e. everything but `id`
    pub fn settable_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.name != ID_COLUMN).collect()
    }

    pub fn id_type(&self) -> ColumnType {
        self.columns
            .iter()
            .find(|c| c.name == ID_COLUMN)
            .map(|c| c.column_type)
            .unwrap_or(ColumnType::BigInt)
    }
}

/// Closed allow-list of tables reachable through the DAL
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    tables: HashMap<String, TableSchema>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: TableSchema) -> Result<(), SchemaError> {
        let key = schema.name().as_str().to_string();
        if self.tables.contains_key(&key) {
            return Err(SchemaError::DuplicateTable(key));
        }
        self.tables.insert(key, schema);
        Ok(())
    }

    pub fn with_table(mut self, schema: TableSchema) -> Result<Self, SchemaError> {
        self.register(schema)?;
        Ok(self)
    }

    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
