use std::time::Duration;

use crate::store::StoreError;
use crate::utils::IsTransient;

use super::query_builder::BuildError;
use super::schema::ColumnType;

// ============================================================================
// Data Access Errors
// ============================================================================
//
// The DAL never recovers from these locally. Callers decide:
// - Build / ValueCount / ValueType / Arity / Prepare: code or schema bug
// - Exec(Connection) and Timeout: may be retried with backoff
// - Exec(Constraint): never retried
// - NotFound / NoRowsAffected: the id does not exist
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecErrorKind {
    Constraint,
    Connection,
    Other,
}

impl std::fmt::Display for ExecErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExecErrorKind::Constraint => "constraint violation",
            ExecErrorKind::Connection => "connection failure",
            ExecErrorKind::Other => "execution failure",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DalError {
    #[error("Table is not registered: {0}")]
    UnknownTable(String),

    #[error("Table {table} expects {expected} values, got {actual}")]
    ValueCount {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Column {table}.{column} expects {expected:?}, got {actual:?}")]
    ValueType {
        table: String,
        column: String,
        expected: ColumnType,
        actual: ColumnType,
    },

    #[error("Could not build statement: {0}")]
    Build(#[from] BuildError),

    #[error("Statement has {expected} placeholders but {actual} arguments were supplied")]
    Arity { expected: usize, actual: usize },

    #[error("Store rejected statement `{sql}`: {source}")]
    Prepare {
        sql: String,
        #[source]
        source: StoreError,
    },

    #[error("Statement failed ({kind}): {source}")]
    Exec {
        kind: ExecErrorKind,
        #[source]
        source: StoreError,
    },

    #[error("No row in {table} with id {id}")]
    NotFound { table: String, id: String },

    #[error("Row could not be scanned: {0}")]
    Scan(String),

    #[error("No row in {table} with id {id} was affected")]
    NoRowsAffected { table: String, id: String },

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
}

impl DalError {
    /// Classify a store failure raised while executing a statement
    pub(crate) fn from_exec(source: StoreError) -> Self {
        match source {
            StoreError::Decode(message) => DalError::Scan(message),
            other => {
                let kind = match &other {
                    StoreError::Constraint(_) => ExecErrorKind::Constraint,
                    StoreError::Connection(_) => ExecErrorKind::Connection,
                    _ => ExecErrorKind::Other,
                };
                DalError::Exec { kind, source: other }
            }
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DalError::Exec { kind: ExecErrorKind::Constraint, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DalError::NotFound { .. } | DalError::NoRowsAffected { .. })
    }
}

impl IsTransient for DalError {
    fn is_transient(&self) -> bool {
        match self {
            DalError::Exec { kind, .. } => *kind == ExecErrorKind::Connection,
            DalError::Prepare { source, .. } => matches!(source, StoreError::Connection(_)),
            DalError::Timeout { .. } => true,
            _ => false,
        }
    }
}
