// ============================================================================
// Data Access Layer
// ============================================================================
//
// Table-agnostic CRUD on top of the store boundary:
// - schema: validated identifiers and the catalog of registered tables
// - query_builder: pure SQL rendering with `$n` placeholders
// - access: the DataAccessLayer itself
//
// ============================================================================

mod access;
mod errors;
pub mod query_builder;
mod schema;
pub mod value;

pub use access::{DalConfig, DataAccessLayer};
pub use errors::{DalError, ExecErrorKind};
pub use query_builder::BuildError;
pub use schema::{Catalog, Column, ColumnType, SchemaError, TableName, TableSchema, ID_COLUMN};
pub use value::{expect_row_width, FromRow, Row, Value};
