use serde::{Deserialize, Serialize};

use crate::dal::{expect_row_width, Catalog, ColumnType, FromRow, Row, SchemaError, TableSchema, Value};

// ============================================================================
// Event - the record accepted by the ingestion gateway
// ============================================================================

pub const EVENTS_TABLE: &str = "events";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub payload: String,
}

impl Event {
    /// Column layout of the `events` table; positional values follow it
    pub fn schema() -> Result<TableSchema, SchemaError> {
        TableSchema::new(
            EVENTS_TABLE,
            &[
                ("id", ColumnType::BigInt),
                ("name", ColumnType::Text),
                ("payload", ColumnType::Text),
            ],
        )
    }

    pub fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.id),
            Value::Text(self.name.clone()),
            Value::Text(self.payload.clone()),
        ]
    }
}

impl FromRow for Event {
    fn from_row(row: Row) -> Result<Self, String> {
        expect_row_width(&row, 3)?;
        let mut columns = row.into_iter();

        match (columns.next(), columns.next(), columns.next()) {
            (Some(Value::Int(id)), Some(Value::Text(name)), Some(Value::Text(payload))) => {
                Ok(Event { id, name, payload })
            }
            (id, name, payload) => Err(format!(
                "events row has unexpected column types: ({:?}, {:?}, {:?})",
                id.map(|v| v.column_type()),
                name.map(|v| v.column_type()),
                payload.map(|v| v.column_type()),
            )),
        }
    }
}

/// Tables the gateway is allowed to touch
pub fn gateway_catalog() -> Result<Catalog, SchemaError> {
    Catalog::new().with_table(Event::schema()?)
}
