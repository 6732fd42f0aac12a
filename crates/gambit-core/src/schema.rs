//! Column inference for load-package tables.
//!
//! Types are derived from the JSON values actually seen in a table's rows.
//! Every column is nullable; nested objects and arrays stay JSON.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::JsonObject;

/// Warehouse type of an inferred column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    BigInt,
    Double,
    Bool,
    Json,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Bool => "BOOLEAN",
            ColumnType::Json => "JSONB",
        }
    }

    /// The type a single value asks for; `null` asks for nothing.
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Bool),
            Value::Number(n) if n.as_i64().is_some() => Some(ColumnType::BigInt),
            Value::Number(_) => Some(ColumnType::Double),
            Value::String(_) => Some(ColumnType::Text),
            Value::Array(_) | Value::Object(_) => Some(ColumnType::Json),
        }
    }

    fn merge(self, other: Self) -> Self {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (BigInt, Double) | (Double, BigInt) => Double,
            _ => Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: ColumnType,
}

/// Ordered columns of one table, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn infer(rows: &[JsonObject]) -> Self {
        let mut order: Vec<(String, Option<ColumnType>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for row in rows {
            for (key, value) in row {
                let slot = *index.entry(key.clone()).or_insert_with(|| {
                    order.push((key.clone(), None));
                    order.len() - 1
                });
                if let Some(seen) = ColumnType::of(value) {
                    let current = &mut order[slot].1;
                    *current = Some(match *current {
                        Some(existing) => existing.merge(seen),
                        None => seen,
                    });
                }
            }
        }

        let columns = order
            .into_iter()
            .map(|(name, data_type)| Column {
                name,
                data_type: data_type.unwrap_or(ColumnType::Text),
            })
            .collect();

        Self { columns }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
