use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A single numeric cell read from the row source. Timestamps arrive as
/// epoch-millis integers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowValue {
    Integer(i64),
    Float(f64),
}

impl RowValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            RowValue::Integer(v) => v as f64,
            RowValue::Float(v) => v,
        }
    }

    /// Integer view of the cell, as a JDBC `getLong` reads it: floats
    /// truncate toward zero and saturate at the i64 bounds, NaN reads as 0.
    pub fn as_i64(&self) -> i64 {
        match *self {
            RowValue::Integer(v) => v,
            RowValue::Float(v) => v.trunc() as i64,
        }
    }
}

impl From<i64> for RowValue {
    fn from(v: i64) -> Self { RowValue::Integer(v) }
}

impl From<i32> for RowValue {
    fn from(v: i32) -> Self { RowValue::Integer(v as i64) }
}

impl From<f64> for RowValue {
    fn from(v: f64) -> Self { RowValue::Float(v) }
}

/// Named-column access over one row of a query result.
pub trait Row {
    /// `Ok(None)` is SQL NULL; a column the row does not carry is an error.
    fn value(&self, column: &str) -> AppResult<Option<RowValue>>;

    fn long(&self, column: &str) -> AppResult<Option<i64>> {
        Ok(self.value(column)?.map(|v| v.as_i64()))
    }

    fn double(&self, column: &str) -> AppResult<Option<f64>> {
        Ok(self.value(column)?.map(|v| v.as_f64()))
    }
}

/// In-memory row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapRow {
    columns: HashMap<String, Option<RowValue>>,
}

impl MapRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<RowValue>) -> Self {
        self.columns.insert(column.into(), Some(value.into()));
        self
    }

    pub fn with_null(mut self, column: impl Into<String>) -> Self {
        self.columns.insert(column.into(), None);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: Option<RowValue>) {
        self.columns.insert(column.into(), value);
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }
}

impl Row for MapRow {
    fn value(&self, column: &str) -> AppResult<Option<RowValue>> {
        self.columns
            .get(column)
            .copied()
            .ok_or_else(|| AppError::Internal(format!("column \"{}\" not present in result row", column)))
    }
}

impl<R: Row + ?Sized> Row for &R {
    fn value(&self, column: &str) -> AppResult<Option<RowValue>> {
        (**self).value(column)
    }
}
