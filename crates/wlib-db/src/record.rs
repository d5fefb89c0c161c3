//! Fetched rows.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use sqlx::{Column, Row};
use wlib_sql_core::Value;

use crate::config::{Attributes, NullHandling};
use crate::error::Result;

/// Submitted column values, keyed by column name.
pub type Fields = BTreeMap<String, Value>;

/// One fetched row: column names and values in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names in select order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in select order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value of the first column called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Returns the value at `index`.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns a column as an integer.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Returns a text column.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Iterates over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Converts into a name-keyed map. Later duplicates win.
    #[must_use]
    pub fn into_map(self) -> Fields {
        self.columns.into_iter().zip(self.values).collect()
    }

    /// Consumes the record, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Renders the record as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(column, value)| (column.to_string(), value_to_json(value)))
                .collect(),
        )
    }

    /// Deserializes the record into `T` through its JSON form.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let (columns, values) = iter.into_iter().unzip();
        Self { columns, values }
    }
}

/// Converts a value to JSON. Blobs become byte arrays.
#[must_use]
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Text(s) | Value::Raw(s) => serde_json::Value::String(s.clone()),
        Value::Blob(b) => serde_json::Value::from(b.clone()),
    }
}

/// Decodes a driver row with `decode`, applying the connection attributes.
pub(crate) fn decode_row<R, D>(row: &R, attributes: Attributes, decode: D) -> Result<Record>
where
    R: Row,
    D: Fn(&R, usize) -> Result<Value>,
{
    let mut record = Record {
        columns: Vec::with_capacity(row.columns().len()),
        values: Vec::with_capacity(row.columns().len()),
    };
    for column in row.columns() {
        let value = match (attributes.nulls, decode(row, column.ordinal())?) {
            (NullHandling::EmptyStringToNull, Value::Text(s)) if s.is_empty() => Value::Null,
            (NullHandling::NullToEmptyString, Value::Null) => Value::Text(String::new()),
            (_, value) => value,
        };
        record.columns.push(attributes.column_case.apply(column.name()));
        record.values.push(value);
    }
    Ok(record)
}
