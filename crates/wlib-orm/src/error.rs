//! Error types for the table layer.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use wlib_db::DbError;
use wlib_sql_core::SqlError;

/// Table-layer errors.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Connection, SQL generation or driver failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Submitted fields were rejected by the table's filters.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Table metadata or a filter template is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A filter pattern failed to compile.
    #[error("Invalid filter pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl From<SqlError> for OrmError {
    fn from(err: SqlError) -> Self {
        Self::Db(DbError::Sql(err))
    }
}

impl From<ValidationErrors> for OrmError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Result type alias for table operations.
pub type Result<T> = std::result::Result<T, OrmError>;

/// Validation messages keyed by column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Messages per column, in column order.
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message for `column`.
    pub fn add(&mut self, column: &str, message: impl Into<String>) {
        self.errors
            .entry(column.to_string())
            .or_default()
            .push(message.into());
    }

    /// Returns whether there are no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of columns with messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Messages of one column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&[String]> {
        self.errors.get(column).map(Vec::as_slice)
    }

    /// Every `(column, message)` pair.
    #[must_use]
    pub fn all_errors(&self) -> Vec<(&str, &str)> {
        self.errors
            .iter()
            .flat_map(|(column, messages)| {
                messages
                    .iter()
                    .map(move |msg| (column.as_str(), msg.as_str()))
            })
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (column, message) in self.all_errors() {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{column}: {message}")?;
            first = false;
        }
        Ok(())
    }
}
