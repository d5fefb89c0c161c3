//! Error types for the connection and query layer.

use wlib_sql_core::SqlError;

/// Errors that can occur while configuring, connecting or executing.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The configuration names an unknown driver or an empty database.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// SQL generation or binding failed.
    #[error(transparent)]
    Sql(#[from] SqlError),

    /// A fetch or row count was requested before `run()`.
    #[error("Query has not been executed")]
    NotExecuted,

    /// Composite column and value lists differ in length.
    #[error("Shape mismatch: {names} column(s) but {values} value(s)")]
    ShapeMismatch {
        /// Number of column names.
        names: usize,
        /// Number of values.
        values: usize,
    },

    /// Error reported by the database driver.
    #[error("Database error: {0}")]
    Driver(#[from] sqlx::Error),

    /// The blocking runtime could not be created.
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    /// The connection URL could not be assembled.
    #[error("Invalid connection URL: {0}")]
    Url(#[from] url::ParseError),

    /// Opening the connection took longer than the configured timeout.
    #[error("Connection timed out after {0} second(s)")]
    Timeout(u64),

    /// A row or configuration could not be converted through serde.
    #[error("Serialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;
