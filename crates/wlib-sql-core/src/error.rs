//! SQL generation errors.

use core::fmt;

use crate::value::ParamType;

/// An error raised while validating, compiling or binding a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlError {
    /// A table or column name is empty or contains characters outside `[A-Za-z0-9_]`.
    InvalidIdentifier(String),
    /// A placeholder in the SQL text has no registered parameter.
    MissingParameter(String),
    /// The clause tree lacks a part required by its query kind.
    IncompleteQuery(&'static str),
    /// The dialect has no equivalent for a requested statement.
    Unsupported {
        /// Dialect name.
        dialect: &'static str,
        /// The statement or feature that was requested.
        feature: &'static str,
    },
    /// A value could not be converted to its declared bind type.
    TypeMismatch {
        /// The declared bind type.
        expected: ParamType,
        /// Debug rendering of the offending value.
        value: String,
    },
    /// A driver name that maps to no supported dialect.
    UnknownDialect(String),
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentifier(name) => write!(f, "invalid identifier: {name:?}"),
            Self::MissingParameter(name) => write!(f, "no value bound for parameter {name}"),
            Self::IncompleteQuery(what) => write!(f, "incomplete query: {what}"),
            Self::Unsupported { dialect, feature } => {
                write!(f, "{feature} is not supported by the {dialect} dialect")
            }
            Self::TypeMismatch { expected, value } => {
                write!(f, "cannot bind {value} as {expected:?}")
            }
            Self::UnknownDialect(driver) => write!(f, "unknown database driver: {driver:?}"),
        }
    }
}

impl std::error::Error for SqlError {}

/// Result type alias for SQL generation.
pub type Result<T> = core::result::Result<T, SqlError>;
