//! Identifier validation and quoting.
//!
//! Table and column names that end up inside generated SQL must match
//! `[A-Za-z0-9_]+`. Anything else is rejected before it reaches the
//! statement text.

use crate::error::{Result, SqlError};

/// Validates an identifier, returning it unchanged on success.
pub fn check(name: &str) -> Result<&str> {
    if !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        Ok(name)
    } else {
        Err(SqlError::InvalidIdentifier(name.to_string()))
    }
}

/// Validates an identifier and optionally wraps it in `quote`.
pub fn escape(name: &str, quote: char, enclose: bool) -> Result<String> {
    let name = check(name)?;
    if enclose {
        Ok(format!("{quote}{name}{quote}"))
    } else {
        Ok(name.to_string())
    }
}
