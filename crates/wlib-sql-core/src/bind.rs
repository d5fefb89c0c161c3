//! Placeholder expansion.
//!
//! Statements are written with `:name` and `?` placeholders. Before they
//! reach the driver, [`expand`] rewrites every placeholder into the
//! dialect's positional form and collects the values in binding order, so
//! the driver layer only ever sees positional parameters.

use crate::dialect::{Dialect, DialectKind};
use crate::error::{Result, SqlError};
use crate::value::{ParamKey, Params, Value};

/// A statement ready for the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// SQL with positional placeholders.
    pub sql: String,
    /// Values in placeholder order.
    pub values: Vec<Value>,
}

/// Rewrites the placeholders of `sql` for `dialect`.
///
/// String literals, quoted identifiers and comments are copied untouched,
/// and `::` casts are not placeholders. A name used twice binds its value
/// twice. `now` replaces `NOW()` values on engines without that function.
pub fn expand(sql: &str, params: &Params, dialect: &dyn Dialect, now: &str) -> Result<Bound> {
    let backslash_escapes = dialect.kind() == DialectKind::MySql;
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut values = Vec::new();
    let mut positional = 0_usize;
    let mut start = 0_usize;
    let mut i = 0_usize;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i = skip_quoted(bytes, i, quote, backslash_escapes && quote != b'`');
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |p| i + p + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = sql[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
            }
            b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
            b':' if bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') => {
                let name_end = bytes[i + 1..]
                    .iter()
                    .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))
                    .map_or(bytes.len(), |p| i + 1 + p);
                out.push_str(&sql[start..i]);
                let key = ParamKey::Named(sql[i + 1..name_end].to_string());
                bind_one(&key, params, dialect, now, &mut values, &mut out)?;
                i = name_end;
                start = i;
            }
            b'?' => {
                positional += 1;
                out.push_str(&sql[start..i]);
                let key = ParamKey::Positional(positional);
                bind_one(&key, params, dialect, now, &mut values, &mut out)?;
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[start..]);

    Ok(Bound { sql: out, values })
}

fn bind_one(
    key: &ParamKey,
    params: &Params,
    dialect: &dyn Dialect,
    now: &str,
    values: &mut Vec<Value>,
    out: &mut String,
) -> Result<()> {
    let param = params
        .get(key)
        .ok_or_else(|| SqlError::MissingParameter(key.to_string()))?;
    let mut value = match param.ty {
        Some(ty) => ty.coerce(param.value.clone())?,
        None => param.value.clone(),
    };
    if !dialect.supports_now() && value.is_now() {
        value = Value::Text(now.to_string());
    }
    if let Value::Raw(text) = value {
        value = Value::Text(text);
    }
    values.push(value);
    out.push_str(&dialect.placeholder(values.len()));
    Ok(())
}

/// Returns the index just past the literal opened at `open`.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8, backslash_escapes: bool) -> usize {
    let mut i = open + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslash_escapes && b == b'\\' {
            i += 2;
        } else if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
            } else {
                return i + 1;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}
