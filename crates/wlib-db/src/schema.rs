//! Column metadata and default-value parsing.

use wlib_sql_core::{DialectKind, Value};

use crate::record::Record;

/// Metadata of one table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared type as reported by the engine, e.g. `enum('a','b')`.
    pub type_name: String,
    /// `NOT NULL` constraint.
    pub not_null: bool,
    /// Default expression text, if any.
    pub default: Option<String>,
    /// Part of the primary key.
    pub primary_key: bool,
}

impl ColumnInfo {
    /// Reads a row of a dialect column query (positional, so column casing
    /// attributes do not matter).
    pub(crate) fn from_record(record: &Record) -> Self {
        let text = |idx: usize| match record.get_index(idx) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.to_string()),
        };
        let flag = |idx: usize| record.get_index(idx).and_then(Value::as_i64).unwrap_or(0) != 0;
        Self {
            name: text(0).unwrap_or_default(),
            type_name: text(1).unwrap_or_default(),
            not_null: flag(2),
            default: text(3).filter(|d| !d.is_empty()),
            primary_key: flag(4),
        }
    }

    /// The value a new row gets for this column.
    ///
    /// Literal defaults are parsed; expressions such as `CURRENT_TIMESTAMP`
    /// or `nextval(...)` yield NULL.
    #[must_use]
    pub fn default_value(&self, kind: DialectKind) -> Value {
        self.default
            .as_deref()
            .map_or(Value::Null, |d| parse_default(d, kind))
    }
}

fn parse_default(default: &str, kind: DialectKind) -> Value {
    let mut text = default.trim();
    // postgres reports 'draft'::character varying
    if kind == DialectKind::Postgres {
        if let Some((literal, _cast)) = text.split_once("::") {
            text = literal.trim();
        }
    }
    if let Some(inner) = text
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return Value::Text(inner.replace("''", "'"));
    }
    if text.eq_ignore_ascii_case("NULL") {
        return Value::Null;
    }
    if let Ok(n) = text.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(f) = text.parse::<f64>() {
        return Value::Float(f);
    }
    if text.eq_ignore_ascii_case("TRUE") || text.eq_ignore_ascii_case("FALSE") {
        return Value::Bool(text.eq_ignore_ascii_case("TRUE"));
    }
    // information_schema on MySQL reports string defaults unquoted
    let is_expression = text.contains('(') || text.to_ascii_uppercase().starts_with("CURRENT_");
    if kind == DialectKind::MySql && !is_expression {
        return Value::Text(text.to_string());
    }
    Value::Null
}

/// Parses the member list of an `enum('a','b',...)` column type.
///
/// Returns `None` when the type is not an enum.
#[must_use]
pub fn parse_enum_values(type_name: &str) -> Option<Vec<String>> {
    let trimmed = type_name.trim();
    if !trimmed.get(..5)?.eq_ignore_ascii_case("enum(") {
        return None;
    }
    let body = trimmed[5..].strip_suffix(')')?;

    let mut values = Vec::new();
    let mut chars = body.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some('\'') => {}
            Some(_) => return None,
        }
        let mut value = String::new();
        loop {
            match chars.next() {
                None => return None,
                Some('\'') if chars.peek() == Some(&'\'') => {
                    chars.next();
                    value.push('\'');
                }
                Some('\'') => break,
                Some(c) => value.push(c),
            }
        }
        values.push(value);
    }
    Some(values)
}
