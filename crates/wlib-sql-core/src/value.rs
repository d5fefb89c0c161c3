//! Tagged values, bind types and parameter sets.
//!
//! Every value that travels towards the driver carries its variant
//! explicitly, so there is no guessing about whether `"5"` is a string or an
//! integer. A declared [`ParamType`] can still coerce a value at bind time.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, SqlError};

/// A SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// A SQL fragment emitted verbatim and never bound, e.g. `views + 1`.
    Raw(String),
}

impl Value {
    /// Creates a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Creates a raw SQL fragment.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    /// The `NOW()` sentinel, rewritten per dialect.
    #[must_use]
    pub fn now() -> Self {
        Self::Text(String::from("NOW()"))
    }

    /// Returns whether this is SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the text payload of `Text` and `Raw` values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Raw(s) => Some(s),
            _ => None,
        }
    }

    /// Returns whether the value is a placeholder token (`:name` or `?`).
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Text(s) if s.starts_with(':') || s == "?")
    }

    /// Returns whether the value is the `NOW()` sentinel (any case).
    #[must_use]
    pub fn is_now(&self) -> bool {
        matches!(self, Self::Text(s) if s.eq_ignore_ascii_case("NOW()"))
    }

    /// Returns whether the value is the literal text `NULL`.
    ///
    /// `set()` treats it as the SQL keyword, which is the only way to assign
    /// NULL through the builder: a real [`Value::Null`] is dropped.
    #[must_use]
    pub fn is_null_literal(&self) -> bool {
        matches!(self, Self::Text(s) if s == "NULL")
    }

    /// Interprets the value as an integer where that is lossless enough.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Bool(b) => Some(i64::from(*b)),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interprets the value as a float.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(n) => Some(*n as f64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the SQL representation for inline use (escaped).
    ///
    /// **Warning**: Prefer using parameterized queries instead.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Text(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Raw(sql) => sql.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", u8::from(*b)),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) | Self::Raw(s) => f.write_str(s),
            Self::Blob(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Self::Int(i64::from(n))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Self::Float(f64::from(f))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(String::from(s))
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Blob(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::Blob(b.to_vec())
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Declared bind type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Bind as text.
    Str,
    /// Bind as a 64-bit integer.
    Int,
    /// Bind as a boolean.
    Bool,
    /// Bind as a double.
    Float,
    /// Bind as a binary blob.
    Lob,
    /// Always bind NULL.
    Null,
}

impl ParamType {
    /// Converts `value` to this bind type.
    ///
    /// NULL stays NULL for every type. Text is parsed for numeric and
    /// boolean types; a value that cannot be parsed is a
    /// [`SqlError::TypeMismatch`].
    pub fn coerce(self, value: Value) -> Result<Value> {
        let value = match value {
            Value::Raw(s) => Value::Text(s),
            other => other,
        };
        if value.is_null() {
            return Ok(value);
        }
        let mismatch = |v: &Value| SqlError::TypeMismatch {
            expected: self,
            value: format!("{v:?}"),
        };
        match self {
            Self::Null => Ok(Value::Null),
            Self::Str => Ok(match value {
                Value::Text(_) => value,
                Value::Blob(b) => Value::Text(String::from_utf8_lossy(&b).into_owned()),
                other => Value::Text(other.to_string()),
            }),
            Self::Int => value.as_i64().map(Value::Int).ok_or_else(|| mismatch(&value)),
            Self::Float => value
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| mismatch(&value)),
            Self::Bool => match &value {
                Value::Bool(_) => Ok(value),
                Value::Int(n) => Ok(Value::Bool(*n != 0)),
                Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "on" | "yes" => Ok(Value::Bool(true)),
                    "0" | "false" | "off" | "no" | "" => Ok(Value::Bool(false)),
                    _ => Err(mismatch(&value)),
                },
                _ => Err(mismatch(&value)),
            },
            Self::Lob => Ok(match value {
                Value::Blob(_) => value,
                Value::Text(s) => Value::Blob(s.into_bytes()),
                other => Value::Blob(other.to_string().into_bytes()),
            }),
        }
    }
}

/// Key of a bound parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamKey {
    /// A named parameter, stored without its leading colon.
    Named(String),
    /// A positional (`?`) parameter, 1-based.
    Positional(usize),
}

impl ParamKey {
    /// Creates a named key, stripping a leading `:` if present.
    pub fn named(name: &str) -> Self {
        Self::Named(name.strip_prefix(':').unwrap_or(name).to_string())
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, ":{name}"),
            Self::Positional(n) => write!(f, "?{n}"),
        }
    }
}

impl From<&str> for ParamKey {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for ParamKey {
    fn from(name: String) -> Self {
        Self::named(&name)
    }
}

impl From<usize> for ParamKey {
    fn from(n: usize) -> Self {
        Self::Positional(n)
    }
}

/// A bound value with its optional declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// The value.
    pub value: Value,
    /// Declared bind type, if any.
    pub ty: Option<ParamType>,
}

/// The parameter set of a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: BTreeMap<ParamKey, Param>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a parameter.
    pub fn insert(&mut self, key: impl Into<ParamKey>, value: impl Into<Value>, ty: Option<ParamType>) {
        self.entries.insert(
            key.into(),
            Param {
                value: value.into(),
                ty,
            },
        );
    }

    /// Builder-style [`Params::insert`] without a declared type.
    #[must_use]
    pub fn with(mut self, key: impl Into<ParamKey>, value: impl Into<Value>) -> Self {
        self.insert(key, value, None);
        self
    }

    /// Returns the parameter registered under `key`.
    #[must_use]
    pub fn get(&self, key: &ParamKey) -> Option<&Param> {
        self.entries.get(key)
    }

    /// Removes a parameter.
    pub fn remove(&mut self, key: &ParamKey) -> Option<Param> {
        self.entries.remove(key)
    }

    /// Copies every entry of `other` into this set.
    pub fn extend(&mut self, other: &Params) {
        for (key, param) in &other.entries {
            self.entries.insert(key.clone(), param.clone());
        }
    }

    /// Returns whether any parameter carries a declared type.
    #[must_use]
    pub fn has_types(&self) -> bool {
        self.entries.values().any(|p| p.ty.is_some())
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &Param)> {
        self.entries.iter()
    }
}

impl<K: Into<ParamKey>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value, None);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_inline() {
        assert_eq!(Value::Null.to_sql_inline(), "NULL");
        assert_eq!(Value::Bool(true).to_sql_inline(), "TRUE");
        assert_eq!(Value::Int(-100).to_sql_inline(), "-100");
        assert_eq!(Value::text("it's").to_sql_inline(), "'it''s'");
        assert_eq!(Value::Blob(vec![0x48, 0x49]).to_sql_inline(), "X'4849'");
        assert_eq!(Value::raw("views + 1").to_sql_inline(), "views + 1");
    }

    #[test]
    fn test_sentinels() {
        assert!(Value::text(":id").is_placeholder());
        assert!(Value::text("?").is_placeholder());
        assert!(!Value::text("??").is_placeholder());
        assert!(!Value::Int(1).is_placeholder());
        assert!(Value::text("now()").is_now());
        assert!(Value::now().is_now());
        assert!(!Value::text("NOW() + 1").is_now());
        assert!(Value::text("NULL").is_null_literal());
        assert!(!Value::Null.is_null_literal());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(42_i32), Value::Int(42));
        assert_eq!(Value::from("hello"), Value::text("hello"));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(2.5_f64)), Value::Float(2.5));
    }

    #[test]
    fn test_coerce_by_declared_type() {
        assert_eq!(ParamType::Int.coerce(Value::text(" 5 ")), Ok(Value::Int(5)));
        assert_eq!(ParamType::Str.coerce(Value::Int(5)), Ok(Value::text("5")));
        assert_eq!(ParamType::Bool.coerce(Value::text("yes")), Ok(Value::Bool(true)));
        assert_eq!(ParamType::Float.coerce(Value::Int(2)), Ok(Value::Float(2.0)));
        assert_eq!(ParamType::Lob.coerce(Value::text("ab")), Ok(Value::Blob(b"ab".to_vec())));
        assert_eq!(ParamType::Null.coerce(Value::Int(3)), Ok(Value::Null));
        assert_eq!(ParamType::Int.coerce(Value::Null), Ok(Value::Null));
        assert!(matches!(
            ParamType::Int.coerce(Value::text("five")),
            Err(SqlError::TypeMismatch { expected: ParamType::Int, .. })
        ));
    }

    #[test]
    fn test_param_keys() {
        assert_eq!(ParamKey::from(":id"), ParamKey::Named("id".into()));
        assert_eq!(ParamKey::from("id"), ParamKey::Named("id".into()));
        assert_eq!(ParamKey::from(2_usize), ParamKey::Positional(2));
        assert_eq!(ParamKey::from("id").to_string(), ":id");
    }

    #[test]
    fn test_params_collect_and_extend() {
        let mut params: Params = [("a", 1), (":b", 2)].into_iter().collect();
        assert_eq!(params.len(), 2);
        assert!(!params.has_types());
        let mut other = Params::new();
        other.insert("c", "x", Some(ParamType::Str));
        params.extend(&other);
        assert!(params.has_types());
        assert_eq!(
            params.get(&ParamKey::named("b")).map(|p| &p.value),
            Some(&Value::Int(2))
        );
    }
}
