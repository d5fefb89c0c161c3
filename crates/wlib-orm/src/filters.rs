//! Reusable validation filters.
//!
//! A [`FilterRegistry`] maps template names (`string`, `alnum`, `bool`,
//! `enum`, `date`, `time`, `datetime`) to [`Template`]s. Tables turn
//! templates into concrete [`Filter`]s with [`FilterRegistry::get_filter`]
//! and run them over submitted fields with [`FilterRegistry::filter_fields`],
//! typically from `Model::filter_fields`.

use std::collections::HashMap;

use regex::Regex;
use wlib_db::{Db, Fields};
use wlib_sql_core::{ParamType, Value};

use crate::error::{OrmError, Result, ValidationErrors};

/// A filter ready to run over one value.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Strips markup tags and surrounding whitespace from text.
    Sanitize,
    /// Coerces to a boolean; anything unrecognised becomes NULL.
    Boolean,
    /// Rejects non-NULL values whose text does not match `regex`.
    Pattern {
        /// Pattern the whole value must match.
        regex: Regex,
        /// Message reported on mismatch.
        message: String,
    },
}

/// Result of applying a [`Filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// The value to store.
    Valid(Value),
    /// The value was rejected.
    Invalid(String),
}

impl Filter {
    /// Compiles a pattern filter.
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<Self> {
        Ok(Self::Pattern {
            regex: Regex::new(pattern)?,
            message: message.into(),
        })
    }

    /// Runs the filter over `value`.
    #[must_use]
    pub fn apply(&self, value: &Value) -> FilterOutcome {
        match self {
            Self::Sanitize => FilterOutcome::Valid(match value {
                Value::Text(text) => Value::Text(strip_tags(text).trim().to_string()),
                other => other.clone(),
            }),
            Self::Boolean => {
                FilterOutcome::Valid(ParamType::Bool.coerce(value.clone()).unwrap_or(Value::Null))
            }
            Self::Pattern { regex, message } => {
                if value.is_null() || regex.is_match(&value.to_string()) {
                    FilterOutcome::Valid(value.clone())
                } else {
                    FilterOutcome::Invalid(message.clone())
                }
            }
        }
    }
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// A named filter recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    /// See [`Filter::Sanitize`].
    Sanitize,
    /// See [`Filter::Boolean`].
    Boolean,
    /// A fixed pattern.
    Pattern {
        /// Regular expression source.
        pattern: String,
        /// Default message on mismatch.
        message: String,
    },
    /// Membership in a list supplied through [`FilterArgs::source`].
    Enum {
        /// Default message on mismatch.
        message: String,
    },
}

impl Template {
    fn pattern(pattern: &str, message: &str) -> Self {
        Self::Pattern {
            pattern: pattern.to_string(),
            message: message.to_string(),
        }
    }
}

/// Where an `enum` filter reads its allowed values from.
#[derive(Debug, Clone)]
pub enum EnumSource<'a> {
    /// A literal list.
    List(Vec<String>),
    /// A comma- or pipe-delimited string, e.g. `draft|published`.
    Delimited(String),
    /// The members of a database `enum(...)` column.
    Column {
        /// Connection to introspect.
        db: &'a Db,
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
}

impl EnumSource<'_> {
    fn values(&self) -> Result<Vec<String>> {
        match self {
            Self::List(values) => Ok(values.clone()),
            Self::Delimited(text) => Ok(text
                .split([',', '|'])
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect()),
            Self::Column { db, table, column } => {
                db.get_enum_values(table, column)?.ok_or_else(|| {
                    OrmError::InvalidConfiguration(format!(
                        "{table}.{column} is not an enum column"
                    ))
                })
            }
        }
    }
}

/// Extra arguments of [`FilterRegistry::get_filter`].
#[derive(Debug, Clone, Default)]
pub struct FilterArgs<'a> {
    /// Allowed values of an `enum` template.
    pub source: Option<EnumSource<'a>>,
    /// Replaces the template's message.
    pub message: Option<String>,
}

impl<'a> FilterArgs<'a> {
    /// No extra arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the enum source.
    #[must_use]
    pub fn source(mut self, source: EnumSource<'a>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the mismatch message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Registry of filter templates.
#[derive(Debug, Clone)]
pub struct FilterRegistry {
    templates: HashMap<String, Template>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("string", Template::Sanitize);
        registry.register(
            "alnum",
            Template::pattern("^[A-Za-z0-9]+$", "Only letters and digits are allowed"),
        );
        registry.register("bool", Template::Boolean);
        registry.register(
            "enum",
            Template::Enum {
                message: String::from("Invalid value"),
            },
        );
        registry.register(
            "date",
            Template::pattern(r"^\d{4}-\d{2}-\d{2}$", "Expected a date (YYYY-MM-DD)"),
        );
        registry.register(
            "time",
            Template::pattern(r"^\d{2}:\d{2}(:\d{2})?$", "Expected a time (HH:MM:SS)"),
        );
        registry.register(
            "datetime",
            Template::pattern(
                r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}(:\d{2})?$",
                "Expected a date and time (YYYY-MM-DD HH:MM:SS)",
            ),
        );
        registry
    }
}

impl FilterRegistry {
    /// A registry without templates.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Registers or overrides a template, returning the one it replaced.
    pub fn register(&mut self, name: impl Into<String>, template: Template) -> Option<Template> {
        self.templates.insert(name.into(), template)
    }

    /// Looks up a template.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Builds the filter described by template `name`.
    pub fn get_filter(&self, name: &str, args: FilterArgs<'_>) -> Result<Filter> {
        let template = self
            .get(name)
            .ok_or_else(|| OrmError::InvalidConfiguration(format!("unknown filter {name:?}")))?;
        match template {
            Template::Sanitize => Ok(Filter::Sanitize),
            Template::Boolean => Ok(Filter::Boolean),
            Template::Pattern { pattern, message } => {
                Filter::pattern(pattern, args.message.unwrap_or_else(|| message.clone()))
            }
            Template::Enum { message } => {
                let source = args.source.ok_or_else(|| {
                    OrmError::InvalidConfiguration(format!("filter {name:?} needs a value source"))
                })?;
                let values = source.values()?;
                if values.is_empty() {
                    return Err(OrmError::InvalidConfiguration(format!(
                        "filter {name:?} has no allowed values"
                    )));
                }
                let alternatives: Vec<String> =
                    values.iter().map(|v| regex::escape(v)).collect();
                Filter::pattern(
                    &format!("^(?:{})$", alternatives.join("|")),
                    args.message.unwrap_or_else(|| message.clone()),
                )
            }
        }
    }

    /// Runs `rules` over `fields`.
    ///
    /// Only columns that have a rule are kept; a rule whose column was not
    /// submitted is skipped. Every rejected column is reported.
    pub fn filter_fields(
        fields: &Fields,
        rules: &[(&str, Filter)],
    ) -> std::result::Result<Fields, ValidationErrors> {
        let mut filtered = Fields::new();
        let mut errors = ValidationErrors::new();
        for (column, filter) in rules {
            let Some(value) = fields.get(*column) else {
                continue;
            };
            match filter.apply(value) {
                FilterOutcome::Valid(value) => {
                    filtered.insert((*column).to_string(), value);
                }
                FilterOutcome::Invalid(message) => errors.add(column, message),
            }
        }
        if errors.is_empty() {
            Ok(filtered)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(name: &str) -> Filter {
        FilterRegistry::default()
            .get_filter(name, FilterArgs::new())
            .unwrap()
    }

    fn is_valid(filter: &Filter, value: impl Into<Value>) -> bool {
        matches!(filter.apply(&value.into()), FilterOutcome::Valid(_))
    }

    #[test]
    fn test_string_strips_tags() {
        assert_eq!(
            filter("string").apply(&Value::text("  <b>Hello</b> world<br/> ")),
            FilterOutcome::Valid(Value::text("Hello world"))
        );
        assert_eq!(
            filter("string").apply(&Value::Int(3)),
            FilterOutcome::Valid(Value::Int(3))
        );
    }

    #[test]
    fn test_bool_nulls_on_failure() {
        let bool_filter = filter("bool");
        assert_eq!(
            bool_filter.apply(&Value::text("yes")),
            FilterOutcome::Valid(Value::Bool(true))
        );
        assert_eq!(
            bool_filter.apply(&Value::Int(0)),
            FilterOutcome::Valid(Value::Bool(false))
        );
        assert_eq!(
            bool_filter.apply(&Value::text("maybe")),
            FilterOutcome::Valid(Value::Null)
        );
    }

    #[test]
    fn test_format_templates() {
        assert!(is_valid(&filter("alnum"), "abc123"));
        assert!(!is_valid(&filter("alnum"), "abc 123"));
        assert!(is_valid(&filter("date"), "2024-02-29"));
        assert!(!is_valid(&filter("date"), "29/02/2024"));
        assert!(is_valid(&filter("time"), "23:59"));
        assert!(is_valid(&filter("datetime"), "2024-02-29 23:59:00"));
        assert!(is_valid(&filter("datetime"), "2024-02-29T23:59"));
        assert!(!is_valid(&filter("datetime"), "2024-02-29"));
        assert!(is_valid(&filter("date"), Value::Null));
    }

    #[test]
    fn test_enum_sources() {
        let registry = FilterRegistry::default();
        let list = registry
            .get_filter(
                "enum",
                FilterArgs::new().source(EnumSource::List(vec!["draft".into(), "a.b".into()])),
            )
            .unwrap();
        assert!(is_valid(&list, "draft"));
        assert!(is_valid(&list, "a.b"));
        assert!(!is_valid(&list, "axb"));
        assert!(!is_valid(&list, "drafts"));

        let delimited = registry
            .get_filter(
                "enum",
                FilterArgs::new()
                    .source(EnumSource::Delimited("draft| published ,archived".into()))
                    .message("Unknown status"),
            )
            .unwrap();
        assert!(is_valid(&delimited, "published"));
        assert_eq!(
            delimited.apply(&Value::text("deleted")),
            FilterOutcome::Invalid("Unknown status".into())
        );
    }

    #[test]
    fn test_get_filter_errors() {
        let registry = FilterRegistry::default();
        assert!(matches!(
            registry.get_filter("phone", FilterArgs::new()),
            Err(OrmError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            registry.get_filter("enum", FilterArgs::new()),
            Err(OrmError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            registry.get_filter(
                "enum",
                FilterArgs::new().source(EnumSource::Delimited(" | ".into()))
            ),
            Err(OrmError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_register_overrides() {
        let mut registry = FilterRegistry::empty();
        assert!(registry.get("date").is_none());
        registry.register("code", Template::pattern("^[A-Z]{3}$", "Expected a code"));
        let previous = registry.register("code", Template::pattern("(", "broken"));
        assert!(previous.is_some());
        assert!(matches!(
            registry.get_filter("code", FilterArgs::new()),
            Err(OrmError::Regex(_))
        ));
    }

    #[test]
    fn test_filter_fields() {
        let mut fields = Fields::new();
        fields.insert("title".into(), Value::text("<i>Hi</i>"));
        fields.insert("published".into(), Value::text("on"));
        fields.insert("owner".into(), Value::Int(7));

        let rules = [("title", Filter::Sanitize), ("published", Filter::Boolean), ("views", Filter::Boolean)];
        let filtered = FilterRegistry::filter_fields(&fields, &rules).unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.get("title"), Some(&Value::text("Hi")));
        assert_eq!(filtered.get("published"), Some(&Value::Bool(true)));
        assert!(!filtered.contains_key("owner"));

        let rules = [("title", filter("alnum")), ("published", filter("date"))];
        let errors = FilterRegistry::filter_fields(&fields, &rules).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.get("title").is_some());
    }
}
