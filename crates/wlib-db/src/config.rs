//! Connection configuration.

use serde::{Deserialize, Serialize};
use wlib_sql_core::DialectKind;

use crate::error::{DbError, Result};

/// Prefix of the environment variables read by [`DbConfig::from_env`].
pub const ENV_PREFIX: &str = "WLIB_DB_";

/// How column names of fetched rows are cased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnCase {
    /// As returned by the driver.
    #[default]
    Natural,
    /// Lowercased.
    Lower,
    /// Uppercased.
    Upper,
}

impl ColumnCase {
    /// Applies the casing to a column name.
    #[must_use]
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::Natural => name.to_string(),
            Self::Lower => name.to_lowercase(),
            Self::Upper => name.to_uppercase(),
        }
    }
}

/// How NULLs and empty strings of fetched rows are converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullHandling {
    /// No conversion.
    #[default]
    Natural,
    /// Empty strings become NULL.
    EmptyStringToNull,
    /// NULLs become empty strings.
    NullToEmptyString,
}

/// Row-shaping attributes applied to every fetched row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    /// Column name casing.
    pub column_case: ColumnCase,
    /// NULL conversion.
    pub nulls: NullHandling,
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Driver name: `mysql`, `pgsql`/`postgres`, or `sqlite`.
    pub driver: String,
    /// Database name, or file path for SQLite (`:memory:` for in-memory).
    pub database: String,
    /// User name (network dialects).
    pub user: Option<String>,
    /// Password (network dialects).
    pub password: Option<String>,
    /// Host, `localhost` when unset.
    pub host: Option<String>,
    /// Port, the dialect default when unset.
    pub port: Option<u16>,
    /// Connect timeout in seconds (network dialects).
    pub timeout: Option<u64>,
    /// Keep an in-memory log of executed statements.
    pub log_queries: bool,
    /// Row-shaping attributes.
    pub attributes: Attributes,
}

impl DbConfig {
    /// Creates a configuration for `driver` and `database`.
    pub fn new(driver: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// SQLite database stored at `path` (created when missing).
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new("sqlite", path)
    }

    /// Private in-memory SQLite database.
    #[must_use]
    pub fn sqlite_memory() -> Self {
        Self::new("sqlite", ":memory:")
    }

    /// Sets the user name.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the connect timeout in seconds.
    #[must_use]
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    /// Enables or disables the in-memory query log.
    #[must_use]
    pub fn log_queries(mut self, enabled: bool) -> Self {
        self.log_queries = enabled;
        self
    }

    /// Sets the row-shaping attributes.
    #[must_use]
    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Reads `WLIB_DB_*` variables, after loading a `.env` file if present.
    pub fn from_env() -> Result<Self> {
        // a missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from a variable lookup function.
    ///
    /// `lookup` receives the full variable name, e.g. `WLIB_DB_DRIVER`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));
        let mut config = Self::new(
            var("DRIVER").unwrap_or_default(),
            var("NAME").unwrap_or_default(),
        );
        config.user = var("USER");
        config.password = var("PASSWORD");
        config.host = var("HOST");
        if let Some(port) = var("PORT") {
            config.port = Some(port.trim().parse().map_err(|_| {
                DbError::InvalidConfiguration(format!("invalid port {port:?}"))
            })?);
        }
        if let Some(timeout) = var("TIMEOUT") {
            config.timeout = Some(timeout.trim().parse().map_err(|_| {
                DbError::InvalidConfiguration(format!("invalid timeout {timeout:?}"))
            })?);
        }
        config.log_queries = var("LOG").is_some_and(|v| {
            matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes")
        });
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the driver and database name, returning the dialect.
    pub fn validate(&self) -> Result<DialectKind> {
        let kind = DialectKind::parse(&self.driver).map_err(|_| {
            DbError::InvalidConfiguration(format!("unsupported driver {:?}", self.driver))
        })?;
        if self.database.trim().is_empty() {
            return Err(DbError::InvalidConfiguration(String::from(
                "database name is empty",
            )));
        }
        Ok(kind)
    }
}

/// Per-connect overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Replaces the configured attributes.
    pub attributes: Option<Attributes>,
    /// Replaces the configured connect timeout (seconds).
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_validate() {
        assert_eq!(DbConfig::sqlite_memory().validate().unwrap(), DialectKind::Sqlite);
        assert_eq!(
            DbConfig::new("pgsql", "app").validate().unwrap(),
            DialectKind::Postgres
        );
        assert!(matches!(
            DbConfig::new("oracle", "app").validate(),
            Err(DbError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            DbConfig::new("mysql", "  ").validate(),
            Err(DbError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("WLIB_DB_DRIVER", "mysql"),
            ("WLIB_DB_NAME", "blog"),
            ("WLIB_DB_USER", "root"),
            ("WLIB_DB_PORT", "3307"),
            ("WLIB_DB_LOG", "true"),
        ]
        .into_iter()
        .collect();
        let config = DbConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();
        assert_eq!(config.driver, "mysql");
        assert_eq!(config.database, "blog");
        assert_eq!(config.user.as_deref(), Some("root"));
        assert_eq!(config.port, Some(3307));
        assert!(config.log_queries);
        assert_eq!(config.host, None);
    }

    #[test]
    fn test_from_lookup_rejects_bad_port() {
        let result = DbConfig::from_lookup(|k| match k {
            "WLIB_DB_DRIVER" => Some("mysql".into()),
            "WLIB_DB_NAME" => Some("blog".into()),
            "WLIB_DB_PORT" => Some("abc".into()),
            _ => None,
        });
        assert!(matches!(result, Err(DbError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_from_json() {
        let config = DbConfig::from_json(
            r#"{"driver": "sqlite", "database": ":memory:",
                "attributes": {"column_case": "upper", "nulls": "null_to_empty_string"}}"#,
        )
        .unwrap();
        assert_eq!(config.attributes.column_case, ColumnCase::Upper);
        assert_eq!(config.attributes.nulls, NullHandling::NullToEmptyString);
        assert!(!config.log_queries);

        assert!(DbConfig::from_json(r#"{"driver": "sqlite"}"#).is_err());
        assert!(matches!(
            DbConfig::from_json("{"),
            Err(DbError::Deserialize(_))
        ));
    }

    #[test]
    fn test_column_case() {
        assert_eq!(ColumnCase::Natural.apply("Title"), "Title");
        assert_eq!(ColumnCase::Lower.apply("Title"), "title");
        assert_eq!(ColumnCase::Upper.apply("Title"), "TITLE");
    }
}
