//! SQL Dialect support.
//!
//! MySQL, PostgreSQL and SQLite disagree on identifier quoting, placeholder
//! syntax, `NOW()`, `TRUNCATE` and schema introspection. The [`Dialect`]
//! trait collects every such difference so the builder and the connection
//! never branch on a driver name.

mod mysql;
mod postgres;
mod sqlite;

use core::fmt;
use core::str::FromStr;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::error::{Result, SqlError};
use crate::ident;

/// `strftime`-style format of the timestamp substituted for `NOW()` on
/// engines without that function.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Trait for SQL dialect-specific behavior.
///
/// Introspection queries take a single `:table` parameter and return the
/// column aliases documented on each method.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Returns the kind of this dialect.
    fn kind(&self) -> DialectKind;

    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Validates an identifier and quotes it when `enclose` is set.
    fn escape(&self, name: &str, enclose: bool) -> Result<String> {
        ident::escape(name, self.identifier_quote(), enclose)
    }

    /// Renders the positional placeholder for the 1-based `index`.
    fn placeholder(&self, _index: usize) -> String {
        String::from("?")
    }

    /// URL scheme understood by the driver.
    fn url_scheme(&self) -> &'static str;

    /// Default TCP port, `None` for file-based engines.
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Returns whether the engine has a `NOW()` function.
    fn supports_now(&self) -> bool {
        true
    }

    /// Returns whether `REPLACE INTO` is available.
    fn supports_replace(&self) -> bool {
        true
    }

    /// Statements that empty `table` and reset its auto-increment counter.
    fn truncate(&self, table: &str) -> Result<Vec<String>> {
        Ok(vec![format!("TRUNCATE {}", self.escape(table, true)?)])
    }

    /// Name of the table tracking auto-increment counters, if the engine
    /// keeps one that `truncate` touches.
    fn sequence_table(&self) -> Option<&'static str> {
        None
    }

    /// Body appended to `INSERT INTO <table>` when no column is set.
    fn insert_defaults(&self) -> &'static str {
        " DEFAULT VALUES"
    }

    /// Query returning one row with a `found` count for `:table`.
    fn table_exists_sql(&self) -> &'static str;

    /// Query returning `name`, `type`, `not_null`, `default_value` and
    /// `primary_key` per column of `:table`, in declaration order.
    fn columns_sql(&self) -> &'static str;

    /// Query returning the next auto-increment value of `:table` as
    /// `next_id`, when the engine exposes one.
    fn auto_increment_sql(&self) -> Option<&'static str> {
        None
    }

    /// Query returning one row with a `found` count when `:table` declares
    /// an auto-increment counter, for engines whose counter only exists
    /// after the first insert.
    fn auto_increment_declared_sql(&self) -> Option<&'static str> {
        None
    }

    /// Escapes `text` as a string literal.
    fn quote_literal(&self, text: &str) -> String {
        format!("'{}'", text.replace('\'', "''"))
    }
}

/// The supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    /// MySQL and MariaDB.
    MySql,
    /// PostgreSQL.
    Postgres,
    /// SQLite 3.
    Sqlite,
}

impl DialectKind {
    /// Parses a driver name.
    pub fn parse(driver: &str) -> Result<Self> {
        match driver.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(SqlError::UnknownDialect(driver.to_string())),
        }
    }

    /// Returns the dialect implementation.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::MySql => &MySqlDialect,
            Self::Postgres => &PostgresDialect,
            Self::Sqlite => &SqliteDialect,
        }
    }

    /// Canonical driver name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl FromStr for DialectKind {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
