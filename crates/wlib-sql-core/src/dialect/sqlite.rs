//! SQLite dialect.

use super::{Dialect, DialectKind};
use crate::error::Result;

/// SQLite dialect.
///
/// SQLite has neither `NOW()` nor `TRUNCATE`; the first is substituted at
/// bind time and the second is emulated with two `DELETE` statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn url_scheme(&self) -> &'static str {
        "sqlite"
    }

    fn supports_now(&self) -> bool {
        false
    }

    fn truncate(&self, table: &str) -> Result<Vec<String>> {
        let quoted = self.escape(table, true)?;
        Ok(vec![
            format!("DELETE FROM {quoted}"),
            format!("DELETE FROM sqlite_sequence WHERE name = '{table}'"),
        ])
    }

    fn sequence_table(&self) -> Option<&'static str> {
        Some("sqlite_sequence")
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT COUNT(*) AS found FROM sqlite_master WHERE type = 'table' AND name = :table"
    }

    fn columns_sql(&self) -> &'static str {
        "SELECT name, type, \"notnull\" AS not_null, dflt_value AS default_value, \
         pk AS primary_key FROM pragma_table_info(:table) ORDER BY cid"
    }

    fn auto_increment_sql(&self) -> Option<&'static str> {
        Some("SELECT seq + 1 AS next_id FROM sqlite_sequence WHERE name = :table")
    }

    fn auto_increment_declared_sql(&self) -> Option<&'static str> {
        Some(
            "SELECT COUNT(*) AS found FROM sqlite_master \
             WHERE type = 'table' AND name = :table AND sql LIKE '%AUTOINCREMENT%'",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_dialect() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.name(), "sqlite");
        assert_eq!(dialect.identifier_quote(), '"');
        assert_eq!(dialect.placeholder(2), "?");
        assert_eq!(dialect.default_port(), None);
        assert!(!dialect.supports_now());
        assert_eq!(dialect.sequence_table(), Some("sqlite_sequence"));
        assert!(dialect.auto_increment_declared_sql().is_some());
    }

    #[test]
    fn test_truncate_validates_table() {
        assert!(SqliteDialect::new().truncate("post'; --").is_err());
    }
}
