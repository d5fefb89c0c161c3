//! MySQL dialect.

use super::{Dialect, DialectKind};

/// MySQL (and MariaDB) dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn url_scheme(&self) -> &'static str {
        "mysql"
    }

    fn default_port(&self) -> Option<u16> {
        Some(3306)
    }

    fn insert_defaults(&self) -> &'static str {
        " () VALUES ()"
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT COUNT(*) AS found FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_name = :table"
    }

    fn columns_sql(&self) -> &'static str {
        // column_type keeps the enum member list, data_type does not
        "SELECT CAST(column_name AS CHAR) AS name, \
         CAST(column_type AS CHAR) AS type, \
         CASE WHEN is_nullable = 'NO' THEN 1 ELSE 0 END AS not_null, \
         CAST(column_default AS CHAR) AS default_value, \
         CASE WHEN column_key = 'PRI' THEN 1 ELSE 0 END AS primary_key \
         FROM information_schema.columns \
         WHERE table_schema = DATABASE() AND table_name = :table \
         ORDER BY ordinal_position"
    }

    fn auto_increment_sql(&self) -> Option<&'static str> {
        Some(
            "SELECT CAST(auto_increment AS SIGNED) AS next_id FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = :table",
        )
    }

    fn quote_literal(&self, text: &str) -> String {
        format!("'{}'", text.replace('\\', "\\\\").replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_dialect() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.name(), "mysql");
        assert_eq!(dialect.identifier_quote(), '`');
        assert_eq!(dialect.placeholder(3), "?");
        assert_eq!(dialect.default_port(), Some(3306));
        assert!(dialect.supports_replace());
        assert!(dialect.sequence_table().is_none());
    }

    #[test]
    fn test_quote_literal_escapes_backslashes() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.quote_literal(r"it's a \ test"), r"'it''s a \\ test'");
    }
}
