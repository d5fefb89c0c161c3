//! PostgreSQL dialect.

use super::{Dialect, DialectKind};

/// PostgreSQL dialect.
///
/// Identifiers are double-quoted and placeholders are `$1`, `$2`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn url_scheme(&self) -> &'static str {
        "postgres"
    }

    fn default_port(&self) -> Option<u16> {
        Some(5432)
    }

    fn supports_replace(&self) -> bool {
        false
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT COUNT(*) AS found FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name::text = :table"
    }

    fn columns_sql(&self) -> &'static str {
        "SELECT c.column_name::text AS name, \
         c.data_type::text AS type, \
         CASE WHEN c.is_nullable = 'NO' THEN 1 ELSE 0 END AS not_null, \
         c.column_default::text AS default_value, \
         CASE WHEN EXISTS (\
         SELECT 1 FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage k \
         ON k.constraint_name = tc.constraint_name AND k.table_schema = tc.table_schema \
         WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = c.table_schema \
         AND tc.table_name = c.table_name AND k.column_name = c.column_name\
         ) THEN 1 ELSE 0 END AS primary_key \
         FROM information_schema.columns c \
         WHERE c.table_schema = current_schema() AND c.table_name::text = :table \
         ORDER BY c.ordinal_position"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_dialect() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.name(), "postgres");
        assert_eq!(dialect.identifier_quote(), '"');
        assert_eq!(dialect.placeholder(1), "$1");
        assert_eq!(dialect.placeholder(12), "$12");
        assert_eq!(dialect.default_port(), Some(5432));
        assert_eq!(dialect.insert_defaults(), " DEFAULT VALUES");
    }
}
