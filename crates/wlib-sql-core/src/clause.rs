//! The clause tree of a query under construction.
//!
//! Slots are filled in any order; [`crate::compile`] emits them in the fixed
//! order of the active [`QueryKind`].

/// The statement kind that decides how the clause tree compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryKind {
    /// `SELECT ...`.
    #[default]
    Select,
    /// `INSERT INTO ...`.
    Insert,
    /// `REPLACE INTO ...`.
    Replace,
    /// `UPDATE ... SET ...`.
    Update,
    /// `DELETE FROM ...`.
    Delete,
    /// `TRUNCATE ...`, emulated on SQLite.
    Truncate,
    /// Caller-supplied SQL.
    Raw,
}

impl QueryKind {
    /// Returns whether running this kind produces a cursor.
    #[must_use]
    pub const fn returns_rows(self) -> bool {
        matches!(self, Self::Select | Self::Raw)
    }
}

/// The `FROM` target of a SELECT.
#[derive(Debug, Clone, PartialEq)]
pub enum FromClause {
    /// A table with an optional alias.
    Table {
        /// Table name, quoted at compile time.
        name: String,
        /// Alias.
        alias: Option<String>,
    },
    /// A compiled subquery, which must be aliased.
    Subquery {
        /// Compiled SQL of the inner query.
        sql: String,
        /// Alias.
        alias: String,
    },
}

impl FromClause {
    /// Creates a table target.
    pub fn table(name: impl Into<String>, alias: Option<&str>) -> Self {
        Self::Table {
            name: name.into(),
            alias: alias.map(String::from),
        }
    }
}

/// Join mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// `INNER JOIN`.
    Inner,
    /// `LEFT JOIN`.
    Left,
    /// `RIGHT JOIN`.
    Right,
}

impl JoinMode {
    /// Returns the SQL keyword(s).
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

/// A join entry. The table is emitted verbatim so it may carry an alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join mode.
    pub mode: JoinMode,
    /// Joined table expression, e.g. `user u`.
    pub table: String,
    /// `ON` condition.
    pub condition: String,
}

impl Join {
    /// Creates a join entry.
    pub fn new(mode: JoinMode, table: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            mode,
            table: table.into(),
            condition: condition.into(),
        }
    }
}

/// The `LIMIT` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Limit {
    /// Row count with offset (0 means none).
    Rows {
        /// Maximum number of rows.
        count: u64,
        /// Rows to skip.
        offset: u64,
    },
    /// A caller-written expression such as `:limit`.
    Expr(String),
}

/// The clause slots of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clauses {
    /// Active statement kind.
    pub kind: QueryKind,
    /// Select list, `*` when empty.
    pub select: Vec<String>,
    /// `FROM` target.
    pub from: Option<FromClause>,
    /// Joins in declaration order.
    pub joins: Vec<Join>,
    /// `WHERE` expression.
    pub where_clause: Option<String>,
    /// `GROUP BY` expressions.
    pub group_by: Vec<String>,
    /// `HAVING` expression.
    pub having: Option<String>,
    /// `ORDER BY` expressions.
    pub order_by: Vec<String>,
    /// `LIMIT` clause.
    pub limit: Option<Limit>,
    /// Table targeted by INSERT/REPLACE/UPDATE/DELETE/TRUNCATE.
    pub target: Option<String>,
    /// Body of a raw statement.
    pub raw: Option<String>,
    /// Column to SQL fragment assignments, in first-set order.
    pub values: Vec<(String, String)>,
}

impl Clauses {
    /// Creates an empty SELECT clause tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `fragment` to `column`, replacing an earlier assignment in place.
    pub fn set_value(&mut self, column: &str, fragment: impl Into<String>) {
        let fragment = fragment.into();
        if let Some(slot) = self.values.iter_mut().find(|(c, _)| c == column) {
            slot.1 = fragment;
        } else {
            self.values.push((column.to_string(), fragment));
        }
    }

    /// Removes the assignment of `column`, if any.
    pub fn remove_value(&mut self, column: &str) {
        self.values.retain(|(c, _)| c != column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_value_replaces_in_place() {
        let mut clauses = Clauses::new();
        clauses.set_value("a", ":a");
        clauses.set_value("b", ":b");
        clauses.set_value("a", "a + 1");
        assert_eq!(
            clauses.values,
            vec![("a".into(), "a + 1".into()), ("b".into(), ":b".into())]
        );
        clauses.remove_value("a");
        assert_eq!(clauses.values, vec![("b".into(), ":b".into())]);
    }

    #[test]
    fn test_kind_defaults_to_select() {
        assert_eq!(Clauses::new().kind, QueryKind::Select);
        assert!(QueryKind::Raw.returns_rows());
        assert!(!QueryKind::Truncate.returns_rows());
    }
}
