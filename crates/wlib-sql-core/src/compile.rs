//! Clause tree compilation.

use core::fmt;

use crate::clause::{Clauses, FromClause, Limit, QueryKind};
use crate::dialect::Dialect;
use crate::error::{Result, SqlError};

/// Compiled SQL: one statement, or a batch run in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledSql {
    /// A single statement.
    Single(String),
    /// Several statements, e.g. the SQLite TRUNCATE emulation.
    Batch(Vec<String>),
}

impl CompiledSql {
    /// Returns the statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[String] {
        match self {
            Self::Single(sql) => core::slice::from_ref(sql),
            Self::Batch(list) => list,
        }
    }

    /// Returns the statement when there is exactly one.
    #[must_use]
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(sql) => Some(sql),
            Self::Batch(list) if list.len() == 1 => list.first().map(String::as_str),
            Self::Batch(_) => None,
        }
    }
}

impl fmt::Display for CompiledSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.statements().join(";\n"))
    }
}

/// Compiles a clause tree for `dialect`.
pub fn compile(clauses: &Clauses, dialect: &dyn Dialect) -> Result<CompiledSql> {
    match clauses.kind {
        QueryKind::Select => compile_select(clauses, dialect).map(CompiledSql::Single),
        QueryKind::Insert => compile_insert(clauses, dialect, "INSERT").map(CompiledSql::Single),
        QueryKind::Replace => {
            if !dialect.supports_replace() {
                return Err(SqlError::Unsupported {
                    dialect: dialect.name(),
                    feature: "REPLACE INTO",
                });
            }
            compile_insert(clauses, dialect, "REPLACE").map(CompiledSql::Single)
        }
        QueryKind::Update => compile_update(clauses, dialect).map(CompiledSql::Single),
        QueryKind::Delete => {
            let table = target(clauses, dialect, "DELETE requires a table")?;
            let mut sql = format!("DELETE FROM {table}");
            push_where(&mut sql, clauses);
            Ok(CompiledSql::Single(sql))
        }
        QueryKind::Truncate => {
            let table = clauses
                .target
                .as_deref()
                .ok_or(SqlError::IncompleteQuery("TRUNCATE requires a table"))?;
            let mut statements = dialect.truncate(table)?;
            if statements.len() == 1 {
                Ok(CompiledSql::Single(statements.remove(0)))
            } else {
                Ok(CompiledSql::Batch(statements))
            }
        }
        QueryKind::Raw => clauses
            .raw
            .clone()
            .map(CompiledSql::Single)
            .ok_or(SqlError::IncompleteQuery("raw statement has no body")),
    }
}

fn target(clauses: &Clauses, dialect: &dyn Dialect, missing: &'static str) -> Result<String> {
    let table = clauses
        .target
        .as_deref()
        .ok_or(SqlError::IncompleteQuery(missing))?;
    dialect.escape(table, true)
}

fn push_where(sql: &mut String, clauses: &Clauses) {
    if let Some(expr) = &clauses.where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(expr);
    }
}

fn compile_select(clauses: &Clauses, dialect: &dyn Dialect) -> Result<String> {
    let mut sql = String::from("SELECT ");
    if clauses.select.is_empty() {
        sql.push('*');
    } else {
        sql.push_str(&clauses.select.join(", "));
    }

    match &clauses.from {
        Some(FromClause::Table { name, alias }) => {
            sql.push_str(" FROM ");
            sql.push_str(&dialect.escape(name, true)?);
            if let Some(alias) = alias {
                sql.push_str(" AS ");
                sql.push_str(&dialect.escape(alias, false)?);
            }
        }
        Some(FromClause::Subquery { sql: inner, alias }) => {
            sql.push_str(&format!(" FROM ({inner}) AS {}", dialect.escape(alias, false)?));
        }
        None => {}
    }

    for join in &clauses.joins {
        sql.push_str(&format!(
            " {} {} ON {}",
            join.mode.as_sql(),
            join.table,
            join.condition
        ));
    }

    push_where(&mut sql, clauses);

    if !clauses.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&clauses.group_by.join(", "));
    }

    if let Some(expr) = &clauses.having {
        sql.push_str(" HAVING ");
        sql.push_str(expr);
    }

    if !clauses.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&clauses.order_by.join(", "));
    }

    match &clauses.limit {
        Some(Limit::Rows { count, offset }) => {
            sql.push_str(&format!(" LIMIT {count}"));
            if *offset > 0 {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }
        Some(Limit::Expr(expr)) => {
            sql.push_str(" LIMIT ");
            sql.push_str(expr);
        }
        None => {}
    }

    Ok(sql)
}

fn compile_insert(clauses: &Clauses, dialect: &dyn Dialect, verb: &str) -> Result<String> {
    let table = target(clauses, dialect, "INSERT requires a table")?;
    if clauses.values.is_empty() {
        return Ok(format!("{verb} INTO {table}{}", dialect.insert_defaults()));
    }
    let mut columns = Vec::with_capacity(clauses.values.len());
    let mut fragments = Vec::with_capacity(clauses.values.len());
    for (column, fragment) in &clauses.values {
        columns.push(dialect.escape(column, true)?);
        fragments.push(fragment.as_str());
    }
    Ok(format!(
        "{verb} INTO {table}({}) VALUES ({})",
        columns.join(", "),
        fragments.join(", ")
    ))
}

fn compile_update(clauses: &Clauses, dialect: &dyn Dialect) -> Result<String> {
    let table = target(clauses, dialect, "UPDATE requires a table")?;
    if clauses.values.is_empty() {
        return Err(SqlError::IncompleteQuery("UPDATE has no assignments"));
    }
    let assignments = clauses
        .values
        .iter()
        .map(|(column, fragment)| Ok(format!("{} = {fragment}", dialect.escape(column, true)?)))
        .collect::<Result<Vec<_>>>()?;
    let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
    push_where(&mut sql, clauses);
    Ok(sql)
}
