//! The query builder bound to a connection.
//!
//! A [`Query`] accumulates clauses through chained mutators, compiles them
//! for the connection's dialect, runs them and exposes the result rows.
//! One instance represents one logical statement and is not thread-safe.
//!
//! ```no_run
//! use wlib_db::{Db, DbConfig};
//!
//! # fn main() -> wlib_db::Result<()> {
//! let db = Db::new(DbConfig::sqlite("blog.db"))?;
//! let mut query = db.new_query();
//! query
//!     .select(["id", "title"])
//!     .from("post", None)?
//!     .where_clause("views > :min")
//!     .order_by(["id DESC"])
//!     .limit(10, 0)
//!     .set_parameter("min", 5, None);
//! query.run()?;
//! for row in query.fetch_all()? {
//!     println!("{:?}", row.get("title"));
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;

use serde::de::DeserializeOwned;
use wlib_sql_core::{
    compile, ident, Clauses, CompiledSql, FromClause, Join, JoinMode, Limit, ParamKey, ParamType,
    Params, QueryKind, SqlError, Value,
};

use crate::connection::{Db, Outcome};
use crate::error::{DbError, Result};
use crate::record::Record;

/// Whether the cached compilation matches the clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// The cached SQL is current.
    Ready,
    /// Clauses changed since the last compilation.
    Stale,
}

/// What [`Query::run`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executed {
    /// INSERT/REPLACE: the generated key, when the driver reports one.
    InsertId(Option<i64>),
    /// SELECT/RAW: rows are available through the fetch methods.
    Cursor,
    /// UPDATE/DELETE/TRUNCATE: rows affected, summed over all statements.
    Affected(u64),
}

#[derive(Debug, Default)]
struct Cursor {
    rows: VecDeque<Record>,
    affected: u64,
}

/// A statement under construction on a [`Db`].
#[derive(Debug)]
pub struct Query<'db> {
    db: &'db Db,
    clauses: Clauses,
    params: Params,
    state: QueryState,
    compiled: Option<CompiledSql>,
    cursor: Option<Cursor>,
}

impl<'db> Query<'db> {
    /// Creates an empty SELECT on `db`.
    #[must_use]
    pub fn new(db: &'db Db) -> Self {
        Self {
            db,
            clauses: Clauses::new(),
            params: Params::new(),
            state: QueryState::Stale,
            compiled: None,
            cursor: None,
        }
    }

    fn touch(&mut self) -> &mut Self {
        self.state = QueryState::Stale;
        self.compiled = None;
        self
    }

    fn target(&mut self, kind: QueryKind, table: &str) -> Result<&mut Self> {
        ident::check(table)?;
        self.clauses.kind = kind;
        self.clauses.target = Some(table.to_string());
        Ok(self.touch())
    }

    /// Sets the select list.
    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clauses.kind = QueryKind::Select;
        self.clauses.select = columns.into_iter().map(Into::into).collect();
        self.touch()
    }

    /// Sets the table to select from.
    pub fn from(&mut self, table: &str, alias: Option<&str>) -> Result<&mut Self> {
        ident::check(table)?;
        if let Some(alias) = alias {
            ident::check(alias)?;
        }
        self.clauses.kind = QueryKind::Select;
        self.clauses.from = Some(FromClause::table(table, alias));
        Ok(self.touch())
    }

    /// Selects from a compiled subquery, adopting its parameters.
    pub fn from_subquery(&mut self, subquery: &Query<'_>, alias: &str) -> Result<&mut Self> {
        ident::check(alias)?;
        let compiled = compile(&subquery.clauses, self.db.dialect())?;
        let sql = compiled
            .as_single()
            .ok_or(SqlError::Unsupported {
                dialect: self.db.dialect().name(),
                feature: "multi-statement subquery",
            })?
            .to_string();
        self.params.extend(&subquery.params);
        self.clauses.kind = QueryKind::Select;
        self.clauses.from = Some(FromClause::Subquery {
            sql,
            alias: alias.to_string(),
        });
        Ok(self.touch())
    }

    fn join(&mut self, mode: JoinMode, table: &str, condition: &str) -> &mut Self {
        self.clauses.joins.push(Join::new(mode, table, condition));
        self.touch()
    }

    /// Adds an `INNER JOIN`. The table may carry an alias (`user u`).
    pub fn inner_join(&mut self, table: &str, condition: &str) -> &mut Self {
        self.join(JoinMode::Inner, table, condition)
    }

    /// Adds a `LEFT JOIN`.
    pub fn left_join(&mut self, table: &str, condition: &str) -> &mut Self {
        self.join(JoinMode::Left, table, condition)
    }

    /// Adds a `RIGHT JOIN`.
    pub fn right_join(&mut self, table: &str, condition: &str) -> &mut Self {
        self.join(JoinMode::Right, table, condition)
    }

    /// Appends several joins.
    pub fn joins(&mut self, joins: impl IntoIterator<Item = Join>) -> &mut Self {
        self.clauses.joins.extend(joins);
        self.touch()
    }

    /// Sets the `WHERE` expression. An empty expression clears it.
    pub fn where_clause(&mut self, expr: impl Into<String>) -> &mut Self {
        self.clauses.where_clause = non_empty(expr.into());
        self.touch()
    }

    /// Sets the `GROUP BY` list.
    pub fn group_by<I, S>(&mut self, exprs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clauses.group_by = exprs.into_iter().map(Into::into).collect();
        self.touch()
    }

    /// Sets the `HAVING` expression. An empty expression clears it.
    pub fn having(&mut self, expr: impl Into<String>) -> &mut Self {
        self.clauses.having = non_empty(expr.into());
        self.touch()
    }

    /// Sets the `ORDER BY` list.
    pub fn order_by<I, S>(&mut self, exprs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clauses.order_by = exprs.into_iter().map(Into::into).collect();
        self.touch()
    }

    /// Limits the result to `count` rows after skipping `offset`.
    pub fn limit(&mut self, count: u64, offset: u64) -> &mut Self {
        self.clauses.limit = Some(Limit::Rows { count, offset });
        self.touch()
    }

    /// Sets a `LIMIT` expression verbatim, e.g. `:n OFFSET :skip`.
    pub fn limit_expr(&mut self, expr: impl Into<String>) -> &mut Self {
        self.clauses.limit = non_empty(expr.into()).map(Limit::Expr);
        self.touch()
    }

    /// Starts an INSERT into `table`.
    pub fn insert(&mut self, table: &str) -> Result<&mut Self> {
        self.target(QueryKind::Insert, table)
    }

    /// Starts a REPLACE into `table` (MySQL and SQLite).
    pub fn replace(&mut self, table: &str) -> Result<&mut Self> {
        self.target(QueryKind::Replace, table)
    }

    /// Starts an UPDATE of `table`.
    pub fn update(&mut self, table: &str) -> Result<&mut Self> {
        self.target(QueryKind::Update, table)
    }

    /// Starts a DELETE from `table`.
    pub fn delete(&mut self, table: &str) -> Result<&mut Self> {
        self.target(QueryKind::Delete, table)
    }

    /// Empties `table` and resets its auto-increment counter.
    pub fn truncate(&mut self, table: &str) -> Result<&mut Self> {
        self.target(QueryKind::Truncate, table)
    }

    /// Replaces the statement with caller-written SQL.
    pub fn raw(&mut self, sql: impl Into<String>) -> &mut Self {
        self.clauses.kind = QueryKind::Raw;
        self.clauses.raw = Some(sql.into());
        self.touch()
    }

    /// Assigns `value` to `column` for INSERT/REPLACE/UPDATE.
    ///
    /// - [`Value::Null`] removes the column from the statement. To store SQL
    ///   NULL pass the text `"NULL"` (or `Value::raw("NULL")`).
    /// - [`Value::Raw`] and placeholder text (`:name`, `?`) are emitted
    ///   verbatim; placeholders must be bound with [`Query::set_parameter`].
    /// - `NOW()` is emitted as a function call where the engine has one.
    /// - Anything else is bound as parameter `:column`.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.set_typed(column, value, None)
    }

    /// [`Query::set`] with a declared bind type.
    pub fn set_typed(
        &mut self,
        column: &str,
        value: impl Into<Value>,
        ty: Option<ParamType>,
    ) -> Result<&mut Self> {
        ident::check(column)?;
        let value = value.into();
        let fragment = match &value {
            Value::Null => {
                self.clauses.remove_value(column);
                return Ok(self.touch());
            }
            Value::Raw(sql) => sql.clone(),
            v if v.is_null_literal() || v.is_placeholder() => v.to_string(),
            v if v.is_now() && self.db.dialect().supports_now() => String::from("NOW()"),
            _ => {
                self.params.insert(column, value.clone(), ty);
                format!(":{column}")
            }
        };
        self.clauses.set_value(column, fragment);
        Ok(self.touch())
    }

    /// Calls [`Query::set`] for every pair.
    pub fn values<I, S, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
        V: Into<Value>,
    {
        for (column, value) in values {
            self.set(column.as_ref(), value)?;
        }
        Ok(self)
    }

    /// Binds `value` to the placeholder `key` (`"name"`, `":name"` or a
    /// 1-based position).
    pub fn set_parameter(
        &mut self,
        key: impl Into<ParamKey>,
        value: impl Into<Value>,
        ty: Option<ParamType>,
    ) -> &mut Self {
        self.params.insert(key, value, ty);
        self
    }

    /// Binds several untyped parameters.
    pub fn set_parameters<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ParamKey>,
        V: Into<Value>,
    {
        for (key, value) in params {
            self.params.insert(key, value, None);
        }
        self
    }

    /// Copies every entry of `params`.
    pub fn extend_parameters(&mut self, params: &Params) -> &mut Self {
        self.params.extend(params);
        self
    }

    /// The bound parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The clause tree.
    #[must_use]
    pub fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    /// Compilation state.
    #[must_use]
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Compiles the statement, reusing the cached SQL when nothing changed.
    pub fn get_sql(&mut self) -> Result<&CompiledSql> {
        if self.state == QueryState::Stale || self.compiled.is_none() {
            self.compiled = Some(compile(&self.clauses, self.db.dialect())?);
            self.state = QueryState::Ready;
        }
        self.compiled
            .as_ref()
            .ok_or(DbError::Sql(SqlError::IncompleteQuery("nothing compiled")))
    }

    /// Executes the statement, discarding the rows of a previous run.
    pub fn run(&mut self) -> Result<Executed> {
        self.cursor = None;
        let mut statements = self.get_sql()?.statements().to_vec();

        if self.clauses.kind == QueryKind::Truncate && statements.len() > 1 {
            if let Some(sequence) = self.db.dialect().sequence_table() {
                // no sequence table yet means no counter to reset
                if !self.db.is_table(sequence)? {
                    statements.truncate(1);
                }
            }
        }

        let outcomes = self.db.execute(&statements, &self.params)?;
        let mut cursor = Cursor::default();
        let mut insert_id = None;
        for outcome in outcomes {
            cursor.affected += outcome.affected();
            match outcome {
                Outcome::Rows(rows) => cursor.rows.extend(rows),
                Outcome::Done { last_insert_id, .. } => {
                    insert_id = last_insert_id.or(insert_id);
                }
            }
        }
        if self.clauses.kind == QueryKind::Select {
            // drivers may report the previous write's change count for reads
            cursor.affected = cursor.rows.len() as u64;
        }
        let affected = cursor.affected;
        self.cursor = Some(cursor);

        Ok(match self.clauses.kind {
            QueryKind::Insert | QueryKind::Replace => {
                if insert_id.is_none() && affected > 0 {
                    insert_id = self.db.last_insert_id()?;
                }
                Executed::InsertId(insert_id)
            }
            QueryKind::Select | QueryKind::Raw => Executed::Cursor,
            QueryKind::Update | QueryKind::Delete | QueryKind::Truncate => {
                Executed::Affected(affected)
            }
        })
    }

    fn cursor(&mut self) -> Result<&mut Cursor> {
        self.cursor.as_mut().ok_or(DbError::NotExecuted)
    }

    /// The next row, `None` when exhausted.
    pub fn fetch(&mut self) -> Result<Option<Record>> {
        Ok(self.cursor()?.rows.pop_front())
    }

    /// All remaining rows.
    pub fn fetch_all(&mut self) -> Result<Vec<Record>> {
        Ok(self.cursor()?.rows.drain(..).collect())
    }

    /// Column `index` of the next row.
    pub fn fetch_column(&mut self, index: usize) -> Result<Option<Value>> {
        Ok(self
            .fetch()?
            .and_then(|row| row.into_values().into_iter().nth(index)))
    }

    /// The next row deserialized into `T`.
    pub fn fetch_as<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        self.fetch()?
            .map(|row| row.deserialize_into())
            .transpose()
    }

    /// All remaining rows deserialized into `T`.
    pub fn fetch_all_as<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        self.fetch_all()?
            .iter()
            .map(Record::deserialize_into)
            .collect()
    }

    /// Rows affected by the last run.
    pub fn get_affected_rows(&mut self) -> Result<u64> {
        Ok(self.cursor()?.affected)
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
