//! CRUD over one table.
//!
//! [`Table`] wraps a [`Db`] and a [`Model`]. Writes run the model's
//! `filter_fields` first, fill the configured timestamp columns with
//! `NOW()` and fire `db.<table>.<action>.<before|after>` hooks; listeners
//! may rewrite the id and fields of a `before` event.
//!
//! Negative outcomes stay distinct: rejected input is an `Err`, a
//! business-rule no-op is `Ok(None)`/`Ok(false)`, and driver failures such
//! as constraint violations propagate as [`OrmError::Db`].

use std::rc::Rc;

use tracing::debug;
use wlib_db::{event_name, Db, DbError, Executed, Fields, HookContext, Phase, Query, Record};
use wlib_sql_core::{Join, Limit, ParamType, Params, Value};

use crate::error::{OrmError, Result};
use crate::filters::FilterRegistry;
use crate::model::{check_meta, FilterContext, Model};

const ID_PARAM: &str = "__id";

/// Joins, grouping and `HAVING` of a find or count.
#[derive(Debug, Clone, Default)]
pub struct Extra {
    /// Joined tables.
    pub joins: Vec<Join>,
    /// `GROUP BY` list.
    pub group_by: Vec<String>,
    /// `HAVING` expression.
    pub having: Option<String>,
}

/// Clauses of [`Table::find_rows`], [`Table::count`] and
/// [`Table::get_selectable_array`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// `WHERE` expression.
    pub where_clause: Option<String>,
    /// Parameters of the expressions.
    pub params: Params,
    /// `ORDER BY` list.
    pub order_by: Vec<String>,
    /// Row limit.
    pub limit: Option<Limit>,
    /// Joins, grouping, `HAVING`.
    pub extra: Extra,
}

/// Options of [`Table::get_selectable_array`]. The order defaults to the
/// label column.
pub type SelectableOptions = FindOptions;

impl FindOptions {
    /// No clauses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `WHERE` expression.
    #[must_use]
    pub fn where_clause(mut self, expr: impl Into<String>) -> Self {
        self.where_clause = Some(expr.into());
        self
    }

    /// Binds a parameter of the expressions.
    #[must_use]
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name, value, None);
        self
    }

    /// Sets the `ORDER BY` list.
    #[must_use]
    pub fn order_by<I, S>(mut self, exprs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = exprs.into_iter().map(Into::into).collect();
        self
    }

    /// Limits to `count` rows after `offset`.
    #[must_use]
    pub fn limit(mut self, count: u64, offset: u64) -> Self {
        self.limit = Some(Limit::Rows { count, offset });
        self
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.extra.joins.push(join);
        self
    }

    /// Sets the `GROUP BY` list.
    #[must_use]
    pub fn group_by<I, S>(mut self, exprs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra.group_by = exprs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `HAVING` expression.
    #[must_use]
    pub fn having(mut self, expr: impl Into<String>) -> Self {
        self.extra.having = Some(expr.into());
        self
    }

    fn apply(&self, query: &mut Query<'_>, ordered: bool) {
        if let Some(expr) = &self.where_clause {
            query.where_clause(expr.as_str());
        }
        query
            .extend_parameters(&self.params)
            .joins(self.extra.joins.iter().cloned())
            .group_by(self.extra.group_by.iter().cloned());
        if let Some(expr) = &self.extra.having {
            query.having(expr.as_str());
        }
        if ordered {
            query.order_by(self.order_by.iter().cloned());
        }
        match &self.limit {
            Some(Limit::Rows { count, offset }) => {
                query.limit(*count, *offset);
            }
            Some(Limit::Expr(expr)) => {
                query.limit_expr(expr.as_str());
            }
            None => {}
        }
    }
}

/// Record access for the table described by `M`.
#[derive(Debug)]
pub struct Table<'db, M: Model> {
    db: &'db Db,
    model: M,
    filters: Rc<FilterRegistry>,
    fields: Fields,
}

impl<'db, M: Model> Table<'db, M> {
    /// Binds `model` to `db`, checking the table metadata.
    pub fn new(db: &'db Db, model: M) -> Result<Self> {
        check_meta::<M>()?;
        Ok(Self {
            db,
            model,
            filters: Rc::new(FilterRegistry::default()),
            fields: Fields::new(),
        })
    }

    /// Uses a shared filter registry instead of the built-in one.
    #[must_use]
    pub fn with_filters(mut self, filters: Rc<FilterRegistry>) -> Self {
        self.filters = filters;
        self
    }

    /// The connection.
    #[must_use]
    pub fn db(&self) -> &'db Db {
        self.db
    }

    /// The model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The filter templates.
    #[must_use]
    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    fn fire(&self, action: &str, phase: Phase, ctx: &mut HookContext) {
        self.db
            .hooks()
            .fire(&event_name(M::NAME, action, phase), ctx);
    }

    fn pk_condition(&self) -> Result<String> {
        Ok(format!(
            "{} = :{ID_PARAM}",
            self.db.dialect().escape(M::PRIMARY_KEY, true)?
        ))
    }

    fn by_id(&self, query: &mut Query<'_>, id: i64) -> Result<()> {
        query
            .where_clause(self.pk_condition()?)
            .set_parameter(ID_PARAM, id, Some(ParamType::Int));
        Ok(())
    }

    /// A SELECT over this table.
    pub fn select(&self) -> Result<Query<'db>> {
        let mut query = self.db.new_query();
        query.from(M::NAME, None)?;
        Ok(query)
    }

    /// A record holding every column's default value.
    pub fn create(&self) -> Result<Option<Record>> {
        Ok(self.db.create_empty_row(M::NAME)?)
    }

    /// Runs the model's filters over `fields`.
    ///
    /// The result, or the submitted fields when validation fails, is kept
    /// for [`Table::get_fields`].
    pub fn filter_fields(&mut self, fields: Fields, id: i64) -> Result<Fields> {
        let mut ctx = HookContext::lifecycle(M::NAME, "filter", id, fields);
        self.fire("filter", Phase::Before, &mut ctx);
        let HookContext { id, fields, .. } = ctx;

        let filter_ctx = FilterContext {
            db: self.db,
            filters: &self.filters,
        };
        match self.model.filter_fields(&filter_ctx, fields.clone(), id) {
            Ok(filtered) => {
                let mut ctx = HookContext::lifecycle(M::NAME, "filter", id, filtered);
                self.fire("filter", Phase::After, &mut ctx);
                self.fields = ctx.fields.clone();
                Ok(ctx.fields)
            }
            Err(err) => {
                if let OrmError::Validation(errors) = &err {
                    debug!(table = M::NAME, id, errors = %errors, "Rejected fields");
                }
                self.fields = fields;
                Err(err)
            }
        }
    }

    /// The fields of the last write, after filtering.
    #[must_use]
    pub fn get_fields(&self) -> &Fields {
        &self.fields
    }

    /// Inserts a row, returning its id.
    ///
    /// `CREATED_AT` and `UPDATED_AT` default to `NOW()`. Without a driver
    /// generated key the id is the submitted primary key, if any.
    pub fn add(&mut self, fields: Fields) -> Result<Option<i64>> {
        let mut ctx = HookContext::lifecycle(M::NAME, "add", 0, fields);
        self.fire("add", Phase::Before, &mut ctx);

        let mut fields = self.filter_fields(ctx.fields, 0)?;
        for column in [M::CREATED_AT, M::UPDATED_AT].into_iter().flatten() {
            fields
                .entry(column.to_string())
                .or_insert_with(Value::now);
        }

        let mut query = self.db.new_query();
        query.insert(M::NAME)?.values(&fields)?;
        let id = match query.run()? {
            Executed::InsertId(id) => id,
            _ => None,
        }
        .or_else(|| fields.get(M::PRIMARY_KEY).and_then(Value::as_i64));
        debug!(table = M::NAME, id = ?id, "Added row");

        let mut ctx = HookContext::lifecycle(M::NAME, "add", id.unwrap_or(0), fields);
        ctx.affected = Some(u64::from(id.is_some()));
        self.fire("add", Phase::After, &mut ctx);
        Ok(id)
    }

    /// Updates row `id`, returning `Some(id)` when a row changed.
    ///
    /// `UPDATED_AT` defaults to `NOW()`. Nothing is executed when no
    /// column survives filtering.
    pub fn update(&mut self, id: i64, fields: Fields) -> Result<Option<i64>> {
        let mut ctx = HookContext::lifecycle(M::NAME, "update", id, fields);
        self.fire("update", Phase::Before, &mut ctx);
        let id = ctx.id;

        let mut fields = self.filter_fields(ctx.fields, id)?;
        if let Some(column) = M::UPDATED_AT {
            fields
                .entry(column.to_string())
                .or_insert_with(Value::now);
        }

        let mut query = self.db.new_query();
        query.update(M::NAME)?.values(&fields)?;
        if query.clauses().values.is_empty() {
            return Ok(None);
        }
        self.by_id(&mut query, id)?;
        let affected = match query.run()? {
            Executed::Affected(n) => n,
            _ => 0,
        };
        debug!(table = M::NAME, id, affected, "Updated row");

        let mut ctx = HookContext::lifecycle(M::NAME, "update", id, fields);
        ctx.affected = Some(affected);
        self.fire("update", Phase::After, &mut ctx);
        Ok((affected > 0).then_some(id))
    }

    /// [`Table::add`] when `id` is 0, [`Table::update`] otherwise.
    pub fn save(&mut self, fields: Fields, id: i64) -> Result<Option<i64>> {
        if id == 0 {
            self.add(fields)
        } else {
            self.update(id, fields)
        }
    }

    /// Deletes row `id`, returning whether a row was affected.
    ///
    /// With a `DELETED_AT` column and `hard == false` the row is kept and
    /// the column set to `NOW()`.
    pub fn delete(&mut self, id: i64, hard: bool) -> Result<bool> {
        if !self.model.is_deletable(self.db, id)? {
            return Ok(false);
        }
        let mut ctx = HookContext::lifecycle(M::NAME, "delete", id, Fields::new());
        self.fire("delete", Phase::Before, &mut ctx);
        let id = ctx.id;

        let mut query = self.db.new_query();
        match M::DELETED_AT {
            Some(column) if !hard => {
                query.update(M::NAME)?.set(column, Value::now())?;
            }
            _ => {
                query.delete(M::NAME)?;
            }
        }
        self.by_id(&mut query, id)?;
        let affected = match query.run()? {
            Executed::Affected(n) => n,
            _ => 0,
        };
        debug!(table = M::NAME, id, hard, affected, "Deleted row");

        ctx.affected = Some(affected);
        self.fire("delete", Phase::After, &mut ctx);
        Ok(affected > 0)
    }

    /// Clears the `DELETED_AT` column of row `id`.
    ///
    /// `false` when the table has no such column or the model refuses.
    pub fn restore(&mut self, id: i64) -> Result<bool> {
        let Some(column) = M::DELETED_AT else {
            return Ok(false);
        };
        if !self.model.is_restorable(self.db, id)? {
            return Ok(false);
        }
        let mut ctx = HookContext::lifecycle(M::NAME, "restore", id, Fields::new());
        self.fire("restore", Phase::Before, &mut ctx);
        let id = ctx.id;

        let mut query = self.db.new_query();
        query.update(M::NAME)?.set(column, "NULL")?;
        self.by_id(&mut query, id)?;
        let affected = match query.run()? {
            Executed::Affected(n) => n,
            _ => 0,
        };
        debug!(table = M::NAME, id, affected, "Restored row");

        ctx.affected = Some(affected);
        self.fire("restore", Phase::After, &mut ctx);
        Ok(affected > 0)
    }

    /// The next auto-increment value.
    pub fn get_auto_increment(&self) -> Result<Option<i64>> {
        Ok(self.db.get_auto_increment(M::NAME)?)
    }

    /// Column `column` of row `id`.
    pub fn find_val(&self, column: &str, id: i64) -> Result<Option<Value>> {
        let mut query = self.select()?;
        query
            .select([self.db.dialect().escape(column, true)?])
            .limit(1, 0);
        self.by_id(&mut query, id)?;
        query.run()?;
        Ok(query.fetch_column(0)?)
    }

    fn match_condition(
        &self,
        names: &[&str],
        values: &[Value],
        params: &mut Params,
    ) -> Result<String> {
        if names.is_empty() || names.len() != values.len() {
            return Err(DbError::ShapeMismatch {
                names: names.len(),
                values: values.len(),
            }
            .into());
        }
        let dialect = self.db.dialect();
        let mut parts = Vec::with_capacity(names.len());
        for (i, (name, value)) in names.iter().zip(values).enumerate() {
            let column = dialect.escape(name, true)?;
            if value.is_null() {
                parts.push(format!("{column} IS NULL"));
            } else {
                let key = format!("__w{i}");
                parts.push(format!("{column} = :{key}"));
                params.insert(key, value.clone(), None);
            }
        }
        Ok(parts.join(" AND "))
    }

    /// Id of the first row whose `names` columns equal `values`, 0 when
    /// none does.
    pub fn find_id(&self, names: &[&str], values: &[Value]) -> Result<i64> {
        let mut params = Params::new();
        let condition = self.match_condition(names, values, &mut params)?;
        let pk = self.db.dialect().escape(M::PRIMARY_KEY, true)?;
        let mut query = self.select()?;
        query
            .select([pk.as_str()])
            .where_clause(condition)
            .order_by([pk.as_str()])
            .limit(1, 0)
            .extend_parameters(&params);
        query.run()?;
        Ok(query
            .fetch_column(0)?
            .and_then(|value| value.as_i64())
            .unwrap_or(0))
    }

    /// Row `id`, restricted to `columns` (`*` when empty).
    pub fn find_row(&self, columns: &[&str], id: i64) -> Result<Option<Record>> {
        let mut query = self.select()?;
        query.select(columns.iter().copied()).limit(1, 0);
        self.by_id(&mut query, id)?;
        query.run()?;
        Ok(query.fetch()?)
    }

    /// [`Table::find_row`] as a column map.
    pub fn find_assoc(&self, columns: &[&str], id: i64) -> Result<Option<Fields>> {
        Ok(self.find_row(columns, id)?.map(Record::into_map))
    }

    /// Rows matching `options`, restricted to `columns` (`*` when empty).
    pub fn find_rows(&self, columns: &[&str], options: &FindOptions) -> Result<Vec<Record>> {
        let mut query = self.select()?;
        query.select(columns.iter().copied());
        options.apply(&mut query, true);
        query.run()?;
        Ok(query.fetch_all()?)
    }

    /// [`Table::find_rows`] as column maps.
    pub fn find_assocs(&self, columns: &[&str], options: &FindOptions) -> Result<Vec<Fields>> {
        Ok(self
            .find_rows(columns, options)?
            .into_iter()
            .map(Record::into_map)
            .collect())
    }

    /// Whether a row other than `except_id` has `names` equal to `values`.
    ///
    /// Pass one name and value for a single-column check. An `except_id`
    /// of 0 excludes nothing.
    pub fn exists(&self, names: &[&str], values: &[Value], except_id: i64) -> Result<bool> {
        let mut params = Params::new();
        let mut condition = self.match_condition(names, values, &mut params)?;
        if except_id != 0 {
            condition = format!(
                "{condition} AND {} <> :{ID_PARAM}",
                self.db.dialect().escape(M::PRIMARY_KEY, true)?
            );
            params.insert(ID_PARAM, except_id, Some(ParamType::Int));
        }
        let mut query = self.select()?;
        query
            .select(["1"])
            .where_clause(condition)
            .limit(1, 0)
            .extend_parameters(&params);
        query.run()?;
        Ok(query.fetch()?.is_some())
    }

    /// Number of rows matching `options`.
    ///
    /// With a limit or grouping the rows are counted through a subquery.
    pub fn count(&self, options: &FindOptions) -> Result<i64> {
        let mut query = if options.limit.is_some() || !options.extra.group_by.is_empty() {
            let mut inner = self.select()?;
            inner.select(["1"]);
            options.apply(&mut inner, true);
            let mut outer = self.db.new_query();
            outer.select(["COUNT(*)"]).from_subquery(&inner, "counted")?;
            outer
        } else {
            let mut query = self.select()?;
            query.select(["COUNT(*)"]);
            options.apply(&mut query, false);
            query
        };
        query.run()?;
        Ok(query
            .fetch_column(0)?
            .and_then(|value| value.as_i64())
            .unwrap_or(0))
    }

    /// `(id, label)` pairs for option lists, ordered by `label` unless
    /// `options` says otherwise.
    pub fn get_selectable_array(
        &self,
        label: &str,
        options: &SelectableOptions,
    ) -> Result<Vec<(i64, String)>> {
        let dialect = self.db.dialect();
        let label = dialect.escape(label, true)?;
        let mut query = self.select()?;
        query.select([dialect.escape(M::PRIMARY_KEY, true)?, label.clone()]);
        options.apply(&mut query, true);
        if options.order_by.is_empty() {
            query.order_by([label]);
        }
        query.run()?;
        Ok(query
            .fetch_all()?
            .into_iter()
            .filter_map(|row| {
                let id = row.get_index(0).and_then(Value::as_i64)?;
                let label = row.get_index(1).map(Value::to_string).unwrap_or_default();
                Some((id, label))
            })
            .collect())
    }
}
