//! # wlib-sql-core
//!
//! Portable SQL generation for MySQL, PostgreSQL and SQLite.
//!
//! This crate provides:
//! - Identifier validation and dialect-aware quoting
//! - A [`Dialect`] trait with one implementation per supported engine
//! - A clause tree ([`Clauses`]) and a compiler turning it into SQL text
//! - Tagged values and parameter sets with explicit bind types
//! - Placeholder expansion from `:name` / `?` to the driver's positional form
//!
//! Nothing in this crate performs I/O. Execution lives in `wlib-db`.
//!
//! ## Example
//!
//! ```rust
//! use wlib_sql_core::{compile, Clauses, DialectKind, FromClause, QueryKind};
//!
//! let mut clauses = Clauses::new();
//! clauses.kind = QueryKind::Select;
//! clauses.select = vec!["id".into(), "title".into()];
//! clauses.from = Some(FromClause::table("post", None));
//! clauses.where_clause = Some("id = :id".into());
//!
//! let sql = compile(&clauses, DialectKind::MySql.dialect()).unwrap();
//! assert_eq!(sql.to_string(), "SELECT id, title FROM `post` WHERE id = :id");
//! ```

pub mod bind;
pub mod clause;
pub mod compile;
pub mod dialect;
mod error;
pub mod ident;
pub mod value;

pub use bind::{expand, Bound};
pub use clause::{Clauses, FromClause, Join, JoinMode, Limit, QueryKind};
pub use compile::{compile, CompiledSql};
pub use dialect::{
    Dialect, DialectKind, MySqlDialect, PostgresDialect, SqliteDialect, TIMESTAMP_FORMAT,
};
pub use error::{Result, SqlError};
pub use value::{Param, ParamKey, ParamType, Params, Value};
