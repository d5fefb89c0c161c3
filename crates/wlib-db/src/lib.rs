//! # wlib-db
//!
//! A blocking connection and query builder over MySQL, PostgreSQL and
//! SQLite.
//!
//! This crate provides:
//! - [`Db`], a lazily-opened connection with schema introspection, a query
//!   counter and an optional in-memory query log
//! - [`Query`], a chainable builder for SELECT, INSERT, REPLACE, UPDATE,
//!   DELETE, TRUNCATE and raw statements
//! - [`Hooks`], named extension points around every execution
//! - [`Record`], a fetched row with name and index access
//!
//! SQL generation itself lives in `wlib-sql-core`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wlib_db::{Db, DbConfig, Executed};
//!
//! # fn main() -> wlib_db::Result<()> {
//! let db = Db::new(DbConfig::sqlite_memory())?;
//! db.exec("CREATE TABLE post (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT)")?;
//!
//! let mut insert = db.new_query();
//! insert.insert("post")?.set("title", "First post")?;
//! assert_eq!(insert.run()?, Executed::InsertId(Some(1)));
//!
//! let mut select = db.new_query();
//! select.select(["title"]).from("post", None)?;
//! select.run()?;
//! let title = select.fetch_column(0)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
mod driver;
mod error;
pub mod hooks;
pub mod query;
pub mod record;
pub mod schema;

pub use config::{Attributes, ColumnCase, ConnectOptions, DbConfig, NullHandling};
pub use connection::{Db, Outcome, QueryLogEntry};
pub use error::{DbError, Result};
pub use hooks::{event_name, HookContext, Hooks, Phase, EXECUTE_AFTER, EXECUTE_BEFORE};
pub use query::{Executed, Query, QueryState};
pub use record::{value_to_json, Fields, Record};
pub use schema::{parse_enum_values, ColumnInfo};

pub use wlib_sql_core::{ParamKey, ParamType, Params, SqlError, Value};
