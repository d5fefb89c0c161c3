//! # wlib-orm
//!
//! Record access over one table at a time, built on `wlib-db`.
//!
//! - [`TableMeta`]: table name, primary key and timestamp columns, usually
//!   derived with `#[derive(Table)]`
//! - [`Model`]: override points for field validation and delete/restore
//!   permission
//! - [`Table`]: create, add, update, save, soft and hard delete, restore,
//!   and the `find_*`/`exists`/`count` lookups
//! - [`FilterRegistry`]: named validation filter templates
//!
//! ## Example
//!
//! ```ignore
//! use wlib_db::{Db, DbConfig, Fields, Value};
//! use wlib_orm::{Model, Table};
//!
//! #[derive(Table)]
//! #[table(
//!     name = "post",
//!     created_at = "created_at",
//!     updated_at = "updated_at",
//!     deleted_at = "deleted_at"
//! )]
//! struct Post;
//!
//! impl Model for Post {}
//!
//! let db = Db::new(DbConfig::sqlite("blog.db"))?;
//! let mut posts = Table::new(&db, Post)?;
//! let mut fields = Fields::new();
//! fields.insert("title".into(), Value::text("First post"));
//! let id = posts.add(fields)?;
//! posts.delete(id.unwrap_or(0), false)?;
//! ```

mod error;
pub mod filters;
pub mod model;
pub mod table;

pub use error::{OrmError, Result, ValidationErrors};
pub use filters::{EnumSource, Filter, FilterArgs, FilterOutcome, FilterRegistry, Template};
pub use model::{FilterContext, Model, TableMeta};
pub use table::{Extra, FindOptions, SelectableOptions, Table};

pub use wlib_derive::Table;
