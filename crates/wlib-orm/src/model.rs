//! Table metadata and override points.

use wlib_db::{Db, Fields};
use wlib_sql_core::ident;

use crate::error::{OrmError, Result};
use crate::filters::FilterRegistry;

/// Per-table constants.
///
/// Usually derived:
///
/// ```ignore
/// use wlib_orm::{Model, Table};
///
/// #[derive(Table)]
/// #[table(name = "post", deleted_at = "deleted_at")]
/// struct Post;
///
/// impl Model for Post {}
/// ```
pub trait TableMeta {
    /// SQL table name.
    const NAME: &'static str;
    /// Primary-key column.
    const PRIMARY_KEY: &'static str = "id";
    /// Column set to `NOW()` on insert when not supplied.
    const CREATED_AT: Option<&'static str> = None;
    /// Column set to `NOW()` on insert and update when not supplied.
    const UPDATED_AT: Option<&'static str> = None;
    /// Column that enables soft delete.
    const DELETED_AT: Option<&'static str> = None;
}

/// What a [`Model::filter_fields`] override can use.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// The table's connection, e.g. for enum lookups.
    pub db: &'a Db,
    /// The table's filter templates.
    pub filters: &'a FilterRegistry,
}

/// Business rules of one table.
///
/// Every method has a permissive default, so `impl Model for Post {}` is a
/// complete implementation.
pub trait Model: TableMeta {
    /// Validates and sanitizes submitted fields before a write.
    ///
    /// `id` is 0 for inserts. Columns missing from the returned map are not
    /// written. Return [`OrmError::Validation`] to reject the write.
    fn filter_fields(&self, _ctx: &FilterContext<'_>, fields: Fields, _id: i64) -> Result<Fields> {
        Ok(fields)
    }

    /// Whether row `id` may be deleted.
    fn is_deletable(&self, _db: &Db, _id: i64) -> Result<bool> {
        Ok(true)
    }

    /// Whether row `id` may be restored.
    fn is_restorable(&self, _db: &Db, _id: i64) -> Result<bool> {
        Ok(true)
    }
}

/// Checks every configured name of `M`.
pub(crate) fn check_meta<M: TableMeta>() -> Result<()> {
    let names = [
        ("table name", Some(M::NAME)),
        ("primary key", Some(M::PRIMARY_KEY)),
        ("created_at column", M::CREATED_AT),
        ("updated_at column", M::UPDATED_AT),
        ("deleted_at column", M::DELETED_AT),
    ];
    for (what, name) in names {
        if let Some(name) = name {
            ident::check(name).map_err(|_| {
                OrmError::InvalidConfiguration(format!("invalid {what} {name:?} for {}", M::NAME))
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Post;

    impl TableMeta for Post {
        const NAME: &'static str = "post";
        const DELETED_AT: Option<&'static str> = Some("deleted_at");
    }

    struct Unnamed;

    impl TableMeta for Unnamed {
        const NAME: &'static str = "";
    }

    struct BadColumn;

    impl TableMeta for BadColumn {
        const NAME: &'static str = "post";
        const UPDATED_AT: Option<&'static str> = Some("updated at");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Post::PRIMARY_KEY, "id");
        assert_eq!(Post::CREATED_AT, None);
        assert!(check_meta::<Post>().is_ok());
    }

    #[test]
    fn test_invalid_meta() {
        assert!(matches!(
            check_meta::<Unnamed>(),
            Err(OrmError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            check_meta::<BadColumn>(),
            Err(OrmError::InvalidConfiguration(_))
        ));
    }
}
