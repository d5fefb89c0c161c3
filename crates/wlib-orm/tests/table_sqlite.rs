//! Table operations against in-memory SQLite.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{fields, is_timestamp, memory_db};
use wlib_db::{DbError, Fields, Value};
use wlib_orm::{
    EnumSource, FilterArgs, FilterContext, FilterRegistry, FindOptions, Model, OrmError,
    SelectableOptions, Table, TableMeta,
};

#[derive(Debug, Table)]
#[table(
    name = "post",
    created_at = "created_at",
    updated_at = "updated_at",
    deleted_at = "deleted_at"
)]
struct Post;

impl Model for Post {}

#[derive(Debug, Table)]
#[table(name = "post")]
struct PlainPost;

impl Model for PlainPost {}

#[derive(Debug, Table)]
#[table(name = "post")]
struct CheckedPost;

impl Model for CheckedPost {
    fn filter_fields(
        &self,
        ctx: &FilterContext<'_>,
        fields: Fields,
        _id: i64,
    ) -> wlib_orm::Result<Fields> {
        let status = FilterArgs::new()
            .source(EnumSource::Delimited("draft|published".into()))
            .message("Unknown status");
        let rules = [
            ("title", ctx.filters.get_filter("string", FilterArgs::new())?),
            ("status", ctx.filters.get_filter("enum", status)?),
        ];
        Ok(FilterRegistry::filter_fields(&fields, &rules)?)
    }
}

#[derive(Debug, Table)]
#[table(name = "post", deleted_at = "deleted_at")]
struct LockedPost;

impl Model for LockedPost {
    fn is_deletable(&self, _db: &wlib_db::Db, id: i64) -> wlib_orm::Result<bool> {
        Ok(id != 1)
    }

    fn is_restorable(&self, _db: &wlib_db::Db, _id: i64) -> wlib_orm::Result<bool> {
        Ok(false)
    }
}

struct Misnamed;

impl TableMeta for Misnamed {
    const NAME: &'static str = "post table";
}

impl Model for Misnamed {}

fn title(title: &str) -> Fields {
    fields([("title", Value::text(title))])
}

#[test]
fn test_post_lifecycle() {
    let db = memory_db();
    let mut posts = Table::new(&db, Post).unwrap();

    let id = posts.add(title("First post")).unwrap();
    assert_eq!(id, Some(1));
    let row = posts.find_row(&[], 1).unwrap().unwrap();
    assert_eq!(row.get_i64("views"), Some(0));
    assert!(is_timestamp(row.get("created_at")));
    assert!(is_timestamp(row.get("updated_at")));
    assert_eq!(row.get("deleted_at"), Some(&Value::Null));

    db.exec("UPDATE post SET updated_at = '2000-01-01 00:00:00'")
        .unwrap();
    assert_eq!(
        posts.update(1, fields([("views", Value::Int(1))])).unwrap(),
        Some(1)
    );
    let row = posts.find_row(&["views", "updated_at"], 1).unwrap().unwrap();
    assert_eq!(row.get_i64("views"), Some(1));
    assert!(is_timestamp(row.get("updated_at")));
    assert_ne!(row.get_str("updated_at"), Some("2000-01-01 00:00:00"));

    assert!(posts.delete(1, false).unwrap());
    assert!(is_timestamp(posts.find_val("deleted_at", 1).unwrap().as_ref()));
    assert_eq!(posts.count(&FindOptions::new()).unwrap(), 1);
    assert_eq!(
        posts
            .count(&FindOptions::new().where_clause("deleted_at IS NULL"))
            .unwrap(),
        0
    );

    assert!(posts.restore(1).unwrap());
    assert_eq!(posts.find_val("deleted_at", 1).unwrap(), Some(Value::Null));

    assert!(posts.delete(1, true).unwrap());
    assert_eq!(posts.count(&FindOptions::new()).unwrap(), 0);
    assert!(!posts.delete(1, true).unwrap());
    assert_eq!(posts.find_row(&[], 1).unwrap(), None);
}

#[test]
fn test_add_returns_increasing_ids() {
    let db = memory_db();
    let mut posts = Table::new(&db, Post).unwrap();
    let first = posts.add(title("First post")).unwrap().unwrap();
    let second = posts.add(title("Second post")).unwrap().unwrap();
    assert_eq!(first, 1);
    assert!(second > first);

    // timestamp columns are declared DATETIME
    let rows = posts.find_rows(&[], &FindOptions::new()).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| is_timestamp(row.get("created_at"))));
}

#[test]
fn test_find_id() {
    let db = memory_db();
    let mut posts = Table::new(&db, Post).unwrap();
    posts.add(title("First post")).unwrap();
    posts.add(title("Second post")).unwrap();

    assert_eq!(posts.find_id(&["title"], &[Value::text("First post")]).unwrap(), 1);
    assert_eq!(posts.find_id(&["title"], &[Value::text("Second post")]).unwrap(), 2);
    assert_eq!(posts.find_id(&["title"], &[Value::text("Missing")]).unwrap(), 0);
    assert_eq!(
        posts
            .find_id(&["status", "views"], &[Value::text("draft"), Value::Int(0)])
            .unwrap(),
        1
    );
}

#[test]
fn test_exists() {
    let db = memory_db();
    let mut posts = Table::new(&db, Post).unwrap();
    posts.add(title("First post")).unwrap();

    let names = ["title", "status"];
    assert!(posts
        .exists(&names, &[Value::text("First post"), Value::text("draft")], 0)
        .unwrap());
    assert!(!posts
        .exists(&names, &[Value::text("First post"), Value::text("published")], 0)
        .unwrap());
    assert!(!posts
        .exists(&["title"], &[Value::text("First post")], 1)
        .unwrap());
    assert!(posts.exists(&["deleted_at"], &[Value::Null], 0).unwrap());

    assert!(matches!(
        posts.exists(&names, &[Value::text("First post")], 0),
        Err(OrmError::Db(DbError::ShapeMismatch {
            names: 2,
            values: 1
        }))
    ));
    assert!(matches!(
        posts.find_id(&["title"], &[]),
        Err(OrmError::Db(DbError::ShapeMismatch { .. }))
    ));
}

#[test]
fn test_update_without_effect() {
    let db = memory_db();
    let mut posts = Table::new(&db, PlainPost).unwrap();
    assert_eq!(posts.add(title("First post")).unwrap(), Some(1));

    assert_eq!(posts.update(1, Fields::new()).unwrap(), None);
    assert_eq!(posts.update(1, fields([("views", Value::Null)])).unwrap(), None);
    assert_eq!(posts.update(42, title("Nobody")).unwrap(), None);
    assert_eq!(posts.save(title("Renamed"), 1).unwrap(), Some(1));
    assert_eq!(posts.save(title("Another"), 0).unwrap(), Some(2));
    assert_eq!(
        posts.find_val("title", 1).unwrap(),
        Some(Value::text("Renamed"))
    );
}

#[test]
fn test_without_soft_delete() {
    let db = memory_db();
    let mut posts = Table::new(&db, PlainPost).unwrap();
    posts.add(title("First post")).unwrap();

    assert!(!posts.restore(1).unwrap());
    assert!(posts.delete(1, false).unwrap());
    assert_eq!(posts.count(&FindOptions::new()).unwrap(), 0);
}

#[test]
fn test_delete_and_restore_permissions() {
    let db = memory_db();
    let mut posts = Table::new(&db, LockedPost).unwrap();
    posts.add(title("Pinned")).unwrap();
    posts.add(title("Regular")).unwrap();

    assert!(!posts.delete(1, true).unwrap());
    assert!(posts.delete(2, false).unwrap());
    assert!(!posts.restore(2).unwrap());
    assert_eq!(posts.count(&FindOptions::new()).unwrap(), 2);
    assert!(is_timestamp(posts.find_val("deleted_at", 2).unwrap().as_ref()));
}

#[test]
fn test_filter_fields() {
    let db = memory_db();
    let mut posts = Table::new(&db, CheckedPost).unwrap();

    let submitted = fields([
        ("title", Value::text("Draft")),
        ("status", Value::text("deleted")),
    ]);
    match posts.add(submitted.clone()) {
        Err(OrmError::Validation(errors)) => {
            assert_eq!(errors.get("status"), Some(&["Unknown status".to_string()][..]));
            assert!(errors.get("title").is_none());
        }
        other => panic!("Expected a validation error, got {other:?}"),
    }
    assert_eq!(posts.get_fields(), &submitted);
    assert_eq!(posts.count(&FindOptions::new()).unwrap(), 0);

    let id = posts
        .add(fields([
            ("title", Value::text(" <b>Hello</b> ")),
            ("status", Value::text("published")),
            ("bogus", Value::Int(1)),
        ]))
        .unwrap();
    assert_eq!(id, Some(1));
    assert!(!posts.get_fields().contains_key("bogus"));
    let row = posts.find_assoc(&["title", "status"], 1).unwrap().unwrap();
    assert_eq!(row.get("title"), Some(&Value::text("Hello")));
    assert_eq!(row.get("status"), Some(&Value::text("published")));
}

#[test]
fn test_constraint_violation_propagates() {
    let db = memory_db();
    let mut posts = Table::new(&db, Post).unwrap();
    assert!(matches!(
        posts.add(Fields::new()),
        Err(OrmError::Db(DbError::Driver(_)))
    ));
}

#[test]
fn test_hooks_rewrite_fields() {
    let mut db = memory_db();
    let added = Rc::new(Cell::new(0));
    let seen = Rc::clone(&added);
    db.hooks_mut().on("db.post.add.before", |ctx| {
        ctx.fields
            .insert("status".into(), Value::text("published"));
    });
    db.hooks_mut().on("db.post.add.after", move |ctx| {
        assert_eq!(ctx.action.as_deref(), Some("add"));
        seen.set(ctx.id);
    });
    db.hooks_mut().on("db.post.delete.before", |ctx| ctx.id = 2);

    let mut posts = Table::new(&db, Post).unwrap();
    posts.add(title("First post")).unwrap();
    posts.add(title("Second post")).unwrap();
    assert_eq!(added.get(), 2);
    assert_eq!(
        posts.find_val("status", 1).unwrap(),
        Some(Value::text("published"))
    );

    assert!(posts.delete(1, true).unwrap());
    assert!(posts.find_row(&["id"], 1).unwrap().is_some());
    assert!(posts.find_row(&["id"], 2).unwrap().is_none());
}

#[test]
fn test_find_rows_and_count() {
    let db = memory_db();
    let mut posts = Table::new(&db, Post).unwrap();
    for (name, views) in [("Beta", 5), ("Alpha", 10), ("Gamma", 0)] {
        posts
            .add(fields([("title", Value::text(name)), ("views", Value::Int(views))]))
            .unwrap();
    }

    let rows = posts
        .find_rows(
            &["id", "title"],
            &FindOptions::new().order_by(["views DESC"]).limit(2, 0),
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_str("title"), Some("Alpha"));
    assert_eq!(rows[1].get_str("title"), Some("Beta"));

    let assocs = posts
        .find_assocs(&["title"], &FindOptions::new().where_clause("views = 0"))
        .unwrap();
    assert_eq!(assocs.len(), 1);
    assert_eq!(assocs[0].get("title"), Some(&Value::text("Gamma")));

    let min = FindOptions::new()
        .where_clause("views > :min")
        .param("min", 1);
    assert_eq!(posts.count(&min).unwrap(), 2);
    assert_eq!(posts.count(&min.clone().limit(1, 0)).unwrap(), 1);
    assert_eq!(
        posts
            .count(&FindOptions::new().group_by(["status"]))
            .unwrap(),
        1
    );
}

#[test]
fn test_get_selectable_array() {
    let db = memory_db();
    let mut posts = Table::new(&db, Post).unwrap();
    for name in ["Beta", "Alpha", "Gamma"] {
        posts.add(title(name)).unwrap();
    }

    assert_eq!(
        posts
            .get_selectable_array("title", &SelectableOptions::new())
            .unwrap(),
        vec![
            (2, "Alpha".to_string()),
            (1, "Beta".to_string()),
            (3, "Gamma".to_string())
        ]
    );
    assert_eq!(
        posts
            .get_selectable_array(
                "title",
                &SelectableOptions::new()
                    .where_clause("title <> :skip")
                    .param("skip", "Gamma")
                    .order_by(["id DESC"])
            )
            .unwrap(),
        vec![(2, "Alpha".to_string()), (1, "Beta".to_string())]
    );
}

#[test]
fn test_create_and_auto_increment() {
    let db = memory_db();
    let mut posts = Table::new(&db, Post).unwrap();

    let empty = posts.create().unwrap().unwrap();
    assert_eq!(empty.get("views"), Some(&Value::Int(0)));
    assert_eq!(empty.get("status"), Some(&Value::text("draft")));
    assert_eq!(empty.get("title"), Some(&Value::Null));

    posts.add(title("First post")).unwrap();
    assert_eq!(posts.get_auto_increment().unwrap(), Some(2));
}

#[test]
fn test_invalid_metadata_fails_fast() {
    let db = memory_db();
    assert!(matches!(
        Table::new(&db, Misnamed),
        Err(OrmError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_select_reuses_table() {
    let db = memory_db();
    let mut posts = Table::new(&db, Post).unwrap();
    posts.add(title("First post")).unwrap();

    let mut query = posts.select().unwrap();
    query.select(["COUNT(*) AS n"]);
    query.run().unwrap();
    assert_eq!(query.fetch().unwrap().unwrap().get_i64("n"), Some(1));
}
