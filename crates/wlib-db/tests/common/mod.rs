#![allow(dead_code)]

use wlib_db::{Db, DbConfig, Executed, Value};

pub const CREATE_POST: &str = "CREATE TABLE post (\
    id INTEGER PRIMARY KEY AUTOINCREMENT, \
    title TEXT NOT NULL, \
    views INTEGER NOT NULL DEFAULT 0, \
    status TEXT DEFAULT 'draft', \
    created_at DATETIME, \
    updated_at DATETIME, \
    deleted_at DATETIME)";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn open(config: DbConfig) -> Db {
    init_tracing();
    Db::new(config).unwrap_or_else(|e| panic!("Failed to create connection: {e}"))
}

/// In-memory database with the `post` table.
pub fn memory_db() -> Db {
    let db = open(DbConfig::sqlite_memory());
    db.exec(CREATE_POST)
        .unwrap_or_else(|e| panic!("Failed to create post table: {e}"));
    db
}

pub fn insert_post(db: &Db, title: &str) -> i64 {
    let mut query = db.new_query();
    query.insert("post").unwrap().set("title", title).unwrap();
    match query.run().unwrap() {
        Executed::InsertId(Some(id)) => id,
        other => panic!("Expected an insert id, got {other:?}"),
    }
}

pub fn count_posts(db: &Db) -> i64 {
    let rows = db.query("SELECT COUNT(*) AS n FROM post").unwrap();
    rows[0].get_i64("n").unwrap()
}

pub fn is_timestamp(value: Option<&Value>) -> bool {
    let Some(Value::Text(text)) = value else {
        return false;
    };
    let bytes = text.as_bytes();
    bytes.len() == 19
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 | 16 => *b == b':',
            _ => b.is_ascii_digit(),
        })
}
