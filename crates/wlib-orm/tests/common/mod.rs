#![allow(dead_code)]

use wlib_db::{Db, DbConfig, Fields, Value};

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

/// In-memory database with the `post` table.
pub fn memory_db() -> Db {
    init_tracing();
    let db = Db::new(DbConfig::sqlite_memory())
        .unwrap_or_else(|e| panic!("Failed to create connection: {e}"));
    db.exec(CREATE_POST)
        .unwrap_or_else(|e| panic!("Failed to create post table: {e}"));
    db
}

pub fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .collect()
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
