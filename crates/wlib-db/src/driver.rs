//! One concrete sqlx connection per dialect.
//!
//! Every statement is streamed through `fetch_many`, so a statement yields
//! its rows and its completion whatever its leading keyword. Values are
//! decoded per engine; date and time columns come back as text in
//! [`TIMESTAMP_FORMAT`].

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnection, MySqlQueryResult, MySqlRow};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgConnection, PgQueryResult, PgRow, PgTypeInfo};
use sqlx::sqlite::{SqliteConnection, SqliteQueryResult, SqliteRow};
use sqlx::types::Decimal;
use sqlx::{
    ColumnIndex, Connection, Database, Either, Encode, Execute, Executor, MySql, Postgres, Row,
    Sqlite, Type, TypeInfo, ValueRef,
};
use tracing::debug;
use wlib_sql_core::{Bound, DialectKind, Value, TIMESTAMP_FORMAT};

use crate::config::Attributes;
use crate::connection::Outcome;
use crate::error::Result;
use crate::record::{decode_row, Record};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// An open connection to one of the supported engines.
pub(crate) enum DriverConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
    Sqlite(SqliteConnection),
}

impl DriverConnection {
    pub(crate) async fn open(kind: DialectKind, url: &str) -> Result<Self> {
        Ok(match kind {
            DialectKind::MySql => Self::MySql(MySqlConnection::connect(url).await?),
            DialectKind::Postgres => Self::Postgres(PgConnection::connect(url).await?),
            DialectKind::Sqlite => Self::Sqlite(SqliteConnection::connect(url).await?),
        })
    }

    pub(crate) async fn close(self) -> Result<()> {
        match self {
            Self::MySql(conn) => conn.close().await?,
            Self::Postgres(conn) => conn.close().await?,
            Self::Sqlite(conn) => conn.close().await?,
        }
        Ok(())
    }

    /// Runs one bound statement, unprepared when it has no values.
    pub(crate) async fn run(&mut self, bound: &Bound, attributes: Attributes) -> Result<Outcome> {
        let values = &bound.values;
        match self {
            Self::MySql(conn) => {
                let (rows, done) = if values.is_empty() {
                    collect(&mut *conn, bound.sql.as_str(), attributes, decode_mysql).await?
                } else {
                    let query =
                        bind_values(sqlx::query::<MySql>(&bound.sql), values, TEXT_NULL, false);
                    collect(&mut *conn, query, attributes, decode_mysql).await?
                };
                let affected = done.iter().map(MySqlQueryResult::rows_affected).sum();
                let id = done
                    .last()
                    .and_then(|result| i64::try_from(result.last_insert_id()).ok())
                    .filter(|id| *id > 0);
                Ok(outcome(rows, affected, id))
            }
            Self::Postgres(conn) => {
                let (rows, done) = if values.is_empty() {
                    collect(&mut *conn, bound.sql.as_str(), attributes, decode_postgres).await?
                } else {
                    let query =
                        bind_values(sqlx::query::<Postgres>(&bound.sql), values, UntypedNull, true);
                    collect(&mut *conn, query, attributes, decode_postgres).await?
                };
                // the protocol reports no generated key, see `last_insert_id`
                let affected = done.iter().map(PgQueryResult::rows_affected).sum();
                Ok(outcome(rows, affected, None))
            }
            Self::Sqlite(conn) => {
                let (rows, done) = if values.is_empty() {
                    collect(&mut *conn, bound.sql.as_str(), attributes, decode_sqlite).await?
                } else {
                    let query =
                        bind_values(sqlx::query::<Sqlite>(&bound.sql), values, TEXT_NULL, false);
                    collect(&mut *conn, query, attributes, decode_sqlite).await?
                };
                let affected = done.iter().map(SqliteQueryResult::rows_affected).sum();
                let id = done
                    .last()
                    .filter(|_| affected > 0)
                    .map(SqliteQueryResult::last_insert_rowid);
                Ok(outcome(rows, affected, id))
            }
        }
    }

    /// The key generated by the latest insert on this connection.
    ///
    /// PostgreSQL answers from `lastval()`, which fails until a sequence
    /// has been used in the session; that failure reads as `None`.
    pub(crate) async fn last_insert_id(&mut self) -> Result<Option<i64>> {
        match self {
            Self::MySql(conn) => {
                let id: u64 = sqlx::query_scalar("SELECT LAST_INSERT_ID()")
                    .fetch_one(&mut *conn)
                    .await?;
                Ok(i64::try_from(id).ok().filter(|id| *id > 0))
            }
            Self::Postgres(conn) => {
                match sqlx::query_scalar::<_, i64>("SELECT lastval()")
                    .fetch_one(&mut *conn)
                    .await
                {
                    Ok(id) => Ok(Some(id)),
                    Err(err) => {
                        debug!(error = %err, "No sequence value in this session");
                        Ok(None)
                    }
                }
            }
            Self::Sqlite(conn) => {
                let id: i64 = sqlx::query_scalar("SELECT last_insert_rowid()")
                    .fetch_one(&mut *conn)
                    .await?;
                Ok(Some(id).filter(|id| *id > 0))
            }
        }
    }
}

fn outcome(rows: Vec<Record>, rows_affected: u64, last_insert_id: Option<i64>) -> Outcome {
    if rows.is_empty() {
        Outcome::Done {
            rows_affected,
            last_insert_id,
        }
    } else {
        Outcome::Rows(rows)
    }
}

/// Streams a statement, decoding its rows and keeping its completions.
async fn collect<'c, DB, E, Q, D>(
    executor: E,
    query: Q,
    attributes: Attributes,
    decode: D,
) -> Result<(Vec<Record>, Vec<DB::QueryResult>)>
where
    DB: Database,
    E: Executor<'c, Database = DB>,
    Q: Execute<'c, DB> + 'c,
    D: Fn(&DB::Row, usize) -> Result<Value>,
{
    let mut rows = Vec::new();
    let mut done = Vec::new();
    let mut stream = executor.fetch_many(query);
    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(result) => done.push(result),
            Either::Right(row) => rows.push(decode_row(&row, attributes, &decode)?),
        }
    }
    Ok((rows, done))
}

type BoundQuery<'q, DB> = sqlx::query::Query<'q, DB, <DB as Database>::Arguments<'q>>;

const TEXT_NULL: Option<String> = None;

/// A NULL whose type PostgreSQL infers from the statement.
#[derive(Debug, Clone, Copy)]
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        // `unknown`
        PgTypeInfo::with_oid(Oid(705))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(
        &self,
        _buf: &mut PgArgumentBuffer,
    ) -> std::result::Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// Binds positional values, sending [`Value::Null`] as `null`. With
/// `temporal_text`, text in [`TIMESTAMP_FORMAT`] is sent as a timestamp so
/// that typed columns accept it.
fn bind_values<'q, DB, N>(
    mut query: BoundQuery<'q, DB>,
    values: &'q [Value],
    null: N,
    temporal_text: bool,
) -> BoundQuery<'q, DB>
where
    DB: Database,
    N: Encode<'q, DB> + Type<DB> + Clone + 'q,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    &'q str: Encode<'q, DB> + Type<DB>,
    &'q [u8]: Encode<'q, DB> + Type<DB>,
    NaiveDateTime: Encode<'q, DB> + Type<DB>,
{
    for value in values {
        query = match value {
            Value::Null => query.bind(null.clone()),
            Value::Bool(b) => query.bind(*b),
            Value::Int(n) => query.bind(*n),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) | Value::Raw(s) => {
                let stamp = temporal_text
                    .then(|| NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok())
                    .flatten();
                match stamp {
                    Some(stamp) => query.bind(stamp),
                    None => query.bind(s.as_str()),
                }
            }
            Value::Blob(b) => query.bind(b.as_slice()),
        };
    }
    query
}

/// Type name of a non-NULL value, `None` for NULL.
fn type_name<R>(row: &R, idx: usize) -> Result<Option<String>>
where
    R: Row,
    usize: ColumnIndex<R>,
{
    let raw = row.try_get_raw(idx)?;
    Ok((!raw.is_null()).then(|| raw.type_info().name().to_string()))
}

fn timestamp(stamp: NaiveDateTime) -> Value {
    Value::Text(stamp.format(TIMESTAMP_FORMAT).to_string())
}

fn date(day: NaiveDate) -> Value {
    Value::Text(day.format(DATE_FORMAT).to_string())
}

fn time(clock: NaiveTime) -> Value {
    Value::Text(clock.format(TIME_FORMAT).to_string())
}

// SQLite types values by storage class, so a DATETIME column holding text
// reads as text.
fn decode_sqlite(row: &SqliteRow, idx: usize) -> Result<Value> {
    let Some(name) = type_name(row, idx)? else {
        return Ok(Value::Null);
    };
    Ok(match name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::Int(row.try_get_unchecked(idx)?),
        "REAL" => Value::Float(row.try_get_unchecked(idx)?),
        "BLOB" => Value::Blob(row.try_get_unchecked(idx)?),
        "NULL" => Value::Null,
        _ => Value::Text(row.try_get_unchecked(idx)?),
    })
}

fn decode_mysql(row: &MySqlRow, idx: usize) -> Result<Value> {
    let Some(name) = type_name(row, idx)? else {
        return Ok(Value::Null);
    };
    Ok(match name.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get_unchecked(idx)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::Int(row.try_get_unchecked(idx)?)
        }
        "YEAR" => Value::Int(i64::from(row.try_get_unchecked::<u16, _>(idx)?)),
        unsigned if unsigned.ends_with(" UNSIGNED") => {
            let n: u64 = row.try_get_unchecked(idx)?;
            i64::try_from(n).map_or_else(|_| Value::Text(n.to_string()), Value::Int)
        }
        "FLOAT" => Value::Float(f64::from(row.try_get::<f32, _>(idx)?)),
        "DOUBLE" => Value::Float(row.try_get(idx)?),
        "DECIMAL" => Value::Text(row.try_get::<Decimal, _>(idx)?.to_string()),
        "DATETIME" | "TIMESTAMP" => timestamp(row.try_get_unchecked(idx)?),
        "DATE" => date(row.try_get(idx)?),
        "TIME" => time(row.try_get(idx)?),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            Value::Blob(row.try_get_unchecked(idx)?)
        }
        "NULL" => Value::Null,
        _ => Value::Text(row.try_get_unchecked(idx)?),
    })
}

fn decode_postgres(row: &PgRow, idx: usize) -> Result<Value> {
    let Some(name) = type_name(row, idx)? else {
        return Ok(Value::Null);
    };
    Ok(match name.as_str() {
        "BOOL" => Value::Bool(row.try_get(idx)?),
        "INT2" => Value::Int(i64::from(row.try_get::<i16, _>(idx)?)),
        "INT4" => Value::Int(i64::from(row.try_get::<i32, _>(idx)?)),
        "INT8" => Value::Int(row.try_get(idx)?),
        "FLOAT4" => Value::Float(f64::from(row.try_get::<f32, _>(idx)?)),
        "FLOAT8" => Value::Float(row.try_get(idx)?),
        "NUMERIC" => Value::Text(row.try_get::<Decimal, _>(idx)?.to_string()),
        "TIMESTAMP" => timestamp(row.try_get(idx)?),
        "TIMESTAMPTZ" => timestamp(row.try_get::<DateTime<Local>, _>(idx)?.naive_local()),
        "DATE" => date(row.try_get(idx)?),
        "TIME" => time(row.try_get(idx)?),
        "BYTEA" => Value::Blob(row.try_get(idx)?),
        "JSON" | "JSONB" => Value::Text(row.try_get::<serde_json::Value, _>(idx)?.to_string()),
        "VOID" => Value::Null,
        // text-like types and enum labels share the UTF-8 wire form
        _ => Value::Text(row.try_get_unchecked(idx)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporal_formats() {
        let stamp = NaiveDateTime::parse_from_str("2024-03-01 09:05:00", TIMESTAMP_FORMAT).unwrap();
        assert_eq!(timestamp(stamp), Value::text("2024-03-01 09:05:00"));
        assert_eq!(date(stamp.date()), Value::text("2024-03-01"));
        assert_eq!(time(stamp.time()), Value::text("09:05:00"));
    }

    #[test]
    fn test_outcome_prefers_rows() {
        let mut row = Record::new();
        row.push("n", 1);
        assert_eq!(outcome(vec![row.clone()], 0, None), Outcome::Rows(vec![row]));
        assert_eq!(
            outcome(Vec::new(), 2, Some(7)),
            Outcome::Done {
                rows_affected: 2,
                last_insert_id: Some(7)
            }
        );
    }
}
