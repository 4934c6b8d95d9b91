//! SQLite connection backed by sqlx
//!
//! sqlx is async; this wrapper drives it on a private current-thread tokio
//! runtime so the facade stays blocking. Opening or using it from inside
//! another tokio runtime fails with an `Execution` error instead of
//! blocking that runtime.

use std::io;
use std::str::FromStr;

use parking_lot::Mutex;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Row as _, Sqlite, TypeInfo, ValueRef};
use tokio::runtime::{Builder, Handle, Runtime};

use crate::config::OrmConfig;
use crate::connection::{Connection, ExecResult, Row};
use crate::error::Result;
use crate::value::SqlValue;

/// A single SQLite connection; one statement runs at a time.
#[derive(Debug)]
pub struct SqliteConnection {
    runtime: Runtime,
    conn: Mutex<sqlx::SqliteConnection>,
}

impl SqliteConnection {
    /// Open the database described by `config`.
    pub fn open(config: &OrmConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(config.create_if_missing)
            .busy_timeout(config.busy_timeout);
        Self::connect_with(options)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&OrmConfig::default())
    }

    pub fn connect_with(options: SqliteConnectOptions) -> Result<Self> {
        ensure_blocking_context()?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(sqlx::Error::Io)?;
        let conn = runtime.block_on(options.connect())?;
        tracing::debug!(filename = %options.get_filename().display(), "Opened SQLite connection");

        Ok(Self {
            runtime,
            conn: Mutex::new(conn),
        })
    }
}

impl Connection for SqliteConnection {
    /// `last_insert_id` carries SQLite's last rowid whenever rows were
    /// affected; it is only meaningful after an INSERT.
    fn execute(&self, sql: &str, values: &[SqlValue]) -> Result<ExecResult> {
        tracing::debug!(sql = %sql, binds = values.len(), "Executing statement");
        ensure_blocking_context()?;

        let mut conn = self.conn.lock();
        let result = self
            .runtime
            .block_on(bind_all(sqlx::query(sql), values).execute(&mut *conn))?;

        let rows_affected = result.rows_affected();
        Ok(ExecResult {
            rows_affected,
            last_insert_id: (rows_affected > 0).then(|| result.last_insert_rowid()),
        })
    }

    fn query(&self, sql: &str, values: &[SqlValue]) -> Result<Vec<Row>> {
        tracing::debug!(sql = %sql, binds = values.len(), "Executing query");
        ensure_blocking_context()?;

        let mut conn = self.conn.lock();
        let rows = self
            .runtime
            .block_on(bind_all(sqlx::query(sql), values).fetch_all(&mut *conn))?;

        let decoded = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
        Ok(decoded)
    }
}

/// `block_on` panics when called on a thread that is already driving a
/// tokio runtime.
fn ensure_blocking_context() -> Result<(), sqlx::Error> {
    if Handle::try_current().is_ok() {
        return Err(sqlx::Error::Io(io::Error::other(
            "blocking SQLite connection used from inside an async runtime",
        )));
    }
    Ok(())
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::String(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Bool(b) => query.bind(if *b { 1i32 } else { 0i32 }),
            SqlValue::Null => query.bind(None::<String>),
        };
    }
    query
}

/// Decode by the stored value's storage class rather than the declared
/// column type.
fn decode_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let type_info = raw.type_info();
            match type_info.name() {
                "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get(index)?),
                "REAL" => SqlValue::Float(row.try_get(index)?),
                "TEXT" | "DATE" | "TIME" | "DATETIME" => SqlValue::String(row.try_get(index)?),
                other => {
                    return Err(sqlx::Error::Decode(
                        format!("unsupported value type {other} in column {}", column.name())
                            .into(),
                    ));
                }
            }
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmError;
    use assert_matches::assert_matches;

    fn async_runtime() -> Runtime {
        Builder::new_current_thread().enable_all().build().unwrap()
    }

    #[test]
    fn test_open_inside_runtime_fails() {
        let result = async_runtime().block_on(async { SqliteConnection::open_in_memory() });
        assert_matches!(result, Err(OrmError::Execution(sqlx::Error::Io(_))));
    }

    #[test]
    fn test_statements_inside_runtime_fail() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        let runtime = async_runtime();
        runtime.block_on(async {
            assert_matches!(
                conn.execute("CREATE TABLE t (id INTEGER)", &[]),
                Err(OrmError::Execution(sqlx::Error::Io(_)))
            );
            assert_matches!(
                conn.query("SELECT 1", &[]),
                Err(OrmError::Execution(sqlx::Error::Io(_)))
            );
        });

        // still usable from a plain thread
        conn.execute("CREATE TABLE t (id INTEGER)", &[]).unwrap();
        assert_eq!(conn.query("SELECT id FROM t", &[]).unwrap().len(), 0);
    }

    #[test]
    fn test_round_trip_values() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE v (s TEXT, i INTEGER, f REAL, b INTEGER, n TEXT)", &[])
            .unwrap();
        let result = conn
            .execute(
                "INSERT INTO v (s, i, f, b, n) VALUES (?, ?, ?, ?, ?)",
                &[
                    SqlValue::String("it's".into()),
                    SqlValue::Int(7),
                    SqlValue::Float(1.5),
                    SqlValue::Bool(true),
                    SqlValue::Null,
                ],
            )
            .unwrap();
        assert_eq!(result.last_insert_id, Some(1));

        let rows = conn.query("SELECT s, i, f, b, n FROM v", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("s"), Some(&SqlValue::String("it's".into())));
        assert_eq!(rows[0].get("i"), Some(&SqlValue::Int(7)));
        assert_eq!(rows[0].get("f"), Some(&SqlValue::Float(1.5)));
        assert_eq!(rows[0].get("b"), Some(&SqlValue::Int(1)));
        assert_eq!(rows[0].get("n"), Some(&SqlValue::Null));
    }
}
