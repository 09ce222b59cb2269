use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::Connection as RusqliteConnection;
use sqlforge_core::{
    Connection, ConnectionSettings, Dialect, Driver, DriverError, QueryOutput, Row, Value,
};

/// Opens SQLite files (or `:memory:`) named by the connection settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn Connection>, DriverError> {
        let target = settings.target()?;
        let Some(path) = target.database else {
            return Err(DriverError::new("sqlite connection requires a file path"));
        };

        let conn = RusqliteConnection::open(&path).map_err(map_sqlite_error)?;
        if let Some(timeout) = settings.connect_timeout {
            // SQLite has no connect phase; the timeout bounds lock waits.
            conn.busy_timeout(timeout).map_err(map_sqlite_error)?;
        }
        log::debug!("opened sqlite database at {}", path);
        Ok(Box::new(SqliteConnection { conn }))
    }
}

pub struct SqliteConnection {
    conn: RusqliteConnection,
}

impl SqliteConnection {
    pub fn new(conn: RusqliteConnection) -> Self {
        Self { conn }
    }

    pub fn open_in_memory() -> Result<Self, DriverError> {
        RusqliteConnection::open_in_memory()
            .map(|conn| Self { conn })
            .map_err(map_sqlite_error)
    }

    pub fn open(path: &str) -> Result<Self, DriverError> {
        RusqliteConnection::open(path)
            .map(|conn| Self { conn })
            .map_err(map_sqlite_error)
    }
}

impl Connection for SqliteConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutput, DriverError> {
        let mut statement = self.conn.prepare(sql).map_err(map_sqlite_error)?;
        let column_count = statement.column_count();
        let bound: Vec<ToSqlOutput<'_>> = params.iter().map(value_to_sqlite).collect();

        if column_count == 0 {
            let affected = statement
                .execute(rusqlite::params_from_iter(bound))
                .map_err(map_sqlite_error)?;
            return Ok(QueryOutput::affected(affected as u64));
        }

        let columns: Vec<String> = statement
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let mut rows = Vec::new();
        let mut results = statement
            .query(rusqlite::params_from_iter(bound))
            .map_err(map_sqlite_error)?;
        while let Some(row) = results.next().map_err(map_sqlite_error)? {
            let mut values: Row = Vec::with_capacity(column_count);
            for index in 0..column_count {
                let value = row.get_ref(index).map_err(map_sqlite_error)?;
                values.push(value_from_sqlite(value));
            }
            rows.push(values);
        }

        Ok(QueryOutput::rows(columns, rows))
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        // A bare COMMIT outside a transaction is an error in SQLite;
        // autocommit mode means there is nothing to do.
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT").map_err(map_sqlite_error)?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(map_sqlite_error)?;
        }
        Ok(())
    }
}

fn value_to_sqlite(value: &Value) -> ToSqlOutput<'_> {
    match value {
        Value::Null => ToSqlOutput::Owned(SqliteValue::Null),
        Value::Bool(b) => ToSqlOutput::Owned(SqliteValue::Integer(*b as i64)),
        Value::Int(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
        Value::Float(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
        Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        Value::Timestamp(ts) => ToSqlOutput::Owned(SqliteValue::Text(
            ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        )),
        Value::Json(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
    }
}

fn value_from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::Bytes(blob.to_vec()),
    }
}

fn map_sqlite_error(error: rusqlite::Error) -> DriverError {
    let sqlstate = match &error {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            rusqlite::ErrorCode::ConstraintViolation => Some("23000"),
            _ => None,
        },
        _ => None,
    };

    let mut mapped = DriverError::new(error.to_string());
    if let Some(code) = sqlstate {
        mapped = mapped.with_sqlstate(code);
    }
    mapped.with_source(error)
}
