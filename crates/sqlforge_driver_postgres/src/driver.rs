use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use postgres::{Client, Config, NoTls};
use sqlforge_core::{
    Connection, ConnectionSettings, Dialect, Driver, DriverError, QueryOutput, Row, Value,
};

/// Opens connections from `postgresql://` URLs.
#[derive(Debug, Clone, Copy)]
pub struct PostgresDriver {
    dialect: Dialect,
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self {
            dialect: Dialect::Postgres,
        }
    }

    /// Same adapter, CockroachDB dialect.
    pub fn cockroach() -> Self {
        Self {
            dialect: Dialect::CockroachDb,
        }
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for PostgresDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn Connection>, DriverError> {
        let target = settings.target()?;

        let mut config = Config::new();
        if let Some(host) = &target.host {
            config.host(host);
        }
        if let Some(port) = target.port {
            config.port(port);
        }
        if let Some(user) = &target.username {
            config.user(user);
        }
        if let Some(password) = &target.password {
            config.password(password);
        }
        if let Some(database) = &target.database {
            config.dbname(database);
        }
        if let Some(timeout) = settings.connect_timeout {
            config.connect_timeout(timeout);
        }

        let client = config.connect(NoTls).map_err(map_postgres_error)?;
        log::debug!(
            "connected to {} at {:?}",
            self.dialect,
            target.host.as_deref().unwrap_or("localhost")
        );
        Ok(Box::new(PostgresConnection { client }))
    }
}

pub struct PostgresConnection {
    client: Client,
}

impl PostgresConnection {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Connection for PostgresConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutput, DriverError> {
        // The compiler emits `%s` placeholders; the wire protocol wants `$n`.
        let sql = numbered_placeholders(sql);
        let statement = self.client.prepare(&sql).map_err(map_postgres_error)?;

        let owned: Vec<Box<dyn ToSql + Sync>> = params.iter().map(value_to_sql).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = owned.iter().map(AsRef::as_ref).collect();

        if statement.columns().is_empty() {
            let affected = self
                .client
                .execute(&statement, &refs)
                .map_err(map_postgres_error)?;
            return Ok(QueryOutput::affected(affected));
        }

        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let pg_rows = self
            .client
            .query(&statement, &refs)
            .map_err(map_postgres_error)?;

        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in &pg_rows {
            let mut values: Row = Vec::with_capacity(pg_row.len());
            for (index, column) in pg_row.columns().iter().enumerate() {
                values.push(read_column(pg_row, index, column.type_()));
            }
            rows.push(values);
        }

        Ok(QueryOutput::rows(columns, rows))
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.client
            .batch_execute("COMMIT")
            .map_err(map_postgres_error)
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.client
            .batch_execute("ROLLBACK")
            .map_err(map_postgres_error)
    }
}

/// Rewrite `%s` placeholders to the `$1 … $n` wire form.
pub fn numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut position = 0usize;
    let mut rest = sql;
    while let Some(index) = rest.find("%s") {
        position += 1;
        out.push_str(&rest[..index]);
        out.push_str(&format!("${}", position));
        rest = &rest[index + 2..];
    }
    out.push_str(rest);
    out
}

/// NULL parameter accepted against any column type.
#[derive(Debug)]
struct AnyNull;

impl ToSql for AnyNull {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn value_to_sql(value: &Value) -> Box<dyn ToSql + Sync> {
    match value {
        Value::Null => Box::new(AnyNull),
        Value::Bool(b) => Box::new(*b),
        Value::Int(i) => Box::new(*i),
        Value::Float(f) => Box::new(*f),
        Value::Text(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Timestamp(ts) => Box::new(*ts),
        Value::Json(s) => Box::new(
            serde_json::from_str::<serde_json::Value>(s)
                .unwrap_or(serde_json::Value::String(s.clone())),
        ),
    }
}

fn read_column(row: &postgres::Row, index: usize, column_type: &Type) -> Value {
    match column_type.name() {
        "bool" => row
            .try_get::<_, Option<bool>>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, Option<i16>>(index)
            .map(|v| Value::from(v.map(i64::from)))
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, Option<i32>>(index)
            .map(|v| Value::from(v.map(i64::from)))
            .unwrap_or(Value::Null),
        "int8" => row
            .try_get::<_, Option<i64>>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "float4" => row
            .try_get::<_, Option<f32>>(index)
            .map(|v| Value::from(v.map(f64::from)))
            .unwrap_or(Value::Null),
        "float8" => row
            .try_get::<_, Option<f64>>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(index)
            .map(|v| Value::from(v.map(|naive| naive.and_utc())))
            .unwrap_or(Value::Null),
        "json" | "jsonb" => row
            .try_get::<_, Option<serde_json::Value>>(index)
            .map(|v| match v {
                Some(json) => Value::Json(json.to_string()),
                None => Value::Null,
            })
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<_, Option<String>>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
    }
}

fn map_postgres_error(error: postgres::Error) -> DriverError {
    let sqlstate = error
        .as_db_error()
        .map(|db_error| db_error.code().code().to_string());
    let message = error
        .as_db_error()
        .map(|db_error| db_error.message().to_string())
        .unwrap_or_else(|| error.to_string());

    let mut mapped = DriverError::new(message);
    if let Some(code) = sqlstate {
        mapped = mapped.with_sqlstate(code);
    }
    mapped.with_source(error)
}
