use chrono::{NaiveDate, Timelike};
use mysql::prelude::Queryable;
use mysql::{Conn, Opts, OptsBuilder, Params, Value as MysqlValue};
use sqlforge_core::{
    Connection, ConnectionSettings, Dialect, Driver, DriverError, QueryOutput, Row, Value,
};

/// Opens connections from `mysql://` / `mariadb://` URLs.
#[derive(Debug, Clone, Copy)]
pub struct MySqlDriver {
    dialect: Dialect,
}

impl MySqlDriver {
    pub fn new() -> Self {
        Self {
            dialect: Dialect::MySql,
        }
    }

    /// Same adapter, MariaDB dialect.
    pub fn mariadb() -> Self {
        Self {
            dialect: Dialect::MariaDb,
        }
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MySqlDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn Connection>, DriverError> {
        // The mysql crate only understands the mysql:// scheme.
        let url = settings.url.replacen("mariadb://", "mysql://", 1);
        let opts = Opts::from_url(&url)
            .map_err(|e| DriverError::new(format!("invalid mysql url: {e}")))?;

        let mut builder = OptsBuilder::from_opts(opts);
        if let Some(timeout) = settings.connect_timeout {
            builder = builder.tcp_connect_timeout(Some(timeout));
        }

        let conn = Conn::new(builder).map_err(map_mysql_error)?;
        log::debug!("connected to {}", self.dialect);
        Ok(Box::new(MySqlConnection {
            conn,
            dialect: self.dialect,
        }))
    }
}

pub struct MySqlConnection {
    conn: Conn,
    dialect: Dialect,
}

impl MySqlConnection {
    pub fn new(conn: Conn, dialect: Dialect) -> Self {
        Self { conn, dialect }
    }

    fn rewrite(&self, sql: &str) -> String {
        // The MySQL dialect emits %s placeholders; the driver binds `?`.
        // MariaDB SQL already carries `?`.
        if self.dialect == Dialect::MySql {
            sql.replace("%s", "?")
        } else {
            sql.to_string()
        }
    }
}

impl Connection for MySqlConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutput, DriverError> {
        let sql = self.rewrite(sql);
        let bound = Params::Positional(params.iter().map(value_to_mysql).collect());

        let mut result = self.conn.exec_iter(&sql, bound).map_err(map_mysql_error)?;
        let columns: Vec<String> = result
            .columns()
            .as_ref()
            .iter()
            .map(|column| column.name_str().into_owned())
            .collect();

        if columns.is_empty() {
            let affected = result.affected_rows();
            return Ok(QueryOutput::affected(affected));
        }

        let mut rows = Vec::new();
        for row in result.by_ref() {
            let row = row.map_err(map_mysql_error)?;
            let values: Row = row.unwrap().into_iter().map(value_from_mysql).collect();
            rows.push(values);
        }

        Ok(QueryOutput::rows(columns, rows))
    }

    fn execute_many(&mut self, sql: &str, param_sets: &[Vec<Value>]) -> Result<(), DriverError> {
        let sql = self.rewrite(sql);
        let batches: Vec<Params> = param_sets
            .iter()
            .map(|params| Params::Positional(params.iter().map(value_to_mysql).collect()))
            .collect();
        self.conn.exec_batch(&sql, batches).map_err(map_mysql_error)
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.conn.query_drop("COMMIT").map_err(map_mysql_error)
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.conn.query_drop("ROLLBACK").map_err(map_mysql_error)
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<Option<bool>, DriverError> {
        let previous: Option<u8> = self
            .conn
            .query_first("SELECT @@autocommit")
            .map_err(map_mysql_error)?;
        self.conn
            .query_drop(format!("SET autocommit = {}", if enabled { 1 } else { 0 }))
            .map_err(map_mysql_error)?;
        Ok(previous.map(|value| value != 0))
    }
}

fn value_to_mysql(value: &Value) -> MysqlValue {
    match value {
        Value::Null => MysqlValue::NULL,
        Value::Bool(b) => MysqlValue::Int(*b as i64),
        Value::Int(i) => MysqlValue::Int(*i),
        Value::Float(f) => MysqlValue::Double(*f),
        Value::Text(s) => MysqlValue::Bytes(s.as_bytes().to_vec()),
        Value::Bytes(b) => MysqlValue::Bytes(b.clone()),
        Value::Timestamp(ts) => {
            let date = ts.date_naive();
            MysqlValue::Date(
                chrono::Datelike::year(&date) as u16,
                chrono::Datelike::month(&date) as u8,
                chrono::Datelike::day(&date) as u8,
                ts.hour() as u8,
                ts.minute() as u8,
                ts.second() as u8,
                ts.timestamp_subsec_micros(),
            )
        }
        Value::Json(s) => MysqlValue::Bytes(s.as_bytes().to_vec()),
    }
}

fn value_from_mysql(value: MysqlValue) -> Value {
    match value {
        MysqlValue::NULL => Value::Null,
        MysqlValue::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(error) => Value::Bytes(error.into_bytes()),
        },
        MysqlValue::Int(i) => Value::Int(i),
        MysqlValue::UInt(u) => Value::Int(u as i64),
        MysqlValue::Float(f) => Value::Float(f as f64),
        MysqlValue::Double(d) => Value::Float(d),
        MysqlValue::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                .and_then(|date| {
                    date.and_hms_micro_opt(hour as u32, minute as u32, second as u32, micros)
                })
                .map(|naive| Value::Timestamp(naive.and_utc()))
                .unwrap_or(Value::Null)
        }
        MysqlValue::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            Value::Text(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                sign,
                days * 24 + hours as u32,
                minutes,
                seconds,
                micros
            ))
        }
    }
}

fn map_mysql_error(error: mysql::Error) -> DriverError {
    // The server error code (1213, 1205, ...) is the classification key;
    // normalization also falls back to message phrases.
    let code = match &error {
        mysql::Error::MySqlError(server) => Some(server.code.to_string()),
        _ => None,
    };
    let message = match &error {
        mysql::Error::MySqlError(server) => server.message.clone(),
        other => other.to_string(),
    };

    let mut mapped = DriverError::new(message);
    if let Some(code) = code {
        mapped = mapped.with_sqlstate(code);
    }
    mapped.with_source(error)
}
