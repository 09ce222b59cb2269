use crate::connect::ConnectionSettings;
use crate::dialect::Dialect;
use crate::error::DriverError;
use crate::Value;

pub type Row = Vec<Value>;

/// Result of one driver-level statement.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    /// `Some` iff the statement produced a result set, even an empty one.
    pub rows: Option<Vec<Row>>,
    pub affected_rows: Option<u64>,
}

impl QueryOutput {
    /// Outcome of a statement with no result set.
    pub fn affected(count: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: None,
            affected_rows: Some(count),
        }
    }

    pub fn rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: Some(rows),
            affected_rows: None,
        }
    }

    pub fn has_result_set(&self) -> bool {
        self.rows.is_some()
    }
}

/// Active database connection consumed by the executor.
///
/// The executor interacts exclusively through this trait and owns the
/// connection for the duration of each operation; adapters never need to
/// be thread-safe on their own.
pub trait Connection: Send {
    /// Execute one statement with positional parameters.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutput, DriverError>;

    /// Execute one statement once per parameter set. No rows are returned.
    fn execute_many(&mut self, sql: &str, param_sets: &[Vec<Value>]) -> Result<(), DriverError> {
        for params in param_sets {
            self.execute(sql, params)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError>;

    fn rollback(&mut self) -> Result<(), DriverError>;

    /// Switch autocommit and report the previous setting.
    ///
    /// Returns `None` when the driver has no switchable autocommit; the
    /// transaction manager then skips the save/restore dance.
    fn set_autocommit(&mut self, _enabled: bool) -> Result<Option<bool>, DriverError> {
        Ok(None)
    }

    fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Factory for opening connections from connection settings.
///
/// One implementation per backing database lives in its adapter crate;
/// the executor treats the trait as the whole driver surface.
pub trait Driver: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn Connection>, DriverError>;
}

/// External pool integration: the executor treats both callbacks as opaque.
pub struct PoolHooks {
    pub acquire: Box<dyn FnMut() -> Result<Box<dyn Connection>, DriverError> + Send>,
    pub release: Box<dyn FnMut(Box<dyn Connection>) + Send>,
}

impl PoolHooks {
    pub fn new(
        acquire: impl FnMut() -> Result<Box<dyn Connection>, DriverError> + Send + 'static,
        release: impl FnMut(Box<dyn Connection>) + Send + 'static,
    ) -> Self {
        Self {
            acquire: Box::new(acquire),
            release: Box::new(release),
        }
    }
}
