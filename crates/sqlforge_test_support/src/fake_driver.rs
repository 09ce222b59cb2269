use sqlforge_core::{
    Connection, ConnectionSettings, Dialect, Driver, DriverError, QueryOutput, Row, Value,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Scripted result for one statement execution.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Statement produces a result set (possibly empty).
    Rows(Vec<Row>),
    /// Statement succeeds without a result set.
    Affected(u64),
    /// Statement fails with this driver error.
    Error {
        message: String,
        sqlstate: Option<String>,
    },
}

impl ScriptedOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        ScriptedOutcome::Error {
            message: message.into(),
            sqlstate: None,
        }
    }

    pub fn error_with_sqlstate(message: impl Into<String>, sqlstate: impl Into<String>) -> Self {
        ScriptedOutcome::Error {
            message: message.into(),
            sqlstate: Some(sqlstate.into()),
        }
    }

    fn into_result(self) -> Result<QueryOutput, DriverError> {
        match self {
            ScriptedOutcome::Rows(rows) => Ok(QueryOutput::rows(Vec::new(), rows)),
            ScriptedOutcome::Affected(count) => Ok(QueryOutput::affected(count)),
            ScriptedOutcome::Error { message, sqlstate } => {
                let mut error = DriverError::new(message);
                if let Some(code) = sqlstate {
                    error = error.with_sqlstate(code);
                }
                Err(error)
            }
        }
    }
}

/// Counters and call log shared by every connection of one [`FakeDriver`].
#[derive(Debug, Clone, Default)]
pub struct FakeStats {
    pub executed: Vec<(String, Vec<Value>)>,
    pub executed_many: Vec<(String, usize)>,
    pub connects: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub closes: usize,
    pub autocommit_switches: Vec<bool>,
}

impl FakeStats {
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed.iter().map(|(sql, _)| sql.clone()).collect()
    }
}

#[derive(Default)]
struct FakeState {
    outcomes: Mutex<HashMap<String, VecDeque<ScriptedOutcome>>>,
    commit_errors: Mutex<VecDeque<String>>,
    rollback_errors: Mutex<VecDeque<String>>,
    connect_error: Mutex<Option<String>>,
    stats: Mutex<FakeStats>,
    autocommit_supported: bool,
    autocommit: Mutex<bool>,
}

/// Scripted in-memory driver.
///
/// Outcomes are queued per SQL text and consumed in order; unscripted
/// statements succeed with no result set, so transaction control
/// statements pass through and land in the call log.
#[derive(Clone)]
pub struct FakeDriver {
    dialect: Dialect,
    state: Arc<FakeState>,
}

impl FakeDriver {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Arc::new(FakeState {
                autocommit_supported: true,
                autocommit: Mutex::new(true),
                ..Default::default()
            }),
        }
    }

    /// Driver whose connections report no switchable autocommit.
    pub fn without_autocommit(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Arc::new(FakeState::default()),
        }
    }

    /// Queue an outcome for the next execution of `sql`.
    pub fn with_outcome(self, sql: impl Into<String>, outcome: ScriptedOutcome) -> Self {
        self.push_outcome(sql, outcome);
        self
    }

    pub fn push_outcome(&self, sql: impl Into<String>, outcome: ScriptedOutcome) {
        self.state
            .outcomes
            .lock()
            .unwrap()
            .entry(sql.into())
            .or_default()
            .push_back(outcome);
    }

    pub fn with_connect_error(self, message: impl Into<String>) -> Self {
        *self.state.connect_error.lock().unwrap() = Some(message.into());
        self
    }

    /// Fail the next `commit()` call.
    pub fn push_commit_error(&self, message: impl Into<String>) {
        self.state
            .commit_errors
            .lock()
            .unwrap()
            .push_back(message.into());
    }

    pub fn push_rollback_error(&self, message: impl Into<String>) {
        self.state
            .rollback_errors
            .lock()
            .unwrap()
            .push_back(message.into());
    }

    /// Open a connection directly, for executors in borrow mode.
    pub fn connection(&self) -> FakeConnection {
        FakeConnection {
            state: self.state.clone(),
        }
    }

    pub fn stats(&self) -> FakeStats {
        self.state.stats.lock().unwrap().clone()
    }
}

impl Driver for FakeDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn connect(&self, _settings: &ConnectionSettings) -> Result<Box<dyn Connection>, DriverError> {
        if let Some(message) = self.state.connect_error.lock().unwrap().clone() {
            return Err(DriverError::new(message));
        }
        self.state.stats.lock().unwrap().connects += 1;
        Ok(Box::new(self.connection()))
    }
}

pub struct FakeConnection {
    state: Arc<FakeState>,
}

impl Connection for FakeConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutput, DriverError> {
        self.state
            .stats
            .lock()
            .unwrap()
            .executed
            .push((sql.to_string(), params.to_vec()));

        let outcome = self
            .state
            .outcomes
            .lock()
            .unwrap()
            .get_mut(sql)
            .and_then(VecDeque::pop_front);

        match outcome {
            Some(outcome) => outcome.into_result(),
            None => Ok(QueryOutput::affected(0)),
        }
    }

    fn execute_many(&mut self, sql: &str, param_sets: &[Vec<Value>]) -> Result<(), DriverError> {
        self.state
            .stats
            .lock()
            .unwrap()
            .executed_many
            .push((sql.to_string(), param_sets.len()));

        let outcome = self
            .state
            .outcomes
            .lock()
            .unwrap()
            .get_mut(sql)
            .and_then(VecDeque::pop_front);

        match outcome {
            Some(outcome) => outcome.into_result().map(|_| ()),
            None => Ok(()),
        }
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        if let Some(message) = self.state.commit_errors.lock().unwrap().pop_front() {
            return Err(DriverError::new(message));
        }
        self.state.stats.lock().unwrap().commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        if let Some(message) = self.state.rollback_errors.lock().unwrap().pop_front() {
            return Err(DriverError::new(message));
        }
        self.state.stats.lock().unwrap().rollbacks += 1;
        Ok(())
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<Option<bool>, DriverError> {
        if !self.state.autocommit_supported {
            return Ok(None);
        }
        self.state
            .stats
            .lock()
            .unwrap()
            .autocommit_switches
            .push(enabled);
        let mut autocommit = self.state.autocommit.lock().unwrap();
        let previous = *autocommit;
        *autocommit = enabled;
        Ok(Some(previous))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.state.stats.lock().unwrap().closes += 1;
        Ok(())
    }
}
