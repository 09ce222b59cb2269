use crate::ast::{Delete, Insert, Select, SetOp, Statement, Update};
use crate::compiled_query::CompiledQuery;
use crate::compiler::SqlCompiler;
use crate::connect::ConnectionSettings;
use crate::error::{normalize_driver_error, ErrorDetails, ExecutionError};
use crate::observability::{EventKind, ExecutionEvent, ObservabilitySettings, QueryObservation};
use crate::retry::RetryPolicy;
use crate::traits::{Connection, Driver, PoolHooks, Row};
use crate::Value;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Executor operations, as named in events and error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Execute,
    FetchAll,
    FetchOne,
    ExecuteMany,
    ExecuteRaw,
    Begin,
    Commit,
    Rollback,
    Savepoint,
    RollbackToSavepoint,
    ReleaseSavepoint,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Execute => "execute",
            Operation::FetchAll => "fetch_all",
            Operation::FetchOne => "fetch_one",
            Operation::ExecuteMany => "execute_many",
            Operation::ExecuteRaw => "execute_raw",
            Operation::Begin => "begin",
            Operation::Commit => "commit",
            Operation::Rollback => "rollback",
            Operation::Savepoint => "savepoint",
            Operation::RollbackToSavepoint => "rollback_to_savepoint",
            Operation::ReleaseSavepoint => "release_savepoint",
        }
    }

    /// Mutating entry points auto-commit at the statement boundary when
    /// the executor is not inside an explicit transaction and does not
    /// borrow the caller's connection.
    fn commits_at_statement_boundary(&self) -> bool {
        matches!(
            self,
            Operation::Execute | Operation::ExecuteMany | Operation::ExecuteRaw
        )
    }
}

/// Query input: precompiled SQL or a tree compiled through the bound
/// dialect compiler.
#[derive(Debug, Clone)]
pub enum QuerySource {
    Compiled(CompiledQuery),
    Statement(Statement),
}

impl From<CompiledQuery> for QuerySource {
    fn from(compiled: CompiledQuery) -> Self {
        QuerySource::Compiled(compiled)
    }
}

impl From<Statement> for QuerySource {
    fn from(statement: Statement) -> Self {
        QuerySource::Statement(statement)
    }
}

impl From<Select> for QuerySource {
    fn from(select: Select) -> Self {
        QuerySource::Statement(select.into())
    }
}

impl From<Insert> for QuerySource {
    fn from(insert: Insert) -> Self {
        QuerySource::Statement(insert.into())
    }
}

impl From<Update> for QuerySource {
    fn from(update: Update) -> Self {
        QuerySource::Statement(update.into())
    }
}

impl From<Delete> for QuerySource {
    fn from(delete: Delete) -> Self {
        QuerySource::Statement(delete.into())
    }
}

impl From<SetOp> for QuerySource {
    fn from(set_op: SetOp) -> Self {
        QuerySource::Statement(set_op.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseMode {
    /// Caller-owned connection; give it back untouched.
    Borrow,
    /// Acquired through pool hooks; hand it to the release hook.
    Release,
    /// Opened by the driver for this scope; close it.
    Close,
}

struct ActiveTransaction {
    connection: Box<dyn Connection>,
    mode: ReleaseMode,
    connection_id: Option<String>,
    previous_autocommit: Option<bool>,
    id: Uuid,
    started_at: Instant,
}

/// Event emission context, split from the executor so event calls can
/// run while a connection field is mutably borrowed.
struct Emitter {
    dialect: &'static str,
    name: String,
    settings: ObservabilitySettings,
}

impl Emitter {
    fn event(&self, kind: EventKind) -> ExecutionEvent {
        ExecutionEvent::new(kind, self.dialect, self.name.clone())
            .with_metadata(self.settings.metadata.clone())
    }

    fn emit(&self, event: ExecutionEvent) {
        self.settings.emit_event(&event);
    }

    fn observe(&self, observation: QueryObservation) {
        self.settings.emit_query(&observation);
    }
}

enum Call<'a> {
    Single { sql: &'a str, params: &'a [Value] },
    Many { sql: &'a str, param_sets: &'a [Vec<Value>] },
}

impl Call<'_> {
    fn sql(&self) -> &str {
        match self {
            Call::Single { sql, .. } => sql,
            Call::Many { sql, .. } => sql,
        }
    }

    fn param_count(&self) -> usize {
        match self {
            Call::Single { params, .. } => params.len(),
            Call::Many { param_sets, .. } => param_sets.iter().map(Vec::len).sum(),
        }
    }
}

fn invoke(
    connection: &mut dyn Connection,
    call: &Call<'_>,
) -> Result<Option<Vec<Row>>, crate::DriverError> {
    match call {
        Call::Single { sql, params } => connection.execute(sql, params).map(|output| output.rows),
        Call::Many { sql, param_sets } => {
            connection.execute_many(sql, param_sets).map(|_| None)
        }
    }
}

/// Runtime side of the pipeline: owns the connection/transaction state
/// machine and wraps every driver call in observability, error
/// normalization, and (for the `*_with_retry` entry points) the retry
/// loop.
///
/// One executor runs at most one operation at a time; callers that need
/// concurrency hold one executor per logical task and share pool hooks.
pub struct Executor {
    compiler: Box<dyn SqlCompiler>,
    owned: Option<Box<dyn Connection>>,
    hooks: Option<PoolHooks>,
    opener: Option<(Box<dyn Driver>, ConnectionSettings)>,
    transaction: Option<ActiveTransaction>,
    closed: bool,
    emitter: Emitter,
    sleeper: Box<dyn Fn(Duration) + Send + Sync>,
}

impl Executor {
    pub fn new(compiler: impl SqlCompiler + 'static) -> Self {
        let dialect = compiler.dialect();
        Self {
            compiler: Box::new(compiler),
            owned: None,
            hooks: None,
            opener: None,
            transaction: None,
            closed: false,
            emitter: Emitter {
                dialect: dialect.id(),
                name: format!("{}-executor", dialect.id()),
                settings: ObservabilitySettings::default(),
            },
            sleeper: Box::new(|delay| std::thread::sleep(delay)),
        }
    }

    /// Bind a caller-owned connection (borrow mode). The executor never
    /// closes it, not even on `close()`.
    pub fn with_connection(mut self, connection: impl Connection + 'static) -> Self {
        self.owned = Some(Box::new(connection));
        self
    }

    pub fn with_boxed_connection(mut self, connection: Box<dyn Connection>) -> Self {
        self.owned = Some(connection);
        self
    }

    pub fn with_pool_hooks(mut self, hooks: PoolHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Open a fresh driver connection per operation (close mode).
    pub fn with_driver(mut self, driver: impl Driver + 'static, settings: ConnectionSettings) -> Self {
        self.opener = Some((Box::new(driver), settings));
        self
    }

    pub fn with_observability(mut self, settings: ObservabilitySettings) -> Self {
        self.emitter.settings = settings;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.emitter.name = name.into();
        self
    }

    /// Replace the backoff sleep; tests inject a recorder here.
    pub fn with_sleep_fn(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn dialect(&self) -> crate::Dialect {
        self.compiler.dialect()
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Compile a query source through the bound dialect compiler.
    pub fn prepare(&self, query: impl Into<QuerySource>) -> Result<CompiledQuery, ExecutionError> {
        match query.into() {
            QuerySource::Compiled(compiled) => Ok(compiled),
            QuerySource::Statement(statement) => {
                self.compiler.compile(&statement).map_err(|error| {
                    ExecutionError::Programming(ErrorDetails::new(
                        self.compiler.dialect().id(),
                        "compile",
                        error.to_string(),
                    ))
                })
            }
        }
    }

    // -------------------------------------------------------------------------
    // Query operations
    // -------------------------------------------------------------------------

    /// Run a query; returns rows when the statement produced a result
    /// set (SELECT, RETURNING/OUTPUT), else `None`.
    pub fn execute(
        &mut self,
        query: impl Into<QuerySource>,
    ) -> Result<Option<Vec<Row>>, ExecutionError> {
        let compiled = self.prepare(query)?;
        self.run(
            Operation::Execute,
            &Call::Single {
                sql: &compiled.sql,
                params: &compiled.params,
            },
        )
    }

    pub fn fetch_all(&mut self, query: impl Into<QuerySource>) -> Result<Vec<Row>, ExecutionError> {
        let compiled = self.prepare(query)?;
        let rows = self.run(
            Operation::FetchAll,
            &Call::Single {
                sql: &compiled.sql,
                params: &compiled.params,
            },
        )?;
        Ok(rows.unwrap_or_default())
    }

    pub fn fetch_one(
        &mut self,
        query: impl Into<QuerySource>,
    ) -> Result<Option<Row>, ExecutionError> {
        let compiled = self.prepare(query)?;
        let rows = self.run(
            Operation::FetchOne,
            &Call::Single {
                sql: &compiled.sql,
                params: &compiled.params,
            },
        )?;
        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }

    pub fn execute_many(
        &mut self,
        sql: &str,
        param_sets: &[Vec<Value>],
    ) -> Result<(), ExecutionError> {
        self.run(Operation::ExecuteMany, &Call::Many { sql, param_sets })?;
        Ok(())
    }

    /// Escape hatch for raw SQL outside the query model.
    pub fn execute_raw(&mut self, sql: &str, params: &[Value]) -> Result<(), ExecutionError> {
        self.run(Operation::ExecuteRaw, &Call::Single { sql, params })?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Retry variants
    // -------------------------------------------------------------------------

    pub fn execute_with_retry(
        &mut self,
        query: impl Into<QuerySource>,
        policy: &RetryPolicy,
    ) -> Result<Option<Vec<Row>>, ExecutionError> {
        let compiled = self.prepare(query)?;
        self.retry_loop(Operation::Execute, policy, |executor| {
            executor.run(
                Operation::Execute,
                &Call::Single {
                    sql: &compiled.sql,
                    params: &compiled.params,
                },
            )
        })
    }

    pub fn fetch_all_with_retry(
        &mut self,
        query: impl Into<QuerySource>,
        policy: &RetryPolicy,
    ) -> Result<Vec<Row>, ExecutionError> {
        let compiled = self.prepare(query)?;
        let rows = self.retry_loop(Operation::FetchAll, policy, |executor| {
            executor.run(
                Operation::FetchAll,
                &Call::Single {
                    sql: &compiled.sql,
                    params: &compiled.params,
                },
            )
        })?;
        Ok(rows.unwrap_or_default())
    }

    pub fn fetch_one_with_retry(
        &mut self,
        query: impl Into<QuerySource>,
        policy: &RetryPolicy,
    ) -> Result<Option<Row>, ExecutionError> {
        let compiled = self.prepare(query)?;
        let rows = self.retry_loop(Operation::FetchOne, policy, |executor| {
            executor.run(
                Operation::FetchOne,
                &Call::Single {
                    sql: &compiled.sql,
                    params: &compiled.params,
                },
            )
        })?;
        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }

    pub fn execute_many_with_retry(
        &mut self,
        sql: &str,
        param_sets: &[Vec<Value>],
        policy: &RetryPolicy,
    ) -> Result<(), ExecutionError> {
        self.retry_loop(Operation::ExecuteMany, policy, |executor| {
            executor.run(Operation::ExecuteMany, &Call::Many { sql, param_sets })
        })?;
        Ok(())
    }

    pub fn execute_raw_with_retry(
        &mut self,
        sql: &str,
        params: &[Value],
        policy: &RetryPolicy,
    ) -> Result<(), ExecutionError> {
        self.retry_loop(Operation::ExecuteRaw, policy, |executor| {
            executor.run(Operation::ExecuteRaw, &Call::Single { sql, params })
        })?;
        Ok(())
    }

    fn retry_loop<T>(
        &mut self,
        operation: Operation,
        policy: &RetryPolicy,
        mut op: impl FnMut(&mut Self) -> Result<T, ExecutionError>,
    ) -> Result<T, ExecutionError> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1u32;
        loop {
            match op(self) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let retryable = error.is_transient();
                    if attempt >= max_attempts || !retryable {
                        let event = self
                            .emitter
                            .event(EventKind::RetryGiveup)
                            .with_operation(operation.as_str())
                            .with_retry(attempt, max_attempts)
                            .with_error(
                                error.kind_name(),
                                error.sqlstate().map(str::to_string),
                                error.to_string(),
                            )
                            .with_retryable(retryable);
                        self.emitter.emit(event);
                        return Err(error);
                    }

                    let delay = policy.delay_after(attempt);
                    let event = self
                        .emitter
                        .event(EventKind::RetryScheduled)
                        .with_operation(operation.as_str())
                        .with_retry(attempt, max_attempts)
                        .with_backoff_ms(delay.as_secs_f64() * 1000.0)
                        .with_error(
                            error.kind_name(),
                            error.sqlstate().map(str::to_string),
                            error.to_string(),
                        )
                        .with_retryable(true);
                    self.emitter.emit(event);

                    (self.sleeper)(delay);
                    attempt += 1;
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Core query runner
    // -------------------------------------------------------------------------

    fn run(
        &mut self,
        operation: Operation,
        call: &Call<'_>,
    ) -> Result<Option<Vec<Row>>, ExecutionError> {
        self.ensure_open()?;

        let query_id = Uuid::new_v4().to_string();
        let transaction_id = self.transaction.as_ref().map(|tx| tx.id.to_string());
        let in_transaction = transaction_id.is_some();

        let mut start = self
            .emitter
            .event(EventKind::QueryStart)
            .with_operation(operation.as_str())
            .with_query_id(query_id.clone());
        if let Some(tx_id) = &transaction_id {
            start = start.with_transaction_id(tx_id.clone());
        }
        self.emitter.emit(start);

        let started = Instant::now();
        let result = self.run_on_connection(operation, call);
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut end = self
            .emitter
            .event(EventKind::QueryEnd)
            .with_operation(operation.as_str())
            .with_query_id(query_id)
            .with_duration_ms(duration_ms);
        if let Some(tx_id) = &transaction_id {
            end = end.with_transaction_id(tx_id.clone());
        }

        let mut observation = QueryObservation {
            dialect: self.emitter.dialect,
            operation: operation.as_str(),
            sql: call.sql().to_string(),
            param_count: call.param_count(),
            duration_ms,
            succeeded: result.is_ok(),
            in_transaction,
            metadata: self.emitter.settings.metadata.clone(),
            error_type: None,
            error_message: None,
        };

        if let Err(error) = &result {
            end = end.with_error(
                error.kind_name(),
                error.sqlstate().map(str::to_string),
                error.to_string(),
            );
            observation.error_type = Some(error.kind_name().to_string());
            observation.error_message = Some(error.to_string());
        }

        self.emitter.emit(end);
        self.emitter.observe(observation);

        result
    }

    fn run_on_connection(
        &mut self,
        operation: Operation,
        call: &Call<'_>,
    ) -> Result<Option<Vec<Row>>, ExecutionError> {
        let dialect = self.compiler.dialect();
        let op = operation.as_str();
        let commit_after = operation.commits_at_statement_boundary();

        // 1. Active transaction pins its connection.
        if let Some(tx) = self.transaction.as_mut() {
            return invoke(tx.connection.as_mut(), call)
                .map_err(|e| normalize_driver_error(dialect, op, e));
        }

        // 2. Caller-owned connection; the caller controls commits.
        if let Some(connection) = self.owned.as_mut() {
            return invoke(connection.as_mut(), call)
                .map_err(|e| normalize_driver_error(dialect, op, e));
        }

        // 3. Pool hooks (release mode).
        if self.hooks.is_some() {
            let connection_id = Uuid::new_v4().to_string();
            let acquired = {
                let emitter = &self.emitter;
                let hooks = self.hooks.as_mut().expect("checked above");
                emitter.emit(
                    emitter
                        .event(EventKind::ConnectionAcquireStart)
                        .with_operation(op)
                        .with_connection_id(connection_id.clone()),
                );
                let acquire_started = Instant::now();
                let acquired = (hooks.acquire)();
                let acquire_ms = acquire_started.elapsed().as_secs_f64() * 1000.0;
                let mut end = emitter
                    .event(EventKind::ConnectionAcquireEnd)
                    .with_operation(op)
                    .with_connection_id(connection_id.clone())
                    .with_duration_ms(acquire_ms);
                if let Err(error) = &acquired {
                    end = end.with_error("ConnectionError", error.sqlstate.clone(), error.message.clone());
                }
                emitter.emit(end);
                acquired
            };

            let mut connection =
                acquired.map_err(|e| normalize_driver_error(dialect, op, e))?;

            let mut result =
                invoke(connection.as_mut(), call).map_err(|e| normalize_driver_error(dialect, op, e));
            if result.is_ok() && commit_after {
                if let Err(error) = connection.commit() {
                    result = Err(normalize_driver_error(dialect, op, error));
                }
            }

            let emitter = &self.emitter;
            let hooks = self.hooks.as_mut().expect("checked above");
            (hooks.release)(connection);
            emitter.emit(
                emitter
                    .event(EventKind::ConnectionRelease)
                    .with_operation(op)
                    .with_connection_id(connection_id),
            );
            return result;
        }

        // 4. Fresh driver connection per operation (close mode).
        if let Some((driver, settings)) = self.opener.as_ref() {
            let emitter = &self.emitter;
            let connection_id = Uuid::new_v4().to_string();
            emitter.emit(
                emitter
                    .event(EventKind::ConnectionAcquireStart)
                    .with_operation(op)
                    .with_connection_id(connection_id.clone()),
            );
            let acquire_started = Instant::now();
            let connected = driver.connect(settings);
            let acquire_ms = acquire_started.elapsed().as_secs_f64() * 1000.0;
            let mut end = emitter
                .event(EventKind::ConnectionAcquireEnd)
                .with_operation(op)
                .with_connection_id(connection_id.clone())
                .with_duration_ms(acquire_ms);
            if let Err(error) = &connected {
                end = end.with_error("ConnectionError", error.sqlstate.clone(), error.message.clone());
            }
            emitter.emit(end);

            let mut connection =
                connected.map_err(|e| normalize_driver_error(dialect, op, e))?;

            let mut result =
                invoke(connection.as_mut(), call).map_err(|e| normalize_driver_error(dialect, op, e));
            if result.is_ok() && commit_after {
                if let Err(error) = connection.commit() {
                    result = Err(normalize_driver_error(dialect, op, error));
                }
            }

            if let Err(error) = connection.close() {
                log::warn!("closing per-operation connection failed: {}", error);
            }
            emitter.emit(
                emitter
                    .event(EventKind::ConnectionClose)
                    .with_operation(op)
                    .with_connection_id(connection_id),
            );
            return result;
        }

        Err(ExecutionError::NoConnectionSource)
    }

    // -------------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------------

    /// Begin a transaction, pinning one connection until `commit` or
    /// `rollback`.
    pub fn begin(&mut self, isolation: Option<&str>) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        if self.transaction.is_some() {
            return Err(ExecutionError::TransactionActive);
        }

        let dialect = self.compiler.dialect();
        let isolation = match isolation {
            Some(level) => Some(self.validate_isolation(level)?),
            None => None,
        };

        let (mut connection, mode, connection_id) = self.checkout_connection(Operation::Begin)?;

        let setup: Result<Option<bool>, ExecutionError> = (|| {
            let previous = connection
                .set_autocommit(false)
                .map_err(|e| normalize_driver_error(dialect, "begin", e))?;

            match &isolation {
                Some(level) if dialect.isolation_in_begin() => {
                    connection
                        .execute(&format!("BEGIN {}", level), &[])
                        .map_err(|e| normalize_driver_error(dialect, "begin", e))?;
                }
                Some(level) => {
                    connection
                        .execute(&dialect.set_isolation_statement(level), &[])
                        .map_err(|e| normalize_driver_error(dialect, "begin", e))?;
                    if let Some(statement) = dialect.begin_statement() {
                        connection
                            .execute(statement, &[])
                            .map_err(|e| normalize_driver_error(dialect, "begin", e))?;
                    }
                }
                None => {
                    if let Some(statement) = dialect.begin_statement() {
                        connection
                            .execute(statement, &[])
                            .map_err(|e| normalize_driver_error(dialect, "begin", e))?;
                    }
                }
            }
            Ok(previous)
        })();

        match setup {
            Ok(previous_autocommit) => {
                let id = Uuid::new_v4();
                let event = self
                    .emitter
                    .event(EventKind::TxnBegin)
                    .with_operation(Operation::Begin.as_str())
                    .with_transaction_id(id.to_string());
                self.emitter.emit(event);

                self.transaction = Some(ActiveTransaction {
                    connection,
                    mode,
                    connection_id,
                    previous_autocommit,
                    id,
                    started_at: Instant::now(),
                });
                Ok(())
            }
            Err(error) => {
                self.give_back(connection, mode, connection_id);
                Err(error)
            }
        }
    }

    pub fn commit(&mut self) -> Result<(), ExecutionError> {
        self.finish_transaction(Operation::Commit)
    }

    pub fn rollback(&mut self) -> Result<(), ExecutionError> {
        self.finish_transaction(Operation::Rollback)
    }

    fn finish_transaction(&mut self, operation: Operation) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        let Some(transaction) = self.transaction.take() else {
            return Err(ExecutionError::NoActiveTransaction);
        };

        let dialect = self.compiler.dialect();
        let ActiveTransaction {
            mut connection,
            mode,
            connection_id,
            previous_autocommit,
            id,
            started_at,
        } = transaction;

        let driver_result = match operation {
            Operation::Commit => connection.commit(),
            _ => connection.rollback(),
        };
        let result =
            driver_result.map_err(|e| normalize_driver_error(dialect, operation.as_str(), e));

        if let Some(previous) = previous_autocommit {
            if let Err(error) = connection.set_autocommit(previous) {
                log::warn!("restoring autocommit failed: {}", error);
            }
        }

        let kind = match operation {
            Operation::Commit => EventKind::TxnCommit,
            _ => EventKind::TxnRollback,
        };
        let mut event = self
            .emitter
            .event(kind)
            .with_operation(operation.as_str())
            .with_transaction_id(id.to_string())
            .with_duration_ms(started_at.elapsed().as_secs_f64() * 1000.0);
        if let Err(error) = &result {
            event = event.with_error(
                error.kind_name(),
                error.sqlstate().map(str::to_string),
                error.to_string(),
            );
        }
        self.emitter.emit(event);

        // Close-on-error: the connection is finalized regardless of the
        // driver outcome, then the failure propagates.
        self.give_back(connection, mode, connection_id);
        result
    }

    pub fn savepoint(&mut self, name: &str) -> Result<(), ExecutionError> {
        let statement = Some(self.compiler.dialect().savepoint_statement(name));
        self.savepoint_operation(Operation::Savepoint, EventKind::SavepointCreate, name, statement)
    }

    pub fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), ExecutionError> {
        let statement = Some(self.compiler.dialect().rollback_to_savepoint_statement(name));
        self.savepoint_operation(
            Operation::RollbackToSavepoint,
            EventKind::SavepointRollback,
            name,
            statement,
        )
    }

    /// Release a savepoint. A no-op statement-wise on dialects without
    /// RELEASE SAVEPOINT, but the event is still emitted.
    pub fn release_savepoint(&mut self, name: &str) -> Result<(), ExecutionError> {
        let statement = self.compiler.dialect().release_savepoint_statement(name);
        self.savepoint_operation(
            Operation::ReleaseSavepoint,
            EventKind::SavepointRelease,
            name,
            statement,
        )
    }

    fn savepoint_operation(
        &mut self,
        operation: Operation,
        kind: EventKind,
        name: &str,
        statement: Option<String>,
    ) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        self.validate_savepoint_name(operation, name)?;
        let dialect = self.compiler.dialect();

        let result = {
            let Some(tx) = self.transaction.as_mut() else {
                return Err(ExecutionError::NoActiveTransaction);
            };
            match &statement {
                Some(statement) => tx
                    .connection
                    .execute(statement, &[])
                    .map(|_| ())
                    .map_err(|e| normalize_driver_error(dialect, operation.as_str(), e)),
                None => Ok(()),
            }
        };

        let transaction_id = self
            .transaction
            .as_ref()
            .map(|tx| tx.id.to_string())
            .unwrap_or_default();
        let mut event = self
            .emitter
            .event(kind)
            .with_operation(operation.as_str())
            .with_transaction_id(transaction_id)
            .with_savepoint_name(name);
        if let Err(error) = &result {
            event = event.with_error(
                error.kind_name(),
                error.sqlstate().map(str::to_string),
                error.to_string(),
            );
        }
        self.emitter.emit(event);

        result
    }

    /// Close the executor: roll back any open transaction (errors are
    /// swallowed), finalize its connection, and refuse further work.
    /// Idempotent.
    pub fn close(&mut self) -> Result<(), ExecutionError> {
        if self.closed {
            return Ok(());
        }

        if let Some(transaction) = self.transaction.take() {
            let ActiveTransaction {
                mut connection,
                mode,
                connection_id,
                previous_autocommit,
                id,
                started_at,
            } = transaction;

            if let Err(error) = connection.rollback() {
                log::warn!("rollback during close failed: {}", error);
            }
            if let Some(previous) = previous_autocommit {
                let _ = connection.set_autocommit(previous);
            }

            let event = self
                .emitter
                .event(EventKind::TxnRollback)
                .with_operation("close")
                .with_transaction_id(id.to_string())
                .with_duration_ms(started_at.elapsed().as_secs_f64() * 1000.0);
            self.emitter.emit(event);

            self.give_back(connection, mode, connection_id);
        }

        self.closed = true;
        log::debug!("executor {} closed", self.emitter.name);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Connection plumbing
    // -------------------------------------------------------------------------

    fn checkout_connection(
        &mut self,
        operation: Operation,
    ) -> Result<(Box<dyn Connection>, ReleaseMode, Option<String>), ExecutionError> {
        let dialect = self.compiler.dialect();
        let op = operation.as_str();

        if let Some(connection) = self.owned.take() {
            return Ok((connection, ReleaseMode::Borrow, None));
        }

        if self.hooks.is_some() {
            let connection_id = Uuid::new_v4().to_string();
            let emitter = &self.emitter;
            let hooks = self.hooks.as_mut().expect("checked above");
            emitter.emit(
                emitter
                    .event(EventKind::ConnectionAcquireStart)
                    .with_operation(op)
                    .with_connection_id(connection_id.clone()),
            );
            let started = Instant::now();
            let acquired = (hooks.acquire)();
            let mut end = emitter
                .event(EventKind::ConnectionAcquireEnd)
                .with_operation(op)
                .with_connection_id(connection_id.clone())
                .with_duration_ms(started.elapsed().as_secs_f64() * 1000.0);
            if let Err(error) = &acquired {
                end = end.with_error("ConnectionError", error.sqlstate.clone(), error.message.clone());
            }
            emitter.emit(end);

            let connection = acquired.map_err(|e| normalize_driver_error(dialect, op, e))?;
            return Ok((connection, ReleaseMode::Release, Some(connection_id)));
        }

        if let Some((driver, settings)) = self.opener.as_ref() {
            let emitter = &self.emitter;
            let connection_id = Uuid::new_v4().to_string();
            emitter.emit(
                emitter
                    .event(EventKind::ConnectionAcquireStart)
                    .with_operation(op)
                    .with_connection_id(connection_id.clone()),
            );
            let started = Instant::now();
            let connected = driver.connect(settings);
            let mut end = emitter
                .event(EventKind::ConnectionAcquireEnd)
                .with_operation(op)
                .with_connection_id(connection_id.clone())
                .with_duration_ms(started.elapsed().as_secs_f64() * 1000.0);
            if let Err(error) = &connected {
                end = end.with_error("ConnectionError", error.sqlstate.clone(), error.message.clone());
            }
            emitter.emit(end);

            let connection = connected.map_err(|e| normalize_driver_error(dialect, op, e))?;
            return Ok((connection, ReleaseMode::Close, Some(connection_id)));
        }

        Err(ExecutionError::NoConnectionSource)
    }

    fn give_back(
        &mut self,
        mut connection: Box<dyn Connection>,
        mode: ReleaseMode,
        connection_id: Option<String>,
    ) {
        match mode {
            ReleaseMode::Borrow => {
                self.owned = Some(connection);
            }
            ReleaseMode::Release => {
                let emitter = &self.emitter;
                if let Some(hooks) = self.hooks.as_mut() {
                    (hooks.release)(connection);
                }
                let mut event = emitter.event(EventKind::ConnectionRelease);
                if let Some(connection_id) = connection_id {
                    event = event.with_connection_id(connection_id);
                }
                emitter.emit(event);
            }
            ReleaseMode::Close => {
                if let Err(error) = connection.close() {
                    log::warn!("closing transaction connection failed: {}", error);
                }
                let mut event = self.emitter.event(EventKind::ConnectionClose);
                if let Some(connection_id) = connection_id {
                    event = event.with_connection_id(connection_id);
                }
                self.emitter.emit(event);
            }
        }
    }

    fn ensure_open(&self) -> Result<(), ExecutionError> {
        if self.closed {
            Err(ExecutionError::Closed)
        } else {
            Ok(())
        }
    }

    fn validate_isolation(&self, level: &str) -> Result<String, ExecutionError> {
        let dialect = self.compiler.dialect();
        let normalized = level.trim().to_uppercase();
        if dialect
            .isolation_levels()
            .iter()
            .any(|candidate| *candidate == normalized)
        {
            Ok(normalized)
        } else {
            Err(ExecutionError::Programming(ErrorDetails::new(
                dialect.id(),
                "begin",
                format!(
                    "invalid isolation level '{}'; expected one of: {}",
                    level,
                    dialect.isolation_levels().join(", ")
                ),
            )))
        }
    }

    fn validate_savepoint_name(
        &self,
        operation: Operation,
        name: &str,
    ) -> Result<(), ExecutionError> {
        // Savepoint names are interpolated into SQL text.
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if valid {
            Ok(())
        } else {
            Err(ExecutionError::Programming(ErrorDetails::new(
                self.compiler.dialect().id(),
                operation.as_str(),
                format!("invalid savepoint name '{}'", name),
            )))
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}
