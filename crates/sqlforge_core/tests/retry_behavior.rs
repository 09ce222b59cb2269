//! Retry engine semantics at the executor surface: attempt counts,
//! backoff schedule, and the retry event stream.

use sqlforge_core::{
    CompiledQuery, EventKind, ExecutionError, ExecutionEvent, Executor, ObservabilitySettings,
    RetryPolicy, SqliteCompiler, Value,
};
use sqlforge_test_support::{FakeDriver, ScriptedOutcome};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const INSERT: &str = "INSERT INTO t (v) VALUES (?)";

fn compiled() -> CompiledQuery {
    CompiledQuery::new(INSERT, vec![Value::Int(1)])
}

fn capturing_settings(events: &Arc<Mutex<Vec<ExecutionEvent>>>) -> ObservabilitySettings {
    let sink = events.clone();
    ObservabilitySettings::new().with_event_observer(Arc::new(move |event: &ExecutionEvent| {
        sink.lock().unwrap().push(event.clone());
    }))
}

fn kinds(events: &Arc<Mutex<Vec<ExecutionEvent>>>) -> Vec<EventKind> {
    events.lock().unwrap().iter().map(|event| event.kind).collect()
}

#[test]
fn transient_failures_are_retried_to_success() {
    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite)
        .with_outcome(INSERT, ScriptedOutcome::error_with_sqlstate("deadlock detected", "40P01"))
        .with_outcome(INSERT, ScriptedOutcome::error_with_sqlstate("deadlock detected", "40P01"))
        .with_outcome(INSERT, ScriptedOutcome::Affected(1));

    let events = Arc::new(Mutex::new(Vec::new()));
    let slept = Arc::new(Mutex::new(Vec::new()));
    let sleep_log = slept.clone();

    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(capturing_settings(&events))
        .with_sleep_fn(move |delay| sleep_log.lock().unwrap().push(delay));

    let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(10));
    let result = executor.execute_with_retry(compiled(), &policy).unwrap();
    assert_eq!(result, None);

    // One driver call per attempt.
    assert_eq!(driver.stats().executed_sql().len(), 3);
    // Deterministic exponential backoff, no jitter.
    assert_eq!(
        *slept.lock().unwrap(),
        vec![Duration::from_millis(10), Duration::from_millis(20)]
    );

    let kinds = kinds(&events);
    assert_eq!(
        kinds,
        vec![
            EventKind::QueryStart,
            EventKind::QueryEnd,
            EventKind::RetryScheduled,
            EventKind::QueryStart,
            EventKind::QueryEnd,
            EventKind::RetryScheduled,
            EventKind::QueryStart,
            EventKind::QueryEnd,
        ]
    );

    let captured = events.lock().unwrap();
    let final_end = captured
        .iter()
        .filter(|event| event.kind == EventKind::QueryEnd)
        .next_back()
        .unwrap();
    assert!(final_end.success);

    let scheduled: Vec<&ExecutionEvent> = captured
        .iter()
        .filter(|event| event.kind == EventKind::RetryScheduled)
        .collect();
    assert_eq!(scheduled.len(), 2);
    assert_eq!(scheduled[0].retry_attempt, Some(1));
    assert_eq!(scheduled[0].max_attempts, Some(3));
    assert_eq!(scheduled[0].backoff_ms, Some(10.0));
    assert_eq!(scheduled[0].error_type.as_deref(), Some("DeadlockError"));
    assert_eq!(scheduled[0].retryable, Some(true));
    assert_eq!(scheduled[1].retry_attempt, Some(2));
    assert_eq!(scheduled[1].backoff_ms, Some(20.0));
}

#[test]
fn non_transient_failures_never_retry() {
    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite)
        .with_outcome(INSERT, ScriptedOutcome::error_with_sqlstate("duplicate key", "23000"));

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(capturing_settings(&events))
        .with_sleep_fn(|_| panic!("non-transient errors must not sleep"));

    let error = executor
        .execute_with_retry(compiled(), &RetryPolicy::new(5))
        .unwrap_err();
    assert!(matches!(error, ExecutionError::Integrity(_)));
    assert_eq!(driver.stats().executed_sql().len(), 1);

    let kinds = kinds(&events);
    assert!(kinds.contains(&EventKind::RetryGiveup));
    assert!(!kinds.contains(&EventKind::RetryScheduled));

    let captured = events.lock().unwrap();
    let giveup = captured
        .iter()
        .find(|event| event.kind == EventKind::RetryGiveup)
        .unwrap();
    assert_eq!(giveup.retry_attempt, Some(1));
    assert_eq!(giveup.retryable, Some(false));
    assert_eq!(giveup.error_type.as_deref(), Some("IntegrityConstraintError"));
}

#[test]
fn transient_failures_exhaust_exactly_max_attempts() {
    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite);
    for _ in 0..3 {
        driver.push_outcome(
            INSERT,
            ScriptedOutcome::error_with_sqlstate("deadlock detected", "40P01"),
        );
    }

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(capturing_settings(&events))
        .with_sleep_fn(|_| {});

    let policy = RetryPolicy::new(3).with_base_delay(Duration::ZERO);
    let error = executor.execute_with_retry(compiled(), &policy).unwrap_err();
    assert!(matches!(error, ExecutionError::Deadlock(_)));
    assert_eq!(driver.stats().executed_sql().len(), 3);

    let captured = events.lock().unwrap();
    let giveup = captured
        .iter()
        .find(|event| event.kind == EventKind::RetryGiveup)
        .unwrap();
    assert_eq!(giveup.retry_attempt, Some(3));
    assert_eq!(giveup.retryable, Some(true));
}

#[test]
fn fetch_and_batch_variants_share_the_retry_loop() {
    let select = "SELECT v FROM t";
    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite)
        .with_outcome(select, ScriptedOutcome::error("database is locked"))
        .with_outcome(select, ScriptedOutcome::Rows(vec![vec![Value::Int(5)]]));

    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_sleep_fn(|_| {});

    let policy = RetryPolicy::new(2).with_base_delay(Duration::ZERO);
    let rows = executor
        .fetch_all_with_retry(CompiledQuery::new(select, Vec::new()), &policy)
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Int(5)]]);
    assert_eq!(driver.stats().executed_sql().len(), 2);

    driver.push_outcome(
        INSERT,
        ScriptedOutcome::error_with_sqlstate("serialization failure", "40001"),
    );
    executor
        .execute_many_with_retry(
            INSERT,
            &[vec![Value::Int(1)], vec![Value::Int(2)]],
            &policy,
        )
        .unwrap();
    assert_eq!(driver.stats().executed_many.len(), 2);
}

#[test]
fn default_policy_values() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.base_delay, Duration::from_millis(50));
    assert_eq!(policy.max_delay, Duration::from_secs(1));
    assert_eq!(policy.backoff_multiplier, 2.0);
}
