//! Event stream ordering, query observations, and the shipped adapters
//! wired through a real executor.

use sqlforge_core::{
    CompiledQuery, ConnectionSettings, EventKind, ExecutionEvent, Executor, InMemoryMetrics,
    InMemoryTracing, JsonEventLogger, ObservabilitySettings, QueryObservation, SqliteCompiler,
    Value,
};
use sqlforge_test_support::{FakeDriver, ScriptedOutcome};
use std::io::Write;
use std::sync::{Arc, Mutex};

const INSERT: &str = "INSERT INTO t (v) VALUES (?)";

fn event_log() -> (Arc<Mutex<Vec<ExecutionEvent>>>, ObservabilitySettings) {
    let events: Arc<Mutex<Vec<ExecutionEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let settings = ObservabilitySettings::new()
        .with_metadata("service", "unit-test")
        .with_event_observer(Arc::new(move |event: &ExecutionEvent| {
            sink.lock().unwrap().push(event.clone());
        }));
    (events, settings)
}

#[test]
fn successful_execute_emits_exactly_one_start_and_end() {
    let (events, settings) = event_log();
    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite);
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(settings);

    executor
        .execute(CompiledQuery::new(INSERT, vec![Value::Int(1)]))
        .unwrap();

    let captured = events.lock().unwrap();
    let kinds: Vec<EventKind> = captured.iter().map(|event| event.kind).collect();
    assert_eq!(kinds, vec![EventKind::QueryStart, EventKind::QueryEnd]);

    let start = &captured[0];
    let end = &captured[1];
    assert_eq!(start.operation, Some("execute"));
    assert_eq!(start.query_id, end.query_id);
    assert!(end.success);
    assert!(end.duration_ms.is_some());
    assert_eq!(end.metadata.get("service").map(String::as_str), Some("unit-test"));
}

#[test]
fn failed_execute_reports_error_fields_in_query_end() {
    let (events, settings) = event_log();
    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite)
        .with_outcome(INSERT, ScriptedOutcome::error_with_sqlstate("duplicate key", "23000"));
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(settings);

    executor
        .execute(CompiledQuery::new(INSERT, vec![Value::Int(1)]))
        .unwrap_err();

    let captured = events.lock().unwrap();
    let end = captured
        .iter()
        .find(|event| event.kind == EventKind::QueryEnd)
        .unwrap();
    assert!(!end.success);
    assert_eq!(end.error_type.as_deref(), Some("IntegrityConstraintError"));
    assert_eq!(end.error_code.as_deref(), Some("23000"));
    assert!(end.error_message.is_some());
}

#[test]
fn connection_events_nest_between_query_start_and_end() {
    let (events, settings) = event_log();
    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite);
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_driver(driver, ConnectionSettings::new(":memory:"))
        .with_observability(settings);

    executor
        .execute(CompiledQuery::new(INSERT, vec![Value::Int(1)]))
        .unwrap();

    let kinds: Vec<EventKind> = events.lock().unwrap().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::QueryStart,
            EventKind::ConnectionAcquireStart,
            EventKind::ConnectionAcquireEnd,
            EventKind::ConnectionClose,
            EventKind::QueryEnd,
        ]
    );
}

#[test]
fn operations_are_strictly_sequential_in_the_stream() {
    let (events, settings) = event_log();
    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite);
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(settings);

    executor
        .execute(CompiledQuery::new(INSERT, vec![Value::Int(1)]))
        .unwrap();
    executor
        .fetch_all(CompiledQuery::new("SELECT v FROM t", Vec::new()))
        .unwrap();

    let captured = events.lock().unwrap();
    let first_query_id = captured[0].query_id.clone();
    let second_query_id = captured[2].query_id.clone();
    assert_ne!(first_query_id, second_query_id);
    // All of op 1's events precede all of op 2's.
    assert_eq!(captured[0].query_id, captured[1].query_id);
    assert_eq!(captured[2].query_id, captured[3].query_id);
}

#[test]
fn transaction_events_share_one_transaction_id() {
    let (events, settings) = event_log();
    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite);
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(settings);

    executor.begin(None).unwrap();
    executor.savepoint("sp1").unwrap();
    executor.rollback_to_savepoint("sp1").unwrap();
    executor.release_savepoint("sp1").unwrap();
    executor
        .execute(CompiledQuery::new(INSERT, vec![Value::Int(1)]))
        .unwrap();
    executor.commit().unwrap();

    let captured = events.lock().unwrap();
    let kinds: Vec<EventKind> = captured.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::TxnBegin,
            EventKind::SavepointCreate,
            EventKind::SavepointRollback,
            EventKind::SavepointRelease,
            EventKind::QueryStart,
            EventKind::QueryEnd,
            EventKind::TxnCommit,
        ]
    );

    let begin = &captured[0];
    let commit = captured.last().unwrap();
    assert!(begin.transaction_id.is_some());
    assert_eq!(begin.transaction_id, commit.transaction_id);
    assert!(commit.duration_ms.is_some());

    let savepoint = &captured[1];
    assert_eq!(savepoint.savepoint_name.as_deref(), Some("sp1"));
    assert_eq!(savepoint.transaction_id, begin.transaction_id);

    // Queries inside the transaction carry its id.
    let query_start = &captured[4];
    assert_eq!(query_start.transaction_id, begin.transaction_id);
}

#[test]
fn query_observer_receives_one_observation_per_operation() {
    let observations: Arc<Mutex<Vec<QueryObservation>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = observations.clone();
    let settings = ObservabilitySettings::new()
        .with_metadata("service", "unit-test")
        .with_query_observer(Arc::new(move |observation: &QueryObservation| {
            sink.lock().unwrap().push(observation.clone());
        }));

    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite)
        .with_outcome("SELECT v FROM t", ScriptedOutcome::Rows(vec![vec![Value::Int(1)]]));
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(settings);

    executor
        .execute(CompiledQuery::new(INSERT, vec![Value::Int(1), Value::Int(2)]))
        .unwrap();
    executor
        .fetch_all(CompiledQuery::new("SELECT v FROM t", Vec::new()))
        .unwrap();

    let captured = observations.lock().unwrap();
    assert_eq!(captured.len(), 2);

    let insert = &captured[0];
    assert_eq!(insert.dialect, "sqlite");
    assert_eq!(insert.operation, "execute");
    assert_eq!(insert.sql, INSERT);
    assert_eq!(insert.param_count, 2);
    assert!(insert.succeeded);
    assert!(!insert.in_transaction);
    assert_eq!(insert.metadata.get("service").map(String::as_str), Some("unit-test"));
    assert!(insert.error_type.is_none());

    let select = &captured[1];
    assert_eq!(select.operation, "fetch_all");
}

#[test]
fn metrics_adapter_counts_executor_traffic() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let settings =
        ObservabilitySettings::new().with_event_observer(metrics.clone());

    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite)
        .with_outcome(INSERT, ScriptedOutcome::error_with_sqlstate("duplicate key", "23000"));
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(settings);

    executor
        .execute(CompiledQuery::new(INSERT, vec![Value::Int(1)]))
        .unwrap_err();
    executor
        .fetch_all(CompiledQuery::new("SELECT v FROM t", Vec::new()))
        .unwrap();

    assert_eq!(metrics.counter_total("queries_total"), 2);
    assert_eq!(metrics.counter_total("query_failures_total"), 1);
}

#[test]
fn tracing_adapter_builds_spans_from_executor_events() {
    let tracing = Arc::new(InMemoryTracing::new());
    let settings =
        ObservabilitySettings::new().with_event_observer(tracing.clone());

    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite);
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(settings);

    executor.begin(None).unwrap();
    executor
        .execute(CompiledQuery::new(INSERT, vec![Value::Int(1)]))
        .unwrap();
    executor.commit().unwrap();

    let spans = tracing.completed_spans();
    assert_eq!(spans.len(), 2);
    assert!(spans.iter().any(|span| span.name == "db.query"));
    assert!(spans.iter().any(|span| span.name == "db.transaction"));
}

#[test]
fn json_event_logger_writes_parseable_lines() {
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let buffer = Arc::new(Mutex::new(Vec::new()));
    let logger = Arc::new(JsonEventLogger::new(SharedSink(buffer.clone())));
    let settings = ObservabilitySettings::new().with_event_observer(logger);

    let driver = FakeDriver::new(sqlforge_core::Dialect::Sqlite);
    let mut executor = Executor::new(SqliteCompiler::new())
        .with_connection(driver.connection())
        .with_observability(settings);

    executor
        .execute(CompiledQuery::new(INSERT, vec![Value::Int(1)]))
        .unwrap();

    let bytes = buffer.lock().unwrap().clone();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);

    let start: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    let end: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(start["kind"], "query.start");
    assert_eq!(end["kind"], "query.end");
    assert_eq!(start["dialect"], "sqlite");
}
