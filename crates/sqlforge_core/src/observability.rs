use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Fixed vocabulary of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    QueryStart,
    QueryEnd,
    TxnBegin,
    TxnCommit,
    TxnRollback,
    SavepointCreate,
    SavepointRollback,
    SavepointRelease,
    ConnectionAcquireStart,
    ConnectionAcquireEnd,
    ConnectionRelease,
    ConnectionClose,
    RetryScheduled,
    RetryGiveup,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::QueryStart => "query.start",
            EventKind::QueryEnd => "query.end",
            EventKind::TxnBegin => "txn.begin",
            EventKind::TxnCommit => "txn.commit",
            EventKind::TxnRollback => "txn.rollback",
            EventKind::SavepointCreate => "txn.savepoint.create",
            EventKind::SavepointRollback => "txn.savepoint.rollback",
            EventKind::SavepointRelease => "txn.savepoint.release",
            EventKind::ConnectionAcquireStart => "connection.acquire.start",
            EventKind::ConnectionAcquireEnd => "connection.acquire.end",
            EventKind::ConnectionRelease => "connection.release",
            EventKind::ConnectionClose => "connection.close",
            EventKind::RetryScheduled => "retry.scheduled",
            EventKind::RetryGiveup => "retry.giveup",
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured lifecycle event.
///
/// Emitted synchronously, inline with the originating executor call, in
/// program order.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub dialect: &'static str,
    pub executor: String,
    pub success: bool,
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savepoint_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ExecutionEvent {
    pub fn new(kind: EventKind, dialect: &'static str, executor: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            dialect,
            executor: executor.into(),
            success: true,
            metadata: BTreeMap::new(),
            operation: None,
            query_id: None,
            transaction_id: None,
            savepoint_name: None,
            connection_id: None,
            duration_ms: None,
            retry_attempt: None,
            max_attempts: None,
            backoff_ms: None,
            error_type: None,
            error_code: None,
            error_message: None,
            retryable: None,
        }
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_savepoint_name(mut self, name: impl Into<String>) -> Self {
        self.savepoint_name = Some(name.into());
        self
    }

    pub fn with_connection_id(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_retry(mut self, attempt: u32, max_attempts: u32) -> Self {
        self.retry_attempt = Some(attempt);
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff_ms(mut self, backoff_ms: f64) -> Self {
        self.backoff_ms = Some(backoff_ms);
        self
    }

    pub fn with_error(
        mut self,
        error_type: impl Into<String>,
        error_code: Option<String>,
        error_message: impl Into<String>,
    ) -> Self {
        self.success = false;
        self.error_type = Some(error_type.into());
        self.error_code = error_code;
        self.error_message = Some(error_message.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// Sorted-key JSON object for log sinks.
    pub fn to_json_value(&self) -> serde_json::Value {
        // serde_json maps are BTreeMap-backed, so round-tripping through
        // Value sorts the keys.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Narrow per-query payload, emitted once per operation at completion.
#[derive(Debug, Clone)]
pub struct QueryObservation {
    pub dialect: &'static str,
    pub operation: &'static str,
    pub sql: String,
    pub param_count: usize,
    pub duration_ms: f64,
    pub succeeded: bool,
    pub in_transaction: bool,
    pub metadata: BTreeMap<String, String>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

/// Sink for lifecycle events.
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

impl<F: Fn(&ExecutionEvent) + Send + Sync> EventObserver for F {
    fn on_event(&self, event: &ExecutionEvent) {
        self(event)
    }
}

/// Sink for per-query observations.
pub trait QueryObserver: Send + Sync {
    fn on_query(&self, observation: &QueryObservation);
}

impl<F: Fn(&QueryObservation) + Send + Sync> QueryObserver for F {
    fn on_query(&self, observation: &QueryObservation) {
        self(observation)
    }
}

/// Observer wiring passed at executor construction.
///
/// Observers are plain vectors invoked left-to-right; composing is
/// appending. `metadata` is attached verbatim to every event and
/// observation.
#[derive(Clone, Default)]
pub struct ObservabilitySettings {
    pub metadata: BTreeMap<String, String>,
    pub query_observers: Vec<Arc<dyn QueryObserver>>,
    pub event_observers: Vec<Arc<dyn EventObserver>>,
}

impl ObservabilitySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_query_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.query_observers.push(observer);
        self
    }

    pub fn with_event_observer(mut self, observer: Arc<dyn EventObserver>) -> Self {
        self.event_observers.push(observer);
        self
    }

    pub fn emit_event(&self, event: &ExecutionEvent) {
        for observer in &self.event_observers {
            observer.on_event(event);
        }
    }

    pub fn emit_query(&self, observation: &QueryObservation) {
        for observer in &self.query_observers {
            observer.on_query(observation);
        }
    }
}

impl std::fmt::Debug for ObservabilitySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservabilitySettings")
            .field("metadata", &self.metadata)
            .field("query_observers", &self.query_observers.len())
            .field("event_observers", &self.event_observers.len())
            .finish()
    }
}

// =============================================================================
// In-memory metrics adapter
// =============================================================================

const LABEL_MISSING: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MetricKey {
    name: &'static str,
    labels: BTreeMap<String, String>,
}

#[derive(Default)]
struct MetricsState {
    counters: IndexMap<MetricKey, u64>,
    histograms: IndexMap<MetricKey, Vec<f64>>,
}

/// Event-driven counters and histograms for bootstrapping dashboards.
///
/// Labels are `{dialect, executor, operation, event, error_type}` with a
/// `"none"` sentinel for absent values.
#[derive(Default)]
pub struct InMemoryMetrics {
    state: Mutex<MetricsState>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn labels_for(event: &ExecutionEvent) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert("dialect".to_string(), event.dialect.to_string());
        labels.insert("executor".to_string(), event.executor.clone());
        labels.insert(
            "operation".to_string(),
            event
                .operation
                .map(str::to_string)
                .unwrap_or_else(|| LABEL_MISSING.to_string()),
        );
        labels.insert("event".to_string(), event.kind.as_str().to_string());
        labels.insert(
            "error_type".to_string(),
            event
                .error_type
                .clone()
                .unwrap_or_else(|| LABEL_MISSING.to_string()),
        );
        labels
    }

    fn bump_counter(state: &mut MetricsState, name: &'static str, labels: &BTreeMap<String, String>) {
        let key = MetricKey {
            name,
            labels: labels.clone(),
        };
        *state.counters.entry(key).or_insert(0) += 1;
    }

    fn record_histogram(
        state: &mut MetricsState,
        name: &'static str,
        labels: &BTreeMap<String, String>,
        value: f64,
    ) {
        let key = MetricKey {
            name,
            labels: labels.clone(),
        };
        state.histograms.entry(key).or_default().push(value);
    }

    pub fn counter_value(&self, name: &str, labels: &BTreeMap<String, String>) -> u64 {
        let state = self.state.lock().expect("metrics state poisoned");
        state
            .counters
            .iter()
            .find(|(key, _)| key.name == name && &key.labels == labels)
            .map(|(_, value)| *value)
            .unwrap_or(0)
    }

    pub fn histogram_values(&self, name: &str, labels: &BTreeMap<String, String>) -> Vec<f64> {
        let state = self.state.lock().expect("metrics state poisoned");
        state
            .histograms
            .iter()
            .find(|(key, _)| key.name == name && &key.labels == labels)
            .map(|(_, values)| values.clone())
            .unwrap_or_default()
    }

    /// Total across all label sets, for coarse assertions.
    pub fn counter_total(&self, name: &str) -> u64 {
        let state = self.state.lock().expect("metrics state poisoned");
        state
            .counters
            .iter()
            .filter(|(key, _)| key.name == name)
            .map(|(_, value)| *value)
            .sum()
    }
}

impl EventObserver for InMemoryMetrics {
    fn on_event(&self, event: &ExecutionEvent) {
        let labels = Self::labels_for(event);
        let mut state = self.state.lock().expect("metrics state poisoned");

        match event.kind {
            EventKind::QueryEnd => {
                Self::bump_counter(&mut state, "queries_total", &labels);
                if !event.success {
                    Self::bump_counter(&mut state, "query_failures_total", &labels);
                }
                if let Some(duration) = event.duration_ms {
                    Self::record_histogram(&mut state, "query_duration_ms", &labels, duration);
                }
            }
            EventKind::RetryScheduled => {
                Self::bump_counter(&mut state, "retries_total", &labels);
            }
            EventKind::RetryGiveup => {
                Self::bump_counter(&mut state, "retry_giveups_total", &labels);
            }
            EventKind::TxnCommit | EventKind::TxnRollback => {
                if let Some(duration) = event.duration_ms {
                    Self::record_histogram(&mut state, "txn_duration_ms", &labels, duration);
                }
            }
            EventKind::ConnectionAcquireEnd => {
                if let Some(duration) = event.duration_ms {
                    Self::record_histogram(&mut state, "connection_acquire_ms", &labels, duration);
                }
            }
            _ => {}
        }
    }
}

// =============================================================================
// In-memory tracing adapter
// =============================================================================

/// Completed span assembled from paired start/end events.
#[derive(Debug, Clone)]
pub struct Span {
    pub name: &'static str,
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub events: Vec<String>,
}

#[derive(Default)]
struct TracingState {
    open_queries: IndexMap<String, Span>,
    open_transactions: IndexMap<String, Span>,
    completed: Vec<Span>,
    unscoped: Vec<String>,
}

/// Builds `db.query` and `db.transaction` spans from the event stream.
///
/// Non-span events attach to the enclosing span when one is open for
/// their transaction or query id, else they are recorded unscoped.
#[derive(Default)]
pub struct InMemoryTracing {
    state: Mutex<TracingState>,
}

impl InMemoryTracing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_spans(&self) -> Vec<Span> {
        self.state
            .lock()
            .expect("tracing state poisoned")
            .completed
            .clone()
    }

    pub fn unscoped_events(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("tracing state poisoned")
            .unscoped
            .clone()
    }

    fn attach_or_record(state: &mut TracingState, event: &ExecutionEvent) {
        if let Some(tx_id) = &event.transaction_id {
            if let Some(span) = state.open_transactions.get_mut(tx_id) {
                span.events.push(event.kind.as_str().to_string());
                return;
            }
        }
        if let Some(query_id) = &event.query_id {
            if let Some(span) = state.open_queries.get_mut(query_id) {
                span.events.push(event.kind.as_str().to_string());
                return;
            }
        }
        state.unscoped.push(event.kind.as_str().to_string());
    }
}

impl EventObserver for InMemoryTracing {
    fn on_event(&self, event: &ExecutionEvent) {
        let mut state = self.state.lock().expect("tracing state poisoned");

        match event.kind {
            EventKind::QueryStart => {
                if let Some(query_id) = &event.query_id {
                    let mut attributes = BTreeMap::new();
                    attributes.insert("db.query_id".to_string(), query_id.clone().into());
                    attributes.insert("db.dialect".to_string(), event.dialect.into());
                    if let Some(operation) = event.operation {
                        attributes.insert("db.operation".to_string(), operation.into());
                    }
                    state.open_queries.insert(
                        query_id.clone(),
                        Span {
                            name: "db.query",
                            attributes,
                            events: Vec::new(),
                        },
                    );
                }
            }
            EventKind::QueryEnd => {
                let Some(query_id) = &event.query_id else {
                    return;
                };
                if let Some(mut span) = state.open_queries.shift_remove(query_id) {
                    span.attributes
                        .insert("db.success".to_string(), event.success.into());
                    if let Some(duration) = event.duration_ms {
                        span.attributes
                            .insert("db.duration_ms".to_string(), duration.into());
                    }
                    if let Some(error_type) = &event.error_type {
                        span.attributes
                            .insert("db.error_type".to_string(), error_type.clone().into());
                    }
                    state.completed.push(span);
                } else {
                    Self::attach_or_record(&mut state, event);
                }
            }
            EventKind::TxnBegin => {
                if let Some(tx_id) = &event.transaction_id {
                    let mut attributes = BTreeMap::new();
                    attributes.insert("db.transaction_id".to_string(), tx_id.clone().into());
                    attributes.insert("db.dialect".to_string(), event.dialect.into());
                    state.open_transactions.insert(
                        tx_id.clone(),
                        Span {
                            name: "db.transaction",
                            attributes,
                            events: Vec::new(),
                        },
                    );
                }
            }
            EventKind::TxnCommit | EventKind::TxnRollback => {
                let Some(tx_id) = &event.transaction_id else {
                    return;
                };
                if let Some(mut span) = state.open_transactions.shift_remove(tx_id) {
                    span.attributes
                        .insert("db.outcome".to_string(), event.kind.as_str().into());
                    if let Some(duration) = event.duration_ms {
                        span.attributes
                            .insert("db.duration_ms".to_string(), duration.into());
                    }
                    state.completed.push(span);
                } else {
                    Self::attach_or_record(&mut state, event);
                }
            }
            _ => Self::attach_or_record(&mut state, event),
        }
    }
}

// =============================================================================
// JSON-line event logger
// =============================================================================

/// Writes one sorted-key JSON object per event to the supplied sink.
pub struct JsonEventLogger {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl JsonEventLogger {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }
}

impl EventObserver for JsonEventLogger {
    fn on_event(&self, event: &ExecutionEvent) {
        let value = event.to_json_value();
        let mut sink = self.sink.lock().expect("log sink poisoned");
        if writeln!(sink, "{}", value).is_err() {
            log::warn!("json event logger sink rejected a write");
        }
    }
}
