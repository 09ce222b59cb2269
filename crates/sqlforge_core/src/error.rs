use crate::dialect::Dialect;
use thiserror::Error;

/// Raw error surfaced by a driver adapter.
///
/// Adapters preserve the SQLSTATE-equivalent code when the native library
/// exposes one; normalization consults it before the message text.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    pub sqlstate: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sqlstate: None,
            source: None,
        }
    }

    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Self {
        self.sqlstate = Some(sqlstate.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// Structured context attached to every normalized execution error.
#[derive(Debug)]
pub struct ErrorDetails {
    /// Stable lowercase dialect id (`postgres`, `sqlite`, ...).
    pub dialect: &'static str,
    /// Executor operation that failed (`execute`, `fetch_all`, `commit`, ...).
    pub operation: &'static str,
    pub sqlstate: Option<String>,
    /// Original driver message, untouched.
    pub message: String,
    pub cause: Option<DriverError>,
}

impl ErrorDetails {
    pub fn new(
        dialect: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            dialect,
            operation,
            sqlstate: None,
            message: message.into(),
            cause: None,
        }
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.dialect, self.operation, self.message)?;
        if let Some(code) = &self.sqlstate {
            write!(f, " (sqlstate {})", code)?;
        }
        Ok(())
    }
}

/// Normalized execution errors.
///
/// Every raw driver error is mapped to exactly one of these kinds before
/// it leaves the executor, so callers can pattern-match on kind alone
/// regardless of the backing database.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Two transactions each waited on the other's locks.
    #[error("deadlock detected: {0}")]
    Deadlock(ErrorDetails),

    /// Serializable isolation could not be maintained; safe to retry.
    #[error("serialization failure: {0}")]
    Serialization(ErrorDetails),

    /// A lock could not be obtained within the engine's wait budget.
    #[error("lock timeout: {0}")]
    LockTimeout(ErrorDetails),

    /// The server could not be reached or took too long to answer.
    #[error("connection timeout: {0}")]
    ConnectionTimeout(ErrorDetails),

    /// A constraint was violated (unique, foreign key, check, not null).
    #[error("integrity constraint violation: {0}")]
    Integrity(ErrorDetails),

    /// Malformed SQL or a structurally invalid query tree.
    #[error("programming error: {0}")]
    Programming(ErrorDetails),

    /// Catch-all for driver failures with no more specific class.
    #[error("execution failed: {0}")]
    Execution(ErrorDetails),

    /// The executor was closed; only `close()` is accepted.
    #[error("executor is closed")]
    Closed,

    #[error("no active transaction")]
    NoActiveTransaction,

    #[error("a transaction is already active")]
    TransactionActive,

    /// No owned connection, pool hooks, or driver/settings pair configured.
    #[error("no connection source is configured")]
    NoConnectionSource,
}

impl ExecutionError {
    /// Whether the error is eligible for retry under a policy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExecutionError::Deadlock(_)
                | ExecutionError::Serialization(_)
                | ExecutionError::LockTimeout(_)
                | ExecutionError::ConnectionTimeout(_)
        )
    }

    /// Stable class name, identical across dialects.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExecutionError::Deadlock(_) => "DeadlockError",
            ExecutionError::Serialization(_) => "SerializationError",
            ExecutionError::LockTimeout(_) => "LockTimeoutError",
            ExecutionError::ConnectionTimeout(_) => "ConnectionTimeoutError",
            ExecutionError::Integrity(_) => "IntegrityConstraintError",
            ExecutionError::Programming(_) => "ProgrammingError",
            ExecutionError::Execution(_) => "ExecutionError",
            ExecutionError::Closed
            | ExecutionError::NoActiveTransaction
            | ExecutionError::TransactionActive
            | ExecutionError::NoConnectionSource => "InvalidStateError",
        }
    }

    /// Access the structured details, if the variant carries them.
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            ExecutionError::Deadlock(d)
            | ExecutionError::Serialization(d)
            | ExecutionError::LockTimeout(d)
            | ExecutionError::ConnectionTimeout(d)
            | ExecutionError::Integrity(d)
            | ExecutionError::Programming(d)
            | ExecutionError::Execution(d) => Some(d),
            ExecutionError::Closed
            | ExecutionError::NoActiveTransaction
            | ExecutionError::TransactionActive
            | ExecutionError::NoConnectionSource => None,
        }
    }

    pub fn sqlstate(&self) -> Option<&str> {
        self.details().and_then(|d| d.sqlstate.as_deref())
    }
}

const DEADLOCK_CODES: &[&str] = &["40P01", "1213"];
const SERIALIZATION_CODES: &[&str] = &["40001"];
const LOCK_TIMEOUT_CODES: &[&str] = &["55P03", "57014", "1205"];

const DEADLOCK_PHRASES: &[&str] = &["deadlock"];
const SERIALIZATION_PHRASES: &[&str] = &["serialization failure", "could not serialize"];
const LOCK_TIMEOUT_PHRASES: &[&str] = &["lock wait timeout", "database is locked", "lock timeout"];
const CONNECTION_TIMEOUT_PHRASES: &[&str] = &[
    "connection timed out",
    "timed out",
    "login timeout",
    "could not connect",
    "connection refused",
];
const INTEGRITY_PHRASES: &[&str] = &["unique constraint", "foreign key constraint", "duplicate key"];
const PROGRAMMING_PHRASES: &[&str] = &["syntax error", "invalid identifier", "unknown column"];

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| haystack.contains(p))
}

/// Map a raw driver error to its normalized kind.
///
/// The SQLSTATE-equivalent code wins over message matching; message
/// phrases are checked against the lowercased text in the order of the
/// taxonomy (transient kinds first, so "lock wait timeout" classifies as a
/// lock timeout rather than a generic timeout).
pub fn normalize_driver_error(
    dialect: Dialect,
    operation: &'static str,
    error: DriverError,
) -> ExecutionError {
    let message_lower = error.message.to_lowercase();
    let details = ErrorDetails {
        dialect: dialect.id(),
        operation,
        sqlstate: error.sqlstate.clone(),
        message: error.message.clone(),
        cause: Some(error),
    };

    if let Some(code) = details.sqlstate.as_deref() {
        if DEADLOCK_CODES.contains(&code) {
            return ExecutionError::Deadlock(details);
        }
        if SERIALIZATION_CODES.contains(&code) {
            return ExecutionError::Serialization(details);
        }
        if LOCK_TIMEOUT_CODES.contains(&code) {
            return ExecutionError::LockTimeout(details);
        }
        if code.starts_with("23") {
            return ExecutionError::Integrity(details);
        }
        if code.starts_with("42") {
            return ExecutionError::Programming(details);
        }
    }

    if contains_any(&message_lower, DEADLOCK_PHRASES) {
        return ExecutionError::Deadlock(details);
    }
    if contains_any(&message_lower, SERIALIZATION_PHRASES) {
        return ExecutionError::Serialization(details);
    }
    if contains_any(&message_lower, LOCK_TIMEOUT_PHRASES) {
        return ExecutionError::LockTimeout(details);
    }
    if contains_any(&message_lower, CONNECTION_TIMEOUT_PHRASES) {
        return ExecutionError::ConnectionTimeout(details);
    }
    if contains_any(&message_lower, INTEGRITY_PHRASES) {
        return ExecutionError::Integrity(details);
    }
    if contains_any(&message_lower, PROGRAMMING_PHRASES) {
        return ExecutionError::Programming(details);
    }

    ExecutionError::Execution(details)
}

/// Structural error raised while lowering a query tree to SQL.
///
/// These are always programming errors; they are never retryable.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{dialect} does not support {feature}")]
    UnsupportedFeature {
        dialect: &'static str,
        feature: String,
    },

    #[error("{dialect} cannot compile {node} nodes")]
    UnsupportedNode {
        dialect: &'static str,
        node: &'static str,
    },

    #[error("invalid {node}: {message}")]
    InvalidNode {
        node: &'static str,
        message: String,
    },
}

impl CompileError {
    pub fn unsupported(dialect: Dialect, feature: impl Into<String>) -> Self {
        CompileError::UnsupportedFeature {
            dialect: dialect.display_name(),
            feature: feature.into(),
        }
    }

    pub fn invalid(node: &'static str, message: impl Into<String>) -> Self {
        CompileError::InvalidNode {
            node,
            message: message.into(),
        }
    }
}

impl From<CompileError> for ExecutionError {
    fn from(error: CompileError) -> Self {
        let message = error.to_string();
        let node = match &error {
            CompileError::UnsupportedNode { node, .. } => *node,
            CompileError::InvalidNode { node, .. } => *node,
            CompileError::UnsupportedFeature { .. } => "Statement",
        };
        let mut details = ErrorDetails::new("compile", "compile", message);
        details.cause = Some(DriverError::new(format!("{}: {}", node, error)));
        ExecutionError::Programming(details)
    }
}
