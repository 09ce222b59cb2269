//! Database-agnostic query construction and execution toolkit.
//!
//! Callers build a [`Statement`] tree, lower it through a dialect
//! compiler into a [`CompiledQuery`] (SQL text plus an ordered parameter
//! list), and run it through an [`Executor`] that normalizes driver
//! errors, applies retry policies to transient failures, manages
//! transactions and savepoints, and emits structured lifecycle events.
//!
//! Driver adapters live in sibling crates (`sqlforge_driver_sqlite`,
//! `sqlforge_driver_postgres`, `sqlforge_driver_mysql`) and plug in
//! through the [`Driver`]/[`Connection`] traits.

mod ast;
mod compiled_query;
mod compiler;
mod connect;
mod dialect;
mod error;
mod executor;
mod observability;
mod retry;
mod traits;
mod value;

pub use ast::{
    AlterAction, AlterTable, BinaryOperator, Column, ColumnDef, ConflictTarget, CreateIndex,
    CreateTable, Cte, Delete, DropIndex, DropTable, Expr, Insert, Join, JoinType, LockClause,
    LockMode, OrderBy, OrderDirection, OverClause, ReferentialAction, ReturningClause, Select,
    SetOp, SetOperator, Statement, Subquery, Table, TableConstraint, TableRef, TopClause,
    UnaryOperator, Update, UpsertClause, WhenThen,
};
pub use compiled_query::CompiledQuery;
pub use compiler::{
    CockroachDbCompiler, MariaDbCompiler, MsSqlCompiler, MySqlCompiler, OracleCompiler, ParamList,
    PostgresCompiler, SqlCompiler, SqliteCompiler,
};
pub use connect::{ConnectionSettings, ConnectionTarget};
pub use dialect::{Dialect, DialectFeatures, PlaceholderStyle, UpsertStrategy};
pub use error::{
    normalize_driver_error, CompileError, DriverError, ErrorDetails, ExecutionError,
};
pub use executor::{Executor, Operation, QuerySource};
pub use observability::{
    EventKind, EventObserver, ExecutionEvent, InMemoryMetrics, InMemoryTracing, JsonEventLogger,
    ObservabilitySettings, QueryObservation, QueryObserver, Span,
};
pub use retry::{run_with_retry, RetryPolicy};
pub use traits::{Connection, Driver, PoolHooks, QueryOutput, Row};
pub use value::Value;

pub use chrono;
pub use uuid;
