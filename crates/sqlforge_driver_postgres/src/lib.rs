//! PostgreSQL driver adapter backed by the synchronous `postgres` crate.
//!
//! CockroachDB speaks the same wire protocol; `PostgresDriver::cockroach()`
//! reuses this adapter under the CockroachDB dialect.

mod driver;

pub use driver::{numbered_placeholders, PostgresConnection, PostgresDriver};
