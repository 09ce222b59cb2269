//! Test doubles for the executor and driver boundary.

mod fake_driver;

pub use fake_driver::{FakeConnection, FakeDriver, FakeStats, ScriptedOutcome};
