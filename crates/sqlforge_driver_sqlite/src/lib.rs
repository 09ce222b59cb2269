//! SQLite driver adapter backed by `rusqlite`.

mod driver;

pub use driver::{SqliteConnection, SqliteDriver};
