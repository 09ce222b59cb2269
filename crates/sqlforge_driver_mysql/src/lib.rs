//! MySQL driver adapter backed by the `mysql` crate.
//!
//! MariaDB shares the wire protocol; `MySqlDriver::mariadb()` reuses the
//! adapter under the MariaDB dialect.

mod driver;

pub use driver::{MySqlConnection, MySqlDriver};
