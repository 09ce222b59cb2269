use super::SqlCompiler;
use crate::dialect::Dialect;

/// SQLite compiler.
///
/// Diverges from the shared emission only in the `excluded` spelling;
/// the remaining differences (no INTERSECT ALL, no CASCADE, single-action
/// ALTER) fall out of the feature matrix.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteCompiler;

impl SqliteCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl SqlCompiler for SqliteCompiler {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    // SQLite documents the pseudo-table in lowercase.
    fn excluded_keyword(&self) -> &'static str {
        "excluded"
    }
}
