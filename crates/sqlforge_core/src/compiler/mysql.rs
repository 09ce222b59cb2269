use super::SqlCompiler;
use crate::dialect::Dialect;

/// MySQL compiler: `%s` placeholders, UNION-only set operations,
/// `ON DUPLICATE KEY UPDATE` upserts, table-scoped index statements,
/// no RETURNING.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlCompiler;

impl MySqlCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl SqlCompiler for MySqlCompiler {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }
}
