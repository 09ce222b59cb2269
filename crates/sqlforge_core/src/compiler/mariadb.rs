use super::SqlCompiler;
use crate::dialect::Dialect;

/// MariaDB compiler.
///
/// Shares the MySQL upsert strategy but keeps `?` placeholders, the full
/// set-operation family, RETURNING, and cascading drops.
#[derive(Debug, Default, Clone, Copy)]
pub struct MariaDbCompiler;

impl MariaDbCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl SqlCompiler for MariaDbCompiler {
    fn dialect(&self) -> Dialect {
        Dialect::MariaDb
    }
}
