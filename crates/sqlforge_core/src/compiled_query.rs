use crate::Value;

/// Dialect-correct SQL text plus its bound parameters.
///
/// `params` is ordered by the first textual appearance of each
/// placeholder; compilers never inline literal values into `sql`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl CompiledQuery {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

impl std::fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{} params]", self.sql, self.params.len())
    }
}
