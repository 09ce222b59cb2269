use super::{ParamList, SqlCompiler};
use crate::dialect::Dialect;
use crate::Value;

/// CockroachDB compiler.
///
/// Postgres-shaped output, with one distribution-specific quirk: string
/// parameters are wrapped in `CAST(%s AS STRING)` so the optimizer does
/// not have to guess placeholder types.
#[derive(Debug, Default, Clone, Copy)]
pub struct CockroachDbCompiler;

impl CockroachDbCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl SqlCompiler for CockroachDbCompiler {
    fn dialect(&self) -> Dialect {
        Dialect::CockroachDb
    }

    fn bind(&self, value: &Value, params: &mut ParamList) -> String {
        let position = params.push(value.clone());
        let placeholder = self.dialect().placeholder_style().render(position);
        match value {
            Value::Text(_) => format!("CAST({} AS STRING)", placeholder),
            _ => placeholder,
        }
    }
}
