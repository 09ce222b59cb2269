use super::{validate_insert_shape, validate_upsert, ParamList, SqlCompiler};
use crate::ast::Insert;
use crate::dialect::Dialect;
use crate::error::CompileError;

/// Oracle compiler: `:n` placeholders, MINUS instead of EXCEPT,
/// fetch-first row limiting, `INSERT ALL` for multi-row payloads,
/// MERGE-based upserts, aliases without `AS`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OracleCompiler;

impl OracleCompiler {
    pub fn new() -> Self {
        Self
    }

    fn column_names(insert: &Insert) -> Vec<String> {
        insert.columns.iter().map(|c| c.name.clone()).collect()
    }
}

impl SqlCompiler for OracleCompiler {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    fn except_keyword(&self) -> &'static str {
        "MINUS"
    }

    // Oracle rejects AS before table and subquery aliases.
    fn alias_keyword(&self) -> &'static str {
        " "
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>, _has_order_by: bool) -> String {
        match (limit, offset) {
            (Some(limit), Some(offset)) => {
                format!(" OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", offset, limit)
            }
            (Some(limit), None) => format!(" FETCH FIRST {} ROWS ONLY", limit),
            (None, Some(offset)) => format!(" OFFSET {} ROWS", offset),
            (None, None) => String::new(),
        }
    }

    fn emit_rows_fallback(
        &self,
        insert: &Insert,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        if insert.returning.is_some() {
            return Err(CompileError::unsupported(self.dialect(), "RETURNING"));
        }
        let rows = insert.rows.as_ref().expect("rows payload checked by caller");
        let table = self.table_name(&insert.table);
        let columns = Self::column_names(insert).join(", ");

        let mut parts = vec!["INSERT ALL".to_string()];
        for row in rows {
            parts.push(format!(
                "INTO {} ({}) VALUES ({})",
                table,
                columns,
                self.visit_expr_list(row, params)?
            ));
        }
        parts.push("SELECT 1 FROM dual".to_string());
        Ok(parts.join(" "))
    }

    fn emit_merge_upsert(
        &self,
        insert: &Insert,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        validate_insert_shape(insert)?;
        let upsert = insert.upsert.as_ref().expect("upsert checked by caller");
        validate_upsert(upsert)?;

        if insert.rows.is_some() {
            return Err(CompileError::invalid(
                "Insert",
                "MERGE upsert does not support multi-row rows payload",
            ));
        }
        let values = insert.values.as_ref().expect("values checked above");

        let Some(conflict_target) = &upsert.conflict_target else {
            return Err(CompileError::invalid(
                "Upsert",
                "MERGE upsert requires a conflict target",
            ));
        };

        let columns = Self::column_names(insert);
        let source_columns = columns
            .iter()
            .zip(values.iter())
            .map(|(column, value)| {
                Ok(format!("{} AS {}", self.visit_expr(value, params)?, column))
            })
            .collect::<Result<Vec<_>, CompileError>>()?
            .join(", ");

        let on_clause = conflict_target
            .columns
            .iter()
            .map(|c| format!("target.{} = source.{}", c.name, c.name))
            .collect::<Vec<_>>()
            .join(" AND ");

        let mut sql = format!(
            "MERGE INTO {} target USING (SELECT {} FROM dual) source ON ({})",
            self.table_name(&insert.table),
            source_columns,
            on_clause
        );

        if !upsert.do_nothing {
            let updates = upsert
                .update_columns
                .iter()
                .map(|column| format!("target.{} = source.{}", column, column))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" WHEN MATCHED THEN UPDATE SET {}", updates));
        }

        let insert_columns = columns.join(", ");
        let insert_values = columns
            .iter()
            .map(|column| format!("source.{}", column))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(
            " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
            insert_columns, insert_values
        ));

        Ok(sql)
    }
}
