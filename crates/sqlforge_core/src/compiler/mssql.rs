use super::{validate_insert_shape, validate_upsert, ParamList, SqlCompiler};
use crate::ast::{CreateTable, Expr, Insert, ReturningClause, TopClause};
use crate::dialect::Dialect;
use crate::error::CompileError;

/// SQL Server compiler: native inline `TOP n`, OFFSET/FETCH paging,
/// `OUTPUT` instead of RETURNING, MERGE upserts with a `VALUES` source,
/// guarded `IF NOT EXISTS` table creation, and no trailing lock clauses.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsSqlCompiler;

impl MsSqlCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl SqlCompiler for MsSqlCompiler {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn translate_top(&self, top: &TopClause) -> (Option<String>, Option<u64>) {
        (Some(format!("TOP {} ", top.count)), None)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>, has_order_by: bool) -> String {
        if limit.is_none() && offset.is_none() {
            return String::new();
        }
        // OFFSET/FETCH is only legal after an ORDER BY.
        let mut out = String::new();
        if !has_order_by {
            out.push_str(" ORDER BY (SELECT NULL)");
        }
        out.push_str(&format!(" OFFSET {} ROWS", offset.unwrap_or(0)));
        if let Some(limit) = limit {
            out.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
        }
        out
    }

    fn add_column_keyword(&self) -> &'static str {
        "ADD "
    }

    fn inline_output_clause(
        &self,
        returning: Option<&ReturningClause>,
        source: &'static str,
    ) -> Result<Option<String>, CompileError> {
        let Some(returning) = returning else {
            return Ok(None);
        };
        let items = returning
            .exprs
            .iter()
            .map(|expr| match expr {
                Expr::Star => Ok(format!("{}.*", source)),
                Expr::Column(column) => Ok(format!("{}.{}", source, column.name)),
                _ => Err(CompileError::invalid(
                    "Returning",
                    "SQL Server OUTPUT supports columns and * only",
                )),
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(Some(format!("OUTPUT {}", items.join(", "))))
    }

    fn visit_create_table(
        &self,
        create: &CreateTable,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        let body = format!(
            "CREATE TABLE {} ({})",
            self.table_name(&create.table),
            self.create_table_items(create, params)?
        );
        if create.if_not_exists {
            Ok(format!(
                "IF NOT EXISTS (SELECT 1 FROM sys.tables WHERE name = '{}') BEGIN {} END",
                create.table.name, body
            ))
        } else {
            Ok(body)
        }
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

        let columns: Vec<String> = insert.columns.iter().map(|c| c.name.clone()).collect();
        let source_values = self.visit_expr_list(values, params)?;
        let on_clause = conflict_target
            .columns
            .iter()
            .map(|c| format!("target.{} = source.{}", c.name, c.name))
            .collect::<Vec<_>>()
            .join(" AND ");

        let mut sql = format!(
            "MERGE INTO {} AS target USING (VALUES ({})) AS source ({}) ON {}",
            self.table_name(&insert.table),
            source_values,
            columns.join(", "),
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

        let insert_values = columns
            .iter()
            .map(|column| format!("source.{}", column))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(
            " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({});",
            columns.join(", "),
            insert_values
        ));

        Ok(sql)
    }
}
