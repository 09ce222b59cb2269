//! Dialect compilers: visitors that lower a [`Statement`] tree to a
//! [`CompiledQuery`].
//!
//! The [`SqlCompiler`] trait carries the shared emission as default
//! methods; each dialect overrides only its divergences. Dispatch is an
//! exhaustive match per node family, so a new node kind fails to compile
//! until every dialect handles it.

mod cockroachdb;
mod mariadb;
mod mssql;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;

pub use cockroachdb::CockroachDbCompiler;
pub use mariadb::MariaDbCompiler;
pub use mssql::MsSqlCompiler;
pub use mysql::MySqlCompiler;
pub use oracle::OracleCompiler;
pub use postgres::PostgresCompiler;
pub use sqlite::SqliteCompiler;

use crate::ast::{
    AlterAction, AlterTable, ColumnDef, CreateIndex, CreateTable, Cte, Delete, DropIndex,
    DropTable, Expr, Insert, Join, LockClause, OrderBy, ReturningClause, Select, SetOp,
    SetOperator, Statement, Subquery, Table, TableConstraint, TableRef, TopClause, Update,
    UpsertClause,
};
use crate::compiled_query::CompiledQuery;
use crate::dialect::{Dialect, DialectFeatures, UpsertStrategy};
use crate::error::CompileError;
use crate::Value;

/// Ordered parameter accumulator for one compilation.
#[derive(Debug, Default)]
pub struct ParamList {
    values: Vec<Value>,
}

impl ParamList {
    /// Append a value and return its 1-based position.
    pub fn push(&mut self, value: Value) -> usize {
        self.values.push(value);
        self.values.len()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

pub(crate) fn validate_insert_shape(insert: &Insert) -> Result<(), CompileError> {
    match (&insert.values, &insert.rows) {
        (Some(_), Some(_)) | (None, None) => Err(CompileError::invalid(
            "Insert",
            "must provide exactly one of values or rows",
        )),
        (Some(values), None) => {
            if !insert.columns.is_empty() && insert.columns.len() != values.len() {
                return Err(CompileError::invalid(
                    "Insert",
                    "columns and values must have the same length",
                ));
            }
            Ok(())
        }
        (None, Some(rows)) => {
            if rows.is_empty() {
                return Err(CompileError::invalid("Insert", "rows must not be empty"));
            }
            let width = rows[0].len();
            if rows.iter().any(|row| row.len() != width) {
                return Err(CompileError::invalid(
                    "Insert",
                    "every row must provide the same number of values",
                ));
            }
            if !insert.columns.is_empty() && insert.columns.len() != width {
                return Err(CompileError::invalid(
                    "Insert",
                    "columns and rows must have the same length",
                ));
            }
            Ok(())
        }
    }
}

pub(crate) fn validate_upsert(upsert: &UpsertClause) -> Result<(), CompileError> {
    if upsert.do_nothing && !upsert.update_columns.is_empty() {
        return Err(CompileError::invalid(
            "Upsert",
            "do_nothing and update_columns are mutually exclusive",
        ));
    }
    if !upsert.do_nothing && upsert.update_columns.is_empty() {
        return Err(CompileError::invalid(
            "Upsert",
            "requires update_columns or do_nothing",
        ));
    }
    Ok(())
}

/// Visitor that lowers statements to dialect-correct SQL.
///
/// Compilation is pure given a tree: the parameter list lives in a
/// per-call [`ParamList`] and no other state is touched.
pub trait SqlCompiler: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn compile(&self, statement: &Statement) -> Result<CompiledQuery, CompileError> {
        let mut params = ParamList::default();
        let sql = self.visit_statement(statement, &mut params)?;
        Ok(CompiledQuery::new(sql, params.into_values()))
    }

    // -------------------------------------------------------------------------
    // Binding
    // -------------------------------------------------------------------------

    /// Bind a literal value and return its placeholder text.
    fn bind(&self, value: &Value, params: &mut ParamList) -> String {
        let position = params.push(value.clone());
        self.dialect().placeholder_style().render(position)
    }

    // -------------------------------------------------------------------------
    // Statement dispatch
    // -------------------------------------------------------------------------

    fn visit_statement(
        &self,
        statement: &Statement,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        match statement {
            Statement::Select(select) => self.visit_select(select, params),
            Statement::Insert(insert) => self.visit_insert(insert, params),
            Statement::Update(update) => self.visit_update(update, params),
            Statement::Delete(delete) => self.visit_delete(delete, params),
            Statement::SetOp(set_op) => self.visit_set_op(set_op, params),
            Statement::CreateTable(create) => self.visit_create_table(create, params),
            Statement::DropTable(drop) => self.visit_drop_table(drop),
            Statement::CreateIndex(create) => self.visit_create_index(create),
            Statement::DropIndex(drop) => self.visit_drop_index(drop),
            Statement::AlterTable(alter) => self.visit_alter_table(alter, params),
        }
    }

    // -------------------------------------------------------------------------
    // SELECT
    // -------------------------------------------------------------------------

    fn visit_select(&self, select: &Select, params: &mut ParamList) -> Result<String, CompileError> {
        if select.top.is_some() && (select.limit.is_some() || select.offset.is_some()) {
            return Err(CompileError::invalid(
                "Select",
                "TOP clause is mutually exclusive with LIMIT and OFFSET",
            ));
        }

        let mut sql = String::new();

        if !select.ctes.is_empty() {
            sql.push_str(&self.visit_ctes(&select.ctes, params)?);
            sql.push(' ');
        }

        sql.push_str("SELECT ");
        if select.distinct {
            sql.push_str("DISTINCT ");
        }

        let mut order_by = select.order_by.clone();
        let mut limit = select.limit;
        let offset = select.offset;

        if let Some(top) = &select.top {
            if order_by.is_empty() {
                if let Some(on_expression) = &top.on_expression {
                    order_by.push(OrderBy {
                        expression: on_expression.clone(),
                        direction: top.direction,
                    });
                }
            }
            let (inline, translated) = self.translate_top(top);
            if let Some(inline) = inline {
                sql.push_str(&inline);
            }
            if translated.is_some() {
                limit = translated;
            }
        }

        sql.push_str(&self.visit_expr_list(&select.select_list, params)?);

        if let Some(from) = &select.from {
            sql.push_str(" FROM ");
            sql.push_str(&self.visit_table_ref(from, params)?);
        }

        for join in &select.joins {
            sql.push(' ');
            sql.push_str(&self.visit_join(join, params)?);
        }

        if let Some(condition) = &select.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&self.visit_expr(condition, params)?);
        }

        if !select.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.visit_expr_list(&select.group_by, params)?);
        }

        if let Some(condition) = &select.having {
            sql.push_str(" HAVING ");
            sql.push_str(&self.visit_expr(condition, params)?);
        }

        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.visit_order_items(&order_by, params)?);
        }

        sql.push_str(&self.emit_limit_offset(limit, offset, !order_by.is_empty()));

        if let Some(lock) = &select.lock {
            sql.push_str(&self.visit_lock(lock)?);
        }

        Ok(sql)
    }

    /// TOP lowering: inline SQL fragment (SQL Server) or a translated
    /// trailing limit (everyone else).
    fn translate_top(&self, top: &TopClause) -> (Option<String>, Option<u64>) {
        (None, Some(top.count))
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>, _has_order_by: bool) -> String {
        let mut out = String::new();
        if let Some(limit) = limit {
            out.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = offset {
            out.push_str(&format!(" OFFSET {}", offset));
        }
        out
    }

    fn visit_ctes(&self, ctes: &[Cte], params: &mut ParamList) -> Result<String, CompileError> {
        let rendered = ctes
            .iter()
            .map(|cte| {
                Ok(format!(
                    "{} AS ({})",
                    cte.name,
                    self.visit_select(&cte.query, params)?
                ))
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(format!("WITH {}", rendered.join(", ")))
    }

    fn visit_join(&self, join: &Join, params: &mut ParamList) -> Result<String, CompileError> {
        Ok(format!(
            "{} {} ON {}",
            join.join_type.as_sql(),
            self.visit_table_ref(&join.table, params)?,
            self.visit_expr(&join.on, params)?
        ))
    }

    fn visit_lock(&self, lock: &LockClause) -> Result<String, CompileError> {
        if lock.nowait && lock.skip_locked {
            return Err(CompileError::invalid(
                "Lock",
                "NOWAIT and SKIP LOCKED are mutually exclusive",
            ));
        }
        if !self.dialect().supports(DialectFeatures::LOCK_CLAUSE) {
            return Err(CompileError::unsupported(
                self.dialect(),
                "trailing FOR UPDATE/FOR SHARE lock clauses",
            ));
        }
        let mut out = format!(" {}", lock.mode.as_sql());
        if lock.nowait {
            out.push_str(" NOWAIT");
        }
        if lock.skip_locked {
            out.push_str(" SKIP LOCKED");
        }
        Ok(out)
    }

    // -------------------------------------------------------------------------
    // Set operations
    // -------------------------------------------------------------------------

    /// Keyword for the EXCEPT flavor (`MINUS` on Oracle).
    fn except_keyword(&self) -> &'static str {
        "EXCEPT"
    }

    fn visit_set_op(&self, set_op: &SetOp, params: &mut ParamList) -> Result<String, CompileError> {
        let keyword = match set_op.op {
            SetOperator::Union => "UNION",
            SetOperator::Intersect => {
                if !self.dialect().supports(DialectFeatures::SET_OP_INTERSECT) {
                    return Err(CompileError::unsupported(self.dialect(), "INTERSECT"));
                }
                "INTERSECT"
            }
            SetOperator::Except => {
                if !self.dialect().supports(DialectFeatures::SET_OP_EXCEPT) {
                    return Err(CompileError::unsupported(self.dialect(), "EXCEPT"));
                }
                self.except_keyword()
            }
        };

        if set_op.all
            && set_op.op != SetOperator::Union
            && !self.dialect().supports(DialectFeatures::SET_OP_ALL)
        {
            return Err(CompileError::unsupported(
                self.dialect(),
                format!("{} ALL", keyword),
            ));
        }

        let left = self.visit_statement(&set_op.left, params)?;
        let right = self.visit_statement(&set_op.right, params)?;
        let all = if set_op.all { " ALL" } else { "" };
        Ok(format!("{} {}{} {}", left, keyword, all, right))
    }

    // -------------------------------------------------------------------------
    // INSERT / UPDATE / DELETE
    // -------------------------------------------------------------------------

    fn visit_insert(&self, insert: &Insert, params: &mut ParamList) -> Result<String, CompileError> {
        validate_insert_shape(insert)?;
        if let Some(upsert) = &insert.upsert {
            validate_upsert(upsert)?;
        }

        if insert.upsert.is_some() && self.dialect().upsert_strategy() == UpsertStrategy::Merge {
            return self.emit_merge_upsert(insert, params);
        }

        if insert.rows.is_some() && !self.dialect().supports(DialectFeatures::MULTI_ROW_VALUES) {
            return self.emit_rows_fallback(insert, params);
        }

        let mut sql = format!("INSERT INTO {}", self.table_name(&insert.table));
        if !insert.columns.is_empty() {
            let columns: Vec<String> = insert.columns.iter().map(|c| c.name.clone()).collect();
            sql.push_str(&format!(" ({})", columns.join(", ")));
        }

        let inline_output = self.inline_output_clause(insert.returning.as_ref(), "INSERTED")?;
        if let Some(output) = &inline_output {
            sql.push(' ');
            sql.push_str(output);
        }

        match (&insert.values, &insert.rows) {
            (Some(values), _) => {
                sql.push_str(&format!(" VALUES ({})", self.visit_expr_list(values, params)?));
            }
            (_, Some(rows)) => {
                let rendered = rows
                    .iter()
                    .map(|row| Ok(format!("({})", self.visit_expr_list(row, params)?)))
                    .collect::<Result<Vec<_>, CompileError>>()?;
                sql.push_str(&format!(" VALUES {}", rendered.join(", ")));
            }
            (None, None) => unreachable!("validated by validate_insert_shape"),
        }

        if let Some(upsert) = &insert.upsert {
            match self.dialect().upsert_strategy() {
                UpsertStrategy::OnConflict => sql.push_str(&self.emit_on_conflict(upsert)?),
                UpsertStrategy::OnDuplicateKey => sql.push_str(&self.emit_on_duplicate_key(upsert)?),
                UpsertStrategy::Merge => unreachable!("merge handled above"),
            }
        }

        if inline_output.is_none() {
            sql.push_str(&self.trailing_returning(insert.returning.as_ref(), params)?);
        }

        Ok(sql)
    }

    fn visit_update(&self, update: &Update, params: &mut ParamList) -> Result<String, CompileError> {
        let assignments = update
            .assignments
            .iter()
            .map(|(column, value)| Ok(format!("{} = {}", column, self.visit_expr(value, params)?)))
            .collect::<Result<Vec<_>, CompileError>>()?;

        let mut sql = format!(
            "UPDATE {} SET {}",
            self.table_name(&update.table),
            assignments.join(", ")
        );

        let inline_output = self.inline_output_clause(update.returning.as_ref(), "INSERTED")?;
        if let Some(output) = &inline_output {
            sql.push(' ');
            sql.push_str(output);
        }

        if let Some(condition) = &update.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&self.visit_expr(condition, params)?);
        }

        if inline_output.is_none() {
            sql.push_str(&self.trailing_returning(update.returning.as_ref(), params)?);
        }

        Ok(sql)
    }

    fn visit_delete(&self, delete: &Delete, params: &mut ParamList) -> Result<String, CompileError> {
        let mut sql = format!("DELETE FROM {}", self.table_name(&delete.table));

        let inline_output = self.inline_output_clause(delete.returning.as_ref(), "DELETED")?;
        if let Some(output) = &inline_output {
            sql.push(' ');
            sql.push_str(output);
        }

        if let Some(condition) = &delete.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&self.visit_expr(condition, params)?);
        }

        if inline_output.is_none() {
            sql.push_str(&self.trailing_returning(delete.returning.as_ref(), params)?);
        }

        Ok(sql)
    }

    // -------------------------------------------------------------------------
    // Upsert lowering
    // -------------------------------------------------------------------------

    /// Keyword naming the proposed row in ON CONFLICT updates.
    fn excluded_keyword(&self) -> &'static str {
        "EXCLUDED"
    }

    fn emit_on_conflict(&self, upsert: &UpsertClause) -> Result<String, CompileError> {
        let target = upsert.conflict_target.as_ref().map(|target| {
            let columns: Vec<String> = target.columns.iter().map(|c| c.name.clone()).collect();
            format!(" ({})", columns.join(", "))
        });

        if upsert.do_nothing {
            return Ok(format!(
                " ON CONFLICT{} DO NOTHING",
                target.unwrap_or_default()
            ));
        }

        let Some(target) = target else {
            return Err(CompileError::invalid(
                "Upsert",
                "ON CONFLICT DO UPDATE requires a conflict target",
            ));
        };

        let excluded = self.excluded_keyword();
        let updates: Vec<String> = upsert
            .update_columns
            .iter()
            .map(|column| format!("{} = {}.{}", column, excluded, column))
            .collect();

        Ok(format!(
            " ON CONFLICT{} DO UPDATE SET {}",
            target,
            updates.join(", ")
        ))
    }

    fn emit_on_duplicate_key(&self, upsert: &UpsertClause) -> Result<String, CompileError> {
        if upsert.conflict_target.is_some() {
            return Err(CompileError::invalid(
                "Upsert",
                "ON DUPLICATE KEY UPDATE does not accept a conflict target",
            ));
        }
        if upsert.do_nothing {
            return Err(CompileError::invalid(
                "Upsert",
                "ON DUPLICATE KEY UPDATE does not support DO NOTHING",
            ));
        }

        let updates: Vec<String> = upsert
            .update_columns
            .iter()
            .map(|column| format!("{} = VALUES({})", column, column))
            .collect();

        Ok(format!(" ON DUPLICATE KEY UPDATE {}", updates.join(", ")))
    }

    /// MERGE-based upsert; only the MERGE dialects implement this.
    fn emit_merge_upsert(
        &self,
        _insert: &Insert,
        _params: &mut ParamList,
    ) -> Result<String, CompileError> {
        Err(CompileError::unsupported(self.dialect(), "MERGE upserts"))
    }

    /// Multi-row payload on a dialect without multi-row VALUES; Oracle
    /// overrides this with its `INSERT ALL` form.
    fn emit_rows_fallback(
        &self,
        _insert: &Insert,
        _params: &mut ParamList,
    ) -> Result<String, CompileError> {
        Err(CompileError::unsupported(
            self.dialect(),
            "multi-row VALUES lists",
        ))
    }

    // -------------------------------------------------------------------------
    // RETURNING
    // -------------------------------------------------------------------------

    /// Clause-position output (SQL Server `OUTPUT INSERTED.*`); `None`
    /// means the dialect uses a trailing RETURNING clause instead.
    fn inline_output_clause(
        &self,
        _returning: Option<&ReturningClause>,
        _source: &'static str,
    ) -> Result<Option<String>, CompileError> {
        Ok(None)
    }

    fn trailing_returning(
        &self,
        returning: Option<&ReturningClause>,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        let Some(returning) = returning else {
            return Ok(String::new());
        };
        if !self.dialect().supports(DialectFeatures::RETURNING) {
            return Err(CompileError::unsupported(self.dialect(), "RETURNING"));
        }
        Ok(format!(
            " RETURNING {}",
            self.visit_expr_list(&returning.exprs, params)?
        ))
    }

    // -------------------------------------------------------------------------
    // DDL
    // -------------------------------------------------------------------------

    fn visit_create_table(
        &self,
        create: &CreateTable,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        if create.if_not_exists
            && !self
                .dialect()
                .supports(DialectFeatures::CREATE_TABLE_IF_NOT_EXISTS)
        {
            return Err(CompileError::unsupported(
                self.dialect(),
                "CREATE TABLE IF NOT EXISTS",
            ));
        }

        let if_not_exists = if create.if_not_exists {
            "IF NOT EXISTS "
        } else {
            ""
        };
        Ok(format!(
            "CREATE TABLE {}{} ({})",
            if_not_exists,
            self.table_name(&create.table),
            self.create_table_items(create, params)?
        ))
    }

    /// Column definitions followed by table constraints, comma-joined.
    fn create_table_items(
        &self,
        create: &CreateTable,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        let mut items = Vec::with_capacity(create.columns.len() + create.constraints.len());
        for column in &create.columns {
            items.push(self.visit_column_def(column, params)?);
        }
        for constraint in &create.constraints {
            items.push(self.visit_constraint(constraint, params)?);
        }
        Ok(items.join(", "))
    }

    fn visit_column_def(
        &self,
        column: &ColumnDef,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        let mut out = format!("{} {}", column.name, column.data_type);
        if column.primary_key {
            out.push_str(" PRIMARY KEY");
        }
        if column.not_null {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            out.push_str(&format!(" DEFAULT {}", self.visit_expr(default, params)?));
        }
        Ok(out)
    }

    fn visit_constraint(
        &self,
        constraint: &TableConstraint,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        let named = |name: &Option<String>| match name {
            Some(name) => format!("CONSTRAINT {} ", name),
            None => String::new(),
        };
        let column_list = |columns: &[crate::ast::Column]| {
            columns
                .iter()
                .map(|c| c.name.clone())
                .collect::<Vec<_>>()
                .join(", ")
        };

        match constraint {
            TableConstraint::PrimaryKey { name, columns } => Ok(format!(
                "{}PRIMARY KEY ({})",
                named(name),
                column_list(columns)
            )),
            TableConstraint::Unique { name, columns } => {
                Ok(format!("{}UNIQUE ({})", named(name), column_list(columns)))
            }
            TableConstraint::ForeignKey {
                name,
                columns,
                reference_table,
                reference_columns,
                on_delete,
                on_update,
            } => {
                if columns.is_empty() || columns.len() != reference_columns.len() {
                    return Err(CompileError::invalid(
                        "ForeignKey",
                        "columns and reference_columns must be nonempty lists of the same length",
                    ));
                }
                let mut out = format!(
                    "{}FOREIGN KEY ({}) REFERENCES {} ({})",
                    named(name),
                    column_list(columns),
                    self.table_name(reference_table),
                    column_list(reference_columns)
                );
                if let Some(action) = on_delete {
                    out.push_str(&format!(" ON DELETE {}", action.as_sql()));
                }
                if let Some(action) = on_update {
                    out.push_str(&format!(" ON UPDATE {}", action.as_sql()));
                }
                Ok(out)
            }
            TableConstraint::Check { name, condition } => Ok(format!(
                "{}CHECK ({})",
                named(name),
                self.visit_expr(condition, params)?
            )),
        }
    }

    fn visit_drop_table(&self, drop: &DropTable) -> Result<String, CompileError> {
        if drop.if_exists && !self.dialect().supports(DialectFeatures::DROP_IF_EXISTS) {
            return Err(CompileError::unsupported(
                self.dialect(),
                "IF EXISTS in DROP TABLE",
            ));
        }
        if drop.cascade && !self.dialect().supports(DialectFeatures::DROP_TABLE_CASCADE) {
            return Err(CompileError::unsupported(
                self.dialect(),
                "CASCADE in DROP TABLE",
            ));
        }

        let mut sql = String::from("DROP TABLE ");
        if drop.if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.table_name(&drop.table));
        if drop.cascade {
            sql.push_str(" CASCADE");
        }
        Ok(sql)
    }

    fn visit_create_index(&self, create: &CreateIndex) -> Result<String, CompileError> {
        if create.if_not_exists
            && !self
                .dialect()
                .supports(DialectFeatures::CREATE_INDEX_IF_NOT_EXISTS)
        {
            return Err(CompileError::unsupported(
                self.dialect(),
                "IF NOT EXISTS in CREATE INDEX",
            ));
        }

        let unique = if create.unique { "UNIQUE " } else { "" };
        let if_not_exists = if create.if_not_exists {
            "IF NOT EXISTS "
        } else {
            ""
        };
        let columns: Vec<String> = create.columns.iter().map(|c| c.name.clone()).collect();
        Ok(format!(
            "CREATE {}INDEX {}{} ON {} ({})",
            unique,
            if_not_exists,
            create.name,
            self.table_name(&create.table),
            columns.join(", ")
        ))
    }

    fn visit_drop_index(&self, drop: &DropIndex) -> Result<String, CompileError> {
        if drop.if_exists && !self.dialect().supports(DialectFeatures::DROP_IF_EXISTS) {
            return Err(CompileError::unsupported(
                self.dialect(),
                "IF EXISTS in DROP INDEX",
            ));
        }

        let table_scoped = self
            .dialect()
            .supports(DialectFeatures::INDEX_STATEMENT_REQUIRES_TABLE);

        if drop.cascade {
            // Only the dialects with free-standing index namespaces and
            // cascading drops accept this form.
            let cascade_ok = self.dialect().supports(DialectFeatures::DROP_TABLE_CASCADE)
                && !table_scoped;
            if !cascade_ok {
                return Err(CompileError::unsupported(
                    self.dialect(),
                    "CASCADE in DROP INDEX",
                ));
            }
        }

        let mut sql = String::from("DROP INDEX ");
        if drop.if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&drop.name);

        if table_scoped {
            let Some(table) = &drop.table else {
                return Err(CompileError::invalid(
                    "DropIndex",
                    format!(
                        "{} index statements require ON <table>",
                        self.dialect().display_name()
                    ),
                ));
            };
            sql.push_str(&format!(" ON {}", self.table_name(table)));
        }

        if drop.cascade {
            sql.push_str(" CASCADE");
        }
        Ok(sql)
    }

    /// Keyword introducing an added column (SQL Server omits `COLUMN`).
    fn add_column_keyword(&self) -> &'static str {
        "ADD COLUMN "
    }

    fn visit_alter_table(
        &self,
        alter: &AlterTable,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        if alter.actions.is_empty() {
            return Err(CompileError::invalid(
                "AlterTable",
                "requires at least one action",
            ));
        }
        if alter.actions.len() > 1 && !self.dialect().supports(DialectFeatures::MULTI_ACTION_ALTER)
        {
            return Err(CompileError::invalid(
                "AlterTable",
                format!(
                    "{} supports a single action per ALTER TABLE statement",
                    self.dialect().display_name()
                ),
            ));
        }

        let actions = alter
            .actions
            .iter()
            .map(|action| self.visit_alter_action(action, params))
            .collect::<Result<Vec<_>, CompileError>>()?;

        Ok(format!(
            "ALTER TABLE {} {}",
            self.table_name(&alter.table),
            actions.join(", ")
        ))
    }

    fn visit_alter_action(
        &self,
        action: &AlterAction,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        match action {
            AlterAction::AddColumn(column) => Ok(format!(
                "{}{}",
                self.add_column_keyword(),
                self.visit_column_def(column, params)?
            )),
            AlterAction::DropColumn(name) => Ok(format!("DROP COLUMN {}", name)),
            AlterAction::AddConstraint(constraint) => {
                if !self
                    .dialect()
                    .supports(DialectFeatures::ALTER_ADD_CONSTRAINT)
                {
                    return Err(CompileError::unsupported(
                        self.dialect(),
                        "ADD CONSTRAINT in ALTER TABLE",
                    ));
                }
                Ok(format!("ADD {}", self.visit_constraint(constraint, params)?))
            }
            AlterAction::DropConstraint {
                name,
                if_exists,
                cascade,
            } => {
                if !self
                    .dialect()
                    .supports(DialectFeatures::ALTER_DROP_CONSTRAINT)
                {
                    return Err(CompileError::unsupported(
                        self.dialect(),
                        "DROP CONSTRAINT in ALTER TABLE",
                    ));
                }
                if *if_exists && !self.dialect().supports(DialectFeatures::DROP_IF_EXISTS) {
                    return Err(CompileError::unsupported(
                        self.dialect(),
                        "IF EXISTS in DROP CONSTRAINT",
                    ));
                }
                if *cascade && !self.dialect().supports(DialectFeatures::DROP_TABLE_CASCADE) {
                    return Err(CompileError::unsupported(
                        self.dialect(),
                        "CASCADE in DROP CONSTRAINT",
                    ));
                }
                let mut out = String::from("DROP CONSTRAINT ");
                if *if_exists {
                    out.push_str("IF EXISTS ");
                }
                out.push_str(name);
                if *cascade {
                    out.push_str(" CASCADE");
                }
                Ok(out)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn visit_expr_list(&self, exprs: &[Expr], params: &mut ParamList) -> Result<String, CompileError> {
        Ok(exprs
            .iter()
            .map(|expr| self.visit_expr(expr, params))
            .collect::<Result<Vec<_>, CompileError>>()?
            .join(", "))
    }

    fn visit_expr(&self, expr: &Expr, params: &mut ParamList) -> Result<String, CompileError> {
        match expr {
            Expr::Literal(value) => Ok(self.bind(value, params)),
            Expr::Column(column) => Ok(match &column.table {
                Some(table) => format!("{}.{}", table, column.name),
                None => column.name.clone(),
            }),
            Expr::Star => Ok("*".to_string()),
            Expr::Binary { left, op, right } => Ok(format!(
                "({} {} {})",
                self.visit_expr(left, params)?,
                op.as_sql(),
                self.visit_expr(right, params)?
            )),
            Expr::Unary { op, operand } => Ok(format!(
                "({} {})",
                op.as_sql(),
                self.visit_expr(operand, params)?
            )),
            Expr::Function { name, args, over } => {
                let mut out = format!("{}({})", name, self.visit_expr_list(args, params)?);
                if let Some(over) = over {
                    out.push_str(&self.visit_over(over, params)?);
                }
                Ok(out)
            }
            Expr::Cast { expr, data_type } => Ok(format!(
                "CAST({} AS {})",
                self.visit_expr(expr, params)?,
                data_type
            )),
            Expr::Alias { expr, name } => Ok(format!(
                "{} AS {}",
                self.visit_expr(expr, params)?,
                name
            )),
            Expr::Case { whens, else_result } => {
                let mut out = String::from("CASE");
                for when in whens {
                    out.push_str(&format!(
                        " WHEN {} THEN {}",
                        self.visit_expr(&when.condition, params)?,
                        self.visit_expr(&when.result, params)?
                    ));
                }
                if let Some(else_result) = else_result {
                    out.push_str(&format!(" ELSE {}", self.visit_expr(else_result, params)?));
                }
                out.push_str(" END");
                Ok(out)
            }
            Expr::InList {
                expr,
                values,
                negated,
            } => {
                let keyword = if *negated { "NOT IN" } else { "IN" };
                Ok(format!(
                    "({} {} ({}))",
                    self.visit_expr(expr, params)?,
                    keyword,
                    self.visit_expr_list(values, params)?
                ))
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let keyword = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                Ok(format!(
                    "({} {} {} AND {})",
                    self.visit_expr(expr, params)?,
                    keyword,
                    self.visit_expr(low, params)?,
                    self.visit_expr(high, params)?
                ))
            }
            Expr::Subquery(subquery) => self.visit_subquery(subquery, params),
        }
    }

    fn visit_over(&self, over: &crate::ast::OverClause, params: &mut ParamList) -> Result<String, CompileError> {
        let mut parts = Vec::new();
        if !over.partition_by.is_empty() {
            parts.push(format!(
                "PARTITION BY {}",
                self.visit_expr_list(&over.partition_by, params)?
            ));
        }
        if !over.order_by.is_empty() {
            parts.push(format!(
                "ORDER BY {}",
                self.visit_order_items(&over.order_by, params)?
            ));
        }
        Ok(format!(" OVER ({})", parts.join(" ")))
    }

    fn visit_order_items(
        &self,
        items: &[OrderBy],
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        Ok(items
            .iter()
            .map(|item| {
                Ok(format!(
                    "{} {}",
                    self.visit_expr(&item.expression, params)?,
                    item.direction.as_sql()
                ))
            })
            .collect::<Result<Vec<_>, CompileError>>()?
            .join(", "))
    }

    fn visit_subquery(
        &self,
        subquery: &Subquery,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        let mut out = format!("({})", self.visit_statement(&subquery.query, params)?);
        if let Some(alias) = &subquery.alias {
            out.push_str(self.alias_keyword());
            out.push_str(alias);
        }
        Ok(out)
    }

    // -------------------------------------------------------------------------
    // Identifiers
    // -------------------------------------------------------------------------

    /// Separator before an alias; Oracle omits the `AS`.
    fn alias_keyword(&self) -> &'static str {
        " AS "
    }

    /// Qualified table name without alias, for statement targets.
    fn table_name(&self, table: &Table) -> String {
        match &table.schema {
            Some(schema) => format!("{}.{}", schema, table.name),
            None => table.name.clone(),
        }
    }

    fn visit_table_ref(
        &self,
        table_ref: &TableRef,
        params: &mut ParamList,
    ) -> Result<String, CompileError> {
        match table_ref {
            TableRef::Table(table) => {
                let mut out = self.table_name(table);
                if let Some(alias) = &table.alias {
                    out.push_str(self.alias_keyword());
                    out.push_str(alias);
                }
                Ok(out)
            }
            TableRef::Subquery(subquery) => self.visit_subquery(subquery, params),
        }
    }
}
