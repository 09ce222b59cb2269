use crate::Value;

/// Binary operators usable in expressions and predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Like,
    NotLike,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Like => "LIKE",
            BinaryOperator::NotLike => "NOT LIKE",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Neg,
}

impl UnaryOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "NOT",
            UnaryOperator::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// Row lock flavor for `SELECT … FOR UPDATE / FOR SHARE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Update,
    Share,
}

impl LockMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            LockMode::Update => "FOR UPDATE",
            LockMode::Share => "FOR SHARE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SetOperator::Union => "UNION",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
        }
    }
}

/// Referential action for foreign key ON DELETE / ON UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// Column reference, optionally table-qualified.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub table: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: Some(table.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenThen {
    pub condition: Expr,
    pub result: Expr,
}

impl WhenThen {
    pub fn new(condition: Expr, result: Expr) -> Self {
        Self { condition, result }
    }
}

/// Window specification attached to a function call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverClause {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
}

impl OverClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partition_by(mut self, exprs: Vec<Expr>) -> Self {
        self.partition_by = exprs;
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }
}

/// A SELECT (or set operation) used in expression or FROM position.
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub query: Box<Statement>,
    pub alias: Option<String>,
}

impl Subquery {
    pub fn new(query: impl Into<Statement>) -> Self {
        Self {
            query: Box::new(query.into()),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Value-producing node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(Column),
    Star,
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
        over: Option<OverClause>,
    },
    Cast {
        expr: Box<Expr>,
        data_type: String,
    },
    Alias {
        expr: Box<Expr>,
        name: String,
    },
    Case {
        whens: Vec<WhenThen>,
        else_result: Option<Box<Expr>>,
    },
    InList {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Subquery(Subquery),
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(Column::new(name))
    }

    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Column(Column::qualified(table, name))
    }

    pub fn star() -> Self {
        Expr::Star
    }

    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
            over: None,
        }
    }

    pub fn window(name: impl Into<String>, args: Vec<Expr>, over: OverClause) -> Self {
        Expr::Function {
            name: name.into(),
            args,
            over: Some(over),
        }
    }

    pub fn case(whens: Vec<WhenThen>, else_result: Option<Expr>) -> Self {
        Expr::Case {
            whens,
            else_result: else_result.map(Box::new),
        }
    }

    pub fn subquery(query: impl Into<Statement>) -> Self {
        Expr::Subquery(Subquery::new(query))
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::binary(self, BinaryOperator::Eq, other)
    }

    pub fn not_eq(self, other: Expr) -> Self {
        Expr::binary(self, BinaryOperator::NotEq, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::binary(self, BinaryOperator::Gt, other)
    }

    pub fn gt_eq(self, other: Expr) -> Self {
        Expr::binary(self, BinaryOperator::GtEq, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::binary(self, BinaryOperator::Lt, other)
    }

    pub fn lt_eq(self, other: Expr) -> Self {
        Expr::binary(self, BinaryOperator::LtEq, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::binary(self, BinaryOperator::And, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::binary(self, BinaryOperator::Or, other)
    }

    pub fn like(self, other: Expr) -> Self {
        Expr::binary(self, BinaryOperator::Like, other)
    }

    pub fn not(self) -> Self {
        Expr::Unary {
            op: UnaryOperator::Not,
            operand: Box::new(self),
        }
    }

    pub fn neg(self) -> Self {
        Expr::Unary {
            op: UnaryOperator::Neg,
            operand: Box::new(self),
        }
    }

    pub fn cast(self, data_type: impl Into<String>) -> Self {
        Expr::Cast {
            expr: Box::new(self),
            data_type: data_type.into(),
        }
    }

    pub fn alias(self, name: impl Into<String>) -> Self {
        Expr::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    pub fn in_list(self, values: Vec<Expr>) -> Self {
        Expr::InList {
            expr: Box::new(self),
            values,
            negated: false,
        }
    }

    pub fn not_in_list(self, values: Vec<Expr>) -> Self {
        Expr::InList {
            expr: Box::new(self),
            values,
            negated: true,
        }
    }

    pub fn between(self, low: Expr, high: Expr) -> Self {
        Expr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    pub fn not_between(self, low: Expr, high: Expr) -> Self {
        Expr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: true,
        }
    }
}

// =============================================================================
// Clauses
// =============================================================================

/// Table reference, optionally schema-qualified and aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub schema: Option<String>,
    pub alias: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            alias: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// FROM-position reference: a table or a derived table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    Table(Table),
    Subquery(Subquery),
}

impl From<Table> for TableRef {
    fn from(table: Table) -> Self {
        TableRef::Table(table)
    }
}

impl From<Subquery> for TableRef {
    fn from(subquery: Subquery) -> Self {
        TableRef::Subquery(subquery)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expression: Expr,
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn asc(expression: Expr) -> Self {
        Self {
            expression,
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(expression: Expr) -> Self {
        Self {
            expression,
            direction: OrderDirection::Desc,
        }
    }
}

/// Row-limiting clause translated per dialect (`TOP`, `LIMIT`, `FETCH FIRST`).
#[derive(Debug, Clone, PartialEq)]
pub struct TopClause {
    pub count: u64,
    pub on_expression: Option<Expr>,
    pub direction: OrderDirection,
}

impl TopClause {
    pub fn new(count: u64) -> Self {
        Self {
            count,
            on_expression: None,
            direction: OrderDirection::Asc,
        }
    }

    pub fn on(mut self, expression: Expr, direction: OrderDirection) -> Self {
        self.on_expression = Some(expression);
        self.direction = direction;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LockClause {
    pub mode: LockMode,
    pub nowait: bool,
    pub skip_locked: bool,
}

impl LockClause {
    pub fn new(mode: LockMode) -> Self {
        Self {
            mode,
            nowait: false,
            skip_locked: false,
        }
    }

    pub fn nowait(mut self) -> Self {
        self.nowait = true;
        self
    }

    pub fn skip_locked(mut self) -> Self {
        self.skip_locked = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: Expr,
}

impl Join {
    pub fn new(join_type: JoinType, table: impl Into<TableRef>, on: Expr) -> Self {
        Self {
            join_type,
            table: table.into(),
            on,
        }
    }

    pub fn inner(table: impl Into<TableRef>, on: Expr) -> Self {
        Self::new(JoinType::Inner, table, on)
    }

    pub fn left(table: impl Into<TableRef>, on: Expr) -> Self {
        Self::new(JoinType::Left, table, on)
    }
}

/// Common table expression attached to a SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub query: Select,
}

impl Cte {
    pub fn new(name: impl Into<String>, query: Select) -> Self {
        Self {
            name: name.into(),
            query,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConflictTarget {
    pub columns: Vec<Column>,
}

impl ConflictTarget {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }
}

/// Conflict handling attached to an INSERT.
///
/// `do_nothing` and a nonempty `update_columns` list are mutually
/// exclusive; compilers reject the combination.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpsertClause {
    pub conflict_target: Option<ConflictTarget>,
    pub update_columns: Vec<String>,
    pub do_nothing: bool,
}

impl UpsertClause {
    pub fn update<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            conflict_target: None,
            update_columns: columns.into_iter().map(Into::into).collect(),
            do_nothing: false,
        }
    }

    pub fn do_nothing() -> Self {
        Self {
            conflict_target: None,
            update_columns: Vec::new(),
            do_nothing: true,
        }
    }

    pub fn with_conflict_target(mut self, target: ConflictTarget) -> Self {
        self.conflict_target = Some(target);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturningClause {
    pub exprs: Vec<Expr>,
}

impl ReturningClause {
    pub fn new(exprs: Vec<Expr>) -> Self {
        Self { exprs }
    }

    pub fn star() -> Self {
        Self {
            exprs: vec![Expr::Star],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
    pub not_null: bool,
    pub default: Option<Expr>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            not_null: false,
            default: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_default(mut self, default: Expr) -> Self {
        self.default = Some(default);
        self
    }
}

/// Table-level constraint in CREATE TABLE or ALTER TABLE ADD CONSTRAINT.
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    PrimaryKey {
        name: Option<String>,
        columns: Vec<Column>,
    },
    Unique {
        name: Option<String>,
        columns: Vec<Column>,
    },
    ForeignKey {
        name: Option<String>,
        columns: Vec<Column>,
        reference_table: Table,
        reference_columns: Vec<Column>,
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    },
    Check {
        name: Option<String>,
        condition: Expr,
    },
}

impl TableConstraint {
    pub fn primary_key(name: impl Into<String>, columns: Vec<Column>) -> Self {
        TableConstraint::PrimaryKey {
            name: Some(name.into()),
            columns,
        }
    }

    pub fn unique(name: impl Into<String>, columns: Vec<Column>) -> Self {
        TableConstraint::Unique {
            name: Some(name.into()),
            columns,
        }
    }

    pub fn foreign_key(
        name: impl Into<String>,
        columns: Vec<Column>,
        reference_table: Table,
        reference_columns: Vec<Column>,
    ) -> Self {
        TableConstraint::ForeignKey {
            name: Some(name.into()),
            columns,
            reference_table,
            reference_columns,
            on_delete: None,
            on_update: None,
        }
    }

    pub fn check(name: impl Into<String>, condition: Expr) -> Self {
        TableConstraint::Check {
            name: Some(name.into()),
            condition,
        }
    }

    pub fn with_on_delete(mut self, action: ReferentialAction) -> Self {
        if let TableConstraint::ForeignKey { on_delete, .. } = &mut self {
            *on_delete = Some(action);
        }
        self
    }

    pub fn with_on_update(mut self, action: ReferentialAction) -> Self {
        if let TableConstraint::ForeignKey { on_update, .. } = &mut self {
            *on_update = Some(action);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    DropColumn(String),
    AddConstraint(TableConstraint),
    DropConstraint {
        name: String,
        if_exists: bool,
        cascade: bool,
    },
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub ctes: Vec<Cte>,
    pub distinct: bool,
    pub top: Option<TopClause>,
    pub select_list: Vec<Expr>,
    pub from: Option<TableRef>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub lock: Option<LockClause>,
}

impl Select {
    pub fn new(select_list: Vec<Expr>) -> Self {
        Self {
            ctes: Vec::new(),
            distinct: false,
            top: None,
            select_list,
            from: None,
            joins: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
        }
    }

    pub fn star() -> Self {
        Self::new(vec![Expr::Star])
    }

    pub fn from(mut self, table: impl Into<TableRef>) -> Self {
        self.from = Some(table.into());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn with_cte(mut self, cte: Cte) -> Self {
        self.ctes.push(cte);
        self
    }

    pub fn with_join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn with_where(mut self, condition: Expr) -> Self {
        self.where_clause = Some(condition);
        self
    }

    pub fn with_group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by = exprs;
        self
    }

    pub fn with_having(mut self, condition: Expr) -> Self {
        self.having = Some(condition);
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_top(mut self, top: TopClause) -> Self {
        self.top = Some(top);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_lock(mut self, lock: LockClause) -> Self {
        self.lock = Some(lock);
        self
    }
}

/// INSERT carrying exactly one of `values` (single row) or `rows`
/// (multi-row payload); compilers enforce the exclusivity.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: Table,
    pub columns: Vec<Column>,
    pub values: Option<Vec<Expr>>,
    pub rows: Option<Vec<Vec<Expr>>>,
    pub upsert: Option<UpsertClause>,
    pub returning: Option<ReturningClause>,
}

impl Insert {
    pub fn new(table: Table, columns: Vec<Column>) -> Self {
        Self {
            table,
            columns,
            values: None,
            rows: None,
            upsert: None,
            returning: None,
        }
    }

    pub fn with_values(mut self, values: Vec<Expr>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_rows(mut self, rows: Vec<Vec<Expr>>) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn with_upsert(mut self, upsert: UpsertClause) -> Self {
        self.upsert = Some(upsert);
        self
    }

    pub fn with_returning(mut self, returning: ReturningClause) -> Self {
        self.returning = Some(returning);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: Table,
    /// Ordered column assignments; order is preserved in the emitted SET list.
    pub assignments: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
    pub returning: Option<ReturningClause>,
}

impl Update {
    pub fn new<S: Into<String>>(table: Table, assignments: Vec<(S, Expr)>) -> Self {
        Self {
            table,
            assignments: assignments
                .into_iter()
                .map(|(name, expr)| (name.into(), expr))
                .collect(),
            where_clause: None,
            returning: None,
        }
    }

    pub fn with_where(mut self, condition: Expr) -> Self {
        self.where_clause = Some(condition);
        self
    }

    pub fn with_returning(mut self, returning: ReturningClause) -> Self {
        self.returning = Some(returning);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: Table,
    pub where_clause: Option<Expr>,
    pub returning: Option<ReturningClause>,
}

impl Delete {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            where_clause: None,
            returning: None,
        }
    }

    pub fn with_where(mut self, condition: Expr) -> Self {
        self.where_clause = Some(condition);
        self
    }

    pub fn with_returning(mut self, returning: ReturningClause) -> Self {
        self.returning = Some(returning);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetOp {
    pub op: SetOperator,
    pub left: Box<Statement>,
    pub right: Box<Statement>,
    pub all: bool,
}

impl SetOp {
    pub fn union(left: impl Into<Statement>, right: impl Into<Statement>) -> Self {
        Self::new(SetOperator::Union, left, right)
    }

    pub fn intersect(left: impl Into<Statement>, right: impl Into<Statement>) -> Self {
        Self::new(SetOperator::Intersect, left, right)
    }

    pub fn except(left: impl Into<Statement>, right: impl Into<Statement>) -> Self {
        Self::new(SetOperator::Except, left, right)
    }

    pub fn new(op: SetOperator, left: impl Into<Statement>, right: impl Into<Statement>) -> Self {
        Self {
            op,
            left: Box::new(left.into()),
            right: Box::new(right.into()),
            all: false,
        }
    }

    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub table: Table,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub if_not_exists: bool,
}

impl CreateTable {
    pub fn new(table: Table, columns: Vec<ColumnDef>) -> Self {
        Self {
            table,
            columns,
            constraints: Vec::new(),
            if_not_exists: false,
        }
    }

    pub fn with_constraints(mut self, constraints: Vec<TableConstraint>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub table: Table,
    pub if_exists: bool,
    pub cascade: bool,
}

impl DropTable {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            if_exists: false,
            cascade: false,
        }
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: String,
    pub table: Table,
    pub columns: Vec<Column>,
    pub unique: bool,
    pub if_not_exists: bool,
}

impl CreateIndex {
    pub fn new(name: impl Into<String>, table: Table, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            table,
            columns,
            unique: false,
            if_not_exists: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropIndex {
    pub name: String,
    /// Required by dialects whose index statements are table-scoped
    /// (MySQL, MariaDB, SQL Server).
    pub table: Option<Table>,
    pub if_exists: bool,
    pub cascade: bool,
}

impl DropIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            if_exists: false,
            cascade: false,
        }
    }

    pub fn on(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub table: Table,
    pub actions: Vec<AlterAction>,
}

impl AlterTable {
    pub fn new(table: Table, actions: Vec<AlterAction>) -> Self {
        Self { table, actions }
    }
}

/// Executable root of the query model.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<Select>),
    Insert(Box<Insert>),
    Update(Box<Update>),
    Delete(Box<Delete>),
    SetOp(Box<SetOp>),
    CreateTable(Box<CreateTable>),
    DropTable(DropTable),
    CreateIndex(CreateIndex),
    DropIndex(DropIndex),
    AlterTable(Box<AlterTable>),
}

impl Statement {
    /// Node-kind name used in diagnostics.
    pub fn node_name(&self) -> &'static str {
        match self {
            Statement::Select(_) => "Select",
            Statement::Insert(_) => "Insert",
            Statement::Update(_) => "Update",
            Statement::Delete(_) => "Delete",
            Statement::SetOp(_) => "SetOp",
            Statement::CreateTable(_) => "CreateTable",
            Statement::DropTable(_) => "DropTable",
            Statement::CreateIndex(_) => "CreateIndex",
            Statement::DropIndex(_) => "DropIndex",
            Statement::AlterTable(_) => "AlterTable",
        }
    }
}

impl From<Select> for Statement {
    fn from(v: Select) -> Self {
        Statement::Select(Box::new(v))
    }
}

impl From<Insert> for Statement {
    fn from(v: Insert) -> Self {
        Statement::Insert(Box::new(v))
    }
}

impl From<Update> for Statement {
    fn from(v: Update) -> Self {
        Statement::Update(Box::new(v))
    }
}

impl From<Delete> for Statement {
    fn from(v: Delete) -> Self {
        Statement::Delete(Box::new(v))
    }
}

impl From<SetOp> for Statement {
    fn from(v: SetOp) -> Self {
        Statement::SetOp(Box::new(v))
    }
}

impl From<CreateTable> for Statement {
    fn from(v: CreateTable) -> Self {
        Statement::CreateTable(Box::new(v))
    }
}

impl From<DropTable> for Statement {
    fn from(v: DropTable) -> Self {
        Statement::DropTable(v)
    }
}

impl From<CreateIndex> for Statement {
    fn from(v: CreateIndex) -> Self {
        Statement::CreateIndex(v)
    }
}

impl From<DropIndex> for Statement {
    fn from(v: DropIndex) -> Self {
        Statement::DropIndex(v)
    }
}

impl From<AlterTable> for Statement {
    fn from(v: AlterTable) -> Self {
        Statement::AlterTable(Box::new(v))
    }
}
