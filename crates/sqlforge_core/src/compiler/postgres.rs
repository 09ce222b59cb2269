use super::SqlCompiler;
use crate::dialect::Dialect;

/// PostgreSQL compiler. The shared emission is already Postgres-shaped;
/// only the dialect binding lives here.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresCompiler;

impl PostgresCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl SqlCompiler for PostgresCompiler {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::Value;

    fn compile(statement: impl Into<Statement>) -> crate::CompiledQuery {
        PostgresCompiler::new().compile(&statement.into()).unwrap()
    }

    fn compile_err(statement: impl Into<Statement>) -> crate::CompileError {
        PostgresCompiler::new()
            .compile(&statement.into())
            .unwrap_err()
    }

    #[test]
    fn compiles_simple_select() {
        let compiled = compile(Select::star().from(Table::new("users")));
        assert_eq!(compiled.sql, "SELECT * FROM users");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn compiles_where_with_params() {
        let compiled = compile(
            Select::new(vec![Expr::column("name")])
                .from(Table::new("users"))
                .with_where(Expr::column("age").gt(Expr::literal(25))),
        );
        assert_eq!(compiled.sql, "SELECT name FROM users WHERE (age > %s)");
        assert_eq!(compiled.params, vec![Value::Int(25)]);
    }

    #[test]
    fn compiles_nested_conditions_in_visit_order() {
        let condition = Expr::column("price")
            .gt(Expr::literal(100))
            .and(Expr::column("category").eq(Expr::literal("electronics")));
        let compiled = compile(Select::star().from(Table::new("products")).with_where(condition));
        assert_eq!(
            compiled.sql,
            "SELECT * FROM products WHERE ((price > %s) AND (category = %s))"
        );
        assert_eq!(
            compiled.params,
            vec![Value::Int(100), Value::Text("electronics".into())]
        );
    }

    #[test]
    fn compiles_order_by() {
        let compiled = compile(
            Select::star()
                .from(Table::new("users"))
                .with_order_by(vec![OrderBy::desc(Expr::column("id"))]),
        );
        assert_eq!(compiled.sql, "SELECT * FROM users ORDER BY id DESC");
    }

    #[test]
    fn translates_top_to_order_by_and_limit() {
        let compiled = compile(
            Select::star()
                .from(Table::new("users"))
                .with_top(TopClause::new(10).on(Expr::column("score"), OrderDirection::Desc)),
        );
        assert_eq!(
            compiled.sql,
            "SELECT * FROM users ORDER BY score DESC LIMIT 10"
        );
    }

    #[test]
    fn top_keeps_caller_order_by_when_present() {
        let compiled = compile(
            Select::star()
                .from(Table::new("users"))
                .with_order_by(vec![OrderBy::asc(Expr::column("name"))])
                .with_top(TopClause::new(5).on(Expr::column("score"), OrderDirection::Desc)),
        );
        assert_eq!(
            compiled.sql,
            "SELECT * FROM users ORDER BY name ASC LIMIT 5"
        );
    }

    #[test]
    fn top_with_limit_is_a_programming_error() {
        let error = compile_err(
            Select::star()
                .from(Table::new("users"))
                .with_top(TopClause::new(10))
                .with_limit(5),
        );
        assert!(error
            .to_string()
            .contains("TOP clause is mutually exclusive with LIMIT and OFFSET"));
    }

    #[test]
    fn compiles_group_by_having() {
        let compiled = compile(
            Select::new(vec![Expr::column("dept"), Expr::function("COUNT", vec![Expr::Star])])
                .from(Table::new("employees"))
                .with_group_by(vec![Expr::column("dept")])
                .with_having(
                    Expr::function("COUNT", vec![Expr::Star]).gt(Expr::literal(5)),
                ),
        );
        assert!(compiled.sql.contains("GROUP BY dept"));
        assert!(compiled.sql.contains("HAVING (COUNT(*) > %s)"));
        assert_eq!(compiled.params, vec![Value::Int(5)]);
    }

    #[test]
    fn compiles_limit_offset() {
        let compiled = compile(
            Select::star()
                .from(Table::new("users"))
                .with_limit(10)
                .with_offset(5),
        );
        assert_eq!(compiled.sql, "SELECT * FROM users LIMIT 10 OFFSET 5");
    }

    #[test]
    fn compiles_joins_in_clause_order() {
        let compiled = compile(
            Select::new(vec![Expr::qualified_column("u", "name")])
                .from(Table::new("users").with_alias("u"))
                .with_join(Join::inner(
                    Table::new("orders").with_alias("o"),
                    Expr::qualified_column("o", "user_id").eq(Expr::qualified_column("u", "id")),
                )),
        );
        assert_eq!(
            compiled.sql,
            "SELECT u.name FROM users AS u INNER JOIN orders AS o ON (o.user_id = u.id)"
        );
    }

    #[test]
    fn compiles_cte_prefix() {
        let cte = Cte::new("user_subset", Select::star().from(Table::new("users")));
        let compiled = compile(
            Select::star()
                .from(Table::new("user_subset"))
                .with_cte(cte),
        );
        assert_eq!(
            compiled.sql,
            "WITH user_subset AS (SELECT * FROM users) SELECT * FROM user_subset"
        );
    }

    #[test]
    fn compiles_window_function() {
        let compiled = compile(
            Select::new(vec![
                Expr::column("name"),
                Expr::window(
                    "SUM",
                    vec![Expr::column("salary")],
                    OverClause::new()
                        .with_partition_by(vec![Expr::column("dept")])
                        .with_order_by(vec![OrderBy::asc(Expr::column("id"))]),
                ),
            ])
            .from(Table::new("employees")),
        );
        assert_eq!(
            compiled.sql,
            "SELECT name, SUM(salary) OVER (PARTITION BY dept ORDER BY id ASC) FROM employees"
        );
    }

    #[test]
    fn compiles_case_expression() {
        let compiled = compile(
            Select::new(vec![Expr::case(
                vec![
                    WhenThen::new(Expr::column("score").gt(Expr::literal(90)), Expr::literal("A")),
                    WhenThen::new(Expr::column("score").gt(Expr::literal(80)), Expr::literal("B")),
                ],
                Some(Expr::literal("C")),
            )])
            .from(Table::new("students")),
        );
        assert_eq!(
            compiled.sql,
            "SELECT CASE WHEN (score > %s) THEN %s WHEN (score > %s) THEN %s ELSE %s END FROM students"
        );
        assert_eq!(
            compiled.params,
            vec![
                Value::Int(90),
                Value::Text("A".into()),
                Value::Int(80),
                Value::Text("B".into()),
                Value::Text("C".into())
            ]
        );
    }

    #[test]
    fn compiles_in_and_between() {
        let compiled = compile(
            Select::star().from(Table::new("users")).with_where(
                Expr::column("id").in_list(vec![
                    Expr::literal(1),
                    Expr::literal(2),
                    Expr::literal(3),
                ]),
            ),
        );
        assert_eq!(compiled.sql, "SELECT * FROM users WHERE (id IN (%s, %s, %s))");
        assert_eq!(
            compiled.params,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );

        let compiled = compile(
            Select::star()
                .from(Table::new("products"))
                .with_where(Expr::column("price").between(Expr::literal(10), Expr::literal(50))),
        );
        assert_eq!(
            compiled.sql,
            "SELECT * FROM products WHERE (price BETWEEN %s AND %s)"
        );
        assert_eq!(compiled.params, vec![Value::Int(10), Value::Int(50)]);
    }

    #[test]
    fn compiles_subquery_in_from_and_in_list() {
        let inner = Select::new(vec![Expr::column("id")]).from(Table::new("users"));
        let compiled = compile(
            Select::star().from(Subquery::new(inner.clone()).with_alias("u")),
        );
        assert_eq!(compiled.sql, "SELECT * FROM (SELECT id FROM users) AS u");

        let compiled = compile(
            Select::star().from(Table::new("orders")).with_where(
                Expr::column("user_id").in_list(vec![Expr::subquery(inner)]),
            ),
        );
        assert_eq!(
            compiled.sql,
            "SELECT * FROM orders WHERE (user_id IN ((SELECT id FROM users)))"
        );
    }

    #[test]
    fn compiles_set_operations_unparenthesized() {
        let left = Select::new(vec![Expr::column("id")]).from(Table::new("t1"));
        let right = Select::new(vec![Expr::column("id")]).from(Table::new("t2"));

        let compiled = compile(SetOp::union(left.clone(), right.clone()));
        assert_eq!(compiled.sql, "SELECT id FROM t1 UNION SELECT id FROM t2");

        let compiled = compile(SetOp::union(left.clone(), right.clone()).all());
        assert_eq!(compiled.sql, "SELECT id FROM t1 UNION ALL SELECT id FROM t2");

        let compiled = compile(SetOp::intersect(left.clone(), right.clone()));
        assert_eq!(compiled.sql, "SELECT id FROM t1 INTERSECT SELECT id FROM t2");

        let compiled = compile(SetOp::except(left, right));
        assert_eq!(compiled.sql, "SELECT id FROM t1 EXCEPT SELECT id FROM t2");
    }

    #[test]
    fn compiles_insert_update_delete() {
        let compiled = compile(
            Insert::new(
                Table::new("users"),
                vec![Column::new("name"), Column::new("age")],
            )
            .with_values(vec![Expr::literal("Alice"), Expr::literal(30)]),
        );
        assert_eq!(
            compiled.sql,
            "INSERT INTO users (name, age) VALUES (%s, %s)"
        );
        assert_eq!(
            compiled.params,
            vec![Value::Text("Alice".into()), Value::Int(30)]
        );

        let compiled = compile(
            Update::new(
                Table::new("users"),
                vec![
                    ("age", Expr::literal(31)),
                    ("status", Expr::literal("active")),
                ],
            )
            .with_where(Expr::column("name").eq(Expr::literal("Alice"))),
        );
        assert_eq!(
            compiled.sql,
            "UPDATE users SET age = %s, status = %s WHERE (name = %s)"
        );

        let compiled = compile(
            Delete::new(Table::new("users"))
                .with_where(Expr::column("id").eq(Expr::literal(1))),
        );
        assert_eq!(compiled.sql, "DELETE FROM users WHERE (id = %s)");
        assert_eq!(compiled.params, vec![Value::Int(1)]);
    }

    #[test]
    fn compiles_multi_row_insert() {
        let compiled = compile(
            Insert::new(
                Table::new("users"),
                vec![Column::new("id"), Column::new("name")],
            )
            .with_rows(vec![
                vec![Expr::literal(1), Expr::literal("a")],
                vec![Expr::literal(2), Expr::literal("b")],
            ]),
        );
        assert_eq!(
            compiled.sql,
            "INSERT INTO users (id, name) VALUES (%s, %s), (%s, %s)"
        );
        assert_eq!(
            compiled.params,
            vec![
                Value::Int(1),
                Value::Text("a".into()),
                Value::Int(2),
                Value::Text("b".into())
            ]
        );
    }

    #[test]
    fn insert_requires_exactly_one_of_values_or_rows() {
        let error = compile_err(
            Insert::new(Table::new("users"), vec![Column::new("id")])
                .with_values(vec![Expr::literal(1)])
                .with_rows(vec![vec![Expr::literal(2)]]),
        );
        assert!(error.to_string().contains("exactly one of values or rows"));

        let error = compile_err(Insert::new(Table::new("users"), vec![Column::new("id")]));
        assert!(error.to_string().contains("exactly one of values or rows"));
    }

    #[test]
    fn insert_rows_must_be_rectangular_and_match_columns() {
        let error = compile_err(
            Insert::new(
                Table::new("users"),
                vec![Column::new("id"), Column::new("name")],
            )
            .with_rows(vec![
                vec![Expr::literal(1), Expr::literal("a")],
                vec![Expr::literal(2)],
            ]),
        );
        assert!(error.to_string().contains("same number of values"));

        let error = compile_err(
            Insert::new(
                Table::new("users"),
                vec![Column::new("id"), Column::new("name")],
            )
            .with_rows(vec![vec![Expr::literal(1)]]),
        );
        assert!(error.to_string().contains("same length"));
    }

    #[test]
    fn compiles_on_conflict_do_update_with_excluded() {
        let compiled = compile(
            Insert::new(
                Table::new("users"),
                vec![Column::new("id"), Column::new("email")],
            )
            .with_values(vec![Expr::literal(1), Expr::literal("a@example.com")])
            .with_upsert(
                UpsertClause::update(vec!["email"])
                    .with_conflict_target(ConflictTarget::new(vec![Column::new("id")])),
            ),
        );
        assert_eq!(
            compiled.sql,
            "INSERT INTO users (id, email) VALUES (%s, %s) ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email"
        );
    }

    #[test]
    fn compiles_on_conflict_do_nothing() {
        let compiled = compile(
            Insert::new(
                Table::new("users"),
                vec![Column::new("id"), Column::new("email")],
            )
            .with_values(vec![Expr::literal(1), Expr::literal("a@example.com")])
            .with_upsert(
                UpsertClause::do_nothing()
                    .with_conflict_target(ConflictTarget::new(vec![Column::new("id")])),
            ),
        );
        assert_eq!(
            compiled.sql,
            "INSERT INTO users (id, email) VALUES (%s, %s) ON CONFLICT (id) DO NOTHING"
        );
    }

    #[test]
    fn upsert_discipline_is_enforced() {
        let mut upsert = UpsertClause::update(vec!["email"]);
        upsert.do_nothing = true;
        let error = compile_err(
            Insert::new(Table::new("users"), vec![Column::new("id")])
                .with_values(vec![Expr::literal(1)])
                .with_upsert(upsert),
        );
        assert!(error
            .to_string()
            .contains("do_nothing and update_columns are mutually exclusive"));
    }

    #[test]
    fn compiles_returning_clause() {
        let compiled = compile(
            Insert::new(Table::new("users"), vec![Column::new("email")])
                .with_values(vec![Expr::literal("a@example.com")])
                .with_returning(ReturningClause::new(vec![Expr::column("id")])),
        );
        assert_eq!(
            compiled.sql,
            "INSERT INTO users (email) VALUES (%s) RETURNING id"
        );

        let compiled = compile(
            Delete::new(Table::new("users"))
                .with_where(Expr::column("id").eq(Expr::literal(1)))
                .with_returning(ReturningClause::star()),
        );
        assert_eq!(compiled.sql, "DELETE FROM users WHERE (id = %s) RETURNING *");
    }

    #[test]
    fn compiles_lock_clauses() {
        let compiled = compile(
            Select::star()
                .from(Table::new("jobs"))
                .with_lock(LockClause::new(LockMode::Update).skip_locked()),
        );
        assert_eq!(compiled.sql, "SELECT * FROM jobs FOR UPDATE SKIP LOCKED");

        let error = compile_err(
            Select::star()
                .from(Table::new("jobs"))
                .with_lock(LockClause::new(LockMode::Share).nowait().skip_locked()),
        );
        assert!(error
            .to_string()
            .contains("NOWAIT and SKIP LOCKED are mutually exclusive"));
    }

    #[test]
    fn compiles_create_and_drop_table() {
        let compiled = compile(
            CreateTable::new(
                Table::new("users"),
                vec![
                    ColumnDef::new("id", "SERIAL").primary_key(),
                    ColumnDef::new("name", "VARCHAR(255)").not_null(),
                    ColumnDef::new("age", "INTEGER").with_default(Expr::literal(18)),
                ],
            )
            .if_not_exists(),
        );
        assert_eq!(
            compiled.sql,
            "CREATE TABLE IF NOT EXISTS users (id SERIAL PRIMARY KEY, name VARCHAR(255) NOT NULL, age INTEGER DEFAULT %s)"
        );
        assert_eq!(compiled.params, vec![Value::Int(18)]);

        let compiled = compile(DropTable::new(Table::new("users")).if_exists().cascade());
        assert_eq!(compiled.sql, "DROP TABLE IF EXISTS users CASCADE");
    }

    #[test]
    fn compiles_alter_table_drop_constraint() {
        let compiled = compile(AlterTable::new(
            Table::new("orders"),
            vec![AlterAction::DropConstraint {
                name: "uq_orders_status".into(),
                if_exists: true,
                cascade: true,
            }],
        ));
        assert_eq!(
            compiled.sql,
            "ALTER TABLE orders DROP CONSTRAINT IF EXISTS uq_orders_status CASCADE"
        );
    }

    #[test]
    fn compiles_qualified_identifiers() {
        let compiled = compile(
            Select::new(vec![
                Expr::qualified_column("u", "id"),
                Expr::qualified_column("u", "name"),
            ])
            .from(Table::new("users").with_schema("public")),
        );
        assert_eq!(compiled.sql, "SELECT u.id, u.name FROM public.users");
    }

    #[test]
    fn compilation_is_pure() {
        let compiler = PostgresCompiler::new();
        let statement: Statement = Select::new(vec![Expr::column("name")])
            .from(Table::new("users"))
            .with_where(Expr::column("age").gt(Expr::literal(25)))
            .into();

        let first = compiler.compile(&statement).unwrap();
        let second = compiler.compile(&statement).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.params.len(), 1);
    }
}
