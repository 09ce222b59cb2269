use bitflags::bitflags;

/// Placeholder style for parameterized queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` placeholders (SQLite, MariaDB, SQL Server).
    QuestionMark,
    /// `%s` placeholders (PostgreSQL, MySQL, CockroachDB).
    Format,
    /// `:1`, `:2`, etc. (Oracle).
    NumberedColon,
}

impl PlaceholderStyle {
    /// Render the placeholder for the 1-based parameter position.
    pub fn render(&self, position: usize) -> String {
        match self {
            PlaceholderStyle::QuestionMark => "?".to_string(),
            PlaceholderStyle::Format => "%s".to_string(),
            PlaceholderStyle::NumberedColon => format!(":{}", position),
        }
    }
}

bitflags! {
    /// Per-dialect SQL surface matrix.
    ///
    /// Compilers consult these flags for the shared checks; behavior that
    /// cannot be expressed as a flag (MERGE emission, TOP inlining, ...)
    /// lives in the per-dialect compiler overrides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DialectFeatures: u32 {
        const SET_OP_INTERSECT = 1 << 0;
        const SET_OP_EXCEPT = 1 << 1;
        /// ALL is accepted on INTERSECT/EXCEPT (UNION ALL is universal).
        const SET_OP_ALL = 1 << 2;
        const RETURNING = 1 << 3;
        const DROP_TABLE_CASCADE = 1 << 4;
        /// Index statements are table-scoped (`... ON table` required).
        const INDEX_STATEMENT_REQUIRES_TABLE = 1 << 5;
        const CREATE_TABLE_IF_NOT_EXISTS = 1 << 6;
        const CREATE_INDEX_IF_NOT_EXISTS = 1 << 7;
        const DROP_IF_EXISTS = 1 << 8;
        const MULTI_ROW_VALUES = 1 << 9;
        const LOCK_CLAUSE = 1 << 10;
        const MULTI_ACTION_ALTER = 1 << 11;
        const ALTER_ADD_CONSTRAINT = 1 << 12;
        const ALTER_DROP_CONSTRAINT = 1 << 13;
    }
}

/// How an INSERT conflict clause is lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStrategy {
    /// `INSERT ... ON CONFLICT (...) DO UPDATE / DO NOTHING`.
    OnConflict,
    /// `INSERT ... ON DUPLICATE KEY UPDATE c = VALUES(c)`.
    OnDuplicateKey,
    /// `MERGE INTO ... WHEN MATCHED / WHEN NOT MATCHED`.
    Merge,
}

/// SQL variant targeted by one compiler and one executor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Sqlite,
    MySql,
    MariaDb,
    CockroachDb,
    Oracle,
    SqlServer,
}

impl Dialect {
    /// Stable lowercase identifier used in events and error details.
    pub fn id(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::MySql => "mysql",
            Dialect::MariaDb => "mariadb",
            Dialect::CockroachDb => "cockroachdb",
            Dialect::Oracle => "oracle",
            Dialect::SqlServer => "mssql",
        }
    }

    /// Human-readable name used in compile diagnostics.
    pub fn display_name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "PostgreSQL",
            Dialect::Sqlite => "SQLite",
            Dialect::MySql => "MySQL",
            Dialect::MariaDb => "MariaDB",
            Dialect::CockroachDb => "CockroachDB",
            Dialect::Oracle => "Oracle",
            Dialect::SqlServer => "SQL Server",
        }
    }

    pub fn placeholder_style(&self) -> PlaceholderStyle {
        match self {
            Dialect::Postgres | Dialect::MySql | Dialect::CockroachDb => PlaceholderStyle::Format,
            Dialect::Sqlite | Dialect::MariaDb | Dialect::SqlServer => {
                PlaceholderStyle::QuestionMark
            }
            Dialect::Oracle => PlaceholderStyle::NumberedColon,
        }
    }

    pub fn features(&self) -> DialectFeatures {
        use DialectFeatures as F;
        match self {
            Dialect::Postgres => {
                F::SET_OP_INTERSECT
                    | F::SET_OP_EXCEPT
                    | F::SET_OP_ALL
                    | F::RETURNING
                    | F::DROP_TABLE_CASCADE
                    | F::CREATE_TABLE_IF_NOT_EXISTS
                    | F::CREATE_INDEX_IF_NOT_EXISTS
                    | F::DROP_IF_EXISTS
                    | F::MULTI_ROW_VALUES
                    | F::LOCK_CLAUSE
                    | F::MULTI_ACTION_ALTER
                    | F::ALTER_ADD_CONSTRAINT
                    | F::ALTER_DROP_CONSTRAINT
            }
            Dialect::Sqlite => {
                F::SET_OP_INTERSECT
                    | F::SET_OP_EXCEPT
                    | F::RETURNING
                    | F::CREATE_TABLE_IF_NOT_EXISTS
                    | F::CREATE_INDEX_IF_NOT_EXISTS
                    | F::DROP_IF_EXISTS
                    | F::MULTI_ROW_VALUES
                    | F::LOCK_CLAUSE
            }
            Dialect::MySql => {
                F::INDEX_STATEMENT_REQUIRES_TABLE
                    | F::CREATE_TABLE_IF_NOT_EXISTS
                    | F::DROP_IF_EXISTS
                    | F::MULTI_ROW_VALUES
                    | F::LOCK_CLAUSE
                    | F::MULTI_ACTION_ALTER
                    | F::ALTER_ADD_CONSTRAINT
            }
            Dialect::MariaDb => {
                F::SET_OP_INTERSECT
                    | F::SET_OP_EXCEPT
                    | F::SET_OP_ALL
                    | F::RETURNING
                    | F::DROP_TABLE_CASCADE
                    | F::INDEX_STATEMENT_REQUIRES_TABLE
                    | F::CREATE_TABLE_IF_NOT_EXISTS
                    | F::CREATE_INDEX_IF_NOT_EXISTS
                    | F::DROP_IF_EXISTS
                    | F::MULTI_ROW_VALUES
                    | F::LOCK_CLAUSE
                    | F::MULTI_ACTION_ALTER
                    | F::ALTER_ADD_CONSTRAINT
                    | F::ALTER_DROP_CONSTRAINT
            }
            Dialect::CockroachDb => {
                F::SET_OP_INTERSECT
                    | F::SET_OP_EXCEPT
                    | F::SET_OP_ALL
                    | F::RETURNING
                    | F::DROP_TABLE_CASCADE
                    | F::CREATE_TABLE_IF_NOT_EXISTS
                    | F::CREATE_INDEX_IF_NOT_EXISTS
                    | F::DROP_IF_EXISTS
                    | F::MULTI_ROW_VALUES
                    | F::LOCK_CLAUSE
                    | F::MULTI_ACTION_ALTER
                    | F::ALTER_ADD_CONSTRAINT
                    | F::ALTER_DROP_CONSTRAINT
            }
            Dialect::Oracle => {
                F::SET_OP_INTERSECT
                    | F::SET_OP_EXCEPT
                    | F::LOCK_CLAUSE
                    | F::ALTER_ADD_CONSTRAINT
                    | F::ALTER_DROP_CONSTRAINT
            }
            Dialect::SqlServer => {
                F::SET_OP_INTERSECT
                    | F::SET_OP_EXCEPT
                    | F::INDEX_STATEMENT_REQUIRES_TABLE
                    | F::DROP_IF_EXISTS
                    | F::MULTI_ROW_VALUES
                    | F::MULTI_ACTION_ALTER
                    | F::ALTER_ADD_CONSTRAINT
                    | F::ALTER_DROP_CONSTRAINT
            }
        }
    }

    pub fn supports(&self, feature: DialectFeatures) -> bool {
        self.features().contains(feature)
    }

    pub fn upsert_strategy(&self) -> UpsertStrategy {
        match self {
            Dialect::Postgres | Dialect::Sqlite | Dialect::CockroachDb => {
                UpsertStrategy::OnConflict
            }
            Dialect::MySql | Dialect::MariaDb => UpsertStrategy::OnDuplicateKey,
            Dialect::Oracle | Dialect::SqlServer => UpsertStrategy::Merge,
        }
    }

    // -------------------------------------------------------------------------
    // Transaction syntax
    // -------------------------------------------------------------------------

    /// Explicit begin statement, when the dialect requires one.
    ///
    /// Oracle opens transactions implicitly with the first statement.
    pub fn begin_statement(&self) -> Option<&'static str> {
        match self {
            Dialect::Postgres | Dialect::CockroachDb => Some("BEGIN"),
            Dialect::Sqlite => Some("BEGIN"),
            Dialect::MySql | Dialect::MariaDb => Some("START TRANSACTION"),
            Dialect::SqlServer => Some("BEGIN TRANSACTION"),
            Dialect::Oracle => None,
        }
    }

    /// Accepted isolation level names for `begin(isolation)`.
    pub fn isolation_levels(&self) -> &'static [&'static str] {
        match self {
            Dialect::Sqlite => &["DEFERRED", "IMMEDIATE", "EXCLUSIVE"],
            Dialect::Oracle => &["READ COMMITTED", "SERIALIZABLE"],
            _ => &[
                "READ UNCOMMITTED",
                "READ COMMITTED",
                "REPEATABLE READ",
                "SERIALIZABLE",
            ],
        }
    }

    /// SQLite folds the level into the begin statement instead of issuing
    /// a separate `SET TRANSACTION`.
    pub fn isolation_in_begin(&self) -> bool {
        matches!(self, Dialect::Sqlite)
    }

    pub fn set_isolation_statement(&self, level: &str) -> String {
        format!("SET TRANSACTION ISOLATION LEVEL {}", level)
    }

    pub fn savepoint_statement(&self, name: &str) -> String {
        match self {
            Dialect::SqlServer => format!("SAVE TRANSACTION {}", name),
            _ => format!("SAVEPOINT {}", name),
        }
    }

    pub fn rollback_to_savepoint_statement(&self, name: &str) -> String {
        match self {
            Dialect::SqlServer => format!("ROLLBACK TRANSACTION {}", name),
            _ => format!("ROLLBACK TO SAVEPOINT {}", name),
        }
    }

    /// SQL Server and Oracle have no savepoint release; releasing is a no-op.
    pub fn release_savepoint_statement(&self, name: &str) -> Option<String> {
        match self {
            Dialect::SqlServer | Dialect::Oracle => None,
            _ => Some(format!("RELEASE SAVEPOINT {}", name)),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
