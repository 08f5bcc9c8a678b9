use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

use crate::error::AppError;

pub const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    username VARCHAR(50) UNIQUE NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    role VARCHAR(20) NOT NULL,
    team_id INTEGER,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const CREATE_TEAMS: &str = r#"
CREATE TABLE IF NOT EXISTS teams (
    id SERIAL PRIMARY KEY,
    name VARCHAR(50) NOT NULL,
    leader_id INTEGER REFERENCES users(id)
)
"#;

pub const CREATE_TEAM_MEMBERS: &str = r#"
CREATE TABLE IF NOT EXISTS team_members (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    team_id INTEGER REFERENCES teams(id)
)
"#;

pub const CREATE_COACHINGS: &str = r#"
CREATE TABLE IF NOT EXISTS coachings (
    id SERIAL PRIMARY KEY,
    team_id INTEGER REFERENCES teams(id),
    team_member_name VARCHAR(100) NOT NULL,
    coaching_style VARCHAR(20) NOT NULL,
    tcap_id VARCHAR(50),
    time_spent INTEGER NOT NULL,
    checkmarks JSONB NOT NULL,
    performance_rating INTEGER NOT NULL,
    total_score DECIMAL(3,1) NOT NULL,
    notes TEXT,
    project_notes TEXT,
    coached_by INTEGER REFERENCES users(id),
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

static REFERENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(\w+)\s+INTEGER\s+REFERENCES\s+(\w+)\s*\(\s*(\w+)\s*\)")
        .expect("foreign key pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKey {
    None,
    Primary,
    Unique,
}

/// A column as `information_schema.columns` reports it.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinition {
    pub name: &'static str,
    pub data_type: &'static str,
    pub max_length: Option<i32>,
    pub numeric: Option<(i32, i32)>,
    pub nullable: bool,
    pub has_default: bool,
    pub key: ColumnKey,
}

const fn column(name: &'static str, data_type: &'static str, nullable: bool) -> ColumnDefinition {
    ColumnDefinition {
        name,
        data_type,
        max_length: None,
        numeric: None,
        nullable,
        has_default: false,
        key: ColumnKey::None,
    }
}

const fn varchar(name: &'static str, length: i32, nullable: bool) -> ColumnDefinition {
    ColumnDefinition {
        max_length: Some(length),
        ..column(name, "character varying", nullable)
    }
}

const fn serial_id() -> ColumnDefinition {
    ColumnDefinition {
        has_default: true,
        key: ColumnKey::Primary,
        ..column("id", "integer", false)
    }
}

const fn created_at() -> ColumnDefinition {
    ColumnDefinition {
        has_default: true,
        ..column("created_at", "timestamp without time zone", true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

#[derive(Debug)]
pub struct TableDefinition {
    pub name: &'static str,
    pub create_sql: &'static str,
    pub columns: &'static [ColumnDefinition],
}

impl TableDefinition {
    pub fn foreign_keys(&self) -> Vec<ForeignKey> {
        REFERENCES
            .captures_iter(self.create_sql)
            .map(|caps| ForeignKey {
                column: caps[1].to_lowercase(),
                references_table: caps[2].to_lowercase(),
                references_column: caps[3].to_lowercase(),
            })
            .collect()
    }
}

/// Every table the application needs, in creation order. A table only
/// references tables that precede it.
pub static TABLES: [TableDefinition; 4] = [
    TableDefinition {
        name: "users",
        create_sql: CREATE_USERS,
        columns: &[
            serial_id(),
            ColumnDefinition {
                key: ColumnKey::Unique,
                ..varchar("username", 50, false)
            },
            varchar("password_hash", 255, false),
            varchar("role", 20, false),
            column("team_id", "integer", true),
            created_at(),
        ],
    },
    TableDefinition {
        name: "teams",
        create_sql: CREATE_TEAMS,
        columns: &[
            serial_id(),
            varchar("name", 50, false),
            column("leader_id", "integer", true),
        ],
    },
    TableDefinition {
        name: "team_members",
        create_sql: CREATE_TEAM_MEMBERS,
        columns: &[
            serial_id(),
            varchar("name", 100, false),
            column("team_id", "integer", true),
        ],
    },
    TableDefinition {
        name: "coachings",
        create_sql: CREATE_COACHINGS,
        columns: &[
            serial_id(),
            column("team_id", "integer", true),
            varchar("team_member_name", 100, false),
            varchar("coaching_style", 20, false),
            varchar("tcap_id", 50, true),
            column("time_spent", "integer", false),
            column("checkmarks", "jsonb", false),
            column("performance_rating", "integer", false),
            ColumnDefinition {
                numeric: Some((3, 1)),
                ..column("total_score", "numeric", false)
            },
            column("notes", "text", true),
            column("project_notes", "text", true),
            column("coached_by", "integer", true),
            created_at(),
        ],
    },
];

/// Runs one DDL statement against the store.
#[rocket::async_trait]
pub trait SchemaExecutor: Sync {
    async fn execute_ddl(&self, sql: &str) -> Result<(), AppError>;
}

#[rocket::async_trait]
impl SchemaExecutor for PgPool {
    async fn execute_ddl(&self, sql: &str) -> Result<(), AppError> {
        sqlx::raw_sql(sql).execute(self).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOutcome {
    Ready,
    Failed {
        table: &'static str,
        completed: Vec<&'static str>,
        error: String,
    },
}

impl SchemaOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, SchemaOutcome::Ready)
    }
}

/// Creates any missing application tables, in dependency order.
///
/// Never fails: the first statement error is logged and the remaining
/// statements are skipped. Nothing wraps the statements in a transaction, so
/// tables created before the failure stay in place. Existing tables are never
/// altered.
#[instrument(
    skip_all,
    fields(
        error = tracing::field::Empty,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        otel.status_code = tracing::field::Empty,
    )
)]
pub async fn ensure_schema<E>(executor: &E) -> SchemaOutcome
where
    E: SchemaExecutor + ?Sized,
{
    let mut completed = Vec::with_capacity(TABLES.len());

    for table in TABLES.iter() {
        debug!(table = table.name, "Ensuring table exists");

        if let Err(err) = executor.execute_ddl(table.create_sql).await {
            err.record_in_span();
            error!(
                table = table.name,
                completed = ?completed,
                error = %err,
                "Database initialization error"
            );

            return SchemaOutcome::Failed {
                table: table.name,
                completed,
                error: err.to_string(),
            };
        }

        completed.push(table.name);
    }

    info!("Database initialized successfully");
    SchemaOutcome::Ready
}
