use std::collections::HashSet;
use std::fmt;

use sqlx::PgPool;
use tracing::{info, instrument};

use super::schema::{ColumnDefinition, ColumnKey, TABLES};
use crate::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct CatalogColumn {
    table_name: String,
    column_name: String,
    data_type: String,
    max_length: Option<i32>,
    numeric_precision: Option<i32>,
    numeric_scale: Option<i32>,
    nullable: bool,
    has_default: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct CatalogConstraint {
    table_name: String,
    column_name: String,
    constraint_type: String,
    foreign_table: String,
    foreign_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaProblem {
    MissingTable(&'static str),
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    UnexpectedColumn {
        table: &'static str,
        column: String,
    },
    ColumnMismatch {
        table: &'static str,
        column: &'static str,
        expected: String,
        found: String,
    },
    MissingConstraint {
        table: &'static str,
        column: String,
        constraint: String,
    },
}

impl fmt::Display for SchemaProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaProblem::MissingTable(table) => write!(f, "table {} is missing", table),
            SchemaProblem::MissingColumn { table, column } => {
                write!(f, "column {}.{} is missing", table, column)
            }
            SchemaProblem::UnexpectedColumn { table, column } => {
                write!(f, "column {}.{} is not part of the schema", table, column)
            }
            SchemaProblem::ColumnMismatch {
                table,
                column,
                expected,
                found,
            } => write!(
                f,
                "column {}.{} is `{}`, expected `{}`",
                table, column, found, expected
            ),
            SchemaProblem::MissingConstraint {
                table,
                column,
                constraint,
            } => write!(f, "{} on {}.{} is missing", constraint, table, column),
        }
    }
}

#[derive(Debug, Default)]
pub struct SchemaReport {
    pub tables_found: Vec<&'static str>,
    pub problems: Vec<SchemaProblem>,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.problems.is_empty()
    }
}

fn describe(
    data_type: &str,
    max_length: Option<i32>,
    numeric: Option<(i32, i32)>,
    nullable: bool,
    has_default: bool,
) -> String {
    let mut out = data_type.to_string();
    if let Some(length) = max_length {
        out.push_str(&format!("({})", length));
    }
    if let Some((precision, scale)) = numeric {
        out.push_str(&format!("({},{})", precision, scale));
    }
    if !nullable {
        out.push_str(" not null");
    }
    if has_default {
        out.push_str(" default");
    }
    out
}

impl ColumnDefinition {
    fn describe(&self) -> String {
        describe(
            self.data_type,
            self.max_length,
            self.numeric,
            self.nullable,
            self.has_default,
        )
    }
}

impl CatalogColumn {
    fn describe(&self) -> String {
        let numeric = match (self.data_type.as_str(), self.numeric_precision, self.numeric_scale) {
            ("numeric", Some(precision), Some(scale)) => Some((precision, scale)),
            _ => None,
        };
        describe(
            &self.data_type,
            self.max_length,
            numeric,
            self.nullable,
            self.has_default,
        )
    }
}

/// Compares the live catalog of the current schema against [`TABLES`].
#[instrument(skip(pool))]
pub async fn verify_schema(pool: &PgPool) -> Result<SchemaReport, AppError> {
    info!("Verifying database schema");

    let table_names: Vec<String> = TABLES.iter().map(|t| t.name.to_string()).collect();

    let existing: HashSet<String> = sqlx::query_scalar::<_, String>(
        "SELECT table_name::text
         FROM information_schema.tables
         WHERE table_schema = current_schema()
           AND table_type = 'BASE TABLE'
           AND table_name::text = ANY($1)",
    )
    .bind(&table_names)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let columns = sqlx::query_as::<_, CatalogColumn>(
        "SELECT table_name::text AS table_name,
                column_name::text AS column_name,
                data_type::text AS data_type,
                character_maximum_length::int4 AS max_length,
                numeric_precision::int4 AS numeric_precision,
                numeric_scale::int4 AS numeric_scale,
                is_nullable::text = 'YES' AS nullable,
                column_default IS NOT NULL AS has_default
         FROM information_schema.columns
         WHERE table_schema = current_schema()
           AND table_name::text = ANY($1)
         ORDER BY table_name, ordinal_position",
    )
    .bind(&table_names)
    .fetch_all(pool)
    .await?;

    let constraints = sqlx::query_as::<_, CatalogConstraint>(
        "SELECT tc.table_name::text AS table_name,
                kcu.column_name::text AS column_name,
                tc.constraint_type::text AS constraint_type,
                ccu.table_name::text AS foreign_table,
                ccu.column_name::text AS foreign_column
         FROM information_schema.table_constraints tc
         JOIN information_schema.key_column_usage kcu
           ON kcu.constraint_name = tc.constraint_name
          AND kcu.table_schema = tc.table_schema
         JOIN information_schema.constraint_column_usage ccu
           ON ccu.constraint_name = tc.constraint_name
          AND ccu.table_schema = tc.table_schema
         WHERE tc.table_schema = current_schema()
           AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY')
           AND tc.table_name::text = ANY($1)",
    )
    .bind(&table_names)
    .fetch_all(pool)
    .await?;

    let mut report = SchemaReport::default();

    for table in TABLES.iter() {
        if !existing.contains(table.name) {
            report.problems.push(SchemaProblem::MissingTable(table.name));
            continue;
        }
        report.tables_found.push(table.name);

        let found: Vec<&CatalogColumn> =
            columns.iter().filter(|c| c.table_name == table.name).collect();

        for expected in table.columns {
            match found.iter().find(|c| c.column_name == expected.name) {
                Some(actual) if actual.describe() != expected.describe() => {
                    report.problems.push(SchemaProblem::ColumnMismatch {
                        table: table.name,
                        column: expected.name,
                        expected: expected.describe(),
                        found: actual.describe(),
                    });
                }
                Some(_) => {}
                None => report.problems.push(SchemaProblem::MissingColumn {
                    table: table.name,
                    column: expected.name,
                }),
            }
        }

        for actual in &found {
            if !table.columns.iter().any(|c| c.name == actual.column_name) {
                report.problems.push(SchemaProblem::UnexpectedColumn {
                    table: table.name,
                    column: actual.column_name.clone(),
                });
            }
        }

        let has_constraint = |column: &str, kind: &str| {
            constraints.iter().any(|c| {
                c.table_name == table.name && c.column_name == column && c.constraint_type == kind
            })
        };

        for expected in table.columns {
            let kind = match expected.key {
                ColumnKey::Primary => "PRIMARY KEY",
                ColumnKey::Unique => "UNIQUE",
                ColumnKey::None => continue,
            };
            if !has_constraint(expected.name, kind) {
                report.problems.push(SchemaProblem::MissingConstraint {
                    table: table.name,
                    column: expected.name.to_string(),
                    constraint: kind.to_string(),
                });
            }
        }

        for fk in table.foreign_keys() {
            let present = constraints.iter().any(|c| {
                c.table_name == table.name
                    && c.column_name == fk.column
                    && c.constraint_type == "FOREIGN KEY"
                    && c.foreign_table == fk.references_table
                    && c.foreign_column == fk.references_column
            });
            if !present {
                report.problems.push(SchemaProblem::MissingConstraint {
                    table: table.name,
                    column: fk.column.clone(),
                    constraint: format!(
                        "FOREIGN KEY -> {}({})",
                        fk.references_table, fk.references_column
                    ),
                });
            }
        }
    }

    info!(
        tables_found = report.tables_found.len(),
        problems = report.problems.len(),
        "Schema verification finished"
    );

    Ok(report)
}
