//! Schema migrations for the application store.
//!
//! Versions are recorded in `_migrations`. Each pending step runs inside its
//! own transaction together with its bookkeeping row, so a failed step
//! leaves the schema at the previous version.

use rusqlite::{params, Connection, Transaction};

use super::error::DatabaseError;

/// How a schema step decides whether its SQL still needs to run.
enum Step {
    /// Always run the SQL.
    Create(&'static str),
    /// `ALTER TABLE ... ADD COLUMN`, skipped when the column is already there.
    AddColumn {
        table: &'static str,
        column: &'static str,
        sql: &'static str,
    },
}

struct Migration {
    version: u32,
    name: &'static str,
    step: Step,
}

impl Migration {
    /// Runs the step inside `tx`. Returns false when it was skipped.
    fn apply(&self, tx: &Transaction<'_>) -> Result<bool, DatabaseError> {
        let sql = match self.step {
            Step::Create(sql) => sql,
            Step::AddColumn { table, column, sql } => {
                if column_exists(tx, table, column)? {
                    return Ok(false);
                }
                sql
            }
        };

        tx.execute_batch(sql).map_err(|e| DatabaseError::Migration {
            version: self.version,
            reason: e.to_string(),
        })?;
        Ok(true)
    }
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_directory_tables",
        step: Step::Create(include_str!("sql/001_create_directory.sql")),
    },
    Migration {
        version: 2,
        name: "create_applications_table",
        step: Step::Create(include_str!("sql/002_create_applications.sql")),
    },
    Migration {
        version: 3,
        name: "add_payment_due_date_to_applications",
        step: Step::AddColumn {
            table: "applications",
            column: "payment_due_date",
            sql: include_str!("sql/003_add_payment_due_date.sql"),
        },
    },
];

/// Highest migration version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Highest version recorded in `_migrations`, or 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32, DatabaseError> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

/// Brings the schema up to [`latest_version`].
pub fn run_all(conn: &mut Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )?;

    let from = current_version(conn)?;
    if from > latest_version() {
        return Err(DatabaseError::Migration {
            version: from,
            reason: format!(
                "database schema is newer than this build (latest known version {})",
                latest_version()
            ),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > from) {
        let tx = conn.transaction()?;
        if migration.apply(&tx)? {
            log::info!("Applied migration v{} ({})", migration.version, migration.name);
        } else {
            log::info!(
                "Migration v{} ({}) already satisfied, recording only",
                migration.version,
                migration.name
            );
        }
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    Ok(())
}

/// Checks whether `table` has `column` via `PRAGMA table_info`.
fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    // PRAGMA arguments cannot be bound, so only plain identifiers are accepted.
    if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DatabaseError::Migration {
            version: 0,
            reason: format!("Invalid table name: {}", table),
        });
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}
