use std::path::PathBuf;
use thiserror::Error;

/// Failures of the SQLite application store.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cannot prepare database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored value does not decode into its domain type.
    #[error("application '{id}' has unreadable {column} '{value}'")]
    InvalidValue {
        id: String,
        column: &'static str,
        value: String,
    },

    #[error("database mutex poisoned by a panicking writer")]
    LockPoisoned,
}

impl DatabaseError {
    /// True for UNIQUE and PRIMARY KEY constraint failures.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            ),
            _ => false,
        }
    }
}
