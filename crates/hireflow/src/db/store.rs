//! [`RecordStore`] backed by the SQLite application tables.

use async_trait::async_trait;

use super::application_repo::{self, UpdateOutcome};
use super::Database;
use crate::application::{ApplicationFilter, ApplicationPatch, ApplicationRecord};
use crate::collab::{CollaboratorError, RecordStore};
use crate::config::EngineConfig;
use crate::error::ConfigError;

/// SQLite record store. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the database named by `config`, or the per-user default.
    pub fn open(config: &EngineConfig) -> crate::Result<Self> {
        let path = config
            .resolved_database_path()
            .ok_or_else(|| ConfigError::Validation {
                message: "No database_path configured and no home directory found".to_string(),
            })?;
        Ok(Self::new(Database::open(&path)?))
    }

    /// Opens an in-memory store with all migrations applied.
    pub fn in_memory() -> Result<Self, crate::db::DatabaseError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl SqliteRecordStore {
    /// Runs `work` on the blocking pool so a busy connection cannot stall
    /// the async executor or outlive the caller's timeout.
    async fn run_blocking<T, F>(&self, work: F) -> Result<T, CollaboratorError>
    where
        F: FnOnce(&Database) -> Result<T, CollaboratorError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || work(&db))
            .await
            .map_err(|e| CollaboratorError::Backend(format!("store task failed: {}", e)))?
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn fetch(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationRecord>, CollaboratorError> {
        let filter = filter.clone();
        self.run_blocking(move |db| {
            let (records, total) = application_repo::query(db, &filter)?;
            log::debug!("Fetched {} of {} applications", records.len(), total);
            Ok(records)
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<ApplicationRecord>, CollaboratorError> {
        let id = id.to_string();
        self.run_blocking(move |db| Ok(application_repo::find_by_id(db, &id)?))
            .await
    }

    async fn find_by_user_and_job(
        &self,
        user_id: &str,
        job_id: &str,
    ) -> Result<Option<ApplicationRecord>, CollaboratorError> {
        let (user_id, job_id) = (user_id.to_string(), job_id.to_string());
        self.run_blocking(move |db| {
            Ok(application_repo::find_by_user_and_job(db, &user_id, &job_id)?)
        })
        .await
    }

    async fn update(
        &self,
        id: &str,
        patch: &ApplicationPatch,
    ) -> Result<ApplicationRecord, CollaboratorError> {
        let (id, patch) = (id.to_string(), patch.clone());
        self.run_blocking(move |db| {
            match application_repo::update_fields(db, &id, &patch)? {
                UpdateOutcome::Updated => {}
                UpdateOutcome::NotFound => return Err(CollaboratorError::NotFound(id)),
                UpdateOutcome::StatusMismatch => {
                    return Err(match patch.expected_status {
                        Some(expected) => CollaboratorError::Conflict { id, expected },
                        None => {
                            CollaboratorError::Backend(format!("Update of '{}' changed no rows", id))
                        }
                    });
                }
            }

            application_repo::find_by_id(db, &id)?.ok_or(CollaboratorError::NotFound(id))
        })
        .await
    }

    async fn insert(
        &self,
        record: &ApplicationRecord,
    ) -> Result<ApplicationRecord, CollaboratorError> {
        let record = record.clone();
        self.run_blocking(move |db| {
            if let Err(e) = application_repo::insert(db, &record) {
                if e.is_unique_violation() {
                    log::warn!(
                        "Rejected duplicate application of user {} to job {}",
                        record.user_id,
                        record.job_id
                    );
                    return Err(CollaboratorError::Duplicate {
                        user_id: record.user_id,
                        job_id: record.job_id,
                    });
                }
                return Err(e.into());
            }

            application_repo::find_by_id(db, &record.id)?
                .ok_or(CollaboratorError::NotFound(record.id))
        })
        .await
    }
}
