//! Test harness for isolated service execution.
//!
//! The `TestHarness` struct owns a temporary directory holding the SQLite
//! database, the local collaborators and an `ApplicationService` wired to them.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use hireflow::config::EngineConfig;
use hireflow::{
    Actor, ApplicationRecord, ApplicationService, Collaborators, Database, NotificationLog,
    PaymentLedger, RecordStore, RoleAuthorization, SqliteRecordStore,
};

pub struct TestHarness {
    /// Keeps the database directory alive for the harness lifetime.
    _temp_dir: TempDir,
    pub store: Arc<SqliteRecordStore>,
    pub notifier: NotificationLog,
    pub ledger: PaymentLedger,
    pub service: ApplicationService,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("hireflow.db")).expect("Failed to open database");
        let store = Arc::new(SqliteRecordStore::new(db));
        let notifier = NotificationLog::new(64);
        let ledger = PaymentLedger::new();

        let service = ApplicationService::new(
            Collaborators {
                store: store.clone(),
                authorization: Arc::new(RoleAuthorization),
                notifier: Arc::new(notifier.clone()),
                payments: Arc::new(ledger.clone()),
            },
            &config,
        );

        Self {
            _temp_dir: temp_dir,
            store,
            notifier,
            ledger,
            service,
        }
    }

    pub fn admin() -> Actor {
        Actor::admin("admin-1")
    }

    /// Inserts records directly into the store, bypassing the service.
    pub async fn seed(&self, records: &[ApplicationRecord]) -> Vec<String> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.store.insert(record).await.expect("Failed to seed record").id);
        }
        ids
    }
}
