//! Boundary contracts for the external systems the lifecycle engine calls.
//!
//! The engine owns none of these systems. Each is reached through a narrow
//! trait so hosts can plug in their backend client, and tests can plug in
//! the local implementations from [`local`].

use async_trait::async_trait;
use thiserror::Error;

use crate::application::{
    Actor, ApplicationFilter, ApplicationPatch, ApplicationRecord, ApplicationStatus,
};

pub mod local;

pub use local::{NotificationEvent, NotificationLog, PaymentLedger, RoleAuthorization};

/// Failure of a collaborator call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("An application for user '{user_id}' and job '{job_id}' already exists")]
    Duplicate { user_id: String, job_id: String },

    #[error("Application '{id}' is no longer in status '{expected}'")]
    Conflict {
        id: String,
        expected: ApplicationStatus,
    },

    #[error("Recipient '{0}' cannot be notified")]
    Undeliverable(String),

    #[error("Collaborator call timed out")]
    Timeout,

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<crate::db::DatabaseError> for CollaboratorError {
    fn from(err: crate::db::DatabaseError) -> Self {
        CollaboratorError::Backend(err.to_string())
    }
}

/// Persistent storage of application records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists records matching `filter`, most recent application first.
    async fn fetch(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationRecord>, CollaboratorError>;

    async fn get(&self, id: &str) -> Result<Option<ApplicationRecord>, CollaboratorError>;

    async fn find_by_user_and_job(
        &self,
        user_id: &str,
        job_id: &str,
    ) -> Result<Option<ApplicationRecord>, CollaboratorError>;

    /// Applies `patch` and returns the updated record.
    ///
    /// Fails with `NotFound` for unknown ids and with `Conflict` when the
    /// patch carries an `expected_status` that no longer holds.
    async fn update(
        &self,
        id: &str,
        patch: &ApplicationPatch,
    ) -> Result<ApplicationRecord, CollaboratorError>;

    /// Inserts a new record. Fails with `Duplicate` when the user already
    /// applied to the job.
    async fn insert(&self, record: &ApplicationRecord)
        -> Result<ApplicationRecord, CollaboratorError>;
}

/// Decides whether an actor may run admin-only operations.
pub trait Authorization: Send + Sync {
    fn can_administer(&self, actor: &Actor) -> bool;
}

/// Outbound email/notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one message to every recipient and reports per-recipient outcomes.
    async fn send(
        &self,
        recipient_ids: &[String],
        subject: &str,
        message: &str,
    ) -> Vec<(String, Result<(), CollaboratorError>)>;
}

/// Read-only view of the payment provider.
#[async_trait]
pub trait PaymentGate: Send + Sync {
    async fn has_paid(&self, user_id: &str, job_id: &str) -> Result<bool, CollaboratorError>;
}
