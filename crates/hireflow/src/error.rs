use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::application::ApplicationStatus;
use crate::collab::CollaboratorError;

#[derive(Error, Debug)]
pub enum HireflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Errors surfaced by lifecycle operations on application records.
///
/// Single-record operations return exactly one of these. Bulk operations
/// never return them directly; each failing id carries its [`ErrorKind`]
/// in the batch result instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Invalid status transition from '{from}' to '{to}'")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("Application '{0}' is already in a terminal status")]
    AlreadyTerminal(String),

    #[error("Application not found: {0}")]
    NotFound(String),

    #[error("Collaborator call timed out")]
    Timeout,

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("User '{user_id}' has already applied to job '{job_id}'")]
    DuplicateApplication { user_id: String, job_id: String },

    #[error("Actor '{0}' is not allowed to administer applications")]
    Unauthorized(String),

    #[error("Payment required before user '{user_id}' can apply to job '{job_id}'")]
    PaymentRequired { user_id: String, job_id: String },

    #[error("Application '{0}' has an outstanding payment")]
    PaymentPending(String),

    #[error("Invalid application record: {0}")]
    InvalidRecord(String),
}

impl LifecycleError {
    /// Returns the copyable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            LifecycleError::AlreadyTerminal(_) => ErrorKind::AlreadyTerminal,
            LifecycleError::NotFound(_) => ErrorKind::NotFound,
            LifecycleError::Timeout => ErrorKind::Timeout,
            LifecycleError::Collaborator(_) => ErrorKind::Collaborator,
            LifecycleError::DuplicateApplication { .. } => ErrorKind::DuplicateApplication,
            LifecycleError::Unauthorized(_) => ErrorKind::Unauthorized,
            LifecycleError::PaymentRequired { .. } => ErrorKind::PaymentRequired,
            LifecycleError::PaymentPending(_) => ErrorKind::PaymentPending,
            LifecycleError::InvalidRecord(_) => ErrorKind::InvalidRecord,
        }
    }
}

impl From<CollaboratorError> for LifecycleError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::NotFound(id) => LifecycleError::NotFound(id),
            CollaboratorError::Duplicate { user_id, job_id } => {
                LifecycleError::DuplicateApplication { user_id, job_id }
            }
            CollaboratorError::Timeout => LifecycleError::Timeout,
            other => LifecycleError::Collaborator(other.to_string()),
        }
    }
}

/// Classification of a lifecycle failure, as reported per item in bulk results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidTransition,
    AlreadyTerminal,
    NotFound,
    Timeout,
    Collaborator,
    DuplicateApplication,
    Unauthorized,
    PaymentRequired,
    PaymentPending,
    InvalidRecord,
}

pub type Result<T> = std::result::Result<T, HireflowError>;
