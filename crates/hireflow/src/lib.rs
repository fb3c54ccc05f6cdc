pub mod application;
pub mod bulk;
pub mod cache;
pub mod collab;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod export;
pub mod logging;
pub mod pipeline;
pub mod service;
pub mod stats;

pub use application::{
    transition, transition_at, Actor, ApplicationFilter, ApplicationPatch, ApplicationRecord,
    ApplicationStatus, PaymentStatus, PaymentTerms, Role,
};
pub use bulk::{BulkCoordinator, BulkFailure, BulkOperation, BulkResult, BulkSettings, EmailIntent};
pub use cache::QueryCache;
pub use collab::{
    Authorization, CollaboratorError, NotificationLog, Notifier, PaymentGate, PaymentLedger,
    RecordStore, RoleAuthorization,
};
pub use config::{load_config, EngineConfig};
pub use db::{Database, SqliteRecordStore};
pub use error::{ConfigError, ErrorKind, HireflowError, LifecycleError, Result};
pub use logging::init_logging;
pub use pipeline::{project, Lane, PipelineView};
pub use service::{ApplicationService, Collaborators};
pub use stats::{aggregate, StatsSnapshot};
