//! Caller-facing facade over the lifecycle core.
//!
//! The service checks authorization and payment gates, runs the pure
//! transition policy, persists the result and keeps the query cache
//! coherent. Every collaborator call runs under the configured timeout.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use tracing::Instrument;

use crate::application::{
    Actor, ApplicationFilter, ApplicationPatch, ApplicationRecord, ApplicationStatus,
    PaymentStatus, PaymentTerms,
};
use crate::bulk::{
    call_with_timeout, commit_status_change, BulkCoordinator, BulkOperation, BulkResult,
    EmailIntent, MAX_STATUS_ATTEMPTS,
};
use crate::cache::QueryCache;
use crate::collab::{Authorization, CollaboratorError, Notifier, PaymentGate, RecordStore};
use crate::config::EngineConfig;
use crate::error::LifecycleError;
use crate::export;
use crate::pipeline::{self, PipelineView};
use crate::stats::{self, StatsSnapshot};

/// The external systems a service talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn RecordStore>,
    pub authorization: Arc<dyn Authorization>,
    pub notifier: Arc<dyn Notifier>,
    pub payments: Arc<dyn PaymentGate>,
}

pub struct ApplicationService {
    store: Arc<dyn RecordStore>,
    authorization: Arc<dyn Authorization>,
    payments: Arc<dyn PaymentGate>,
    bulk: BulkCoordinator,
    cache: Option<QueryCache>,
    timeout: Duration,
}

impl ApplicationService {
    pub fn new(collaborators: Collaborators, config: &EngineConfig) -> Self {
        let cache = if config.cache_enabled() {
            Some(QueryCache::new(
                config.cache_capacity,
                Duration::from_secs(config.cache_ttl_secs),
            ))
        } else {
            None
        };

        Self {
            bulk: BulkCoordinator::new(
                Arc::clone(&collaborators.store),
                collaborators.notifier,
                config.bulk_settings(),
            ),
            store: collaborators.store,
            authorization: collaborators.authorization,
            payments: collaborators.payments,
            cache,
            timeout: config.collaborator_timeout(),
        }
    }

    /// Replaces the memoization cache, or disables it with `None`.
    pub fn with_cache(mut self, cache: Option<QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    fn require_admin(&self, actor: &Actor) -> Result<(), LifecycleError> {
        if self.authorization.can_administer(actor) {
            Ok(())
        } else {
            tracing::warn!(actor = %actor.id, "Rejected admin operation");
            Err(LifecycleError::Unauthorized(actor.id.clone()))
        }
    }

    fn invalidate(&self) {
        if let Some(ref cache) = self.cache {
            cache.invalidate_all();
        }
    }

    async fn load(&self, id: &str) -> Result<ApplicationRecord, LifecycleError> {
        call_with_timeout(self.timeout, self.store.get(id))
            .await?
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))
    }

    /// Creates an application of `actor` to `job_id`.
    ///
    /// Jobs with `payment` terms require the payment gate to confirm the
    /// applicant paid. Re-applying to the same job fails with
    /// `DuplicateApplication`.
    pub async fn apply(
        &self,
        actor: &Actor,
        job_id: &str,
        payment: Option<&PaymentTerms>,
    ) -> Result<ApplicationRecord, LifecycleError> {
        let span = tracing::info_span!("apply", user = %actor.id, job = %job_id);
        async {
            let existing = call_with_timeout(
                self.timeout,
                self.store.find_by_user_and_job(&actor.id, job_id),
            )
            .await?;
            if existing.is_some() {
                return Err(LifecycleError::DuplicateApplication {
                    user_id: actor.id.clone(),
                    job_id: job_id.to_string(),
                });
            }

            let mut record = ApplicationRecord::new(&actor.id, job_id, Utc::now().trunc_subsecs(6));
            if let Some(terms) = payment {
                let paid =
                    call_with_timeout(self.timeout, self.payments.has_paid(&actor.id, job_id))
                        .await?;
                if !paid {
                    return Err(LifecycleError::PaymentRequired {
                        user_id: actor.id.clone(),
                        job_id: job_id.to_string(),
                    });
                }
                record = record.with_payment(terms, PaymentStatus::Completed);
            }
            record.validate()?;

            let created = call_with_timeout(self.timeout, self.store.insert(&record)).await?;
            self.invalidate();
            tracing::info!(application_id = %created.id, "Application created");
            Ok::<_, LifecycleError>(created)
        }
        .instrument(span)
        .await
    }

    /// Moves one application to `target`. Admin only.
    pub async fn change_status(
        &self,
        actor: &Actor,
        id: &str,
        target: ApplicationStatus,
    ) -> Result<ApplicationRecord, LifecycleError> {
        let span = tracing::info_span!("change_status", application_id = %id, to = %target);
        async {
            self.require_admin(actor)?;
            let record = self.load(id).await?;
            let updated =
                commit_status_change(self.store.as_ref(), self.timeout, record, target, actor)
                    .await?;
            self.invalidate();
            Ok::<_, LifecycleError>(updated)
        }
        .instrument(span)
        .await
    }

    /// Records that the applicant submitted their assignment.
    ///
    /// Allowed for the applicant who owns the record and for admins. The
    /// pipeline status is left alone.
    pub async fn complete_assignment(
        &self,
        actor: &Actor,
        id: &str,
    ) -> Result<ApplicationRecord, LifecycleError> {
        let mut record = self.load(id).await?;
        if record.user_id != actor.id {
            self.require_admin(actor)?;
        }

        for _ in 0..MAX_STATUS_ATTEMPTS {
            if record.is_terminal() {
                return Err(LifecycleError::AlreadyTerminal(record.id));
            }

            // Guarded on the status just read so a concurrent rejection wins.
            let patch = ApplicationPatch {
                expected_status: Some(record.status),
                ..ApplicationPatch::assignment_completed(next_timestamp(&record))
            };
            match tokio::time::timeout(self.timeout, self.store.update(id, &patch)).await {
                Err(_) => return Err(LifecycleError::Timeout),
                Ok(Ok(updated)) => {
                    self.invalidate();
                    tracing::info!(application_id = %id, "Assignment completed");
                    return Ok(updated);
                }
                Ok(Err(CollaboratorError::Conflict { .. })) => record = self.load(id).await?,
                Ok(Err(e)) => return Err(e.into()),
            }
        }

        Err(LifecycleError::Collaborator(format!(
            "application '{}' kept changing while completing its assignment",
            id
        )))
    }

    /// Records a payment status reported by the payment provider. Admin only.
    pub async fn set_payment_status(
        &self,
        actor: &Actor,
        id: &str,
        status: PaymentStatus,
    ) -> Result<ApplicationRecord, LifecycleError> {
        self.require_admin(actor)?;
        let record = self.load(id).await?;
        if !record.payment_required {
            return Err(LifecycleError::InvalidRecord(format!(
                "application '{}' does not require payment",
                id
            )));
        }

        let patch = ApplicationPatch::payment(status, next_timestamp(&record));
        let updated = call_with_timeout(self.timeout, self.store.update(id, &patch)).await?;
        self.invalidate();
        Ok(updated)
    }

    /// Applies one status change to many applications. Admin only.
    pub async fn bulk_change_status(
        &self,
        actor: &Actor,
        ids: &[String],
        target: ApplicationStatus,
    ) -> Result<BulkResult, LifecycleError> {
        self.require_admin(actor)?;
        let result = self
            .bulk
            .apply_bulk(ids, &BulkOperation::StatusChange(target), actor)
            .await;
        if !result.succeeded.is_empty() {
            self.invalidate();
        }
        Ok(result)
    }

    /// Emails the applicants behind `ids`. Admin only.
    pub async fn bulk_email(
        &self,
        actor: &Actor,
        ids: &[String],
        intent: EmailIntent,
    ) -> Result<BulkResult, LifecycleError> {
        self.require_admin(actor)?;
        Ok(self
            .bulk
            .apply_bulk(ids, &BulkOperation::Email(intent), actor)
            .await)
    }

    pub async fn get(&self, id: &str) -> Result<ApplicationRecord, LifecycleError> {
        self.load(id).await
    }

    /// Lists records matching `filter`, served from the cache when possible.
    pub async fn list(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Arc<Vec<ApplicationRecord>>, LifecycleError> {
        let Some(ref cache) = self.cache else {
            let records = call_with_timeout(self.timeout, self.store.fetch(filter)).await?;
            return Ok(Arc::new(records));
        };

        if let Some(hit) = cache.get(filter) {
            return Ok(hit);
        }
        let generation = cache.generation();
        let records = call_with_timeout(self.timeout, self.store.fetch(filter)).await?;
        Ok(cache.insert_if_current(filter, records, generation))
    }

    pub async fn stats(&self, filter: &ApplicationFilter) -> Result<StatsSnapshot, LifecycleError> {
        let records = self.list(filter).await?;
        Ok(stats::aggregate(&records))
    }

    pub async fn pipeline(&self, filter: &ApplicationFilter) -> Result<PipelineView, LifecycleError> {
        let records = self.list(filter).await?;
        Ok(pipeline::project(&records))
    }

    pub async fn export_csv(&self, filter: &ApplicationFilter) -> Result<String, LifecycleError> {
        let records = self.list(filter).await?;
        Ok(export::to_csv(&records))
    }
}

/// Wall-clock timestamp for a non-status mutation, kept after the record's
/// last update.
fn next_timestamp(record: &ApplicationRecord) -> chrono::DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    if now > record.updated_at {
        now
    } else {
        record.updated_at + chrono::TimeDelta::microseconds(1)
    }
}
