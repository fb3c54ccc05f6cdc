//! Bulk operation coordinator.
//!
//! Applies one status change or one email intent to a set of application
//! ids. Every id is processed on its own: a failure is recorded against
//! that id and the rest of the batch carries on.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::application::{
    transition, Actor, ApplicationPatch, ApplicationRecord, ApplicationStatus,
};
use crate::collab::{CollaboratorError, Notifier, RecordStore};
use crate::error::{ErrorKind, LifecycleError};

/// Subject and body of a bulk email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailIntent {
    pub subject: String,
    pub message: String,
}

/// The one operation a bulk request applies to every id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOperation {
    StatusChange(ApplicationStatus),
    Email(EmailIntent),
}

impl BulkOperation {
    fn name(&self) -> &'static str {
        match self {
            BulkOperation::StatusChange(_) => "status_change",
            BulkOperation::Email(_) => "email",
        }
    }
}

/// Fan-out limits for bulk operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkSettings {
    /// Maximum number of ids in flight at once.
    pub concurrency: usize,
    /// Deadline for each collaborator call.
    pub timeout: Duration,
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout: Duration::from_secs(5),
        }
    }
}

/// One id that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub id: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Per-id outcome, reported to progress callbacks as items complete.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemOutcome {
    pub id: String,
    pub result: Result<(), LifecycleError>,
}

/// Aggregated outcome of a bulk request. Both lists follow input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    pub succeeded: Vec<String>,
    pub failed: Vec<BulkFailure>,
}

impl BulkResult {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// The failure recorded for `id`, if any.
    pub fn failure(&self, id: &str) -> Option<&BulkFailure> {
        self.failed.iter().find(|f| f.id == id)
    }
}

/// Runs `fut` under `timeout`, mapping collaborator failures to lifecycle errors.
pub(crate) async fn call_with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, LifecycleError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(LifecycleError::from),
        Err(_) => Err(LifecycleError::Timeout),
    }
}

/// Attempts at a guarded status write before giving up on a record that
/// keeps changing underneath us.
pub(crate) const MAX_STATUS_ATTEMPTS: usize = 3;

/// Moves `record` to `target` with a guarded write.
///
/// When another writer changes the status first, the record is read again
/// and the transition policy re-runs against the fresh status, so the
/// caller sees `AlreadyTerminal` or `InvalidTransition` rather than a raw
/// store conflict.
pub(crate) async fn commit_status_change(
    store: &dyn RecordStore,
    timeout: Duration,
    mut record: ApplicationRecord,
    target: ApplicationStatus,
    actor: &Actor,
) -> Result<ApplicationRecord, LifecycleError> {
    for _ in 0..MAX_STATUS_ATTEMPTS {
        let next = transition(&record, target, actor)?;
        record.ensure_payment_settled_for(target)?;

        let patch = ApplicationPatch::status_change(&record, &next);
        let written = tokio::time::timeout(timeout, store.update(&record.id, &patch)).await;
        match written {
            Err(_) => return Err(LifecycleError::Timeout),
            Ok(Ok(updated)) => return Ok(updated),
            Ok(Err(CollaboratorError::Conflict { id, .. })) => {
                tracing::debug!(application_id = %id, "Status changed concurrently, re-reading");
                let fresh = call_with_timeout(timeout, store.get(&id)).await?;
                record = fresh.ok_or(LifecycleError::NotFound(id))?;
            }
            Ok(Err(e)) => return Err(e.into()),
        }
    }

    Err(LifecycleError::Collaborator(format!(
        "application '{}' kept changing while moving it to '{}'",
        record.id, target
    )))
}

/// Drops repeated ids, keeping the first occurrence.
fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

pub struct BulkCoordinator {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    settings: BulkSettings,
}

impl BulkCoordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        settings: BulkSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> BulkSettings {
        self.settings
    }

    pub async fn apply_bulk(
        &self,
        ids: &[String],
        operation: &BulkOperation,
        actor: &Actor,
    ) -> BulkResult {
        self.apply_bulk_with_progress(ids, operation, actor, |_| {})
            .await
    }

    /// Like [`apply_bulk`](Self::apply_bulk), calling `on_item` for every id
    /// as soon as its outcome is known. Callback order follows completion,
    /// not input order.
    pub async fn apply_bulk_with_progress<F>(
        &self,
        ids: &[String],
        operation: &BulkOperation,
        actor: &Actor,
        mut on_item: F,
    ) -> BulkResult
    where
        F: FnMut(&BulkItemOutcome),
    {
        let ids = dedup_ids(ids);
        let span = tracing::info_span!(
            "bulk_operation",
            operation = operation.name(),
            actor = %actor.id,
            count = ids.len()
        );

        async {
            let mut outcomes: Vec<Option<Result<(), LifecycleError>>> = vec![None; ids.len()];

            let mut pending = stream::iter(ids.iter().enumerate())
                .map(|(index, id)| async move { (index, self.apply_one(id, operation, actor).await) })
                .buffer_unordered(self.settings.concurrency.max(1));

            while let Some((index, result)) = pending.next().await {
                let outcome = BulkItemOutcome {
                    id: ids[index].clone(),
                    result,
                };
                on_item(&outcome);
                outcomes[index] = Some(outcome.result);
            }

            let mut result = BulkResult::default();
            for (id, outcome) in ids.iter().zip(outcomes) {
                match outcome {
                    Some(Ok(())) => result.succeeded.push(id.clone()),
                    Some(Err(e)) => result.failed.push(BulkFailure {
                        id: id.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    }),
                    // Every index is filled once the stream drains.
                    None => result.failed.push(BulkFailure {
                        id: id.clone(),
                        kind: ErrorKind::Collaborator,
                        message: "no outcome recorded".to_string(),
                    }),
                }
            }

            tracing::info!(
                succeeded = result.succeeded.len(),
                failed = result.failed.len(),
                "Bulk operation finished"
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn apply_one(
        &self,
        id: &str,
        operation: &BulkOperation,
        actor: &Actor,
    ) -> Result<(), LifecycleError> {
        let timeout = self.settings.timeout;
        let record = call_with_timeout(timeout, self.store.get(id))
            .await?
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;

        match operation {
            BulkOperation::StatusChange(target) => {
                commit_status_change(self.store.as_ref(), timeout, record, *target, actor).await?;
                Ok(())
            }
            BulkOperation::Email(intent) => {
                let recipients = [record.user_id.clone()];
                let sent = tokio::time::timeout(
                    timeout,
                    self.notifier
                        .send(&recipients, &intent.subject, &intent.message),
                )
                .await
                .map_err(|_| LifecycleError::Timeout)?;

                match sent.into_iter().next() {
                    Some((_, Ok(()))) => Ok(()),
                    Some((_, Err(e))) => Err(e.into()),
                    None => Err(LifecycleError::Collaborator(format!(
                        "notifier reported no result for application '{}'",
                        id
                    ))),
                }
            }
        }
    }
}
