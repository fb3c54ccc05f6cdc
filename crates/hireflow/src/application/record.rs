//! The application record entity and its partial-update patch.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::status::{ApplicationStatus, PaymentStatus};
use crate::error::LifecycleError;

/// One user's application to one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    /// Unique application identifier (UUID).
    pub id: String,
    /// Applicant profile id.
    pub user_id: String,
    /// Job posting id.
    pub job_id: String,
    pub status: ApplicationStatus,
    /// When the application was created. Never changes.
    pub applied_at: DateTime<Utc>,
    /// When the application was last mutated.
    pub updated_at: DateTime<Utc>,
    /// Set only by the assignment-completion signal.
    #[serde(default)]
    pub assignment_completed: bool,
    /// Secondary assignment status ("assigned", "completed", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_status: Option<String>,
    #[serde(default)]
    pub payment_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    /// Amount in minor currency units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_due_date: Option<NaiveDate>,
    /// Joined from the job posting at read time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    /// Joined from the job's company at read time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Joined from the applicant profile at read time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_name: Option<String>,
}

/// Payment terms attached to a payment-gated job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTerms {
    pub amount: i64,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl ApplicationRecord {
    /// Creates a fresh `applied` record with a new UUID.
    pub fn new(user_id: &str, job_id: &str, applied_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            job_id: job_id.to_string(),
            status: ApplicationStatus::Applied,
            applied_at,
            updated_at: applied_at,
            assignment_completed: false,
            assignment_status: None,
            payment_required: false,
            payment_status: None,
            payment_amount: None,
            payment_due_date: None,
            job_title: None,
            company: None,
            applicant_name: None,
        }
    }

    /// Attaches payment terms with the given payment state.
    pub fn with_payment(mut self, terms: &PaymentTerms, status: PaymentStatus) -> Self {
        self.payment_required = true;
        self.payment_amount = Some(terms.amount);
        self.payment_due_date = terms.due_date;
        self.payment_status = Some(status);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true while a required payment has not completed.
    pub fn is_payment_blocked(&self) -> bool {
        self.payment_required && self.payment_status != Some(PaymentStatus::Completed)
    }

    /// Refuses approval while a required payment is outstanding.
    pub fn ensure_payment_settled_for(&self, target: ApplicationStatus) -> Result<(), LifecycleError> {
        if target == ApplicationStatus::Approved && self.is_payment_blocked() {
            return Err(LifecycleError::PaymentPending(self.id.clone()));
        }
        Ok(())
    }

    /// Checks the record-level invariants.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.id.trim().is_empty() {
            return Err(LifecycleError::InvalidRecord("id must not be empty".to_string()));
        }
        if self.user_id.trim().is_empty() || self.job_id.trim().is_empty() {
            return Err(LifecycleError::InvalidRecord(format!(
                "application '{}' must reference a user and a job",
                self.id
            )));
        }
        if self.applied_at > self.updated_at {
            return Err(LifecycleError::InvalidRecord(format!(
                "application '{}' was updated at {} before it was applied at {}",
                self.id, self.updated_at, self.applied_at
            )));
        }
        if let Some(amount) = self.payment_amount {
            if amount < 0 {
                return Err(LifecycleError::InvalidRecord(format!(
                    "application '{}' has a negative payment amount",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Partial update of an application record.
///
/// `expected_status` is a guard: stores must refuse the update when the
/// stored status differs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationPatch {
    pub expected_status: Option<ApplicationStatus>,
    pub status: Option<ApplicationStatus>,
    pub updated_at: Option<DateTime<Utc>>,
    pub assignment_completed: Option<bool>,
    pub assignment_status: Option<String>,
    pub payment_status: Option<PaymentStatus>,
}

impl ApplicationPatch {
    /// Patch that moves `before` to the status and timestamp of `after`.
    pub fn status_change(before: &ApplicationRecord, after: &ApplicationRecord) -> Self {
        Self {
            expected_status: Some(before.status),
            status: Some(after.status),
            updated_at: Some(after.updated_at),
            ..Default::default()
        }
    }

    /// Patch for the external assignment-completion signal.
    pub fn assignment_completed(at: DateTime<Utc>) -> Self {
        Self {
            updated_at: Some(at),
            assignment_completed: Some(true),
            assignment_status: Some("completed".to_string()),
            ..Default::default()
        }
    }

    pub fn payment(status: PaymentStatus, at: DateTime<Utc>) -> Self {
        Self {
            updated_at: Some(at),
            payment_status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.updated_at.is_none()
            && self.assignment_completed.is_none()
            && self.assignment_status.is_none()
            && self.payment_status.is_none()
    }

    /// Applies the patch in place. Guard checks are the caller's job.
    pub fn apply_to(&self, record: &mut ApplicationRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(updated_at) = self.updated_at {
            record.updated_at = updated_at;
        }
        if let Some(completed) = self.assignment_completed {
            record.assignment_completed = completed;
        }
        if let Some(ref assignment_status) = self.assignment_status {
            record.assignment_status = Some(assignment_status.clone());
        }
        if let Some(payment_status) = self.payment_status {
            record.payment_status = Some(payment_status);
        }
    }
}
