//! Status transition policy.
//!
//! Transitions are data-only: they compute the next record and never call
//! stores, notifiers or payment systems. Callers persist the result and
//! trigger side effects as separate steps.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::record::ApplicationRecord;
use super::status::ApplicationStatus;
use crate::error::LifecycleError;

/// Capability tag of whoever invokes an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Applicant,
}

/// The caller of a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn admin(id: &str) -> Self {
        Self {
            id: id.to_string(),
            role: Role::Admin,
        }
    }

    pub fn applicant(id: &str) -> Self {
        Self {
            id: id.to_string(),
            role: Role::Applicant,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Moves `record` to `target` using the current wall clock.
pub fn transition(
    record: &ApplicationRecord,
    target: ApplicationStatus,
    actor: &Actor,
) -> Result<ApplicationRecord, LifecycleError> {
    transition_at(record, target, actor, Utc::now())
}

/// Moves `record` to `target`, stamping `updated_at` from `now`.
///
/// Terminal records fail with `AlreadyTerminal` whatever the target.
/// The returned `updated_at` has microsecond precision and is always
/// strictly after the previous one.
pub fn transition_at(
    record: &ApplicationRecord,
    target: ApplicationStatus,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<ApplicationRecord, LifecycleError> {
    if record.status.is_terminal() {
        return Err(LifecycleError::AlreadyTerminal(record.id.clone()));
    }
    if !record.status.can_transition_to(target) {
        return Err(LifecycleError::InvalidTransition {
            from: record.status,
            to: target,
        });
    }

    let now = now.trunc_subsecs(6);
    let updated_at = if now > record.updated_at {
        now
    } else {
        record.updated_at + TimeDelta::microseconds(1)
    };

    tracing::debug!(
        application_id = %record.id,
        actor = %actor.id,
        from = %record.status,
        to = %target,
        "Application status transition"
    );

    let mut next = record.clone();
    next.status = target;
    next.updated_at = updated_at;
    Ok(next)
}
