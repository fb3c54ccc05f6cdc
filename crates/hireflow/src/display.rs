//! Human-readable renderings of application records.
//!
//! Joined fields are optional on the record. This module is the only place
//! that substitutes fallbacks for them.

use crate::application::{ApplicationRecord, ApplicationStatus};

/// Fallback for a missing applicant name or job title.
pub const UNKNOWN: &str = "Unknown";

/// Fallback for any other missing value.
pub const NOT_AVAILABLE: &str = "N/A";

const DATE_FORMAT: &str = "%m/%d/%Y";

fn or_fallback<'a>(value: Option<&'a str>, fallback: &'static str) -> &'a str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

pub fn applicant_name(record: &ApplicationRecord) -> &str {
    or_fallback(record.applicant_name.as_deref(), UNKNOWN)
}

pub fn job_title(record: &ApplicationRecord) -> &str {
    or_fallback(record.job_title.as_deref(), UNKNOWN)
}

pub fn company(record: &ApplicationRecord) -> &str {
    or_fallback(record.company.as_deref(), NOT_AVAILABLE)
}

/// `under_review` renders as `UNDER REVIEW`.
pub fn status_label(status: ApplicationStatus) -> String {
    status.label()
}

pub fn applied_date(record: &ApplicationRecord) -> String {
    record.applied_at.format(DATE_FORMAT).to_string()
}

/// `Completed` once the assignment was submitted, otherwise the secondary
/// assignment status if any.
pub fn assignment(record: &ApplicationRecord) -> String {
    if record.assignment_completed {
        return "Completed".to_string();
    }
    or_fallback(record.assignment_status.as_deref(), NOT_AVAILABLE).to_string()
}

pub fn payment(record: &ApplicationRecord) -> String {
    match record.payment_status {
        Some(status) => status.label(),
        None => NOT_AVAILABLE.to_string(),
    }
}
