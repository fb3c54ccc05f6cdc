//! Builders for application records used across integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use hireflow::{ApplicationRecord, ApplicationStatus, PaymentStatus, PaymentTerms};

/// Fixed base time so generated records sort deterministically.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()
}

/// Builder for `ApplicationRecord` instances.
pub struct RecordBuilder {
    record: ApplicationRecord,
}

impl RecordBuilder {
    /// An `applied` record of user `u-<n>` to job `j-1`, applied `n` minutes after the base time.
    pub fn new(n: u32) -> Self {
        let at = base_time() + chrono::TimeDelta::minutes(n as i64);
        let mut record = ApplicationRecord::new(&format!("u-{}", n), "j-1", at);
        record.id = format!("app-{:03}", n);
        Self { record }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.record.id = id.to_string();
        self
    }

    pub fn user(mut self, user_id: &str) -> Self {
        self.record.user_id = user_id.to_string();
        self
    }

    pub fn job(mut self, job_id: &str) -> Self {
        self.record.job_id = job_id.to_string();
        self
    }

    pub fn status(mut self, status: ApplicationStatus) -> Self {
        self.record.status = status;
        self
    }

    pub fn applicant_name(mut self, name: &str) -> Self {
        self.record.applicant_name = Some(name.to_string());
        self
    }

    pub fn payment(mut self, amount: i64, status: PaymentStatus) -> Self {
        let terms = PaymentTerms {
            amount,
            due_date: None,
        };
        self.record = self.record.with_payment(&terms, status);
        self
    }

    pub fn build(self) -> ApplicationRecord {
        self.record
    }
}

/// Builds records whose statuses follow `counts`, given as `(status, how_many)` pairs.
pub fn records_with_counts(counts: &[(ApplicationStatus, usize)]) -> Vec<ApplicationRecord> {
    let mut records = Vec::new();
    let mut n = 0;
    for (status, count) in counts {
        for _ in 0..*count {
            records.push(RecordBuilder::new(n).status(*status).build());
            n += 1;
        }
    }
    records
}

/// The ten-record collection used by the dashboard scenarios.
pub fn dashboard_records() -> Vec<ApplicationRecord> {
    records_with_counts(&[
        (ApplicationStatus::Applied, 4),
        (ApplicationStatus::UnderReview, 3),
        (ApplicationStatus::Approved, 2),
        (ApplicationStatus::Rejected, 1),
    ])
}
