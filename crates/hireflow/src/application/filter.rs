//! Query filter for listing application records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::ApplicationRecord;
use super::status::ApplicationStatus;

/// Filter parameters for application listing.
///
/// Results are ordered by `applied_at` descending.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    /// Case-insensitive substring over applicant name, job title and company.
    pub search: Option<String>,
    pub user_id: Option<String>,
    pub job_id: Option<String>,
    /// Inclusive lower bound on `applied_at`.
    pub from_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `applied_at`.
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ApplicationFilter {
    pub fn with_status(status: ApplicationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_search(search: &str) -> Self {
        Self {
            search: Some(search.to_string()),
            ..Default::default()
        }
    }

    /// The trimmed search term, or `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Evaluates every predicate except pagination against one record.
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(ref user_id) = self.user_id {
            if &record.user_id != user_id {
                return false;
            }
        }
        if let Some(ref job_id) = self.job_id {
            if &record.job_id != job_id {
                return false;
            }
        }
        if let Some(from) = self.from_date {
            if record.applied_at < from {
                return false;
            }
        }
        if let Some(to) = self.to_date {
            if record.applied_at > to {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            let needle = term.to_lowercase();
            let hit = [
                record.applicant_name.as_deref(),
                record.job_title.as_deref(),
                record.company.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }

    /// Filters, orders newest first and paginates an in-memory collection.
    pub fn apply(&self, records: &[ApplicationRecord]) -> Vec<ApplicationRecord> {
        let mut matched: Vec<ApplicationRecord> =
            records.iter().filter(|r| self.matches(r)).cloned().collect();
        matched.sort_by(|a, b| b.applied_at.cmp(&a.applied_at).then_with(|| a.id.cmp(&b.id)));

        let offset = self.offset.unwrap_or(0) as usize;
        let iter = matched.into_iter().skip(offset);
        match self.limit {
            Some(limit) => iter.take(limit as usize).collect(),
            None => iter.collect(),
        }
    }
}
