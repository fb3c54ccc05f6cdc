//! Aggregate statistics over a collection of applications.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::application::{ApplicationRecord, ApplicationStatus};

/// Per-status counts and conversion rate of a collection of applications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total: usize,
    /// Always holds all six statuses, in display order.
    pub counts_by_status: BTreeMap<ApplicationStatus, usize>,
    /// Share of approved applications in percent, one decimal place.
    pub conversion_rate: f64,
}

impl StatsSnapshot {
    pub fn count(&self, status: ApplicationStatus) -> usize {
        self.counts_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Number of applications still awaiting a decision.
    pub fn pending(&self) -> usize {
        ApplicationStatus::ALL
            .iter()
            .filter(|s| !s.is_terminal())
            .map(|s| self.count(*s))
            .sum()
    }
}

/// Counts `records` per status.
pub fn aggregate(records: &[ApplicationRecord]) -> StatsSnapshot {
    let mut counts_by_status: BTreeMap<ApplicationStatus, usize> =
        ApplicationStatus::ALL.iter().map(|s| (*s, 0)).collect();

    for record in records {
        *counts_by_status.entry(record.status).or_insert(0) += 1;
    }

    let total = records.len();
    let approved = counts_by_status
        .get(&ApplicationStatus::Approved)
        .copied()
        .unwrap_or(0);

    StatsSnapshot {
        total,
        counts_by_status,
        conversion_rate: conversion_rate(approved, total),
    }
}

fn conversion_rate(approved: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = approved as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn records_with(statuses: &[ApplicationStatus]) -> Vec<ApplicationRecord> {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
        statuses
            .iter()
            .map(|s| {
                let mut r = ApplicationRecord::new("u", "j", at);
                r.status = *s;
                r
            })
            .collect()
    }

    #[test]
    fn test_empty_collection() {
        let stats = aggregate(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.conversion_rate, 0.0);
        assert_eq!(stats.counts_by_status.len(), 6);
        assert!(stats.counts_by_status.values().all(|c| *c == 0));
    }

    #[test]
    fn test_mixed_collection() {
        use ApplicationStatus::*;
        let mut statuses = vec![Applied; 4];
        statuses.extend([UnderReview; 3]);
        statuses.extend([Approved; 2]);
        statuses.push(Rejected);

        let stats = aggregate(&records_with(&statuses));
        assert_eq!(stats.total, 10);
        assert_eq!(stats.count(Applied), 4);
        assert_eq!(stats.count(UnderReview), 3);
        assert_eq!(stats.count(TestAssigned), 0);
        assert_eq!(stats.count(TestCompleted), 0);
        assert_eq!(stats.count(Approved), 2);
        assert_eq!(stats.count(Rejected), 1);
        assert_eq!(stats.conversion_rate, 20.0);
        assert_eq!(stats.pending(), 7);
    }

    #[test]
    fn test_conversion_rate_rounds_to_one_decimal() {
        use ApplicationStatus::*;
        let stats = aggregate(&records_with(&[Approved, Applied, Applied]));
        assert_eq!(stats.conversion_rate, 33.3);

        let stats = aggregate(&records_with(&[Approved, Approved, Applied]));
        assert_eq!(stats.conversion_rate, 66.7);

        let stats = aggregate(&records_with(&[Approved]));
        assert_eq!(stats.conversion_rate, 100.0);
    }

    #[test]
    fn test_counts_serialize_with_every_status_key() {
        let stats = aggregate(&records_with(&[ApplicationStatus::Rejected]));
        let json = serde_json::to_value(&stats).unwrap();
        let counts = json["countsByStatus"].as_object().unwrap();
        assert_eq!(counts.len(), 6);
        assert_eq!(counts["rejected"], 1);
        assert_eq!(counts["test_completed"], 0);
        assert_eq!(json["conversionRate"], 0.0);
    }
}
