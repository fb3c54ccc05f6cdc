//! Hiring pipeline projection: applications grouped into status lanes.

use serde::Serialize;

use crate::application::{ApplicationRecord, ApplicationStatus};

/// One pipeline lane.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    pub status: ApplicationStatus,
    /// Most recent application first.
    pub records: Vec<ApplicationRecord>,
}

impl Lane {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Six lanes in display order; lanes without records are present and empty.
///
/// Only [`project`] builds a view, so every status always has its lane.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineView {
    lanes: Vec<Lane>,
}

impl PipelineView {
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, status: ApplicationStatus) -> &Lane {
        // lanes follow ApplicationStatus::ALL, which is declaration order
        &self.lanes[status as usize]
    }

    pub fn into_lanes(self) -> Vec<Lane> {
        self.lanes
    }

    pub fn lane_lengths(&self) -> Vec<usize> {
        self.lanes.iter().map(Lane::len).collect()
    }

    pub fn total(&self) -> usize {
        self.lanes.iter().map(Lane::len).sum()
    }
}

/// Groups `records` by status, newest application first within each lane.
pub fn project(records: &[ApplicationRecord]) -> PipelineView {
    let mut lanes: Vec<Lane> = ApplicationStatus::ALL
        .iter()
        .map(|status| Lane {
            status: *status,
            records: Vec::new(),
        })
        .collect();

    for record in records {
        lanes[record.status as usize].records.push(record.clone());
    }

    for lane in &mut lanes {
        lane.records
            .sort_by(|a, b| b.applied_at.cmp(&a.applied_at).then_with(|| a.id.cmp(&b.id)));
    }

    PipelineView { lanes }
}
