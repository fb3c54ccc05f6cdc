//! Application and payment status enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of a job application.
///
/// Variants are declared in pipeline display order, so the derived `Ord`
/// sorts statuses the way lanes are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    UnderReview,
    TestAssigned,
    TestCompleted,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// All statuses in display order.
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Applied,
        ApplicationStatus::UnderReview,
        ApplicationStatus::TestAssigned,
        ApplicationStatus::TestCompleted,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::TestAssigned => "test_assigned",
            ApplicationStatus::TestCompleted => "test_completed",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Returns true for `approved` and `rejected`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }

    /// Statuses reachable from this one in a single transition.
    pub fn allowed_targets(&self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            Applied => &[UnderReview, Approved, Rejected],
            UnderReview => &[TestAssigned, Approved, Rejected],
            TestAssigned => &[TestCompleted, Approved, Rejected],
            TestCompleted => &[Approved, Rejected],
            Approved | Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, target: ApplicationStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Human-readable label: upper-cased with underscores replaced by spaces.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string that is not part of a closed status set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind} status '{value}'")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for ApplicationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                kind: "application",
                value: s.to_string(),
            })
    }
}

/// Payment state of a payment-gated application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ParseStatusError {
                kind: "payment",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_have_no_targets() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.is_terminal(), status.allowed_targets().is_empty());
        }
    }

    #[test]
    fn test_no_self_transitions() {
        for status in ApplicationStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_every_open_status_can_reach_both_terminals() {
        for status in ApplicationStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(ApplicationStatus::Approved));
            assert!(status.can_transition_to(ApplicationStatus::Rejected));
        }
    }

    #[test]
    fn test_parse_round_trips_every_status() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        let err = "hired".parse::<ApplicationStatus>().unwrap_err();
        assert_eq!(err.value, "hired");
        assert_eq!(err.to_string(), "Unknown application status 'hired'");
    }

    #[test]
    fn test_label() {
        assert_eq!(ApplicationStatus::UnderReview.label(), "UNDER REVIEW");
        assert_eq!(ApplicationStatus::Applied.label(), "APPLIED");
        assert_eq!(ApplicationStatus::TestCompleted.label(), "TEST COMPLETED");
    }

    #[test]
    fn test_ord_follows_display_order() {
        let mut shuffled = vec![
            ApplicationStatus::Rejected,
            ApplicationStatus::Applied,
            ApplicationStatus::TestCompleted,
            ApplicationStatus::UnderReview,
            ApplicationStatus::Approved,
            ApplicationStatus::TestAssigned,
        ];
        shuffled.sort();
        assert_eq!(shuffled, ApplicationStatus::ALL.to_vec());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&ApplicationStatus::TestAssigned).unwrap();
        assert_eq!(json, "\"test_assigned\"");
        let parsed: ApplicationStatus = serde_json::from_str("\"under_review\"").unwrap();
        assert_eq!(parsed, ApplicationStatus::UnderReview);
        assert!(serde_json::from_str::<ApplicationStatus>("\"interview\"").is_err());
    }

    #[test]
    fn test_payment_status_parse() {
        assert_eq!("completed".parse::<PaymentStatus>().unwrap(), PaymentStatus::Completed);
        assert!("paid".parse::<PaymentStatus>().is_err());
    }
}
