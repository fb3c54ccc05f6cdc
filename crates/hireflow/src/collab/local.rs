//! In-process collaborator implementations.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use super::{Authorization, CollaboratorError, Notifier, PaymentGate};
use crate::application::Actor;

/// Trusts the role tag carried by the actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorization;

impl Authorization for RoleAuthorization {
    fn can_administer(&self, actor: &Actor) -> bool {
        actor.is_admin()
    }
}

/// A notification that was handed to the [`NotificationLog`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub timestamp: DateTime<Utc>,
    pub recipient_id: String,
    pub subject: String,
    pub message: String,
}

/// Notifier that logs each message and broadcasts it to subscribers
/// instead of delivering email.
///
/// Every recipient is reported as delivered unless it was marked
/// undeliverable with [`NotificationLog::block_recipient`].
#[derive(Clone)]
pub struct NotificationLog {
    sender: broadcast::Sender<NotificationEvent>,
    blocked: Arc<RwLock<HashSet<String>>>,
}

impl NotificationLog {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            blocked: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }

    /// Makes every later send to `recipient_id` fail as undeliverable.
    pub fn block_recipient(&self, recipient_id: &str) {
        match self.blocked.write() {
            Ok(mut blocked) => {
                blocked.insert(recipient_id.to_string());
            }
            Err(poisoned) => {
                log::warn!("Notification log lock was poisoned, recovering");
                poisoned.into_inner().insert(recipient_id.to_string());
            }
        }
    }

    fn is_blocked(&self, recipient_id: &str) -> bool {
        match self.blocked.read() {
            Ok(blocked) => blocked.contains(recipient_id),
            Err(poisoned) => poisoned.into_inner().contains(recipient_id),
        }
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Notifier for NotificationLog {
    async fn send(
        &self,
        recipient_ids: &[String],
        subject: &str,
        message: &str,
    ) -> Vec<(String, Result<(), CollaboratorError>)> {
        recipient_ids
            .iter()
            .map(|recipient_id| {
                if self.is_blocked(recipient_id) {
                    tracing::warn!(recipient = %recipient_id, "Notification undeliverable");
                    return (
                        recipient_id.clone(),
                        Err(CollaboratorError::Undeliverable(recipient_id.clone())),
                    );
                }

                tracing::info!(recipient = %recipient_id, subject = %subject, "Notification sent");
                // Ignore errors - no active receivers is fine
                let _ = self.sender.send(NotificationEvent {
                    timestamp: Utc::now(),
                    recipient_id: recipient_id.clone(),
                    subject: subject.to_string(),
                    message: message.to_string(),
                });
                (recipient_id.clone(), Ok(()))
            })
            .collect()
    }
}

/// In-memory record of which users paid for which jobs.
#[derive(Clone, Default)]
pub struct PaymentLedger {
    paid: Arc<RwLock<HashSet<(String, String)>>>,
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_payment(&self, user_id: &str, job_id: &str) {
        let key = (user_id.to_string(), job_id.to_string());
        match self.paid.write() {
            Ok(mut paid) => {
                paid.insert(key);
            }
            Err(poisoned) => {
                log::warn!("Payment ledger lock was poisoned, recovering");
                poisoned.into_inner().insert(key);
            }
        }
    }
}

#[async_trait]
impl PaymentGate for PaymentLedger {
    async fn has_paid(&self, user_id: &str, job_id: &str) -> Result<bool, CollaboratorError> {
        let key = (user_id.to_string(), job_id.to_string());
        let paid = self
            .paid
            .read()
            .map_err(|_| CollaboratorError::Backend("payment ledger lock poisoned".to_string()))?;
        Ok(paid.contains(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_authorization() {
        let authz = RoleAuthorization;
        assert!(authz.can_administer(&Actor::admin("a")));
        assert!(!authz.can_administer(&Actor::applicant("u")));
    }

    #[tokio::test]
    async fn test_notification_log_reports_per_recipient() {
        let log = NotificationLog::new(16);
        let mut rx = log.subscribe();
        log.block_recipient("bounced");

        let results = log
            .send(
                &["u1".to_string(), "bounced".to_string()],
                "Interview",
                "See you Monday",
            )
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0], ("u1".to_string(), Ok(())));
        assert_eq!(
            results[1].1,
            Err(CollaboratorError::Undeliverable("bounced".to_string()))
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.recipient_id, "u1");
        assert_eq!(event.subject, "Interview");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_notification_log_without_subscribers() {
        let log = NotificationLog::default();
        let results = log.send(&["u1".to_string()], "s", "m").await;
        assert!(results[0].1.is_ok());
    }

    #[tokio::test]
    async fn test_payment_ledger() {
        let ledger = PaymentLedger::new();
        assert!(!ledger.has_paid("u1", "j1").await.unwrap());
        ledger.record_payment("u1", "j1");
        assert!(ledger.has_paid("u1", "j1").await.unwrap());
        assert!(!ledger.has_paid("u1", "j2").await.unwrap());
    }
}
