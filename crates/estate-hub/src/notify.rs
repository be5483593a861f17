use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Outbound message about marketplace activity (new leads, assignments, ticket replies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    /// User the message is addressed to; `None` means the admin inbox.
    pub recipient_id: Option<String>,
    pub subject_id: String,
    pub details: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(template: &str, recipient_id: Option<String>, subject_id: &str) -> Self {
        Self {
            template: template.to_string(),
            recipient_id,
            subject_id: subject_id.to_string(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Trait describing outbound notification hooks (e-mail, SMS or push adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Writes each notification to the log and nothing else. Used until a real transport is
/// configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationPublisher for LogNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        log_notification(&notification);
        Ok(())
    }
}

fn log_notification(notification: &Notification) {
    info!(
        template = %notification.template,
        recipient = notification.recipient_id.as_deref().unwrap_or("admin"),
        subject = %notification.subject_id,
        "notification queued"
    );
}

/// Logs every notification and keeps it in memory so callers can inspect what was sent.
/// Unbounded; meant for tests and short-lived tools.
#[derive(Default, Clone)]
pub struct OutboxNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl OutboxNotifier {
    pub fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl NotificationPublisher for OutboxNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        log_notification(&notification);
        let mut guard = self
            .events
            .lock()
            .map_err(|_| NotifyError::Transport("outbox mutex poisoned".to_string()))?;
        guard.push(notification);
        Ok(())
    }
}

/// Publishes and swallows failures: a lost notification never fails the request.
pub fn dispatch(publisher: &dyn NotificationPublisher, notification: Notification) {
    let template = notification.template.clone();
    if let Err(err) = publisher.publish(notification) {
        tracing::warn!(%template, error = %err, "notification dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenTransport;

    impl NotificationPublisher for BrokenTransport {
        fn publish(&self, _notification: Notification) -> Result<(), NotifyError> {
            Err(NotifyError::Transport("smtp down".to_string()))
        }
    }

    #[test]
    fn outbox_records_notifications() {
        let outbox = OutboxNotifier::default();
        dispatch(
            &outbox,
            Notification::new("lead_created", Some("agent-1".to_string()), "lead-1")
                .with_detail("name", "Asha"),
        );
        let events = outbox.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].details.get("name").map(String::as_str), Some("Asha"));
    }

    #[test]
    fn log_notifier_accepts_everything() {
        let notifier = LogNotifier;
        for n in 0..3 {
            assert!(notifier
                .publish(Notification::new("ticket_reply", None, &format!("ticket-{n}")))
                .is_ok());
        }
    }

    #[test]
    fn dispatch_swallows_transport_errors() {
        dispatch(&BrokenTransport, Notification::new("lead_created", None, "lead-2"));
    }
}
