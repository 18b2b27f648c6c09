use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::domain::{GatewayId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    Default,
    Destructive,
}

/// Transient, user-facing message raised when a gateway call fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub session_id: SessionId,
    pub gateway: GatewayId,
    pub variant: NotificationVariant,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn gateway_failed(session_id: SessionId, gateway: GatewayId) -> Self {
        Self {
            session_id,
            gateway,
            variant: NotificationVariant::Destructive,
            title: "An error occurred".to_string(),
            description: format!(
                "Failed to fetch data for {}. Please try again.",
                gateway.label()
            ),
        }
    }
}

/// Outbound hook for notifications (toast feed, console, chat adapters).
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;

    /// Take every pending notification for a session. Sinks that push
    /// immediately have nothing to hand back.
    fn drain(&self, _session: &SessionId) -> Result<Vec<Notification>, NotificationError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Per-session notification queue drained by the HTTP API.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationSink {
    pending: Arc<Mutex<HashMap<SessionId, Vec<Notification>>>>,
}

impl NotificationSink for InMemoryNotificationSink {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| NotificationError::Transport("notification queue poisoned".to_string()))?;
        pending
            .entry(notification.session_id.clone())
            .or_default()
            .push(notification);
        Ok(())
    }

    fn drain(&self, session: &SessionId) -> Result<Vec<Notification>, NotificationError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| NotificationError::Transport("notification queue poisoned".to_string()))?;
        Ok(pending.remove(session).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_notification_names_the_gateway() {
        let session = SessionId::parse("tab").expect("valid id");
        let notification = Notification::gateway_failed(session, GatewayId::AdverseMedia);
        assert_eq!(notification.title, "An error occurred");
        assert_eq!(
            notification.description,
            "Failed to fetch data for Reputational & Adverse Media. Please try again."
        );
        assert_eq!(notification.variant, NotificationVariant::Destructive);
    }

    #[test]
    fn drain_empties_only_the_requested_session() {
        let sink = InMemoryNotificationSink::default();
        let first = SessionId::parse("a").expect("valid id");
        let second = SessionId::parse("b").expect("valid id");
        sink.publish(Notification::gateway_failed(first.clone(), GatewayId::CourtRecords))
            .expect("publish");
        sink.publish(Notification::gateway_failed(second.clone(), GatewayId::Screening))
            .expect("publish");

        assert_eq!(sink.drain(&first).expect("drain").len(), 1);
        assert!(sink.drain(&first).expect("drain").is_empty());
        assert_eq!(sink.drain(&second).expect("drain").len(), 1);
    }
}
