// ============================================================================
// User Notifications
// ============================================================================

use crate::core::{MessageType, ResourceId, Result, SweepError};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    /// Transactions were rolled back without the user asking
    Rollback,
}

/// User-facing message about a data source
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub resource: ResourceId,
    pub category: NotificationCategory,
    pub message: String,
    pub severity: MessageType,
    pub created_at: DateTime<Utc>,
    pub rolled_back: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Notification {
    pub fn new(
        resource: ResourceId,
        category: NotificationCategory,
        message: &str,
        severity: MessageType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource,
            category,
            message: message.to_string(),
            severity,
            created_at: Utc::now(),
            rolled_back: 0,
            failed: 0,
            skipped: 0,
        }
    }

    /// Attach per-item tallies from a sweep
    pub fn with_counts(mut self, rolled_back: usize, failed: usize, skipped: usize) -> Self {
        self.rolled_back = rolled_back;
        self.failed = failed;
        self.skipped = skipped;
        self
    }
}

/// Delivers notifications to the user. Fire-and-forget: implementations
/// must not block on the user reading the message.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<()>;
}

/// Writes notifications to the application log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, notification: Notification) -> Result<()> {
        match notification.severity {
            MessageType::Error => error!(
                "[{}] {:?}: {}",
                notification.resource, notification.category, notification.message
            ),
            MessageType::Warning => warn!(
                "[{}] {:?}: {}",
                notification.resource, notification.category, notification.message
            ),
            MessageType::Information => info!(
                "[{}] {:?}: {}",
                notification.resource, notification.category, notification.message
            ),
        }
        Ok(())
    }
}

/// Hands notifications to an async consumer over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotificationSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotificationSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn notify(&self, notification: Notification) -> Result<()> {
        self.tx
            .send(notification)
            .map_err(|err| SweepError::Notification(format!("receiver dropped: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelNotificationSink::channel();

        let notification = Notification::new(
            ResourceId::from("ds-1"),
            NotificationCategory::Rollback,
            "rolled back",
            MessageType::Error,
        )
        .with_counts(2, 1, 0);
        sink.notify(notification).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.resource.as_str(), "ds-1");
        assert_eq!(received.category, NotificationCategory::Rollback);
        assert_eq!(received.rolled_back, 2);
        assert_eq!(received.failed, 1);
    }

    #[test]
    fn test_channel_sink_closed_receiver() {
        let (sink, rx) = ChannelNotificationSink::channel();
        drop(rx);

        let result = sink.notify(Notification::new(
            ResourceId::from("ds-1"),
            NotificationCategory::Rollback,
            "hello",
            MessageType::Information,
        ));
        assert!(matches!(result, Err(SweepError::Notification(_))));
    }

    #[test]
    fn test_log_sink_never_fails() {
        let sink = LogNotificationSink;
        let result = sink.notify(Notification::new(
            ResourceId::from("ds-1"),
            NotificationCategory::Rollback,
            "rolled back",
            MessageType::Warning,
        ));
        assert!(result.is_ok());
    }
}
