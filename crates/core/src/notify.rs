use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{sync::Notify, time::Instant};
use tracing::debug;
use uuid::Uuid;

use crate::{
    config::{DEFAULT_NOTIFICATION_HISTORY, DEFAULT_NOTIFICATION_TTL},
    queues::{FifoDropOldestQueue, Latest1Queue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            severity,
            created_at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

/// Where terminal outcomes are surfaced to the user. Sinks only observe; they
/// never feed back into orchestration state.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Debug, Clone)]
struct Shown {
    notification: Notification,
    shown_at: Instant,
}

/// In-memory sink: one notification visible at a time (the newest replaces
/// the current one), auto-dismissed after `ttl`, with a bounded history of
/// everything that was shown.
pub struct NotificationCenter {
    visible: Latest1Queue<Shown>,
    history: FifoDropOldestQueue<Notification>,
    ttl: Duration,
    changed: Arc<Notify>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL, DEFAULT_NOTIFICATION_HISTORY)
    }
}

impl NotificationCenter {
    pub fn new(ttl: Duration, history: usize) -> Self {
        let changed = Arc::new(Notify::new());
        Self {
            visible: Latest1Queue::new(Arc::clone(&changed)),
            history: FifoDropOldestQueue::new(history),
            ttl,
            changed,
        }
    }

    /// The notification currently on screen, if it has not expired yet.
    pub fn visible(&self) -> Option<Notification> {
        let shown = self.visible.peek()?;
        if shown.shown_at.elapsed() < self.ttl {
            return Some(shown.notification);
        }

        let id = shown.notification.id;
        if self.visible.take_if(|s| s.notification.id == id).is_some() {
            debug!(%id, "notification auto-dismissed");
        }
        None
    }

    pub fn dismiss(&self) -> Option<Notification> {
        self.visible.try_recv().map(|shown| shown.notification)
    }

    /// Everything notified so far, oldest first, up to the history capacity.
    pub fn history(&self) -> Vec<Notification> {
        self.history.snapshot()
    }

    /// Resolves on the next `notify`.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}

impl NotificationSink for NotificationCenter {
    fn notify(&self, notification: Notification) {
        debug!(severity = %notification.severity, message = %notification.message, "notify");
        self.history.push_overwrite(notification.clone());
        self.visible.set(Shown {
            notification,
            shown_at: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn newest_notification_is_the_visible_one() {
        let center = NotificationCenter::new(Duration::from_secs(6), 8);
        center.notify(Notification::info("first"));
        center.notify(Notification::error("second"));

        let visible = center.visible().unwrap();
        assert_eq!(visible.message, "second");
        assert_eq!(visible.severity, Severity::Error);

        let messages: Vec<_> = center.history().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_auto_dismiss_after_ttl() {
        let center = NotificationCenter::new(Duration::from_secs(6), 8);
        center.notify(Notification::success("done"));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(center.visible().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(center.visible().is_none());
        assert_eq!(center.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn replacement_restarts_the_timer() {
        let center = NotificationCenter::new(Duration::from_secs(6), 8);
        center.notify(Notification::info("old"));
        tokio::time::advance(Duration::from_secs(5)).await;
        center.notify(Notification::info("new"));
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(center.visible().map(|n| n.message).as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn dismiss_clears_the_visible_slot() {
        let center = NotificationCenter::default();
        center.notify(Notification::warning("careful"));
        assert_eq!(center.dismiss().map(|n| n.message).as_deref(), Some("careful"));
        assert!(center.visible().is_none());
    }
}
