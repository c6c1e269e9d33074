//! Transient UI notifications with automatic expiry.
//!
//! Cart operations push short-lived success or error toasts here; each
//! notification removes itself after its TTL, and clients may dismiss
//! early. The queue is shared state, cheap to clone.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

/// Default lifetime of a notification.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Millisecond-timestamp-derived id, unique within the queue.
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
}

/// Shared queue of active notifications, newest last.
#[derive(Clone, Default)]
pub struct NotificationQueue {
    inner: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a success notification with the default TTL.
    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(message.into(), NotificationKind::Success, DEFAULT_TTL)
    }

    /// Push an error notification with the default TTL.
    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(message.into(), NotificationKind::Error, DEFAULT_TTL)
    }

    /// Push a notification and schedule its removal after `ttl`.
    ///
    /// Returns the notification id.
    pub fn push(&self, message: String, kind: NotificationKind, ttl: Duration) -> u64 {
        let id = {
            let mut queue = lock_queue(&self.inner);
            let mut id = timestamp_millis();
            // Two pushes in the same millisecond would collide
            while queue.iter().any(|n| n.id == id) {
                id += 1;
            }
            debug!(id, ?kind, "notification pushed");
            queue.push(Notification { id, message, kind });
            id
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            lock_queue(&inner).retain(|n| n.id != id);
        });

        id
    }

    /// Dismiss a notification by id. Dismissing an unknown or already
    /// expired id is a no-op.
    pub fn dismiss(&self, id: u64) {
        lock_queue(&self.inner).retain(|n| n.id != id);
    }

    /// Snapshot of the active notifications in insertion order.
    #[must_use]
    pub fn active(&self) -> Vec<Notification> {
        lock_queue(&self.inner).clone()
    }
}

fn lock_queue(inner: &Mutex<Vec<Notification>>) -> std::sync::MutexGuard<'_, Vec<Notification>> {
    // Push and dismiss never panic while holding the lock
    inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notification_expires_after_ttl() {
        let queue = NotificationQueue::new();
        queue.push("Added to cart".to_string(), NotificationKind::Success, DEFAULT_TTL);
        assert_eq!(queue.active().len(), 1);

        tokio::time::sleep(DEFAULT_TTL + Duration::from_millis(10)).await;
        assert!(queue.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ttl_outlives_default() {
        let queue = NotificationQueue::new();
        queue.push(
            "Checkout unavailable".to_string(),
            NotificationKind::Error,
            Duration::from_secs(10),
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(queue.active().len(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(queue.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_is_idempotent() {
        let queue = NotificationQueue::new();
        let id = queue.success("Added to cart");

        queue.dismiss(id);
        queue.dismiss(id);
        queue.dismiss(999_999);
        assert!(queue.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_millisecond_pushes_get_distinct_ids() {
        let queue = NotificationQueue::new();
        let first = queue.success("one");
        let second = queue.success("two");
        let third = queue.error("three");

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(queue.active().len(), 3);

        let ids: Vec<u64> = queue.active().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![first, second, third]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insertion_order_preserved() {
        let queue = NotificationQueue::new();
        queue.success("first");
        queue.error("second");

        let active = queue.active();
        assert_eq!(active[0].message, "first");
        assert_eq!(active[0].kind, NotificationKind::Success);
        assert_eq!(active[1].message, "second");
        assert_eq!(active[1].kind, NotificationKind::Error);
    }
}
