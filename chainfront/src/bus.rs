//! Notification bus.
//!
//! A lightweight pub-sub log of typed lifecycle events. The core only
//! appends records and fans them out; any toast/badge presentation belongs
//! to UI collaborators consuming [`NotificationBus::subscribe`] or polling
//! [`NotificationBus::all`].
//!
//! `notify` is synchronous and never blocks the caller: the log append is a
//! short lock hold and the broadcast send drops messages for lagging
//! receivers instead of waiting on them.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::util::now_ms;

/// Capacity of the broadcast fan-out channel.
const BROADCAST_CAPACITY: usize = 64;

/// Kind of lifecycle event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A wallet session was established.
    WalletConnected,
    /// The wallet session ended.
    WalletDisconnected,
    /// A tracked balance moved.
    BalanceChanged,
    /// A transaction entered the pending state.
    TransactionSubmitted,
    /// A transaction settled.
    TransactionConfirmed,
    /// A transaction failed or was rejected at the agent prompt.
    TransactionFailed,
    /// The simulated chain advanced a block.
    NewBlock,
}

/// A single notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique id, used for read tracking.
    pub id: Uuid,
    /// Event kind.
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Human-readable detail.
    pub message: String,
    /// Creation time, Unix milliseconds.
    pub timestamp: u64,
    /// Whether a UI collaborator has acknowledged it.
    pub read: bool,
    /// Opaque structured payload (hashes, addresses, amounts).
    pub data: serde_json::Value,
}

/// Append-only, newest-first notification log with broadcast fan-out.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

#[derive(Debug)]
struct BusInner {
    /// Newest first.
    log: RwLock<Vec<Notification>>,
    tx: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(BusInner {
                log: RwLock::new(Vec::new()),
                tx,
            }),
        }
    }

    /// Append a notification and fan it out to subscribers.
    pub fn notify(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            message: message.into(),
            timestamp: now_ms(),
            read: false,
            data,
        };
        trace!(kind = ?kind, title = %notification.title, "notification recorded");

        self.lock_write().insert(0, notification.clone());
        // Subscribers may be absent or lagging; neither blocks the caller.
        let _ = self.inner.tx.send(notification.clone());
        notification
    }

    /// Subscribe to live notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.tx.subscribe()
    }

    /// Snapshot of the full log, newest first.
    #[must_use]
    pub fn all(&self) -> Vec<Notification> {
        self.lock_read().clone()
    }

    /// Number of notifications not yet marked read.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.lock_read().iter().filter(|n| !n.read).count()
    }

    /// Mark one notification read. Returns whether the id was found.
    pub fn mark_read(&self, id: Uuid) -> bool {
        let mut log = self.lock_write();
        match log.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    /// Mark every notification read.
    pub fn mark_all_read(&self) {
        for n in self.lock_write().iter_mut() {
            n.read = true;
        }
    }

    /// Total number of recorded notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_read().len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_read().is_empty()
    }

    fn lock_read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Notification>> {
        self.inner.log.read().expect("notification log poisoned")
    }

    fn lock_write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Notification>> {
        self.inner.log.write().expect("notification log poisoned")
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_newest_first() {
        let bus = NotificationBus::new();
        bus.notify(NotificationKind::WalletConnected, "first", "", serde_json::Value::Null);
        bus.notify(NotificationKind::NewBlock, "second", "", serde_json::Value::Null);

        let all = bus.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "second");
        assert_eq!(all[1].title, "first");
    }

    #[test]
    fn read_tracking() {
        let bus = NotificationBus::new();
        let n = bus.notify(NotificationKind::NewBlock, "a", "", serde_json::Value::Null);
        bus.notify(NotificationKind::NewBlock, "b", "", serde_json::Value::Null);
        assert_eq!(bus.unread_count(), 2);

        assert!(bus.mark_read(n.id));
        assert_eq!(bus.unread_count(), 1);

        bus.mark_all_read();
        assert_eq!(bus.unread_count(), 0);
        assert!(!bus.mark_read(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn subscribers_receive_live_events() {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe();

        bus.notify(
            NotificationKind::TransactionSubmitted,
            "submitted",
            "tx pending",
            serde_json::json!({"hash": "0xabc"}),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, NotificationKind::TransactionSubmitted);
        assert_eq!(received.data["hash"], "0xabc");
    }

    #[test]
    fn notify_without_subscribers_does_not_block() {
        let bus = NotificationBus::new();
        for _ in 0..(BROADCAST_CAPACITY * 2) {
            bus.notify(NotificationKind::NewBlock, "tick", "", serde_json::Value::Null);
        }
        assert_eq!(bus.len(), BROADCAST_CAPACITY * 2);
    }
}
