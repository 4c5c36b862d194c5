// ── Notification channel ──
//
// Deduplicated queue of user-facing messages. Any component can post an
// outcome; a display layer observes the ordered list and shows each new
// id exactly once. Entries live until dismissed or reset.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Error,
    Success,
    Warning,
    /// Informational outcome that is not a failure (e.g. nothing to update).
    Info,
}

/// Unique, time-ordered notification id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

type Queue = Arc<Vec<Notification>>;

// ── NotificationChannel ─────────────────────────────────────────────

/// Shared handle to the notification queue. Cloning is cheap; all clones
/// observe the same queue.
#[derive(Clone)]
pub struct NotificationChannel {
    queue: Arc<watch::Sender<Queue>>,
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationChannel {
    pub fn new() -> Self {
        let (queue, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            queue: Arc::new(queue),
        }
    }

    /// Queue a message unless one with identical text is already queued.
    ///
    /// Returns the new id, or `None` when the message was a duplicate.
    pub fn add(&self, message: impl Into<String>, kind: NotificationKind) -> Option<NotificationId> {
        let message = message.into();
        let mut added = None;

        self.queue.send_if_modified(|queue| {
            if queue.iter().any(|n| n.message == message) {
                return false;
            }
            let notification = Notification {
                id: NotificationId::generate(),
                message: message.clone(),
                kind,
                created_at: Utc::now(),
            };
            added = Some(notification.id);
            let mut next = Vec::with_capacity(queue.len() + 1);
            next.extend(queue.iter().cloned());
            next.push(notification);
            *queue = Arc::new(next);
            true
        });

        match added {
            Some(id) => log_added(kind, &message, id),
            None => debug!(text = %message, "duplicate notification suppressed"),
        }
        added
    }

    /// Remove one entry. Absent ids are ignored.
    pub fn remove(&self, id: NotificationId) {
        self.queue.send_if_modified(|queue| {
            if !queue.iter().any(|n| n.id == id) {
                return false;
            }
            *queue = Arc::new(queue.iter().filter(|n| n.id != id).cloned().collect());
            true
        });
    }

    /// Remove every entry.
    pub fn reset(&self) {
        self.queue.send_if_modified(|queue| {
            if queue.is_empty() {
                return false;
            }
            *queue = Arc::new(Vec::new());
            true
        });
    }

    /// Current queue, oldest first.
    pub fn snapshot(&self) -> Arc<Vec<Notification>> {
        self.queue.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// A feed that yields each notification id once.
    pub fn subscribe(&self) -> NotificationFeed {
        NotificationFeed {
            receiver: self.queue.subscribe(),
            seen: HashSet::new(),
        }
    }
}

fn log_added(kind: NotificationKind, message: &str, id: NotificationId) {
    match kind {
        NotificationKind::Error => warn!(%id, text = message, "error notification"),
        NotificationKind::Warning => warn!(%id, text = message, "warning notification"),
        NotificationKind::Success | NotificationKind::Info => {
            info!(%id, kind = %kind, text = message, "notification");
        }
    }
}

// ── NotificationFeed ────────────────────────────────────────────────

/// One consumer's view of the queue.
///
/// Every id is yielded exactly once. Ids that leave the queue before being
/// observed are never yielded, and dismissed ids are never re-yielded.
pub struct NotificationFeed {
    receiver: watch::Receiver<Queue>,
    seen: HashSet<NotificationId>,
}

impl NotificationFeed {
    /// Entries not yet yielded by this feed, without waiting.
    pub fn drain_new(&mut self) -> Vec<Notification> {
        let queue = self.receiver.borrow_and_update().clone();
        self.seen.retain(|id| queue.iter().any(|n| n.id == *id));

        let fresh: Vec<Notification> = queue
            .iter()
            .filter(|n| !self.seen.contains(&n.id))
            .cloned()
            .collect();
        self.seen.extend(fresh.iter().map(|n| n.id));
        fresh
    }

    /// Wait until at least one unseen entry exists and return all of them.
    /// Returns `None` once the channel is gone.
    pub async fn next(&mut self) -> Option<Vec<Notification>> {
        loop {
            let fresh = self.drain_new();
            if !fresh.is_empty() {
                return Some(fresh);
            }
            self.receiver.changed().await.ok()?;
        }
    }
}
