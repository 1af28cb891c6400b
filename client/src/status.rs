//! Backend availability state and user-facing notifications
//!
//! [`BackendStatus`] is the single process-wide answer to "should we try the
//! live backend?". It is read synchronously by every facade call and mirrored
//! to the cache so the last known state survives restarts.

use crate::store::LocalCache;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::warn;

/// Availability flag with the time it was last confirmed
pub struct BackendStatus {
    available: AtomicBool,
    last_checked: Mutex<Option<DateTime<Utc>>>,
    cache: Arc<LocalCache>,
}

impl BackendStatus {
    /// Start from the persisted flag, optimistic when none was recorded
    pub fn new(cache: Arc<LocalCache>) -> Self {
        Self {
            available: AtomicBool::new(cache.backend_available()),
            last_checked: Mutex::new(None),
            cache,
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        *self.last_checked.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Record an observation and return the previous state
    pub fn record(&self, available: bool) -> bool {
        let previous = self.available.swap(available, Ordering::SeqCst);
        *self.last_checked.lock().unwrap_or_else(|p| p.into_inner()) = Some(Utc::now());
        if previous != available {
            if let Err(e) = self.cache.set_backend_available(available) {
                warn!(error = %e, "Failed to persist backend availability");
            }
        }
        previous
    }
}

/// Events surfaced to the user as dismissible banners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Backend is back and writes are waiting to be replayed
    SyncAvailable { pending: usize },
    /// Backend is back with nothing queued
    BackendRestored,
    /// Backend unreachable; serving cached or demo data
    UsingFallback,
    SyncCompleted { message: String },
    SyncFailed { message: String },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::SyncAvailable { pending } => write!(
                f,
                "Connection restored. {} pending change(s) can be synchronized.",
                pending
            ),
            Notification::BackendRestored => write!(f, "Connection to the server restored."),
            Notification::UsingFallback => write!(
                f,
                "Server unavailable. Working offline with local data."
            ),
            Notification::SyncCompleted { message } => write!(f, "{}", message),
            Notification::SyncFailed { message } => write!(f, "Sync failed: {}", message),
        }
    }
}

/// Broadcast channel for [`Notification`]s
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers; dropped silently when nobody listens
    pub fn notify(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_starts_from_persisted_flag() {
        let cache = Arc::new(LocalCache::in_memory());
        assert!(BackendStatus::new(cache.clone()).is_available());

        cache.set_backend_available(false).unwrap();
        assert!(!BackendStatus::new(cache).is_available());
    }

    #[test]
    fn test_record_persists_and_returns_previous() {
        let cache = Arc::new(LocalCache::in_memory());
        let status = BackendStatus::new(cache.clone());
        assert!(status.last_checked().is_none());

        assert!(status.record(false));
        assert!(!cache.backend_available());
        assert!(!status.record(true));
        assert!(cache.backend_available());
        assert!(status.last_checked().is_some());
    }

    #[tokio::test]
    async fn test_notifier_broadcasts() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        notifier.notify(Notification::UsingFallback);
        assert_eq!(rx.recv().await.unwrap(), Notification::UsingFallback);
    }

    #[test]
    fn test_notify_without_subscribers_is_fine() {
        Notifier::default().notify(Notification::BackendRestored);
    }

    #[test]
    fn test_banner_text() {
        let text = Notification::SyncAvailable { pending: 3 }.to_string();
        assert!(text.contains("3 pending"));
    }
}
