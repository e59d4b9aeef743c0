//! Process-wide observable sync status.
//!
//! A single writer (the coordinator) publishes over a watch channel; any
//! number of UI readers subscribe for banners and spinners.

use chrono::{DateTime, Utc};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncState {
    /// True only while one sync invocation is in flight.
    pub is_syncing: bool,
    /// Completion time of the last successful full or quick sync. Left
    /// untouched by failures so the UI can show "stale since X".
    pub last_sync: Option<DateTime<Utc>>,
    /// Count of records with unsynced local mutations.
    pub pending_changes: usize,
}

pub struct SyncStatePublisher {
    tx: watch::Sender<SyncState>,
}

impl SyncStatePublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncState::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SyncState {
        self.tx.borrow().clone()
    }

    /// Flip `is_syncing` on, returning a guard that flips it back off when
    /// dropped — on success, error, and cancellation alike.
    pub fn enter_syncing(&self) -> SyncingGuard<'_> {
        self.tx.send_modify(|state| state.is_syncing = true);
        SyncingGuard { publisher: self }
    }

    pub fn set_pending(&self, pending: usize) {
        self.tx.send_modify(|state| state.pending_changes = pending);
    }

    /// Record a successful sync completion.
    pub fn complete(&self, at: DateTime<Utc>, pending: Option<usize>) {
        self.tx.send_modify(|state| {
            state.last_sync = Some(at);
            if let Some(pending) = pending {
                state.pending_changes = pending;
            }
        });
    }

    /// Record a failed sync. `last_sync` stays where it was.
    pub fn fail(&self, pending: Option<usize>) {
        if let Some(pending) = pending {
            self.set_pending(pending);
        }
    }
}

impl Default for SyncStatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SyncingGuard<'a> {
    publisher: &'a SyncStatePublisher,
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.publisher
            .tx
            .send_modify(|state| state.is_syncing = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syncing_guard_clears_flag_on_drop() {
        let publisher = SyncStatePublisher::new();
        {
            let _guard = publisher.enter_syncing();
            assert!(publisher.current().is_syncing);
        }
        assert!(!publisher.current().is_syncing);
    }

    #[test]
    fn complete_sets_last_sync_and_pending() {
        let publisher = SyncStatePublisher::new();
        let at = Utc::now();
        publisher.complete(at, Some(0));
        let state = publisher.current();
        assert_eq!(state.last_sync, Some(at));
        assert_eq!(state.pending_changes, 0);
    }

    #[test]
    fn fail_leaves_last_sync_untouched() {
        let publisher = SyncStatePublisher::new();
        let at = Utc::now();
        publisher.complete(at, Some(0));
        publisher.fail(Some(3));
        let state = publisher.current();
        assert_eq!(state.last_sync, Some(at));
        assert_eq!(state.pending_changes, 3);
    }

    #[tokio::test]
    async fn subscribers_observe_updates() {
        let publisher = SyncStatePublisher::new();
        let mut rx = publisher.subscribe();
        publisher.set_pending(2);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().pending_changes, 2);
    }
}
