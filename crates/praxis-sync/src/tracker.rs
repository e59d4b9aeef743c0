//! Read/clear surface over the per-record dirty flag.
//!
//! Local edit paths set `needs_sync` when they write through the store; this
//! tracker only counts the flag and clears it, and clearing is reserved for
//! the coordinator after a confirmed upload or reconciliation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use praxis_proto::EntityKind;
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::LocalStore;

#[derive(Clone)]
pub struct ChangeTracker {
    store: Arc<Mutex<LocalStore>>,
}

impl ChangeTracker {
    pub fn new(store: Arc<Mutex<LocalStore>>) -> Self {
        Self { store }
    }

    /// Count of records of one kind awaiting upload. Pure read.
    pub fn count_pending(&self, kind: EntityKind) -> Result<usize, StoreError> {
        self.store.lock().count_pending(kind)
    }

    /// Count across all kinds.
    pub fn total_pending(&self) -> Result<usize, StoreError> {
        self.store.lock().count_pending_total()
    }

    /// Clear the dirty flag for the given ids in one transaction.
    pub fn mark_synced(
        &self,
        kind: EntityKind,
        ids: &[String],
        synced_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.store.lock().mark_synced(kind, ids, synced_at)
    }
}
