//! Sync coordinator: one synchronization pass at a time, per-kind steps in
//! dependency order, outcome published to the app-wide sync state.
//!
//! The mutual-exclusion gate is a `tokio::sync::Mutex` acquired with
//! `try_lock` — a second caller never blocks, it gets `Skipped` back. The
//! guard releases the gate on every exit path, including cancellation.

use chrono::Utc;
use parking_lot::Mutex;
use praxis_proto::EntityKind;
use std::sync::Arc;
use tokio::sync::{watch, Mutex as TokioMutex};
use tracing::{debug, info, warn};

use crate::error::{StepError, SyncError};
use crate::mapper;
use crate::remote::RemoteSource;
use crate::state::{SyncState, SyncStatePublisher};
use crate::store::LocalStore;
use crate::tracker::ChangeTracker;

/// Result of one sync invocation that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// All steps ran; `items_synced` counts records written or uploaded.
    Completed { items_synced: usize },
    /// Another invocation held the gate; nothing was done.
    Skipped,
}

/// Which flavor of pass a sync invocation runs.
#[derive(Clone, Copy)]
enum Pass {
    Full,
    Quick,
}

pub struct SyncCoordinator {
    remote: Arc<dyn RemoteSource>,
    store: Arc<Mutex<LocalStore>>,
    tracker: ChangeTracker,
    state: SyncStatePublisher,
    gate: TokioMutex<()>,
}

impl SyncCoordinator {
    pub fn new(remote: Arc<dyn RemoteSource>, store: Arc<Mutex<LocalStore>>) -> Self {
        let tracker = ChangeTracker::new(Arc::clone(&store));
        Self {
            remote,
            store,
            tracker,
            state: SyncStatePublisher::new(),
            gate: TokioMutex::new(()),
        }
    }

    /// Subscribe to the observable sync state.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Current sync state snapshot.
    pub fn state(&self) -> SyncState {
        self.state.current()
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Full reconciliation: fetch every kind's remote collection and merge it
    /// into the store, clients first. Skips without error when a sync is
    /// already in flight.
    pub async fn run_full_sync(&self) -> Result<SyncOutcome, SyncError> {
        let _gate = match self.gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("full sync skipped, another sync is in flight");
                return Ok(SyncOutcome::Skipped);
            }
        };

        let result = {
            let _syncing = self.state.enter_syncing();
            let result = self.run_steps(Pass::Full).await;
            self.finish("full", result)
        };
        result.map(|items_synced| SyncOutcome::Completed { items_synced })
    }

    /// Quick pass: upload only locally dirty records, kind by kind in the
    /// same dependency order, and clear their flags once the server has
    /// accepted them.
    pub async fn run_quick_sync(&self) -> Result<SyncOutcome, SyncError> {
        let _gate = match self.gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("quick sync skipped, another sync is in flight");
                return Ok(SyncOutcome::Skipped);
            }
        };

        let result = {
            let _syncing = self.state.enter_syncing();
            let result = self.run_steps(Pass::Quick).await;
            self.finish("quick", result)
        };
        result.map(|items_synced| SyncOutcome::Completed { items_synced })
    }

    /// Run the five per-kind steps sequentially, aborting on the first
    /// failure. Kinds committed before the failure stay committed.
    async fn run_steps(&self, pass: Pass) -> Result<usize, SyncError> {
        let mut succeeded = Vec::new();
        let mut total = 0;
        for kind in EntityKind::SYNC_ORDER {
            let step = match pass {
                Pass::Full => self.pull_kind(kind).await,
                Pass::Quick => self.push_kind(kind).await,
            };
            match step {
                Ok(count) => {
                    total += count;
                    succeeded.push(kind);
                }
                Err(cause) => {
                    warn!("sync step for {kind} failed: {cause}");
                    return Err(SyncError::Partial {
                        succeeded,
                        failed: kind,
                        cause,
                    });
                }
            }
        }
        Ok(total)
    }

    /// One entity-kind reconciliation: fetch, map, commit as a single batch.
    /// Remote wins for every record the server returns; dirty local-only
    /// records are left for the upload path.
    async fn pull_kind(&self, kind: EntityKind) -> Result<usize, StepError> {
        let fetched = self
            .remote
            .fetch_all(kind)
            .await
            .map_err(|source| StepError::Transport { kind, source })?;
        let records =
            mapper::map_remote(kind, &fetched).map_err(|source| StepError::Decode { kind, source })?;

        let written = self
            .store
            .lock()
            .apply_remote(kind, &records, Utc::now())
            .map_err(|source| StepError::Store { kind, source })?;
        debug!(kind = %kind, written, "reconciled remote batch");
        Ok(written)
    }

    /// Upload one kind's dirty records, then clear their flags. Records stay
    /// dirty unless the server accepted the whole batch.
    async fn push_kind(&self, kind: EntityKind) -> Result<usize, StepError> {
        let dirty = self
            .store
            .lock()
            .fetch_dirty(kind)
            .map_err(|source| StepError::Store { kind, source })?;
        if dirty.is_empty() {
            return Ok(0);
        }

        let payloads =
            mapper::to_wire_batch(kind, &dirty).map_err(|source| StepError::Decode { kind, source })?;
        self.remote
            .push_batch(kind, &payloads)
            .await
            .map_err(|source| StepError::Transport { kind, source })?;

        let ids: Vec<String> = dirty.iter().map(|entity| entity.record.id.clone()).collect();
        self.tracker
            .mark_synced(kind, &ids, Utc::now())
            .map_err(|source| StepError::Store { kind, source })?;
        info!(kind = %kind, uploaded = ids.len(), "uploaded pending records");
        Ok(ids.len())
    }

    /// Common tail for both entry points: refresh the pending count from the
    /// store and publish the outcome. `last_sync` moves only on success.
    fn finish(&self, label: &str, result: Result<usize, SyncError>) -> Result<usize, SyncError> {
        let pending = match self.tracker.total_pending() {
            Ok(count) => Some(count),
            Err(err) => {
                warn!("failed to refresh pending count: {err}");
                None
            }
        };

        match result {
            Ok(count) => {
                self.state.complete(Utc::now(), pending);
                info!(items = count, "{label} sync completed");
                Ok(count)
            }
            Err(err) => {
                self.state.fail(pending);
                Err(err)
            }
        }
    }
}
