//! Offline-first sync engine for the praxis clinical client.
//!
//! Reconciles the REST backend with a local SQLite store, tracks records
//! edited offline, and publishes an observable sync state for the UI layer.

pub mod config;
pub mod error;
pub mod mapper;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;
pub mod tracker;

pub use error::{StepError, StoreError, SyncError, TransportError};
pub use remote::{HttpRemote, RemoteSource};
pub use state::SyncState;
pub use store::{LocalRecord, LocalStore, StoredEntity};
pub use sync::{SyncCoordinator, SyncOutcome};
pub use tracker::ChangeTracker;
