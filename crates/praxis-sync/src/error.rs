use praxis_proto::EntityKind;
use thiserror::Error;

/// Failure talking to the REST backend.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server returned {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Failure inside the local persisted store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// Failure of a single entity-kind reconciliation step.
///
/// A step either fully commits or leaves the store untouched, so the error
/// names exactly one kind.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("fetch failed for {kind}: {source}")]
    Transport {
        kind: EntityKind,
        #[source]
        source: TransportError,
    },
    #[error("record decode failed for {kind}: {source}")]
    Decode {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("store write failed for {kind}: {source}")]
    Store {
        kind: EntityKind,
        #[source]
        source: StoreError,
    },
}

impl StepError {
    pub fn kind(&self) -> EntityKind {
        match self {
            StepError::Transport { kind, .. }
            | StepError::Decode { kind, .. }
            | StepError::Store { kind, .. } => *kind,
        }
    }
}

/// Failure of a whole sync invocation.
///
/// Kinds reconciled before the failing step stay committed; callers should
/// treat the local data as partially refreshed, not rolled back.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync aborted while reconciling {failed}: {cause}")]
    Partial {
        succeeded: Vec<EntityKind>,
        failed: EntityKind,
        #[source]
        cause: StepError,
    },
}

impl SyncError {
    pub fn succeeded(&self) -> &[EntityKind] {
        match self {
            SyncError::Partial { succeeded, .. } => succeeded,
        }
    }

    pub fn failed_kind(&self) -> EntityKind {
        match self {
            SyncError::Partial { failed, .. } => *failed,
        }
    }
}
