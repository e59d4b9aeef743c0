use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The record kinds the backend serves and the client persists.
///
/// `SYNC_ORDER` is the reconciliation order: clients first, because every
/// other kind carries a `client_id` reference that screens resolve against
/// the local client table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Client,
    Session,
    ProgressNote,
    Document,
    TreatmentPlan,
}

impl EntityKind {
    pub const SYNC_ORDER: [EntityKind; 5] = [
        EntityKind::Client,
        EntityKind::Session,
        EntityKind::ProgressNote,
        EntityKind::Document,
        EntityKind::TreatmentPlan,
    ];

    /// Stable identifier used as the store's kind column.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::Session => "session",
            EntityKind::ProgressNote => "progress_note",
            EntityKind::Document => "document",
            EntityKind::TreatmentPlan => "treatment_plan",
        }
    }

    /// REST collection path segment, e.g. `GET /api/progress-notes`.
    pub fn endpoint(self) -> &'static str {
        match self {
            EntityKind::Client => "clients",
            EntityKind::Session => "sessions",
            EntityKind::ProgressNote => "progress-notes",
            EntityKind::Document => "documents",
            EntityKind::TreatmentPlan => "treatment-plans",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    pub id: String,
    pub client_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: SessionStatus,
    #[serde(default)]
    pub location: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProgressNote {
    pub id: String,
    pub client_id: String,
    /// Session this note was written for, if any.
    #[serde(default)]
    pub session_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub signed: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanStatus {
    Draft,
    Active,
    Completed,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentGoal {
    pub description: String,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub achieved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTreatmentPlan {
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub status: PlanStatus,
    #[serde(default)]
    pub goals: Vec<TreatmentGoal>,
    pub updated_at: DateTime<Utc>,
}
