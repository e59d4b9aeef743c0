//! Pure translation between wire records and the local persisted shape.
//!
//! Each kind gets its own mapping function; nothing here touches the store or
//! the network. Nested fields (tags, goals) ride inside the encoded body and
//! decode back byte-for-byte, so `decode_body(to_local(x).body) == x`.

use praxis_proto::{
    EntityKind, RemoteClient, RemoteDocument, RemoteProgressNote, RemoteSession,
    RemoteTreatmentPlan,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::store::{LocalRecord, StoredEntity};

/// Translate a fetched collection into local records, dispatching on kind.
pub fn map_remote(kind: EntityKind, values: &[Value]) -> Result<Vec<LocalRecord>, serde_json::Error> {
    match kind {
        EntityKind::Client => map_each(values, client_to_local),
        EntityKind::Session => map_each(values, session_to_local),
        EntityKind::ProgressNote => map_each(values, note_to_local),
        EntityKind::Document => map_each(values, document_to_local),
        EntityKind::TreatmentPlan => map_each(values, plan_to_local),
    }
}

/// Rehydrate stored entities into their wire form for upload.
pub fn to_wire_batch(
    kind: EntityKind,
    entities: &[StoredEntity],
) -> Result<Vec<Value>, serde_json::Error> {
    entities
        .iter()
        .map(|entity| to_wire(kind, &entity.record))
        .collect()
}

pub fn to_wire(kind: EntityKind, record: &LocalRecord) -> Result<Value, serde_json::Error> {
    match kind {
        EntityKind::Client => rehydrate::<RemoteClient>(&record.body),
        EntityKind::Session => rehydrate::<RemoteSession>(&record.body),
        EntityKind::ProgressNote => rehydrate::<RemoteProgressNote>(&record.body),
        EntityKind::Document => rehydrate::<RemoteDocument>(&record.body),
        EntityKind::TreatmentPlan => rehydrate::<RemoteTreatmentPlan>(&record.body),
    }
}

/// Decode a stored body back into its typed wire record.
pub fn decode_body<R: DeserializeOwned>(record: &LocalRecord) -> Result<R, serde_json::Error> {
    serde_json::from_str(&record.body)
}

pub fn client_to_local(remote: &RemoteClient) -> Result<LocalRecord, serde_json::Error> {
    Ok(LocalRecord {
        id: remote.id.clone(),
        client_id: None,
        summary: format!("{} {}", remote.first_name, remote.last_name),
        body: serde_json::to_string(remote)?,
        updated_at: remote.updated_at,
    })
}

pub fn session_to_local(remote: &RemoteSession) -> Result<LocalRecord, serde_json::Error> {
    Ok(LocalRecord {
        id: remote.id.clone(),
        client_id: Some(remote.client_id.clone()),
        summary: format!(
            "{} ({} min)",
            remote.scheduled_at.format("%Y-%m-%d %H:%M"),
            remote.duration_minutes
        ),
        body: serde_json::to_string(remote)?,
        updated_at: remote.updated_at,
    })
}

pub fn note_to_local(remote: &RemoteProgressNote) -> Result<LocalRecord, serde_json::Error> {
    Ok(LocalRecord {
        id: remote.id.clone(),
        client_id: Some(remote.client_id.clone()),
        summary: snippet(&remote.content),
        body: serde_json::to_string(remote)?,
        updated_at: remote.updated_at,
    })
}

pub fn document_to_local(remote: &RemoteDocument) -> Result<LocalRecord, serde_json::Error> {
    Ok(LocalRecord {
        id: remote.id.clone(),
        client_id: Some(remote.client_id.clone()),
        summary: remote.title.clone(),
        body: serde_json::to_string(remote)?,
        updated_at: remote.updated_at,
    })
}

pub fn plan_to_local(remote: &RemoteTreatmentPlan) -> Result<LocalRecord, serde_json::Error> {
    Ok(LocalRecord {
        id: remote.id.clone(),
        client_id: Some(remote.client_id.clone()),
        summary: remote.title.clone(),
        body: serde_json::to_string(remote)?,
        updated_at: remote.updated_at,
    })
}

fn map_each<R, F>(values: &[Value], map: F) -> Result<Vec<LocalRecord>, serde_json::Error>
where
    R: DeserializeOwned,
    F: Fn(&R) -> Result<LocalRecord, serde_json::Error>,
{
    values
        .iter()
        .map(|value| {
            let remote: R = serde_json::from_value(value.clone())?;
            map(&remote)
        })
        .collect()
}

fn rehydrate<R: DeserializeOwned + Serialize>(body: &str) -> Result<Value, serde_json::Error> {
    let typed: R = serde_json::from_str(body)?;
    serde_json::to_value(typed)
}

/// First line of a note, clipped for list rows.
fn snippet(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or("");
    first_line.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use praxis_proto::{PlanStatus, SessionStatus, TreatmentGoal};
    use serde_json::json;

    fn sample_client() -> RemoteClient {
        RemoteClient {
            id: "c1".into(),
            first_name: "Alice".into(),
            last_name: "Nguyen".into(),
            email: Some("alice@example.com".into()),
            phone: None,
            date_of_birth: None,
            tags: vec!["cbt".into(), "weekly".into()],
            updated_at: "2026-08-01T10:00:00Z".parse().unwrap(),
        }
    }

    fn sample_session() -> RemoteSession {
        RemoteSession {
            id: "s1".into(),
            client_id: "c1".into(),
            scheduled_at: "2026-08-20T09:00:00Z".parse().unwrap(),
            duration_minutes: 50,
            status: SessionStatus::Scheduled,
            location: Some("Room 2".into()),
            updated_at: "2026-08-20T10:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn client_mapping_preserves_id_and_nested_tags() {
        let remote = sample_client();
        let local = client_to_local(&remote).unwrap();
        assert_eq!(local.id, "c1");
        assert_eq!(local.client_id, None);
        assert_eq!(local.summary, "Alice Nguyen");

        let back: RemoteClient = decode_body(&local).unwrap();
        assert_eq!(back, remote);
    }

    #[test]
    fn session_mapping_extracts_client_reference() {
        let remote = sample_session();
        let local = session_to_local(&remote).unwrap();
        assert_eq!(local.client_id.as_deref(), Some("c1"));
        assert_eq!(local.summary, "2026-08-20 09:00 (50 min)");

        let back: RemoteSession = decode_body(&local).unwrap();
        assert_eq!(back, remote);
    }

    #[test]
    fn note_summary_is_first_line_clipped() {
        let remote = RemoteProgressNote {
            id: "n1".into(),
            client_id: "c1".into(),
            session_id: Some("s1".into()),
            content: "Reviewed sleep log.\nDiscussed homework.".into(),
            tags: vec![],
            signed: true,
            updated_at: "2026-08-20T11:00:00Z".parse().unwrap(),
        };
        let local = note_to_local(&remote).unwrap();
        assert_eq!(local.summary, "Reviewed sleep log.");

        let back: RemoteProgressNote = decode_body(&local).unwrap();
        assert_eq!(back, remote);
    }

    #[test]
    fn plan_goals_survive_the_round_trip() {
        let remote = RemoteTreatmentPlan {
            id: "tp1".into(),
            client_id: "c1".into(),
            title: "Anxiety management".into(),
            status: PlanStatus::Active,
            goals: vec![
                TreatmentGoal {
                    description: "Grounding twice a week".into(),
                    target_date: None,
                    achieved: false,
                },
                TreatmentGoal {
                    description: "Sleep diary".into(),
                    target_date: None,
                    achieved: true,
                },
            ],
            updated_at: "2026-08-01T10:00:00Z".parse().unwrap(),
        };
        let local = plan_to_local(&remote).unwrap();
        let back: RemoteTreatmentPlan = decode_body(&local).unwrap();
        assert_eq!(back, remote);
    }

    #[test]
    fn document_round_trips_through_wire_form() {
        let remote = RemoteDocument {
            id: "d1".into(),
            client_id: "c1".into(),
            title: "Intake form".into(),
            file_name: "intake.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 48_213,
            updated_at: "2026-08-01T10:00:00Z".parse().unwrap(),
        };
        let local = document_to_local(&remote).unwrap();
        let wire = to_wire(EntityKind::Document, &local).unwrap();
        let back: RemoteDocument = serde_json::from_value(wire).unwrap();
        assert_eq!(back, remote);
    }

    #[test]
    fn map_remote_rejects_malformed_records() {
        let values = vec![json!({"id": "s1"})];
        assert!(map_remote(EntityKind::Session, &values).is_err());
    }

    #[test]
    fn map_remote_dispatches_on_kind() {
        let values = vec![serde_json::to_value(sample_client()).unwrap()];
        let locals = map_remote(EntityKind::Client, &values).unwrap();
        assert_eq!(locals.len(), 1);
        assert_eq!(locals[0].id, "c1");
    }
}
