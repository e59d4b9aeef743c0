//! Local SQLite store shared by the sync engine and the UI layer.
//!
//! Every entity kind lives in one `records` table: scalar columns the list
//! screens need (`client_id`, `summary`), plus an encoded `body` holding the
//! kind-specific fields. Batch writes run inside a transaction so readers see
//! either pre-sync or post-commit state for a kind, never a half-written
//! batch.

use chrono::{DateTime, Utc};
use praxis_proto::EntityKind;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

use crate::error::StoreError;

/// The persisted shape shared by all entity kinds. Kind-specific fields are
/// carried in `body`, an encoded JSON document produced by the mapper.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRecord {
    pub id: String,
    /// Foreign reference for the four client-scoped kinds, `None` for clients.
    pub client_id: Option<String>,
    /// Human-readable label so list screens render without decoding `body`.
    pub summary: String,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

/// A `LocalRecord` together with its sync bookkeeping columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntity {
    pub record: LocalRecord,
    pub needs_sync: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    /// Open the database at the given path and initialize tables if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
PRAGMA journal_mode=WAL;

CREATE TABLE IF NOT EXISTS records (
    kind TEXT NOT NULL,
    id TEXT NOT NULL,
    client_id TEXT,
    summary TEXT NOT NULL,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    needs_sync INTEGER NOT NULL DEFAULT 0,
    last_synced_at TEXT,
    PRIMARY KEY (kind, id)
);

CREATE INDEX IF NOT EXISTS idx_records_needs_sync
ON records(kind, needs_sync);
"#,
        )?;
        Ok(Self { conn })
    }

    /// Apply one kind's remote batch as a single transaction: upsert every
    /// fetched record with its dirty flag cleared, then drop clean local rows
    /// the server no longer returns. Dirty rows are never dropped — a record
    /// awaiting upload must survive until the server has confirmed it.
    pub fn apply_remote(
        &mut self,
        kind: EntityKind,
        records: &[LocalRecord],
        synced_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (kind, id, client_id, summary, body, updated_at, needs_sync, last_synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
                 ON CONFLICT(kind, id) DO UPDATE SET
                    client_id = excluded.client_id,
                    summary = excluded.summary,
                    body = excluded.body,
                    updated_at = excluded.updated_at,
                    needs_sync = 0,
                    last_synced_at = excluded.last_synced_at",
            )?;
            for record in records {
                stmt.execute(params![
                    kind.as_str(),
                    record.id,
                    record.client_id,
                    record.summary,
                    record.body,
                    record.updated_at.to_rfc3339(),
                    synced_at.to_rfc3339(),
                ])?;
            }
        }

        // Server-side deletions: anything clean and absent remotely is gone.
        let keep: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let stale: Vec<String> = {
            let mut stmt =
                tx.prepare("SELECT id FROM records WHERE kind = ?1 AND needs_sync = 0")?;
            let ids = stmt.query_map(params![kind.as_str()], |row| row.get::<_, String>(0))?;
            let mut stale = Vec::new();
            for id in ids {
                let id = id?;
                if !keep.contains(id.as_str()) {
                    stale.push(id);
                }
            }
            stale
        };
        for id in &stale {
            tx.execute(
                "DELETE FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
            )?;
        }

        tx.commit()?;
        Ok(records.len())
    }

    /// Insert or update a record from a local edit path, marking it dirty.
    /// `last_synced_at` is left alone so the record still shows when it was
    /// last reconciled.
    pub fn upsert_local(&self, kind: EntityKind, record: &LocalRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO records (kind, id, client_id, summary, body, updated_at, needs_sync)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
             ON CONFLICT(kind, id) DO UPDATE SET
                client_id = excluded.client_id,
                summary = excluded.summary,
                body = excluded.body,
                updated_at = excluded.updated_at,
                needs_sync = 1",
            params![
                kind.as_str(),
                record.id,
                record.client_id,
                record.summary,
                record.body,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Atomically clear the dirty flag for the given ids after a confirmed
    /// upload or reconciliation.
    pub fn mark_synced(
        &mut self,
        kind: EntityKind,
        ids: &[String],
        synced_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE records SET needs_sync = 0, last_synced_at = ?3
                 WHERE kind = ?1 AND id = ?2",
            )?;
            for id in ids {
                stmt.execute(params![kind.as_str(), id, synced_at.to_rfc3339()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Result<Option<StoredEntity>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, client_id, summary, body, updated_at, needs_sync, last_synced_at
                 FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                raw_row,
            )
            .optional()?;
        row.map(RawRow::into_entity).transpose()
    }

    pub fn fetch_all(&self, kind: EntityKind) -> Result<Vec<StoredEntity>, StoreError> {
        self.fetch_where(kind, false)
    }

    /// Records with unsynced local mutations, in stable id order.
    pub fn fetch_dirty(&self, kind: EntityKind) -> Result<Vec<StoredEntity>, StoreError> {
        self.fetch_where(kind, true)
    }

    fn fetch_where(&self, kind: EntityKind, dirty_only: bool) -> Result<Vec<StoredEntity>, StoreError> {
        let sql = if dirty_only {
            "SELECT id, client_id, summary, body, updated_at, needs_sync, last_synced_at
             FROM records WHERE kind = ?1 AND needs_sync = 1 ORDER BY id"
        } else {
            "SELECT id, client_id, summary, body, updated_at, needs_sync, last_synced_at
             FROM records WHERE kind = ?1 ORDER BY id"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![kind.as_str()], raw_row)?;
        let mut entities = Vec::new();
        for row in rows {
            entities.push(row?.into_entity()?);
        }
        Ok(entities)
    }

    pub fn count_pending(&self, kind: EntityKind) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE kind = ?1 AND needs_sync = 1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn count_pending_total(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE needs_sync = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Row as stored, timestamps still raw text.
struct RawRow {
    id: String,
    client_id: Option<String>,
    summary: String,
    body: String,
    updated_at: String,
    needs_sync: bool,
    last_synced_at: Option<String>,
}

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        client_id: row.get(1)?,
        summary: row.get(2)?,
        body: row.get(3)?,
        updated_at: row.get(4)?,
        needs_sync: row.get(5)?,
        last_synced_at: row.get(6)?,
    })
}

impl RawRow {
    fn into_entity(self) -> Result<StoredEntity, StoreError> {
        Ok(StoredEntity {
            record: LocalRecord {
                id: self.id,
                client_id: self.client_id,
                summary: self.summary,
                body: self.body,
                updated_at: parse_timestamp(&self.updated_at)?,
            },
            needs_sync: self.needs_sync,
            last_synced_at: self
                .last_synced_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> LocalRecord {
        LocalRecord {
            id: id.to_string(),
            client_id: Some("c1".to_string()),
            summary: format!("record {id}"),
            body: r#"{"x":1}"#.to_string(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn apply_remote_inserts_and_clears_dirty_flag() {
        let mut store = LocalStore::open_in_memory().unwrap();
        let now = Utc::now();
        let written = store
            .apply_remote(EntityKind::Session, &[record("s1")], now)
            .unwrap();
        assert_eq!(written, 1);

        let stored = store.get(EntityKind::Session, "s1").unwrap().unwrap();
        assert!(!stored.needs_sync);
        assert!(stored.last_synced_at.is_some());
        assert_eq!(stored.record.client_id.as_deref(), Some("c1"));
    }

    #[test]
    fn apply_remote_overwrites_existing_rows() {
        let mut store = LocalStore::open_in_memory().unwrap();
        store
            .apply_remote(EntityKind::Client, &[record("c1")], Utc::now())
            .unwrap();

        let mut updated = record("c1");
        updated.summary = "renamed".to_string();
        store
            .apply_remote(EntityKind::Client, &[updated], Utc::now())
            .unwrap();

        let stored = store.get(EntityKind::Client, "c1").unwrap().unwrap();
        assert_eq!(stored.record.summary, "renamed");
        assert_eq!(store.fetch_all(EntityKind::Client).unwrap().len(), 1);
    }

    #[test]
    fn apply_remote_drops_clean_rows_missing_remotely() {
        let mut store = LocalStore::open_in_memory().unwrap();
        store
            .apply_remote(
                EntityKind::Client,
                &[record("c1"), record("c2")],
                Utc::now(),
            )
            .unwrap();

        // Second pass no longer returns c2.
        store
            .apply_remote(EntityKind::Client, &[record("c1")], Utc::now())
            .unwrap();
        assert!(store.get(EntityKind::Client, "c2").unwrap().is_none());
        assert!(store.get(EntityKind::Client, "c1").unwrap().is_some());
    }

    #[test]
    fn apply_remote_keeps_dirty_rows_missing_remotely() {
        let mut store = LocalStore::open_in_memory().unwrap();
        store.upsert_local(EntityKind::Session, &record("local-1")).unwrap();

        store.apply_remote(EntityKind::Session, &[], Utc::now()).unwrap();

        let stored = store.get(EntityKind::Session, "local-1").unwrap().unwrap();
        assert!(stored.needs_sync);
    }

    #[test]
    fn upsert_local_marks_dirty_and_mark_synced_clears_it() {
        let mut store = LocalStore::open_in_memory().unwrap();
        store.upsert_local(EntityKind::Session, &record("s1")).unwrap();
        assert_eq!(store.count_pending(EntityKind::Session).unwrap(), 1);
        assert_eq!(store.count_pending_total().unwrap(), 1);

        store
            .mark_synced(EntityKind::Session, &["s1".to_string()], Utc::now())
            .unwrap();
        assert_eq!(store.count_pending(EntityKind::Session).unwrap(), 0);

        let stored = store.get(EntityKind::Session, "s1").unwrap().unwrap();
        assert!(!stored.needs_sync);
        assert!(stored.last_synced_at.is_some());
    }

    #[test]
    fn fetch_dirty_returns_only_dirty_rows() {
        let mut store = LocalStore::open_in_memory().unwrap();
        store
            .apply_remote(EntityKind::Document, &[record("d1")], Utc::now())
            .unwrap();
        store.upsert_local(EntityKind::Document, &record("d2")).unwrap();

        let dirty = store.fetch_dirty(EntityKind::Document).unwrap();
        assert_eq!(dirty.len(), 1);
        assert_eq!(dirty[0].record.id, "d2");
    }

    #[test]
    fn kinds_do_not_collide_on_id() {
        let mut store = LocalStore::open_in_memory().unwrap();
        store
            .apply_remote(EntityKind::Client, &[record("x")], Utc::now())
            .unwrap();
        store
            .apply_remote(EntityKind::Session, &[record("x")], Utc::now())
            .unwrap();
        assert_eq!(store.fetch_all(EntityKind::Client).unwrap().len(), 1);
        assert_eq!(store.fetch_all(EntityKind::Session).unwrap().len(), 1);
    }
}
