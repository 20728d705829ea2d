// src/store.rs
//! Durable monitoring state in SQLite.
//!
//! Two tables:
//! - `monitoring_status`: one row per source, upserted after every check.
//! - `change_log`: append-only, one row per detected change.
//!
//! This is the only writer of durable state. Counter arithmetic happens inside
//! the upsert statement itself, so concurrent checks can never lose increments.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info};

use crate::error::StorageFailure;
use crate::model::{ChangeRecord, MonitoringStatus, Snapshot};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS monitoring_status (
    source_id            TEXT PRIMARY KEY,
    url                  TEXT NOT NULL,
    last_fingerprint     TEXT,
    last_content_preview TEXT,
    last_source_url      TEXT,
    last_checked_at      TEXT,
    has_new_content      INTEGER NOT NULL DEFAULT 0,
    last_error           TEXT,
    check_count          INTEGER NOT NULL DEFAULT 0,
    success_count        INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS change_log (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id       TEXT NOT NULL,
    fingerprint     TEXT NOT NULL,
    content_preview TEXT NOT NULL,
    source_url      TEXT NOT NULL,
    degraded        INTEGER NOT NULL DEFAULT 0,
    detected_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE INDEX IF NOT EXISTS idx_change_log_source ON change_log (source_id, id DESC);
"#;

// ?3..?5: snapshot fields, NULL keeps the previous value.
// ?7: has_new_content, NULL keeps the previous flag.
const UPSERT: &str = r#"
INSERT INTO monitoring_status
    (source_id, url, last_fingerprint, last_content_preview, last_source_url,
     last_checked_at, has_new_content, last_error, check_count, success_count)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, 0), ?8, ?9, ?10)
ON CONFLICT (source_id) DO UPDATE SET
    url                  = excluded.url,
    last_fingerprint     = COALESCE(?3, last_fingerprint),
    last_content_preview = COALESCE(?4, last_content_preview),
    last_source_url      = COALESCE(?5, last_source_url),
    last_checked_at      = excluded.last_checked_at,
    has_new_content      = COALESCE(?7, has_new_content),
    last_error           = excluded.last_error,
    check_count          = check_count + excluded.check_count,
    success_count        = success_count + excluded.success_count
"#;

const STATUS_COLUMNS: &str = "source_id, url, last_fingerprint, last_content_preview, \
     last_source_url, last_checked_at, has_new_content, last_error, check_count, success_count";

/// Partial update merged into a source's row by `MonitoringStore::upsert`.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub url: String,
    pub checked_at: DateTime<Utc>,
    /// `None` keeps the stored snapshot fields.
    pub snapshot: Option<Snapshot>,
    /// `None` keeps the stored flag.
    pub has_new_content: Option<bool>,
    /// Always written; `None` clears the previous error.
    pub last_error: Option<String>,
    pub check_increment: u32,
    pub success_increment: u32,
}

impl StatusUpdate {
    /// A completed check that produced `snapshot`.
    pub fn success(url: &str, snapshot: Snapshot, changed: bool, at: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            checked_at: at,
            snapshot: Some(snapshot),
            has_new_content: Some(changed),
            last_error: None,
            check_increment: 1,
            success_increment: 1,
        }
    }

    /// A failed check: counts the attempt, leaves snapshot and flag alone.
    pub fn failure(url: &str, error: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            checked_at: at,
            snapshot: None,
            has_new_content: None,
            last_error: Some(error.into()),
            check_increment: 1,
            success_increment: 0,
        }
    }
}

pub struct MonitoringStore {
    conn: Mutex<Connection>,
}

impl MonitoringStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageFailure> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        info!(target: "store", path = %path.display(), "monitoring store ready");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageFailure> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageFailure> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageFailure> {
        self.conn.lock().map_err(|_| StorageFailure::Poisoned)
    }

    pub fn get(&self, source_id: &str) -> Result<Option<MonitoringStatus>, StorageFailure> {
        let conn = self.conn()?;
        let sql = format!("SELECT {STATUS_COLUMNS} FROM monitoring_status WHERE source_id = ?1");
        let row = conn
            .query_row(&sql, params![source_id], read_status_row)
            .optional()?;
        row.transpose()
    }

    /// Merge `update` into the row for `source_id`, creating it if absent.
    pub fn upsert(&self, source_id: &str, update: &StatusUpdate) -> Result<(), StorageFailure> {
        let conn = self.conn()?;
        let snap = update.snapshot.as_ref();
        conn.execute(
            UPSERT,
            params![
                source_id,
                update.url,
                snap.map(|s| s.fingerprint.as_str()),
                snap.map(|s| s.content_preview.as_str()),
                snap.map(|s| s.source_url.as_str()),
                update.checked_at.to_rfc3339(),
                update.has_new_content,
                update.last_error,
                update.check_increment,
                update.success_increment,
            ],
        )
        .inspect_err(|e| error!(target: "store", source = source_id, error = %e, "upsert failed"))?;
        Ok(())
    }

    pub fn append_change(&self, record: &ChangeRecord) -> Result<(), StorageFailure> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO change_log
                (source_id, fingerprint, content_preview, source_url, degraded, detected_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.source_id,
                record.snapshot.fingerprint,
                record.snapshot.content_preview,
                record.snapshot.source_url,
                record.snapshot.degraded,
                record.detected_at.to_rfc3339(),
            ],
        )
        .inspect_err(
            |e| error!(target: "store", source = %record.source_id, error = %e, "append change failed"),
        )?;
        Ok(())
    }

    /// Every stored status row, ordered by source id.
    pub fn list_all(&self) -> Result<Vec<MonitoringStatus>, StorageFailure> {
        let conn = self.conn()?;
        let sql = format!("SELECT {STATUS_COLUMNS} FROM monitoring_status ORDER BY source_id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], read_status_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row??);
        }
        Ok(out)
    }

    /// Newest first.
    pub fn recent_changes(&self, limit: usize) -> Result<Vec<ChangeRecord>, StorageFailure> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source_id, fingerprint, content_preview, source_url, degraded, detected_at
             FROM change_log ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                Snapshot {
                    fingerprint: row.get(1)?,
                    content_preview: row.get(2)?,
                    source_url: row.get(3)?,
                    degraded: row.get(4)?,
                },
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (source_id, snapshot, ts) = row?;
            out.push(ChangeRecord {
                source_id,
                snapshot,
                detected_at: parse_ts(&ts)?,
            });
        }
        Ok(out)
    }

    pub fn change_count(&self, source_id: &str) -> Result<u64, StorageFailure> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM change_log WHERE source_id = ?1",
            params![source_id],
            |r| r.get(0),
        )?;
        Ok(n as u64)
    }

    /// Clear `has_new_content` everywhere; counters and fingerprints are untouched.
    pub fn reset_new_content_flags(&self) -> Result<usize, StorageFailure> {
        let conn = self.conn()?;
        let n = conn.execute("UPDATE monitoring_status SET has_new_content = 0", [])?;
        info!(target: "store", rows = n, "reset new-content flags");
        Ok(n)
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StorageFailure> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageFailure::Corrupt(format!("timestamp {s:?}: {e}")))
}

/// Outer `Result` is SQLite's, inner is row decoding.
fn read_status_row(row: &Row<'_>) -> rusqlite::Result<Result<MonitoringStatus, StorageFailure>> {
    let checked: Option<String> = row.get(5)?;
    let check_count: i64 = row.get(8)?;
    let success_count: i64 = row.get(9)?;
    let mut status = MonitoringStatus {
        source_id: row.get(0)?,
        url: row.get(1)?,
        last_fingerprint: row.get(2)?,
        last_content_preview: row.get(3)?,
        last_source_url: row.get(4)?,
        last_checked_at: None,
        has_new_content: row.get(6)?,
        last_error: row.get(7)?,
        check_count: check_count.max(0) as u64,
        success_count: success_count.max(0) as u64,
    };
    Ok(match checked.as_deref().map(parse_ts).transpose() {
        Ok(ts) => {
            status.last_checked_at = ts;
            Ok(status)
        }
        Err(e) => Err(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snap(fp: &str) -> Snapshot {
        Snapshot::new(fp.to_string(), "Hello", "https://example.test/a")
    }

    fn t(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 9, min, 0).unwrap()
    }

    #[test]
    fn absent_row_reads_as_none() {
        let store = MonitoringStore::open_in_memory().unwrap();
        assert!(store.get("X").unwrap().is_none());
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn upsert_accumulates_counters() {
        let store = MonitoringStore::open_in_memory().unwrap();
        let url = "https://example.test/a";
        store
            .upsert("X", &StatusUpdate::success(url, snap("f1"), true, t(0)))
            .unwrap();
        store
            .upsert("X", &StatusUpdate::failure(url, "timeout", t(5)))
            .unwrap();

        let st = store.get("X").unwrap().unwrap();
        assert_eq!(st.check_count, 2);
        assert_eq!(st.success_count, 1);
        assert_eq!(st.last_error.as_deref(), Some("timeout"));
        // Failure keeps the last good snapshot and the flag.
        assert_eq!(st.last_fingerprint.as_deref(), Some("f1"));
        assert_eq!(st.last_content_preview.as_deref(), Some("Hello"));
        assert!(st.has_new_content);
        assert_eq!(st.last_checked_at, Some(t(5)));
    }

    #[test]
    fn failure_on_fresh_row_starts_without_snapshot() {
        let store = MonitoringStore::open_in_memory().unwrap();
        store
            .upsert("TikTok", &StatusUpdate::failure("https://t.test", "boom", t(0)))
            .unwrap();
        let st = store.get("TikTok").unwrap().unwrap();
        assert_eq!((st.check_count, st.success_count), (1, 0));
        assert!(st.last_fingerprint.is_none());
        assert!(!st.has_new_content);
    }

    #[test]
    fn success_clears_error() {
        let store = MonitoringStore::open_in_memory().unwrap();
        let url = "https://example.test/a";
        store
            .upsert("X", &StatusUpdate::failure(url, "timeout", t(0)))
            .unwrap();
        store
            .upsert("X", &StatusUpdate::success(url, snap("f2"), true, t(1)))
            .unwrap();
        assert!(store.get("X").unwrap().unwrap().last_error.is_none());
    }

    #[test]
    fn reset_flags_keeps_counters_and_fingerprints() {
        let store = MonitoringStore::open_in_memory().unwrap();
        let url = "https://example.test/a";
        store
            .upsert("X", &StatusUpdate::success(url, snap("f1"), true, t(0)))
            .unwrap();
        store
            .upsert("LinkedIn", &StatusUpdate::success(url, snap("g1"), true, t(0)))
            .unwrap();

        assert_eq!(store.reset_new_content_flags().unwrap(), 2);
        for st in store.list_all().unwrap() {
            assert!(!st.has_new_content);
            assert_eq!((st.check_count, st.success_count), (1, 1));
            assert!(st.last_fingerprint.is_some());
        }
    }

    #[test]
    fn change_log_is_newest_first() {
        let store = MonitoringStore::open_in_memory().unwrap();
        for (i, fp) in ["f1", "f2", "f3"].iter().enumerate() {
            store
                .append_change(&ChangeRecord {
                    source_id: "X".into(),
                    snapshot: snap(fp),
                    detected_at: t(i as u32),
                })
                .unwrap();
        }
        let recent = store.recent_changes(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].snapshot.fingerprint, "f3");
        assert_eq!(recent[0].detected_at, t(2));
        assert_eq!(store.change_count("X").unwrap(), 3);
        assert_eq!(store.change_count("TikTok").unwrap(), 0);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.db");
        {
            let store = MonitoringStore::open(&path).unwrap();
            store
                .upsert(
                    "X",
                    &StatusUpdate::success("https://x.com/a", snap("f1"), true, t(0)),
                )
                .unwrap();
        }
        let store = MonitoringStore::open(&path).unwrap();
        assert_eq!(store.get("X").unwrap().unwrap().check_count, 1);
    }
}
