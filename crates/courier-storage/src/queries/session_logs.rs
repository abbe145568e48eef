// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session observability counters.
//!
//! Field-set and increment are the same single upsert statement, so neither
//! reads the row before writing it.

use courier_core::{CourierError, LogCounter, SessionLogEntry, SessionLogPatch};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

// ?2..?8 are the patch fields (NULL = keep), ?9/?10 the success/error deltas.
const UPSERT_SQL: &str = "
    INSERT INTO session_logs (session_id, started_at, last_seen, success_count, error_count,
                              last_error, last_error_at, last_forwarded_at)
    VALUES (?1, ?2, ?3, COALESCE(?4, 0) + ?9, COALESCE(?5, 0) + ?10, ?6, ?7, ?8)
    ON CONFLICT(session_id) DO UPDATE SET
        started_at        = COALESCE(?2, started_at),
        last_seen         = COALESCE(?3, last_seen),
        success_count     = COALESCE(?4, success_count) + ?9,
        error_count       = COALESCE(?5, error_count) + ?10,
        last_error        = COALESCE(?6, last_error),
        last_error_at     = COALESCE(?7, last_error_at),
        last_forwarded_at = COALESCE(?8, last_forwarded_at)";

const SELECT_COLUMNS: &str = "session_id, started_at, last_seen, success_count, error_count,
                              last_error, last_error_at, last_forwarded_at";

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionLogEntry> {
    let success: i64 = row.get(3)?;
    let error: i64 = row.get(4)?;
    Ok(SessionLogEntry {
        session_id: row.get(0)?,
        started_at: row.get(1)?,
        last_seen: row.get(2)?,
        success_count: success.max(0) as u64,
        error_count: error.max(0) as u64,
        last_error: row.get(5)?,
        last_error_at: row.get(6)?,
        last_forwarded_at: row.get(7)?,
    })
}

fn clamp(count: Option<u64>) -> Option<i64> {
    count.map(|c| i64::try_from(c).unwrap_or(i64::MAX))
}

async fn apply(
    db: &Database,
    session_id: &str,
    patch: SessionLogPatch,
    counter: Option<LogCounter>,
) -> Result<(), CourierError> {
    let session_id = session_id.to_string();
    let (success_delta, error_delta) = match counter {
        Some(LogCounter::Success) => (1i64, 0i64),
        Some(LogCounter::Error) => (0, 1),
        None => (0, 0),
    };
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                UPSERT_SQL,
                params![
                    session_id,
                    patch.started_at,
                    patch.last_seen,
                    clamp(patch.success_count),
                    clamp(patch.error_count),
                    patch.last_error,
                    patch.last_error_at,
                    patch.last_forwarded_at,
                    success_delta,
                    error_delta,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Create the entry if missing and set every `Some` field of `patch`.
pub async fn upsert(
    db: &Database,
    session_id: &str,
    patch: SessionLogPatch,
) -> Result<(), CourierError> {
    apply(db, session_id, patch, None).await
}

/// Bump `counter` by one and apply `patch` in the same statement.
pub async fn increment(
    db: &Database,
    session_id: &str,
    counter: LogCounter,
    patch: SessionLogPatch,
) -> Result<(), CourierError> {
    apply(db, session_id, patch, Some(counter)).await
}

pub async fn get(db: &Database, session_id: &str) -> Result<Option<SessionLogEntry>, CourierError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<SessionLogEntry>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM session_logs WHERE session_id = ?1"),
                params![session_id],
                row_to_entry,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every session log entry, ordered by session id.
pub async fn list(db: &Database) -> Result<Vec<SessionLogEntry>, CourierError> {
    db.connection()
        .call(|conn| -> Result<Vec<SessionLogEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM session_logs ORDER BY session_id"
            ))?;
            let rows = stmt.query_map([], row_to_entry)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    async fn open_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("logs.db");
        Database::open(path.to_str().unwrap(), true).await.unwrap()
    }

    #[tokio::test]
    async fn started_patch_creates_zeroed_entry() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let now = Utc::now();
        upsert(&db, "s1", SessionLogPatch::started(now)).await.unwrap();

        let entry = get(&db, "s1").await.unwrap().unwrap();
        assert_eq!(entry.started_at, Some(now));
        assert_eq!(entry.last_seen, Some(now));
        assert_eq!(entry.success_count, 0);
        assert_eq!(entry.error_count, 0);
        assert!(entry.last_error.is_none());
    }

    #[tokio::test]
    async fn increments_accumulate_and_keep_other_fields() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let now = Utc::now();
        upsert(&db, "s1", SessionLogPatch::started(now)).await.unwrap();

        increment(&db, "s1", LogCounter::Success, SessionLogPatch::forwarded(now))
            .await
            .unwrap();
        increment(&db, "s1", LogCounter::Success, SessionLogPatch::forwarded(now))
            .await
            .unwrap();
        increment(&db, "s1", LogCounter::Error, SessionLogPatch::failed("FLOOD", now))
            .await
            .unwrap();

        let entry = get(&db, "s1").await.unwrap().unwrap();
        assert_eq!(entry.success_count, 2);
        assert_eq!(entry.error_count, 1);
        assert_eq!(entry.last_error.as_deref(), Some("FLOOD"));
        assert_eq!(entry.last_forwarded_at, Some(now));
        assert_eq!(entry.started_at, Some(now), "untouched fields survive");
    }

    #[tokio::test]
    async fn increment_creates_missing_entry() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        increment(&db, "fresh", LogCounter::Error, SessionLogPatch::default())
            .await
            .unwrap();
        let entry = get(&db, "fresh").await.unwrap().unwrap();
        assert_eq!(entry.error_count, 1);
        assert_eq!(entry.success_count, 0);
        assert!(entry.started_at.is_none());
    }

    #[tokio::test]
    async fn restart_resets_counters() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let now = Utc::now();
        increment(&db, "s1", LogCounter::Success, SessionLogPatch::forwarded(now))
            .await
            .unwrap();
        upsert(&db, "s1", SessionLogPatch::started(now)).await.unwrap();
        let entry = get(&db, "s1").await.unwrap().unwrap();
        assert_eq!(entry.success_count, 0);
        assert_eq!(entry.last_forwarded_at, Some(now));
    }

    #[tokio::test]
    async fn list_orders_by_session_id() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        for id in ["b", "a", "c"] {
            upsert(&db, id, SessionLogPatch::started(Utc::now())).await.unwrap();
        }
        let ids: Vec<_> = list(&db).await.unwrap().into_iter().map(|e| e.session_id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
