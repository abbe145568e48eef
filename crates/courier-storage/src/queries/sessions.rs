// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Desired session records.

use std::str::FromStr;

use courier_core::{CourierError, SessionKind, SessionRecord};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::Database;

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    let kind: String = row.get(2)?;
    let kind = SessionKind::from_str(&kind)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(SessionRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        kind,
        identifier: row.get(3)?,
        encrypted_credential: row.get(4)?,
        added_by: row.get(5)?,
        added_at: row.get(6)?,
    })
}

/// List up to `limit` sessions, oldest first.
pub async fn list_sessions(db: &Database, limit: usize) -> Result<Vec<SessionRecord>, CourierError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<SessionRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, name, kind, identifier, encrypted_credential, added_by, added_at
                 FROM sessions ORDER BY added_at ASC, id ASC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], row_to_session)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace a session record.
pub async fn insert_session(db: &Database, session: &SessionRecord) -> Result<(), CourierError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO sessions
                 (id, name, kind, identifier, encrypted_credential, added_by, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session.id,
                    session.name,
                    session.kind.to_string(),
                    session.identifier,
                    session.encrypted_credential,
                    session.added_by,
                    session.added_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a session record. Returns `false` if it did not exist.
pub async fn delete_session(db: &Database, id: &str) -> Result<bool, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn make_session(id: &str, kind: SessionKind, offset_secs: i64) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            name: format!("{id}-name"),
            kind,
            identifier: "42".into(),
            encrypted_credential: "aa:bb".into(),
            added_by: 1,
            added_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    async fn open_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("sessions.db");
        Database::open(path.to_str().unwrap(), true).await.unwrap()
    }

    #[tokio::test]
    async fn insert_and_list_round_trip() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let bot = make_session("s-bot", SessionKind::Bot, 0);
        let user = make_session("s-user", SessionKind::User, 1);
        insert_session(&db, &bot).await.unwrap();
        insert_session(&db, &user).await.unwrap();

        let sessions = list_sessions(&db, 10).await.unwrap();
        assert_eq!(sessions, vec![bot, user]);
    }

    #[tokio::test]
    async fn list_honours_limit() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        for i in 0..5 {
            insert_session(&db, &make_session(&format!("s{i}"), SessionKind::Bot, i))
                .await
                .unwrap();
        }
        let sessions = list_sessions(&db, 3).await.unwrap();
        let ids: Vec<_> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s0", "s1", "s2"]);
    }

    #[tokio::test]
    async fn delete_reports_whether_row_existed() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        insert_session(&db, &make_session("gone", SessionKind::Bot, 0))
            .await
            .unwrap();
        assert!(delete_session(&db, "gone").await.unwrap());
        assert!(!delete_session(&db, "gone").await.unwrap());
        assert!(list_sessions(&db, 10).await.unwrap().is_empty());
    }
}
