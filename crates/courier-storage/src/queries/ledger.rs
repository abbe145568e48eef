// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forwarded-message ledger. Rows are inserted once and never touched again.

use chrono::Utc;
use courier_core::{ChatId, CourierError, DedupKey, ForwardedRecord, MessageNumber};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

/// Insert a ledger row unless `key` is already present.
///
/// Returns `true` when this call created the row.
pub async fn insert_forwarded(
    db: &Database,
    key: &DedupKey,
    source_chat: ChatId,
    source_message: MessageNumber,
) -> Result<bool, CourierError> {
    let key = key.as_str().to_string();
    let now = Utc::now();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO forwarded_messages
                 (key, source_chat, source_message, forwarded_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![key, source_chat, source_message, now],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_forwarded(
    db: &Database,
    key: &DedupKey,
) -> Result<Option<ForwardedRecord>, CourierError> {
    let key = key.as_str().to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ForwardedRecord>, rusqlite::Error> {
            conn.query_row(
                "SELECT key, source_chat, source_message, forwarded_at
                 FROM forwarded_messages WHERE key = ?1",
                params![key],
                |row| {
                    Ok(ForwardedRecord {
                        key: row.get(0)?,
                        source_chat: row.get(1)?,
                        source_message: row.get(2)?,
                        forwarded_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Total number of relayed messages.
pub async fn count_forwarded(db: &Database) -> Result<u64, CourierError> {
    let count: i64 = db
        .connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM forwarded_messages", [], |row| row.get(0))
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(count.max(0) as u64)
}
