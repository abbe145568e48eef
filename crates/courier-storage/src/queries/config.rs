// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay configuration document.

use chrono::Utc;
use courier_core::{CourierError, RelayConfig};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

/// Read the `global` configuration document.
///
/// A missing document yields the empty default so a fresh deployment idles
/// instead of failing.
pub async fn get_config(db: &Database) -> Result<RelayConfig, CourierError> {
    let document: Option<String> = db
        .connection()
        .call(|conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT document FROM configs WHERE id = ?1",
                params![RelayConfig::KEY],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match document {
        Some(json) => serde_json::from_str(&json).map_err(CourierError::storage),
        None => Ok(RelayConfig::default()),
    }
}

/// Replace the `global` configuration document.
pub async fn put_config(db: &Database, config: &RelayConfig) -> Result<(), CourierError> {
    let json = serde_json::to_string(config).map_err(CourierError::storage)?;
    let now = Utc::now();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO configs (id, document, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET document = excluded.document,
                                               updated_at = excluded.updated_at",
                params![RelayConfig::KEY, json, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
