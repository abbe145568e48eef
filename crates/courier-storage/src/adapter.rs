// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`RelayStore`] trait.

use async_trait::async_trait;
use tracing::debug;

use courier_config::model::StorageConfig;
use courier_core::{
    ChatId, CourierError, DedupKey, ForwardedRecord, HealthStatus, LogCounter, MessageNumber,
    RelayConfig, RelayStore, SessionLogEntry, SessionLogPatch, SessionRecord,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed relay store.
///
/// Besides the worker-facing [`RelayStore`] operations it exposes the admin
/// writers (`put_config`, `insert_session`, `delete_session`) used to seed
/// desired state, and read-only listings for status reports.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database described by `config`, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, CourierError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store initialized");
        Ok(Self { db })
    }

    /// Wrap an already-open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn put_config(&self, config: &RelayConfig) -> Result<(), CourierError> {
        queries::config::put_config(&self.db, config).await
    }

    pub async fn insert_session(&self, session: &SessionRecord) -> Result<(), CourierError> {
        queries::sessions::insert_session(&self.db, session).await
    }

    pub async fn delete_session(&self, id: &str) -> Result<bool, CourierError> {
        queries::sessions::delete_session(&self.db, id).await
    }

    pub async fn list_session_logs(&self) -> Result<Vec<SessionLogEntry>, CourierError> {
        queries::session_logs::list(&self.db).await
    }

    pub async fn forwarded_count(&self) -> Result<u64, CourierError> {
        queries::ledger::count_forwarded(&self.db).await
    }

    /// Checkpoint the WAL before the process exits.
    pub async fn close(&self) -> Result<(), CourierError> {
        self.db.close().await
    }
}

#[async_trait]
impl RelayStore for SqliteStore {
    async fn get_config(&self) -> Result<RelayConfig, CourierError> {
        queries::config::get_config(&self.db).await
    }

    async fn get_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, CourierError> {
        queries::sessions::list_sessions(&self.db, limit).await
    }

    async fn get_session_log(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionLogEntry>, CourierError> {
        queries::session_logs::get(&self.db, session_id).await
    }

    async fn upsert_session_log(
        &self,
        session_id: &str,
        patch: SessionLogPatch,
    ) -> Result<(), CourierError> {
        queries::session_logs::upsert(&self.db, session_id, patch).await
    }

    async fn increment_session_log(
        &self,
        session_id: &str,
        counter: LogCounter,
        patch: SessionLogPatch,
    ) -> Result<(), CourierError> {
        queries::session_logs::increment(&self.db, session_id, counter, patch).await
    }

    async fn insert_forwarded_record(
        &self,
        key: &DedupKey,
        source_chat: ChatId,
        source_message: MessageNumber,
    ) -> Result<bool, CourierError> {
        queries::ledger::insert_forwarded(&self.db, key, source_chat, source_message).await
    }

    async fn find_forwarded_record(
        &self,
        key: &DedupKey,
    ) -> Result<Option<ForwardedRecord>, CourierError> {
        queries::ledger::find_forwarded(&self.db, key).await
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        let probe = self
            .db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await;
        Ok(match probe {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }
}
