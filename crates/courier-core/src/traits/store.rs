// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store adapter trait for the desired-state documents, ledger and session log.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::{
    ChatId, DedupKey, ForwardedRecord, HealthStatus, LogCounter, MessageNumber, RelayConfig,
    SessionLogEntry, SessionLogPatch, SessionRecord,
};

/// Persistence backend consumed by the forwarding worker.
///
/// Every mutation must be a single atomic operation on one document
/// (upsert, field-set, counter-increment). Implementations must never
/// read-modify-write across two round trips for the same key.
#[async_trait]
pub trait RelayStore: Send + Sync + 'static {
    /// Returns the current relay configuration, or the empty default if none
    /// has been written yet.
    async fn get_config(&self) -> Result<RelayConfig, CourierError>;

    /// Returns up to `limit` desired sessions.
    async fn get_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, CourierError>;

    async fn get_session_log(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionLogEntry>, CourierError>;

    /// Creates the entry if missing and sets every `Some` field of `patch`.
    async fn upsert_session_log(
        &self,
        session_id: &str,
        patch: SessionLogPatch,
    ) -> Result<(), CourierError>;

    /// Increments `counter` by one and applies `patch` in the same operation.
    async fn increment_session_log(
        &self,
        session_id: &str,
        counter: LogCounter,
        patch: SessionLogPatch,
    ) -> Result<(), CourierError>;

    /// Inserts a ledger record if none exists for `key`.
    ///
    /// Returns `false` when a record was already present.
    async fn insert_forwarded_record(
        &self,
        key: &DedupKey,
        source_chat: ChatId,
        source_message: MessageNumber,
    ) -> Result<bool, CourierError>;

    async fn find_forwarded_record(
        &self,
        key: &DedupKey,
    ) -> Result<Option<ForwardedRecord>, CourierError>;

    /// Performs a health check and returns the store's current status.
    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        Ok(HealthStatus::Healthy)
    }
}
