// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`RelayStore`] with failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use courier_core::{
    ChatId, CourierError, DedupKey, ForwardedRecord, LogCounter, MessageNumber, RelayConfig,
    RelayStore, SessionLogEntry, SessionLogPatch, SessionRecord,
};

#[derive(Default)]
struct State {
    config: RelayConfig,
    sessions: Vec<SessionRecord>,
    ledger: HashMap<String, ForwardedRecord>,
    logs: HashMap<String, SessionLogEntry>,
}

/// A store backed by hash maps.
///
/// Each operation takes the lock once, so mutations are atomic just like a
/// single SQL statement.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    failing_session_reads: AtomicUsize,
    fail_config: AtomicBool,
    fail_ledger_writes: AtomicBool,
    fail_session_logs: AtomicBool,
    ledger_inserts: AtomicUsize,
}

fn injected(what: &str) -> CourierError {
    CourierError::storage(format!("injected {what} failure"))
}

fn apply_patch(entry: &mut SessionLogEntry, patch: SessionLogPatch) {
    if let Some(v) = patch.started_at {
        entry.started_at = Some(v);
    }
    if let Some(v) = patch.last_seen {
        entry.last_seen = Some(v);
    }
    if let Some(v) = patch.success_count {
        entry.success_count = v;
    }
    if let Some(v) = patch.error_count {
        entry.error_count = v;
    }
    if let Some(v) = patch.last_error {
        entry.last_error = Some(v);
    }
    if let Some(v) = patch.last_error_at {
        entry.last_error_at = Some(v);
    }
    if let Some(v) = patch.last_forwarded_at {
        entry.last_forwarded_at = Some(v);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_config(&self, config: RelayConfig) {
        self.state.lock().await.config = config;
    }

    pub async fn add_session(&self, session: SessionRecord) {
        let mut state = self.state.lock().await;
        state.sessions.retain(|s| s.id != session.id);
        state.sessions.push(session);
    }

    pub async fn remove_session(&self, id: &str) {
        self.state.lock().await.sessions.retain(|s| s.id != id);
    }

    /// Make the next `n` calls to `get_sessions` fail.
    pub fn fail_session_reads(&self, n: usize) {
        self.failing_session_reads.store(n, Ordering::SeqCst);
    }

    pub fn set_fail_config(&self, fail: bool) {
        self.fail_config.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_ledger_writes(&self, fail: bool) {
        self.fail_ledger_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_session_logs(&self, fail: bool) {
        self.fail_session_logs.store(fail, Ordering::SeqCst);
    }

    /// Seed a ledger record directly.
    pub async fn seed_forwarded(&self, source_chat: ChatId, source_message: MessageNumber) {
        let key = DedupKey::new(source_chat, source_message);
        self.state.lock().await.ledger.insert(
            key.as_str().to_string(),
            ForwardedRecord {
                key: key.as_str().to_string(),
                source_chat,
                source_message,
                forwarded_at: Utc::now(),
            },
        );
    }

    pub async fn forwarded_records(&self) -> Vec<ForwardedRecord> {
        let mut records: Vec<_> = self.state.lock().await.ledger.values().cloned().collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    /// Number of `insert_forwarded_record` calls, including ones that found
    /// an existing record.
    pub fn ledger_insert_calls(&self) -> usize {
        self.ledger_inserts.load(Ordering::SeqCst)
    }

    pub async fn session_log(&self, session_id: &str) -> Option<SessionLogEntry> {
        self.state.lock().await.logs.get(session_id).cloned()
    }
}

#[async_trait]
impl RelayStore for MemoryStore {
    async fn get_config(&self) -> Result<RelayConfig, CourierError> {
        if self.fail_config.load(Ordering::SeqCst) {
            return Err(injected("config read"));
        }
        Ok(self.state.lock().await.config.clone())
    }

    async fn get_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, CourierError> {
        let remaining = self.failing_session_reads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_session_reads.store(remaining - 1, Ordering::SeqCst);
            return Err(injected("session read"));
        }
        let state = self.state.lock().await;
        Ok(state.sessions.iter().take(limit).cloned().collect())
    }

    async fn get_session_log(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionLogEntry>, CourierError> {
        Ok(self.session_log(session_id).await)
    }

    async fn upsert_session_log(
        &self,
        session_id: &str,
        patch: SessionLogPatch,
    ) -> Result<(), CourierError> {
        if self.fail_session_logs.load(Ordering::SeqCst) {
            return Err(injected("session log"));
        }
        let mut state = self.state.lock().await;
        let entry = state
            .logs
            .entry(session_id.to_string())
            .or_insert_with(|| SessionLogEntry {
                session_id: session_id.to_string(),
                ..SessionLogEntry::default()
            });
        apply_patch(entry, patch);
        Ok(())
    }

    async fn increment_session_log(
        &self,
        session_id: &str,
        counter: LogCounter,
        patch: SessionLogPatch,
    ) -> Result<(), CourierError> {
        if self.fail_session_logs.load(Ordering::SeqCst) {
            return Err(injected("session log"));
        }
        let mut state = self.state.lock().await;
        let entry = state
            .logs
            .entry(session_id.to_string())
            .or_insert_with(|| SessionLogEntry {
                session_id: session_id.to_string(),
                ..SessionLogEntry::default()
            });
        apply_patch(entry, patch);
        match counter {
            LogCounter::Success => entry.success_count += 1,
            LogCounter::Error => entry.error_count += 1,
        }
        Ok(())
    }

    async fn insert_forwarded_record(
        &self,
        key: &DedupKey,
        source_chat: ChatId,
        source_message: MessageNumber,
    ) -> Result<bool, CourierError> {
        self.ledger_inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_ledger_writes.load(Ordering::SeqCst) {
            return Err(injected("ledger write"));
        }
        let mut state = self.state.lock().await;
        if state.ledger.contains_key(key.as_str()) {
            return Ok(false);
        }
        state.ledger.insert(
            key.as_str().to_string(),
            ForwardedRecord {
                key: key.as_str().to_string(),
                source_chat,
                source_message,
                forwarded_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn find_forwarded_record(
        &self,
        key: &DedupKey,
    ) -> Result<Option<ForwardedRecord>, CourierError> {
        Ok(self.state.lock().await.ledger.get(key.as_str()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::bot_session;

    #[tokio::test]
    async fn insert_if_absent() {
        let store = MemoryStore::new();
        let key = DedupKey::new(-1, 2);
        assert!(store.insert_forwarded_record(&key, -1, 2).await.unwrap());
        assert!(!store.insert_forwarded_record(&key, -1, 2).await.unwrap());
        assert_eq!(store.forwarded_records().await.len(), 1);
        assert_eq!(store.ledger_insert_calls(), 2);
    }

    #[tokio::test]
    async fn session_reads_fail_the_requested_number_of_times() {
        let store = MemoryStore::new();
        store.add_session(bot_session("a")).await;
        store.fail_session_reads(1);
        assert!(store.get_sessions(10).await.is_err());
        assert_eq!(store.get_sessions(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn increment_applies_patch_and_counter() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .upsert_session_log("s", SessionLogPatch::started(now))
            .await
            .unwrap();
        store
            .increment_session_log("s", LogCounter::Error, SessionLogPatch::failed("x", now))
            .await
            .unwrap();
        let entry = store.session_log("s").await.unwrap();
        assert_eq!(entry.error_count, 1);
        assert_eq!(entry.last_error.as_deref(), Some("x"));
        assert_eq!(entry.started_at, Some(now));
    }
}
