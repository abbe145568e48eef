// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort writes to the per-session log.
//!
//! The session log is observational. A failed write is logged and never
//! changes the outcome of the delivery that triggered it.

use std::sync::Arc;

use chrono::Utc;
use courier_core::{LogCounter, RelayStore, SessionLogPatch};
use tracing::warn;

#[derive(Clone)]
pub struct SessionLog {
    store: Arc<dyn RelayStore>,
}

impl SessionLog {
    pub fn new(store: Arc<dyn RelayStore>) -> Self {
        Self { store }
    }

    /// Reset the entry for a freshly started session.
    pub async fn started(&self, session_id: &str) {
        let patch = SessionLogPatch::started(Utc::now());
        if let Err(e) = self.store.upsert_session_log(session_id, patch).await {
            warn!(session_id, error = %e, "failed to initialize session log");
        }
    }

    pub async fn forwarded(&self, session_id: &str) {
        let patch = SessionLogPatch::forwarded(Utc::now());
        if let Err(e) = self
            .store
            .increment_session_log(session_id, LogCounter::Success, patch)
            .await
        {
            warn!(session_id, error = %e, "failed to record forward in session log");
        }
    }

    pub async fn failed(&self, session_id: &str, error: &impl ToString) {
        let patch = SessionLogPatch::failed(error.to_string(), Utc::now());
        if let Err(e) = self
            .store
            .increment_session_log(session_id, LogCounter::Error, patch)
            .await
        {
            warn!(session_id, error = %e, "failed to record error in session log");
        }
    }
}
