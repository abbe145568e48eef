// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for domain values used across tests.

use chrono::Utc;
use courier_core::{ChatId, RelayConfig, SessionKind, SessionRecord, SourceChannel, TargetChannel};

/// A relay config with the given sources and optional target.
pub fn relay_config(sources: &[ChatId], target: Option<ChatId>) -> RelayConfig {
    let now = Utc::now();
    RelayConfig {
        sources: sources
            .iter()
            .map(|&channel_id| SourceChannel {
                channel_id,
                title: format!("source {channel_id}"),
                added_by: 1,
                added_at: now,
            })
            .collect(),
        target: target.map(|channel_id| TargetChannel {
            channel_id,
            title: format!("target {channel_id}"),
            set_by: 1,
            set_at: now,
        }),
    }
}

/// A bot session whose "encrypted" credential is `token-<id>`.
///
/// Pair with [`PlaintextDecryptor`](crate::PlaintextDecryptor).
pub fn bot_session(id: &str) -> SessionRecord {
    SessionRecord {
        id: id.to_string(),
        name: format!("bot {id}"),
        kind: SessionKind::Bot,
        identifier: id.to_string(),
        encrypted_credential: format!("token-{id}"),
        added_by: 1,
        added_at: Utc::now(),
    }
}

pub fn user_session(id: &str) -> SessionRecord {
    SessionRecord {
        kind: SessionKind::User,
        encrypted_credential: format!("session-{id}"),
        ..bot_session(id)
    }
}
