// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, transport and worker crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Platform chat identifier (channels are negative on Telegram).
pub type ChatId = i64;

/// Platform message identifier, unique within a chat.
pub type MessageNumber = i64;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

// --- Relay configuration document ---

/// A channel the worker listens to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceChannel {
    pub channel_id: ChatId,
    #[serde(default)]
    pub title: String,
    pub added_by: i64,
    pub added_at: DateTime<Utc>,
}

/// The single channel messages are relayed into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetChannel {
    pub channel_id: ChatId,
    #[serde(default)]
    pub title: String,
    pub set_by: i64,
    pub set_at: DateTime<Utc>,
}

/// The singleton relay configuration document (key `"global"`).
///
/// Written by the admin collaborator, only ever read by the worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub sources: Vec<SourceChannel>,
    #[serde(default)]
    pub target: Option<TargetChannel>,
}

impl RelayConfig {
    /// Document key under which the configuration is stored.
    pub const KEY: &'static str = "global";

    /// Returns `true` if `chat_id` is one of the configured sources.
    pub fn is_source(&self, chat_id: ChatId) -> bool {
        self.sources.iter().any(|s| s.channel_id == chat_id)
    }
}

// --- Sessions ---

/// Authentication flavour of a relay identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionKind {
    /// Bot API token.
    Bot,
    /// User session string.
    User,
}

/// A desired relay identity as stored by the admin collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub name: String,
    pub kind: SessionKind,
    pub identifier: String,
    pub encrypted_credential: String,
    pub added_by: i64,
    pub added_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Name of the live connection built from this record.
    ///
    /// Retry jobs refer to their owning connection by this name, so it must
    /// be stable across reconnects of the same record and unique per id.
    pub fn connection_name(&self) -> String {
        format!("sess-{}", self.id)
    }
}

// --- Ledger ---

/// Composite dedup key `"<source_chat>:<source_message>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(source_chat: ChatId, source_message: MessageNumber) -> Self {
        Self(format!("{source_chat}:{source_message}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proof that a message has been relayed. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardedRecord {
    pub key: String,
    pub source_chat: ChatId,
    pub source_message: MessageNumber,
    pub forwarded_at: DateTime<Utc>,
}

// --- Session log ---

/// Per-session observability counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    pub session_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub success_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_forwarded_at: Option<DateTime<Utc>>,
}

/// Field-set patch applied atomically to a [`SessionLogEntry`].
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionLogPatch {
    pub started_at: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub success_count: Option<u64>,
    pub error_count: Option<u64>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_forwarded_at: Option<DateTime<Utc>>,
}

impl SessionLogPatch {
    /// Patch written when a session's connection starts.
    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(now),
            last_seen: Some(now),
            success_count: Some(0),
            error_count: Some(0),
            ..Self::default()
        }
    }

    /// Patch accompanying a success increment.
    pub fn forwarded(now: DateTime<Utc>) -> Self {
        Self {
            last_forwarded_at: Some(now),
            ..Self::default()
        }
    }

    /// Patch accompanying an error increment.
    pub fn failed(error: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            last_error: Some(error.into()),
            last_error_at: Some(now),
            ..Self::default()
        }
    }
}

/// Counter selected by an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LogCounter {
    Success,
    Error,
}

// --- Messages and jobs ---

/// A message observed on a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub message_id: MessageNumber,
}

impl InboundMessage {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.chat_id, self.message_id)
    }
}

/// A forward that could not be completed inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryJob {
    pub session_name: String,
    pub source_chat_id: ChatId,
    pub source_message_id: MessageNumber,
    pub target_chat_id: ChatId,
    pub dedup_key: DedupKey,
    pub attempts: u32,
}
