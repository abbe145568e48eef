// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Forwarding worker timings and retry policy.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Telegram transport settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Credential decryption settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Forwarding worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Seconds between session reconciliation passes.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    /// Maximum number of desired sessions fetched per pass.
    #[serde(default = "default_session_page_limit")]
    pub session_page_limit: usize,

    /// Attempt ceiling shared by the inline retry ladder and the retry queue.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First inline backoff in milliseconds; doubles on every bounded failure.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Rate-limit wait used when the platform does not specify one.
    #[serde(default = "default_rate_limit_default_wait_secs")]
    pub rate_limit_default_wait_secs: u64,

    /// Pause before requeueing a job whose session is not live.
    #[serde(default = "default_requeue_pause_secs")]
    pub requeue_pause_secs: u64,

    /// Unit of the queue backoff (`base * 2^attempts`).
    #[serde(default = "default_queue_backoff_base_secs")]
    pub queue_backoff_base_secs: u64,

    /// Pause after an unexpected failure inside the queue processor.
    #[serde(default = "default_processor_error_pause_secs")]
    pub processor_error_pause_secs: u64,

    /// Capacity of each connection's inbound message buffer.
    #[serde(default = "default_inbound_buffer")]
    pub inbound_buffer: usize,
}

impl WorkerConfig {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn rate_limit_default_wait(&self) -> Duration {
        Duration::from_secs(self.rate_limit_default_wait_secs)
    }

    pub fn requeue_pause(&self) -> Duration {
        Duration::from_secs(self.requeue_pause_secs)
    }

    pub fn queue_backoff_base(&self) -> Duration {
        Duration::from_secs(self.queue_backoff_base_secs)
    }

    pub fn processor_error_pause(&self) -> Duration {
        Duration::from_secs(self.processor_error_pause_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval_secs(),
            session_page_limit: default_session_page_limit(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            rate_limit_default_wait_secs: default_rate_limit_default_wait_secs(),
            requeue_pause_secs: default_requeue_pause_secs(),
            queue_backoff_base_secs: default_queue_backoff_base_secs(),
            processor_error_pause_secs: default_processor_error_pause_secs(),
            inbound_buffer: default_inbound_buffer(),
        }
    }
}

fn default_reconcile_interval_secs() -> u64 {
    20
}

fn default_session_page_limit() -> usize {
    500
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_rate_limit_default_wait_secs() -> u64 {
    30
}

fn default_requeue_pause_secs() -> u64 {
    5
}

fn default_queue_backoff_base_secs() -> u64 {
    1
}

fn default_processor_error_pause_secs() -> u64 {
    2
}

fn default_inbound_buffer() -> usize {
    256
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier").join("courier.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("courier.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Telegram transport configuration.
///
/// Only bot sessions are served; user (MTProto) sessions are rejected at
/// connect time, so no application id or hash is configured.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Custom Bot API server URL. `None` uses the public endpoint.
    #[serde(default)]
    pub api_url: Option<String>,

    /// HTTP client timeout. Must exceed the long-polling timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    45
}

/// Credential vault configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Hex-encoded 32-byte AES-256-GCM key. Prefer `credential_key_env`.
    #[serde(default)]
    pub credential_key: Option<String>,

    /// Environment variable holding the hex-encoded key.
    #[serde(default = "default_credential_key_env")]
    pub credential_key_env: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            credential_key: None,
            credential_key_env: default_credential_key_env(),
        }
    }
}

fn default_credential_key_env() -> String {
    "COURIER_CREDENTIAL_KEY".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
