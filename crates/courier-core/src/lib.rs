// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier relay.
//!
//! This crate provides the trait seams, error types and domain types shared
//! by the store, transport and worker crates.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CourierError, ForwardError};
pub use types::{
    ChatId, DedupKey, ForwardedRecord, HealthStatus, InboundMessage, LogCounter, MessageNumber,
    RelayConfig, RetryJob, SessionKind, SessionLogEntry, SessionLogPatch, SessionRecord,
    SourceChannel, TargetChannel,
};

pub use traits::{Connector, CredentialDecryptor, InboundStream, RelayConnection, RelayStore};
