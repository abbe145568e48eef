// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier relay.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across Courier traits and core operations.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Relay connection errors (start/stop failure, unsupported session type).
    #[error("connection error: {message}")]
    Connection {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Credential decryption or key handling failed.
    #[error("credential error: {0}")]
    Credential(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Shorthand for a [`CourierError::Connection`] without an underlying source.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps any error as a [`CourierError::Storage`].
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }
}

/// Classified failure of a single forward call.
///
/// This is the only contract the delivery pipeline needs from a transport's
/// error model. Each variant selects a different retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    /// The platform asked us to wait before retrying. `wait` is `None` when
    /// the platform did not say how long.
    #[error("rate limited: {message}")]
    RateLimited {
        wait: Option<Duration>,
        message: String,
    },

    /// A protocol error that is worth a few quick retries with backoff
    /// (payload too long, "retry shortly").
    #[error("retryable error: {message}")]
    Retryable { message: String },

    /// Any other protocol-level error. Busy-retrying will not help.
    #[error("{code}: {message}")]
    Protocol { code: String, message: String },

    /// A non-protocol failure (network, I/O, stopped connection).
    #[error("forward failed: {message}")]
    Failure { message: String },
}

impl ForwardError {
    /// Short machine-readable label, used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Retryable { .. } => "retryable",
            Self::Protocol { .. } => "protocol",
            Self::Failure { .. } => "failure",
        }
    }

    /// Builds a [`ForwardError::Failure`].
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}
