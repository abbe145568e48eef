// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay connection traits for the channel-messaging transport.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::mpsc;

use crate::error::{CourierError, ForwardError};
use crate::types::{ChatId, InboundMessage, MessageNumber, SessionRecord};

/// Stream of messages observed by one live connection, in arrival order.
pub type InboundStream = mpsc::Receiver<InboundMessage>;

/// A single authenticated relay identity connected to the platform.
#[async_trait]
pub trait RelayConnection: Send + Sync + 'static {
    /// Connection name, stable for a given session record.
    fn name(&self) -> &str;

    /// Starts the connection and returns its inbound stream.
    ///
    /// A connection can be started once; later calls fail.
    async fn start(&self) -> Result<InboundStream, CourierError>;

    /// Stops the connection. Afterwards `forward` fails instead of hanging.
    async fn stop(&self) -> Result<(), CourierError>;

    /// Copies `source_message` from `source_chat` into `target`.
    async fn forward(
        &self,
        target: ChatId,
        source_chat: ChatId,
        source_message: MessageNumber,
    ) -> Result<(), ForwardError>;
}

/// Builds connections from session records.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Constructs (but does not start) a connection for `session`.
    async fn connect(
        &self,
        session: &SessionRecord,
        credential: SecretString,
    ) -> Result<Arc<dyn RelayConnection>, CourierError>;
}
