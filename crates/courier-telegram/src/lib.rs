// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API transport for the Courier relay.
//!
//! Implements the core [`Connector`](courier_core::Connector) and
//! [`RelayConnection`](courier_core::RelayConnection) traits via teloxide:
//! long polling for inbound messages and channel posts, `copyMessage` for
//! outbound forwards.

pub mod connection;
pub mod connector;
pub mod errors;
pub mod handler;

pub use connection::TelegramConnection;
pub use connector::TelegramConnector;
pub use errors::classify;
