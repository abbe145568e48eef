// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for Courier.
//!
//! Provides in-memory and scripted implementations of the core seams so the
//! worker can be exercised deterministically without SQLite or a network.
//!
//! # Components
//!
//! - [`MemoryStore`] - hash-map relay store with failure injection
//! - [`MockConnection`] / [`MockConnector`] - scripted relay connections
//! - [`PlaintextDecryptor`] - pass-through credential decryptor

pub mod decryptor;
pub mod fixtures;
pub mod memory_store;
pub mod mock_connection;

pub use decryptor::PlaintextDecryptor;
pub use fixtures::{bot_session, relay_config, user_session};
pub use memory_store::MemoryStore;
pub use mock_connection::{ForwardCall, MockConnection, MockConnector};
