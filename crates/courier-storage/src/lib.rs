// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Courier relay.
//!
//! Holds the desired-state documents (relay config, sessions) written by the
//! admin surface, plus the dedup ledger and per-session logs written by the
//! worker. Schema is managed by embedded refinery migrations.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
