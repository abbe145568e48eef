// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table.

pub mod config;
pub mod ledger;
pub mod session_logs;
pub mod sessions;
