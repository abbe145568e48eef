// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM decryption of stored session credentials.
//!
//! The admin surface encrypts bot tokens and user session strings before
//! writing them; the worker decrypts them here right before connecting.

pub mod credential;
pub mod crypto;

pub use credential::CredentialVault;
