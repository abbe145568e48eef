// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential decryption seam.

use secrecy::SecretString;

use crate::error::CourierError;

/// Turns a stored `encrypted_credential` into the secret a connector needs.
pub trait CredentialDecryptor: Send + Sync + 'static {
    fn decrypt(&self, encrypted: &str) -> Result<SecretString, CourierError>;
}
