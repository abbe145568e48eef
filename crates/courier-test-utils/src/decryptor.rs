// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity credential decryptor.

use std::collections::HashSet;

use courier_core::{CourierError, CredentialDecryptor};
use secrecy::SecretString;

/// Returns the stored credential unchanged.
///
/// Empty credentials and any listed in `rejecting` fail with
/// [`CourierError::Credential`].
#[derive(Debug, Default)]
pub struct PlaintextDecryptor {
    rejected: HashSet<String>,
}

impl PlaintextDecryptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting<I, S>(credentials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rejected: credentials.into_iter().map(Into::into).collect(),
        }
    }
}

impl CredentialDecryptor for PlaintextDecryptor {
    fn decrypt(&self, encrypted: &str) -> Result<SecretString, CourierError> {
        if encrypted.is_empty() || self.rejected.contains(encrypted) {
            return Err(CourierError::Credential(format!(
                "cannot decrypt credential `{encrypted}`"
            )));
        }
        Ok(SecretString::from(encrypted.to_string()))
    }
}
