// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session credential decryption.
//!
//! Stored credentials have the form `hex(nonce) ":" hex(ciphertext || tag)`.
//! The worker only ever decrypts; [`CredentialVault::seal_credential`] exists
//! for the admin side and for tests.

use std::fmt;

use courier_config::model::VaultConfig;
use courier_core::{CourierError, CredentialDecryptor};
use ring::aead::NONCE_LEN;
use secrecy::SecretString;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{self, KEY_LEN};

/// Holds the AES-256-GCM key used to decrypt session credentials.
pub struct CredentialVault {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

impl CredentialVault {
    pub fn from_key(key: [u8; KEY_LEN]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Build a vault from a hex-encoded 32-byte key.
    pub fn from_hex(hex_key: &str) -> Result<Self, CourierError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_key.trim())
                .map_err(|e| CourierError::Credential(format!("credential key is not hex: {e}")))?,
        );
        let key: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            CourierError::Credential(format!(
                "credential key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::from_key(key))
    }

    /// Resolve the key from `[vault]`: the inline key wins, otherwise the
    /// environment variable named by `credential_key_env` is read.
    pub fn from_config(config: &VaultConfig) -> Result<Self, CourierError> {
        if let Some(key) = config.credential_key.as_deref() {
            debug!("using inline credential key");
            return Self::from_hex(key);
        }
        match std::env::var(&config.credential_key_env) {
            Ok(value) => {
                let value = Zeroizing::new(value);
                debug!(var = %config.credential_key_env, "using credential key from environment");
                Self::from_hex(&value)
            }
            Err(_) => Err(CourierError::Credential(format!(
                "no credential key configured: set vault.credential_key or ${}",
                config.credential_key_env
            ))),
        }
    }

    /// Encrypt `plaintext` into the stored credential format.
    pub fn seal_credential(&self, plaintext: &str) -> Result<String, CourierError> {
        let (ciphertext, nonce) = crypto::seal(&self.key, plaintext.as_bytes())?;
        Ok(format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext)))
    }
}

impl CredentialDecryptor for CredentialVault {
    fn decrypt(&self, encrypted: &str) -> Result<SecretString, CourierError> {
        let (nonce_hex, ciphertext_hex) = encrypted
            .split_once(':')
            .ok_or_else(|| CourierError::Credential("malformed credential: missing ':'".into()))?;

        let nonce: [u8; NONCE_LEN] = hex::decode(nonce_hex)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| CourierError::Credential("malformed credential nonce".into()))?;
        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|e| CourierError::Credential(format!("malformed credential body: {e}")))?;

        let plaintext = crypto::open(&self.key, &nonce, &ciphertext)?;
        match String::from_utf8(plaintext) {
            Ok(text) => Ok(SecretString::from(text)),
            Err(e) => {
                e.into_bytes().zeroize();
                Err(CourierError::Credential(
                    "decrypted credential is not UTF-8".into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn sealed_credential_decrypts() {
        let vault = CredentialVault::from_hex(TEST_KEY_HEX).unwrap();
        let stored = vault.seal_credential("123456:ABCdef").unwrap();
        let (nonce, _) = stored.split_once(':').unwrap();
        assert_eq!(nonce.len(), NONCE_LEN * 2);
        assert_eq!(vault.decrypt(&stored).unwrap().expose_secret(), "123456:ABCdef");
    }

    #[test]
    fn different_key_cannot_decrypt() {
        let stored = CredentialVault::from_hex(TEST_KEY_HEX)
            .unwrap()
            .seal_credential("token")
            .unwrap();
        let other = CredentialVault::from_key([9u8; KEY_LEN]);
        assert!(matches!(other.decrypt(&stored), Err(CourierError::Credential(_))));
    }

    #[test]
    fn malformed_inputs_are_credential_errors() {
        let vault = CredentialVault::from_hex(TEST_KEY_HEX).unwrap();
        for bad in ["", "no-separator", "zz:00", "0011:00", "000000000000000000000000:xyz"] {
            assert!(
                matches!(vault.decrypt(bad), Err(CourierError::Credential(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn short_key_is_rejected() {
        let err = CredentialVault::from_hex("abcd").unwrap_err();
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn debug_does_not_leak_key() {
        let vault = CredentialVault::from_hex(TEST_KEY_HEX).unwrap();
        assert!(!format!("{vault:?}").contains("0001"));
    }

    #[test]
    fn inline_key_takes_precedence() {
        let config = VaultConfig {
            credential_key: Some(TEST_KEY_HEX.to_string()),
            credential_key_env: "COURIER_TEST_UNSET_KEY".to_string(),
        };
        assert!(CredentialVault::from_config(&config).is_ok());
    }

    #[test]
    #[serial]
    fn key_is_read_from_environment() {
        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var("COURIER_TEST_VAULT_KEY", TEST_KEY_HEX) };
        let config = VaultConfig {
            credential_key: None,
            credential_key_env: "COURIER_TEST_VAULT_KEY".to_string(),
        };
        let result = CredentialVault::from_config(&config);
        unsafe { std::env::remove_var("COURIER_TEST_VAULT_KEY") };
        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn missing_key_names_the_variable() {
        let config = VaultConfig {
            credential_key: None,
            credential_key_env: "COURIER_TEST_MISSING_KEY".to_string(),
        };
        let err = CredentialVault::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("COURIER_TEST_MISSING_KEY"));
    }
}
