// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] draws a fresh random 96-bit nonce from the system
//! CSPRNG. Nonce reuse under one key breaks GCM.

use courier_core::CourierError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

/// Length of the AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

fn cipher(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, CourierError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| CourierError::Credential("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext`, returning `(ciphertext_with_tag, nonce)`.
pub fn seal(
    key: &[u8; KEY_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_LEN]), CourierError> {
    let cipher = cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| CourierError::Credential("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    cipher
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| CourierError::Credential("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt `ciphertext` (which carries the 16-byte tag appended by [`seal`]).
///
/// Fails if the key is wrong or the data was tampered with.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CourierError> {
    let cipher = cipher(key)?;
    let mut in_out = ciphertext.to_vec();
    let plaintext = cipher
        .open_in_place(Nonce::assume_unique_for_key(*nonce), Aad::empty(), &mut in_out)
        .map_err(|_| {
            CourierError::Credential(
                "AES-256-GCM decryption failed: wrong key or corrupted data".to_string(),
            )
        })?;
    Ok(plaintext.to_vec())
}

/// Generate a random key suitable for [`seal`].
pub fn generate_random_key() -> Result<[u8; KEY_LEN], CourierError> {
    let mut key = [0u8; KEY_LEN];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| CourierError::Credential("failed to generate random key".to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_recovers_sealed_token() {
        let key = generate_random_key().unwrap();
        let (ciphertext, nonce) = seal(&key, b"123456:ABC-bot-token").unwrap();
        assert_eq!(open(&key, &nonce, &ciphertext).unwrap(), b"123456:ABC-bot-token");
    }

    #[test]
    fn nonces_are_fresh_per_seal() {
        let key = generate_random_key().unwrap();
        let (ct1, nonce1) = seal(&key, b"same").unwrap();
        let (ct2, nonce2) = seal(&key, b"same").unwrap();
        assert_ne!(nonce1, nonce2);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let (ciphertext, nonce) = seal(&generate_random_key().unwrap(), b"secret").unwrap();
        let err = open(&generate_random_key().unwrap(), &nonce, &ciphertext).unwrap_err();
        assert!(matches!(err, CourierError::Credential(_)));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let key = generate_random_key().unwrap();
        let (mut ciphertext, nonce) = seal(&key, b"do not tamper").unwrap();
        ciphertext[0] ^= 0x01;
        assert!(open(&key, &nonce, &ciphertext).is_err());
    }

    #[test]
    fn ciphertext_carries_gcm_tag() {
        let key = generate_random_key().unwrap();
        let (ciphertext, _) = seal(&key, b"hello").unwrap();
        assert_eq!(ciphertext.len(), 5 + 16);
    }
}
