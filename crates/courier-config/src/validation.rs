// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-zero intervals and well-formed keys.

use crate::diagnostic::ConfigError;
use crate::model::CourierConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let worker = &config.worker;
    if worker.reconcile_interval_secs == 0 {
        fail("worker.reconcile_interval_secs must be greater than 0".to_string());
    }
    if worker.session_page_limit == 0 {
        fail("worker.session_page_limit must be greater than 0".to_string());
    }
    if worker.max_retries == 0 {
        fail("worker.max_retries must be at least 1".to_string());
    }
    // 2^attempts grows fast; cap so the queue backoff stays representable.
    if worker.max_retries > 32 {
        fail(format!(
            "worker.max_retries must be at most 32, got {}",
            worker.max_retries
        ));
    }
    if worker.initial_backoff_ms == 0 {
        fail("worker.initial_backoff_ms must be greater than 0".to_string());
    }
    if worker.requeue_pause_secs == 0 {
        fail("worker.requeue_pause_secs must be greater than 0".to_string());
    }
    if worker.queue_backoff_base_secs == 0 {
        fail("worker.queue_backoff_base_secs must be greater than 0".to_string());
    }
    if worker.inbound_buffer == 0 {
        fail("worker.inbound_buffer must be greater than 0".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if let Some(url) = &config.telegram.api_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        fail(format!("telegram.api_url `{url}` must be an http(s) URL"));
    }

    if let Some(key) = &config.vault.credential_key {
        match hex::decode(key.trim()) {
            Ok(bytes) if bytes.len() == 32 => {}
            Ok(bytes) => fail(format!(
                "vault.credential_key must decode to 32 bytes, got {}",
                bytes.len()
            )),
            Err(_) => fail("vault.credential_key must be hex-encoded".to_string()),
        }
    }

    if config.vault.credential_key_env.trim().is_empty() {
        fail("vault.credential_key_env must not be empty".to_string());
    }

    if !matches!(
        config.log.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        fail(format!(
            "log.level `{}` must be one of trace, debug, info, warn, error",
            config.log.level
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CourierConfig::default()).is_ok());
    }

    #[test]
    fn zero_interval_fails_validation() {
        let mut config = CourierConfig::default();
        config.worker.reconcile_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "reconcile_interval_secs"));
    }

    #[test]
    fn zero_backoff_units_fail_validation() {
        let mut config = CourierConfig::default();
        config.worker.initial_backoff_ms = 0;
        config.worker.requeue_pause_secs = 0;
        config.worker.queue_backoff_base_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "initial_backoff_ms"));
        assert!(has_error(&errors, "requeue_pause_secs"));
        assert!(has_error(&errors, "queue_backoff_base_secs"));
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CourierConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn short_credential_key_fails_validation() {
        let mut config = CourierConfig::default();
        config.vault.credential_key = Some("00ff".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "32 bytes"));
    }

    #[test]
    fn well_formed_credential_key_passes() {
        let mut config = CourierConfig::default();
        config.vault.credential_key = Some("ab".repeat(32));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = CourierConfig::default();
        config.worker.max_retries = 0;
        config.worker.session_page_limit = 0;
        config.log.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
