// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds [`TelegramConnection`]s from session records.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_config::model::TelegramConfig;
use courier_core::{Connector, CourierError, RelayConnection, SessionKind, SessionRecord};
use secrecy::{ExposeSecret, SecretString};
use teloxide::Bot;
use tracing::debug;

use crate::connection::TelegramConnection;

/// Bot API connector.
///
/// Only `bot` sessions are supported. User sessions hold MTProto session
/// strings, which the Bot API cannot authenticate.
#[derive(Debug, Clone)]
pub struct TelegramConnector {
    config: TelegramConfig,
    inbound_buffer: usize,
}

impl TelegramConnector {
    pub fn new(config: TelegramConfig, inbound_buffer: usize) -> Self {
        Self {
            config,
            inbound_buffer,
        }
    }

    fn build_bot(&self, token: &str) -> Result<Bot, CourierError> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .build()
            .map_err(|e| CourierError::Connection {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let bot = Bot::with_client(token, client);
        match self.config.api_url.as_deref() {
            Some(url) => {
                let parsed = url.parse().map_err(|_| {
                    CourierError::Config(format!("telegram.api_url `{url}` is not a valid URL"))
                })?;
                Ok(bot.set_api_url(parsed))
            }
            None => Ok(bot),
        }
    }
}

#[async_trait]
impl Connector for TelegramConnector {
    async fn connect(
        &self,
        session: &SessionRecord,
        credential: SecretString,
    ) -> Result<Arc<dyn RelayConnection>, CourierError> {
        let name = session.connection_name();
        match session.kind {
            SessionKind::Bot => {}
            SessionKind::User => {
                return Err(CourierError::connection(format!(
                    "{name}: user sessions are not supported by the Bot API transport"
                )));
            }
        }

        let token = credential.expose_secret();
        if token.trim().is_empty() {
            return Err(CourierError::connection(format!("{name}: bot token is empty")));
        }

        let bot = self.build_bot(token)?;
        debug!(session = %name, session_id = %session.id, "bot connection built");
        Ok(Arc::new(TelegramConnection::new(
            name,
            bot,
            self.inbound_buffer,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_session(kind: SessionKind) -> SessionRecord {
        SessionRecord {
            id: "0123456789abcdef".into(),
            name: "relay".into(),
            kind,
            identifier: "42".into(),
            encrypted_credential: String::new(),
            added_by: 1,
            added_at: Utc::now(),
        }
    }

    fn connector(api_url: Option<&str>) -> TelegramConnector {
        TelegramConnector::new(
            TelegramConfig {
                api_url: api_url.map(str::to_string),
                ..TelegramConfig::default()
            },
            16,
        )
    }

    #[tokio::test]
    async fn bot_session_builds_named_connection() {
        let conn = connector(None)
            .connect(
                &make_session(SessionKind::Bot),
                SecretString::from("123456:ABC-DEF".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(conn.name(), "sess-0123456789abcdef");
    }

    #[tokio::test]
    async fn user_session_is_rejected() {
        let err = connector(None)
            .connect(
                &make_session(SessionKind::User),
                SecretString::from("session-string".to_string()),
            )
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CourierError::Connection { .. }));
        assert!(err.to_string().contains("not supported"));
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let result = connector(None)
            .connect(
                &make_session(SessionKind::Bot),
                SecretString::from("  ".to_string()),
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn custom_api_url_is_accepted() {
        let result = connector(Some("http://localhost:8081/"))
            .connect(
                &make_session(SessionKind::Bot),
                SecretString::from("123456:ABC-DEF".to_string()),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn malformed_api_url_is_a_config_error() {
        let result = connector(Some("not a url"))
            .connect(
                &make_session(SessionKind::Bot),
                SecretString::from("123456:ABC-DEF".to_string()),
            )
            .await;
        assert!(matches!(result, Err(CourierError::Config(_))));
    }
}
