// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single bot identity connected to the Telegram Bot API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{
    ChatId as CourierChatId, CourierError, ForwardError, InboundStream, MessageNumber,
    RelayConnection,
};
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::classify;
use crate::handler;

/// How long `stop` waits for the polling task before aborting it.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Live Bot API connection.
///
/// `start` verifies the token with `getMe` and spawns a long-polling
/// dispatcher whose updates feed the returned inbound stream.
pub struct TelegramConnection {
    name: String,
    bot: Bot,
    inbound_buffer: usize,
    started: AtomicBool,
    cancel: CancellationToken,
    polling: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramConnection {
    pub fn new(name: String, bot: Bot, inbound_buffer: usize) -> Self {
        Self {
            name,
            bot,
            inbound_buffer: inbound_buffer.max(1),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            polling: Mutex::new(None),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[async_trait]
impl RelayConnection for TelegramConnection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<InboundStream, CourierError> {
        if self.is_stopped() {
            return Err(CourierError::connection(format!(
                "{}: connection already stopped",
                self.name
            )));
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CourierError::connection(format!(
                "{}: connection already started",
                self.name
            )));
        }

        let me = self.bot.get_me().await.map_err(|e| CourierError::Connection {
            message: format!("{}: getMe failed: {e}", self.name),
            source: Some(Box::new(e)),
        })?;
        info!(
            session = %self.name,
            bot_id = me.user.id.0,
            username = me.user.username.as_deref().unwrap_or("-"),
            "bot authenticated, starting long polling"
        );

        let (tx, rx) = mpsc::channel(self.inbound_buffer);
        let bot = self.bot.clone();
        let cancel = self.cancel.clone();
        let name = self.name.clone();

        let handle = tokio::spawn(async move {
            let mut dispatcher = Dispatcher::builder(bot, handler::schema())
                .dependencies(dptree::deps![tx])
                .default_handler(|_| async {})
                .build();

            tokio::select! {
                _ = dispatcher.dispatch() => {
                    warn!(session = %name, "dispatcher exited");
                }
                _ = cancel.cancelled() => {
                    debug!(session = %name, "polling cancelled");
                }
            }
        });

        *self.polling.lock().await = Some(handle);
        Ok(rx)
    }

    async fn stop(&self) -> Result<(), CourierError> {
        self.cancel.cancel();
        let handle = self.polling.lock().await.take();
        if let Some(mut handle) = handle
            && tokio::time::timeout(STOP_GRACE, &mut handle).await.is_err()
        {
            warn!(session = %self.name, "polling task did not exit in time, aborting");
            handle.abort();
        }
        info!(session = %self.name, "connection stopped");
        Ok(())
    }

    async fn forward(
        &self,
        target: CourierChatId,
        source_chat: CourierChatId,
        source_message: MessageNumber,
    ) -> Result<(), ForwardError> {
        if self.is_stopped() {
            return Err(ForwardError::failure(format!("{}: connection stopped", self.name)));
        }
        let message_id = i32::try_from(source_message).map_err(|_| {
            ForwardError::failure(format!("message id {source_message} out of range"))
        })?;

        let request = self
            .bot
            .copy_message(ChatId(target), ChatId(source_chat), MessageId(message_id));

        tokio::select! {
            result = request.into_future() => result.map(|_| ()).map_err(classify),
            _ = self.cancel.cancelled() => {
                Err(ForwardError::failure(format!("{}: connection stopped", self.name)))
            }
        }
    }
}
