// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery pipeline: dedup check plus tiered forward-with-retry.
//!
//! Rate limits are waited out without consuming retry budget. Retryable and
//! generic failures back off exponentially up to the ceiling. Other protocol
//! errors, and ladder exhaustion, escalate to the retry queue.

use std::sync::Arc;

use courier_core::{
    ChatId, CourierError, DedupKey, ForwardError, InboundMessage, RelayConnection, RelayStore,
    RetryJob,
};
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::policy::RetryPolicy;
use crate::retry_queue::RetryQueue;
use crate::session_log::SessionLog;

/// Why a message was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    NoTarget,
    NotASource,
    AlreadyForwarded,
}

/// Result of dispatching one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Forwarded and recorded.
    Succeeded,
    /// Handed to the retry queue.
    Deferred,
    Discarded(DiscardReason),
}

impl DeliveryOutcome {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Deferred => "deferred",
            Self::Discarded(_) => "discarded",
        }
    }
}

/// The identity a delivery runs under.
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: String,
    pub connection: Arc<dyn RelayConnection>,
}

pub struct DeliveryPipeline {
    store: Arc<dyn RelayStore>,
    queue: RetryQueue,
    log: SessionLog,
    policy: RetryPolicy,
}

impl DeliveryPipeline {
    pub fn new(store: Arc<dyn RelayStore>, queue: RetryQueue, policy: RetryPolicy) -> Self {
        Self {
            log: SessionLog::new(Arc::clone(&store)),
            store,
            queue,
            policy,
        }
    }

    /// Filter, dedup and deliver one inbound message.
    ///
    /// Store failures while reading config or the ledger are returned; the
    /// message is then neither forwarded nor queued.
    pub async fn dispatch(
        &self,
        session: &SessionHandle,
        msg: InboundMessage,
    ) -> Result<DeliveryOutcome, CourierError> {
        let config = self.store.get_config().await?;
        let Some(target) = config.target.as_ref() else {
            debug!(chat_id = msg.chat_id, "no target configured, discarding");
            return Ok(DeliveryOutcome::Discarded(DiscardReason::NoTarget));
        };
        if !config.is_source(msg.chat_id) {
            debug!(chat_id = msg.chat_id, "not a source channel, discarding");
            return Ok(DeliveryOutcome::Discarded(DiscardReason::NotASource));
        }

        let key = msg.dedup_key();
        if self.store.find_forwarded_record(&key).await?.is_some() {
            debug!(key = %key, "already forwarded, discarding");
            return Ok(DeliveryOutcome::Discarded(DiscardReason::AlreadyForwarded));
        }

        Ok(self
            .forward_with_retry(session, &msg, target.channel_id, key)
            .await)
    }

    /// Forward with the inline retry ladder, escalating to the queue.
    pub async fn forward_with_retry(
        &self,
        session: &SessionHandle,
        msg: &InboundMessage,
        target: ChatId,
        key: DedupKey,
    ) -> DeliveryOutcome {
        let session_id = session.session_id.as_str();
        let mut attempt: u32 = 0;
        let mut backoff = self.policy.backoff();

        while attempt < self.policy.max_retries {
            let err = match session
                .connection
                .forward(target, msg.chat_id, msg.message_id)
                .await
            {
                Ok(()) => {
                    self.record_success(session_id, &key, msg).await;
                    info!(key = %key, session_id, "message forwarded");
                    return DeliveryOutcome::Succeeded;
                }
                Err(err) => err,
            };

            self.log.failed(session_id, &err).await;
            match err {
                ForwardError::RateLimited { wait, .. } => {
                    let wait = self.policy.rate_limit_wait(wait);
                    warn!(key = %key, session_id, wait_secs = wait.as_secs(), "rate limited, waiting");
                    tokio::time::sleep(wait).await;
                }
                ForwardError::Retryable { .. } | ForwardError::Failure { .. } => {
                    let delay = backoff.next_delay();
                    attempt += 1;
                    warn!(
                        key = %key,
                        session_id,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "forward failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                ForwardError::Protocol { .. } => {
                    warn!(key = %key, session_id, error = %err, "protocol error, deferring to retry queue");
                    self.defer(session, msg, target, key, attempt + 1);
                    return DeliveryOutcome::Deferred;
                }
            }
        }

        warn!(key = %key, session_id, attempts = attempt, "retries exhausted, deferring to retry queue");
        self.defer(session, msg, target, key, attempt);
        DeliveryOutcome::Deferred
    }

    async fn record_success(&self, session_id: &str, key: &DedupKey, msg: &InboundMessage) {
        match self
            .store
            .insert_forwarded_record(key, msg.chat_id, msg.message_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(key = %key, "ledger record already written by a concurrent delivery"),
            Err(e) => error!(key = %key, error = %e, "forwarded but failed to write ledger record"),
        }
        self.log.forwarded(session_id).await;
    }

    fn defer(
        &self,
        session: &SessionHandle,
        msg: &InboundMessage,
        target: ChatId,
        key: DedupKey,
        attempts: u32,
    ) {
        self.queue.enqueue(RetryJob {
            session_name: session.connection.name().to_string(),
            source_chat_id: msg.chat_id,
            source_message_id: msg.message_id,
            target_chat_id: target,
            dedup_key: key,
            attempts,
        });
    }

    /// Dispatch and log the result. Used by per-message listener tasks.
    pub async fn handle(&self, session: &SessionHandle, msg: InboundMessage) {
        let (chat_id, message_id) = (msg.chat_id, msg.message_id);
        match self.dispatch(session, msg).await {
            Ok(outcome) => metrics::record_forward(outcome.as_label()),
            Err(e) => {
                metrics::record_forward("error");
                warn!(
                    session_id = %session.session_id,
                    chat_id,
                    message_id,
                    error = %e,
                    "dispatch failed"
                );
            }
        }
    }
}
