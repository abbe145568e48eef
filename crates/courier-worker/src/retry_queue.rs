// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background retry queue.
//!
//! Deliveries that cannot finish inline become [`RetryJob`]s. A single
//! [`QueueProcessor`] consumes them one at a time in FIFO order, retrying
//! each once per pass with exponential backoff until the attempt ceiling.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use courier_core::{RelayStore, RetryJob};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::policy::RetryPolicy;
use crate::registry::SessionRegistry;
use crate::session_log::SessionLog;

/// Producer handle for the retry queue.
#[derive(Clone)]
pub struct RetryQueue {
    tx: mpsc::UnboundedSender<RetryJob>,
}

impl RetryQueue {
    /// Append `job` to the back of the queue.
    ///
    /// Returns `false` if the processor is gone and the job was lost.
    pub fn enqueue(&self, job: RetryJob) -> bool {
        match self.tx.send(job) {
            Ok(()) => true,
            Err(mpsc::error::SendError(job)) => {
                error!(key = %job.dedup_key, "retry queue closed, job lost");
                false
            }
        }
    }
}

/// Consumer side, handed to [`QueueProcessor::new`].
pub struct RetryReceiver {
    rx: mpsc::UnboundedReceiver<RetryJob>,
}

impl RetryReceiver {
    /// Take the next job without waiting.
    pub fn try_recv(&mut self) -> Option<RetryJob> {
        self.rx.try_recv().ok()
    }
}

/// Create a connected queue/receiver pair.
pub fn retry_queue() -> (RetryQueue, RetryReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RetryQueue { tx }, RetryReceiver { rx })
}

/// What processing one job amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Forwarded and recorded in the ledger.
    Succeeded,
    /// Forward failed; requeued with one more attempt.
    Retried,
    /// Owning session not live; requeued unchanged.
    Parked,
    /// Attempt ceiling reached; discarded.
    Dropped,
}

impl JobOutcome {
    fn as_label(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Retried => "retried",
            Self::Parked => "parked",
            Self::Dropped => "dropped",
        }
    }
}

/// Single consumer of the retry queue.
pub struct QueueProcessor {
    rx: RetryReceiver,
    queue: RetryQueue,
    registry: SessionRegistry,
    store: Arc<dyn RelayStore>,
    log: SessionLog,
    policy: RetryPolicy,
}

impl QueueProcessor {
    pub fn new(
        rx: RetryReceiver,
        queue: RetryQueue,
        registry: SessionRegistry,
        store: Arc<dyn RelayStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            rx,
            queue,
            registry,
            log: SessionLog::new(Arc::clone(&store)),
            store,
            policy,
        }
    }

    /// Handle one job to completion, including any backoff pause.
    pub async fn process_job(&self, job: RetryJob) -> JobOutcome {
        if self.policy.is_exhausted(job.attempts) {
            warn!(
                key = %job.dedup_key,
                session = %job.session_name,
                attempts = job.attempts,
                "retry ceiling reached, dropping job"
            );
            return JobOutcome::Dropped;
        }

        let Some((session_id, connection)) = self.registry.resolve(&job.session_name).await else {
            debug!(
                key = %job.dedup_key,
                session = %job.session_name,
                "owning session not live, parking job"
            );
            tokio::time::sleep(self.policy.requeue_pause).await;
            self.queue.enqueue(job);
            return JobOutcome::Parked;
        };

        match connection
            .forward(job.target_chat_id, job.source_chat_id, job.source_message_id)
            .await
        {
            Ok(()) => {
                match self
                    .store
                    .insert_forwarded_record(&job.dedup_key, job.source_chat_id, job.source_message_id)
                    .await
                {
                    Ok(_) => {}
                    Err(e) => error!(
                        key = %job.dedup_key,
                        error = %e,
                        "forwarded but failed to write ledger record"
                    ),
                }
                self.log.forwarded(&session_id).await;
                info!(key = %job.dedup_key, session = %job.session_name, "queued forward succeeded");
                JobOutcome::Succeeded
            }
            Err(err) => {
                let wait = self.policy.queue_backoff(job.attempts);
                let attempts = job.attempts + 1;
                self.log.failed(&session_id, &err).await;
                warn!(
                    key = %job.dedup_key,
                    session = %job.session_name,
                    attempt = attempts,
                    wait_secs = wait.as_secs(),
                    error = %err,
                    "queued forward failed, requeueing"
                );
                tokio::time::sleep(wait).await;
                self.queue.enqueue(RetryJob { attempts, ..job });
                JobOutcome::Retried
            }
        }
    }

    /// Consume jobs until `cancel` fires.
    ///
    /// A panic while handling a job is caught and logged; the loop resumes
    /// after `processor_error_pause`.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("retry queue processor running");
        loop {
            let job = tokio::select! {
                job = self.rx.rx.recv() => job,
                _ = cancel.cancelled() => break,
            };
            let Some(job) = job else {
                break;
            };

            let handled = tokio::select! {
                result = AssertUnwindSafe(self.process_job(job)).catch_unwind() => result,
                _ = cancel.cancelled() => break,
            };

            match handled {
                Ok(outcome) => metrics::record_retry_job(outcome.as_label()),
                Err(_) => {
                    metrics::record_retry_job("panicked");
                    error!("retry queue processor panicked while handling a job, pausing");
                    tokio::select! {
                        _ = tokio::time::sleep(self.policy.processor_error_pause) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
            }
        }
        info!("retry queue processor stopped");
    }
}
