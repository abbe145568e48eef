// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forwarding worker for the Courier relay.
//!
//! The [`ForwardWorker`] owns two long-running loops:
//! - the [`LifecycleManager`], which keeps live connections converged on the
//!   desired sessions and feeds their inbound messages to the
//!   [`DeliveryPipeline`]
//! - the [`QueueProcessor`], which retries forwards the pipeline deferred

pub mod delivery;
pub mod lifecycle;
pub mod metrics;
pub mod policy;
pub mod registry;
pub mod retry_queue;
pub mod session_log;
pub mod shutdown;

use std::sync::Arc;

use courier_config::model::WorkerConfig;
use courier_core::{Connector, CourierError, CredentialDecryptor, RelayStore};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use delivery::{DeliveryOutcome, DeliveryPipeline, DiscardReason, SessionHandle};
pub use lifecycle::{LifecycleManager, ReconcileReport};
pub use policy::{Backoff, RetryPolicy};
pub use registry::{LiveSession, SessionRegistry};
pub use retry_queue::{JobOutcome, QueueProcessor, RetryQueue, RetryReceiver, retry_queue};
pub use session_log::SessionLog;

/// Running loop tasks, present between `start` and `stop`.
struct Running {
    cancel: CancellationToken,
    lifecycle: JoinHandle<()>,
    processor: JoinHandle<()>,
}

/// The forwarding worker: lifecycle loop plus retry queue processor.
pub struct ForwardWorker {
    lifecycle: Arc<LifecycleManager>,
    processor: Mutex<Option<QueueProcessor>>,
    registry: SessionRegistry,
    queue: RetryQueue,
    running: Mutex<Option<Running>>,
}

impl ForwardWorker {
    pub fn new(
        config: &WorkerConfig,
        store: Arc<dyn RelayStore>,
        connector: Arc<dyn Connector>,
        decryptor: Arc<dyn CredentialDecryptor>,
    ) -> Self {
        let policy = RetryPolicy::from_config(config);
        let registry = SessionRegistry::new();
        let (queue, jobs) = retry_queue();

        let pipeline = Arc::new(DeliveryPipeline::new(
            Arc::clone(&store),
            queue.clone(),
            policy.clone(),
        ));
        let lifecycle = Arc::new(LifecycleManager::new(
            Arc::clone(&store),
            connector,
            decryptor,
            registry.clone(),
            pipeline,
            config.reconcile_interval(),
            config.session_page_limit,
        ));
        let processor = QueueProcessor::new(jobs, queue.clone(), registry.clone(), store, policy);

        Self {
            lifecycle,
            processor: Mutex::new(Some(processor)),
            registry,
            queue,
            running: Mutex::new(None),
        }
    }

    /// Schedule the lifecycle loop and the queue processor.
    ///
    /// Returns without waiting for the first reconciliation. A worker can be
    /// started once.
    pub async fn start(&self) -> Result<(), CourierError> {
        let mut running = self.running.lock().await;
        let processor = self
            .processor
            .lock()
            .await
            .take()
            .ok_or_else(|| CourierError::Internal("forward worker already started".into()))?;

        let cancel = CancellationToken::new();
        let lifecycle = {
            let manager = Arc::clone(&self.lifecycle);
            let cancel = cancel.clone();
            tokio::spawn(async move { manager.run(cancel).await })
        };
        let processor = tokio::spawn(processor.run(cancel.clone()));

        *running = Some(Running {
            cancel,
            lifecycle,
            processor,
        });
        info!("forward worker started");
        Ok(())
    }

    /// Signal both loops, wait for them to exit, then stop every live
    /// connection. Individual stop failures are logged and swallowed.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.lifecycle.await {
            warn!(error = %e, "lifecycle task ended abnormally");
        }
        if let Err(e) = running.processor.await {
            warn!(error = %e, "retry queue task ended abnormally");
        }
        self.lifecycle.stop_all().await;
        info!("forward worker stopped");
    }

    /// Live connection table.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Handle for enqueueing retry jobs.
    pub fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use courier_test_utils::{MemoryStore, MockConnector, PlaintextDecryptor, bot_session};

    fn worker(store: Arc<MemoryStore>, connector: Arc<MockConnector>) -> ForwardWorker {
        ForwardWorker::new(
            &WorkerConfig::default(),
            store,
            connector,
            Arc::new(PlaintextDecryptor::new()),
        )
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let w = worker(Arc::new(MemoryStore::new()), Arc::new(MockConnector::new()));
        w.start().await.unwrap();
        assert!(w.start().await.is_err());
        w.stop().await;
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let w = worker(Arc::new(MemoryStore::new()), Arc::new(MockConnector::new()));
        w.stop().await;
        assert!(w.registry().is_empty().await);
    }

    #[tokio::test]
    async fn start_reconciles_and_stop_tears_down() {
        let store = Arc::new(MemoryStore::new());
        let connector = Arc::new(MockConnector::new());
        store.add_session(bot_session("a")).await;
        let w = worker(store, connector.clone());

        w.start().await.unwrap();
        while !w.registry().contains("a").await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        w.stop().await;

        assert!(w.registry().is_empty().await);
        assert!(connector.connection("a").await.unwrap().is_stopped());
    }
}
