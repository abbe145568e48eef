// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle manager.
//!
//! Every reconciliation interval the desired sessions are read from the store
//! and compared with the live table: missing sessions are started, extra
//! ones stopped. Sessions present in both are left alone, so credential
//! changes take effect only after a remove and re-add.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use courier_core::{
    Connector, CourierError, CredentialDecryptor, InboundStream, RelayStore, SessionRecord,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::delivery::{DeliveryPipeline, SessionHandle};
use crate::metrics;
use crate::registry::{LiveSession, SessionRegistry};
use crate::session_log::SessionLog;

/// Session ids touched by one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub started: Vec<String>,
    pub stopped: Vec<String>,
    pub failed: Vec<String>,
}

pub struct LifecycleManager {
    store: Arc<dyn RelayStore>,
    connector: Arc<dyn Connector>,
    decryptor: Arc<dyn CredentialDecryptor>,
    registry: SessionRegistry,
    pipeline: Arc<DeliveryPipeline>,
    log: SessionLog,
    interval: Duration,
    page_limit: usize,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn RelayStore>,
        connector: Arc<dyn Connector>,
        decryptor: Arc<dyn CredentialDecryptor>,
        registry: SessionRegistry,
        pipeline: Arc<DeliveryPipeline>,
        interval: Duration,
        page_limit: usize,
    ) -> Self {
        Self {
            log: SessionLog::new(Arc::clone(&store)),
            store,
            connector,
            decryptor,
            registry,
            pipeline,
            interval,
            page_limit,
        }
    }

    /// Run one reconciliation cycle.
    ///
    /// Fails only if the desired sessions cannot be read. Individual start
    /// failures are reported in [`ReconcileReport::failed`].
    pub async fn reconcile_once(&self) -> Result<ReconcileReport, CourierError> {
        let desired: HashMap<String, SessionRecord> = self
            .store
            .get_sessions(self.page_limit)
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        let live = self.registry.session_ids().await;
        let mut report = ReconcileReport::default();

        for (id, record) in &desired {
            if live.contains(id) {
                continue;
            }
            match self.start_session(record).await {
                Ok(()) => report.started.push(id.clone()),
                Err(e) => {
                    warn!(session_id = %id, session = %record.name, error = %e, "failed to start session");
                    report.failed.push(id.clone());
                }
            }
        }

        for id in live.iter().filter(|id| !desired.contains_key(*id)) {
            self.stop_session(id).await;
            report.stopped.push(id.clone());
        }

        metrics::set_live_sessions(self.registry.len().await);
        Ok(report)
    }

    async fn start_session(&self, record: &SessionRecord) -> Result<(), CourierError> {
        let credential = self.decryptor.decrypt(&record.encrypted_credential)?;
        let connection = self.connector.connect(record, credential).await?;
        let stream = connection.start().await?;

        let handle = SessionHandle {
            session_id: record.id.clone(),
            connection: Arc::clone(&connection),
        };
        let listener = tokio::spawn(listen(handle, stream, Arc::clone(&self.pipeline)));
        self.registry
            .insert(record.id.clone(), LiveSession::new(connection, listener))
            .await;
        self.log.started(&record.id).await;

        info!(
            session_id = %record.id,
            session = %record.name,
            kind = %record.kind,
            "session started"
        );
        Ok(())
    }

    async fn stop_session(&self, session_id: &str) {
        let Some(live) = self.registry.remove(session_id).await else {
            return;
        };
        let connection = live.into_connection();
        if let Err(e) = connection.stop().await {
            warn!(session_id, error = %e, "error stopping session, ignoring");
        }
        info!(session_id, "session stopped");
    }

    /// Stop and remove every live session.
    pub async fn stop_all(&self) {
        for (session_id, live) in self.registry.drain().await {
            let connection = live.into_connection();
            if let Err(e) = connection.stop().await {
                warn!(session_id = %session_id, error = %e, "error stopping session, ignoring");
            }
        }
        metrics::set_live_sessions(0);
        info!("all sessions stopped");
    }

    /// Reconcile immediately, then every interval until `cancel` fires.
    ///
    /// Cancellation is observed between cycles only. A cycle always runs to
    /// completion so every connection it starts is registered and can be
    /// stopped by [`stop_all`](Self::stop_all).
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "session lifecycle manager running");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.reconcile_once().await {
                Ok(report) => {
                    metrics::record_reconcile("ok");
                    if report.started.is_empty() && report.stopped.is_empty() && report.failed.is_empty() {
                        debug!("reconciliation: no changes");
                    } else {
                        info!(
                            started = report.started.len(),
                            stopped = report.stopped.len(),
                            failed = report.failed.len(),
                            "reconciliation complete"
                        );
                    }
                }
                Err(e) => {
                    metrics::record_reconcile("error");
                    error!(error = %e, "reconciliation failed, retrying next interval");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancel.cancelled() => break,
            }
        }
        info!("session lifecycle manager stopped");
    }
}

/// Inbound listener: one spawned dispatch task per message, so a slow
/// delivery never blocks the messages behind it.
async fn listen(session: SessionHandle, mut stream: InboundStream, pipeline: Arc<DeliveryPipeline>) {
    while let Some(msg) = stream.recv().await {
        let session = session.clone();
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            pipeline.handle(&session, msg).await;
        });
    }
    debug!(session_id = %session.session_id, "inbound stream closed");
}
