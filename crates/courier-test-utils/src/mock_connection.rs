// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted relay connections for deterministic worker tests.
//!
//! `MockConnection` replays queued forward outcomes (defaulting to success),
//! records every forward call, and exposes its inbound stream for message
//! injection. `MockConnector` hands out mock connections per session id.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, Notify, mpsc};

use courier_core::{
    ChatId, Connector, CourierError, ForwardError, InboundMessage, InboundStream, MessageNumber,
    RelayConnection, SessionRecord,
};

const INBOUND_CAPACITY: usize = 64;

/// One recorded `forward` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardCall {
    pub target: ChatId,
    pub source_chat: ChatId,
    pub source_message: MessageNumber,
}

/// A relay connection driven entirely by the test.
pub struct MockConnection {
    name: String,
    outcomes: Mutex<VecDeque<Result<(), ForwardError>>>,
    calls: Mutex<Vec<ForwardCall>>,
    inbound: Mutex<Option<mpsc::Sender<InboundMessage>>>,
    forwarded: Notify,
    started: AtomicBool,
    stopped: AtomicBool,
    fail_start: AtomicBool,
    fail_stop: AtomicBool,
    forward_delay_ms: AtomicU64,
    start_delay_ms: AtomicU64,
    panic_next_forward: AtomicBool,
}

impl MockConnection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            inbound: Mutex::new(None),
            forwarded: Notify::new(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            fail_stop: AtomicBool::new(false),
            forward_delay_ms: AtomicU64::new(0),
            start_delay_ms: AtomicU64::new(0),
            panic_next_forward: AtomicBool::new(false),
        }
    }

    /// Queue outcomes for the next forward calls. Once drained, forwards succeed.
    pub async fn push_outcomes<I>(&self, outcomes: I)
    where
        I: IntoIterator<Item = Result<(), ForwardError>>,
    {
        self.outcomes.lock().await.extend(outcomes);
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_stop(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }

    /// Every forward call sleeps this long before resolving.
    pub fn set_forward_delay(&self, delay: Duration) {
        self.forward_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// `start` sleeps this long before resolving.
    pub fn set_start_delay(&self, delay: Duration) {
        self.start_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// The next forward call panics instead of resolving.
    pub fn panic_on_next_forward(&self) {
        self.panic_next_forward.store(true, Ordering::SeqCst);
    }

    /// Push a message into the inbound stream. Returns `false` if the
    /// connection was never started or the stream is closed.
    pub async fn inject(&self, chat_id: ChatId, message_id: MessageNumber) -> bool {
        let sender = self.inbound.lock().await.clone();
        match sender {
            Some(tx) => tx.send(InboundMessage { chat_id, message_id }).await.is_ok(),
            None => false,
        }
    }

    pub async fn forward_calls(&self) -> Vec<ForwardCall> {
        self.calls.lock().await.clone()
    }

    pub async fn forward_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Resolves once at least `n` forward calls have been recorded.
    pub async fn wait_for_forwards(&self, n: usize) {
        loop {
            let notified = self.forwarded.notified();
            if self.forward_count().await >= n {
                return;
            }
            notified.await;
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayConnection for MockConnection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<InboundStream, CourierError> {
        let delay = self.start_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(CourierError::connection(format!("{}: scripted start failure", self.name)));
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CourierError::connection(format!("{}: already started", self.name)));
        }
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        *self.inbound.lock().await = Some(tx);
        Ok(rx)
    }

    async fn stop(&self) -> Result<(), CourierError> {
        self.stopped.store(true, Ordering::SeqCst);
        self.inbound.lock().await.take();
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(CourierError::connection(format!("{}: scripted stop failure", self.name)));
        }
        Ok(())
    }

    async fn forward(
        &self,
        target: ChatId,
        source_chat: ChatId,
        source_message: MessageNumber,
    ) -> Result<(), ForwardError> {
        if self.is_stopped() {
            return Err(ForwardError::failure(format!("{}: connection stopped", self.name)));
        }
        if self.panic_next_forward.swap(false, Ordering::SeqCst) {
            panic!("{}: scripted forward panic", self.name);
        }
        let delay = self.forward_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.calls.lock().await.push(ForwardCall {
            target,
            source_chat,
            source_message,
        });
        let outcome = self.outcomes.lock().await.pop_front().unwrap_or(Ok(()));
        self.forwarded.notify_waiters();
        outcome
    }
}

/// Connector handing out [`MockConnection`]s.
///
/// Tests may `prepare` a scripted connection for a session id before the
/// worker connects it; otherwise a fresh default connection is built.
#[derive(Default)]
pub struct MockConnector {
    prepared: Mutex<HashMap<String, Arc<MockConnection>>>,
    built: Mutex<Vec<(String, Arc<MockConnection>)>>,
    failing: Mutex<HashSet<String>>,
    credentials: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `connection` the next time session `id` is connected.
    pub async fn prepare(&self, id: &str, connection: Arc<MockConnection>) {
        self.prepared.lock().await.insert(id.to_string(), connection);
    }

    pub async fn set_fail_connect(&self, id: &str, fail: bool) {
        let mut failing = self.failing.lock().await;
        if fail {
            failing.insert(id.to_string());
        } else {
            failing.remove(id);
        }
    }

    /// The most recent connection built for session `id`.
    pub async fn connection(&self, id: &str) -> Option<Arc<MockConnection>> {
        self.built
            .lock()
            .await
            .iter()
            .rev()
            .find(|(sid, _)| sid == id)
            .map(|(_, conn)| Arc::clone(conn))
    }

    pub async fn connect_count(&self) -> usize {
        self.built.lock().await.len()
    }

    /// Decrypted credentials seen by `connect`, in call order.
    pub async fn credentials(&self) -> Vec<String> {
        self.credentials.lock().await.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        session: &SessionRecord,
        credential: SecretString,
    ) -> Result<Arc<dyn RelayConnection>, CourierError> {
        self.credentials
            .lock()
            .await
            .push(credential.expose_secret().to_string());
        if self.failing.lock().await.contains(&session.id) {
            return Err(CourierError::connection(format!(
                "scripted connect failure for {}",
                session.id
            )));
        }
        let connection = self
            .prepared
            .lock()
            .await
            .remove(&session.id)
            .unwrap_or_else(|| Arc::new(MockConnection::new(session.connection_name())));
        self.built
            .lock()
            .await
            .push((session.id.clone(), Arc::clone(&connection)));
        Ok(connection)
    }
}
