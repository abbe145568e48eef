// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Table of live relay connections, keyed by session id.
//!
//! Only the lifecycle manager mutates the table. Everyone else reads
//! snapshots, typically resolving a connection by its name.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use courier_core::RelayConnection;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// A started connection together with its inbound listener task.
pub struct LiveSession {
    pub connection: Arc<dyn RelayConnection>,
    listener: JoinHandle<()>,
}

impl LiveSession {
    pub fn new(connection: Arc<dyn RelayConnection>, listener: JoinHandle<()>) -> Self {
        Self {
            connection,
            listener,
        }
    }

    /// Abort the listener and hand back the connection for stopping.
    pub(crate) fn into_connection(self) -> Arc<dyn RelayConnection> {
        self.listener.abort();
        self.connection
    }
}

/// Shared handle to the live-connection table.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<String, LiveSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, session_id: String, live: LiveSession) {
        let previous = self.inner.write().await.insert(session_id, live);
        if let Some(previous) = previous {
            previous.listener.abort();
        }
    }

    pub(crate) async fn remove(&self, session_id: &str) -> Option<LiveSession> {
        self.inner.write().await.remove(session_id)
    }

    pub(crate) async fn drain(&self) -> Vec<(String, LiveSession)> {
        self.inner.write().await.drain().collect()
    }

    /// Ids of every live session.
    pub async fn session_ids(&self) -> HashSet<String> {
        self.inner.read().await.keys().cloned().collect()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.inner.read().await.contains_key(session_id)
    }

    /// Find a live connection by connection name, returning its session id too.
    pub async fn resolve(&self, name: &str) -> Option<(String, Arc<dyn RelayConnection>)> {
        self.inner
            .read()
            .await
            .iter()
            .find(|(_, live)| live.connection.name() == name)
            .map(|(id, live)| (id.clone(), Arc::clone(&live.connection)))
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_test_utils::MockConnection;

    fn live(name: &str) -> LiveSession {
        LiveSession::new(
            Arc::new(MockConnection::new(name)),
            tokio::spawn(std::future::pending::<()>()),
        )
    }

    #[tokio::test]
    async fn resolve_by_connection_name() {
        let registry = SessionRegistry::new();
        registry.insert("abc".into(), live("sess-abc")).await;
        registry.insert("def".into(), live("sess-def")).await;

        let (id, conn) = registry.resolve("sess-def").await.unwrap();
        assert_eq!(id, "def");
        assert_eq!(conn.name(), "sess-def");
        assert!(registry.resolve("sess-zzz").await.is_none());
    }

    #[tokio::test]
    async fn remove_and_ids() {
        let registry = SessionRegistry::new();
        registry.insert("a".into(), live("sess-a")).await;
        registry.insert("b".into(), live("sess-b")).await;
        assert_eq!(registry.len().await, 2);

        let removed = registry.remove("a").await.unwrap();
        assert_eq!(removed.into_connection().name(), "sess-a");
        assert_eq!(
            registry.session_ids().await,
            HashSet::from(["b".to_string()])
        );
        assert!(registry.remove("a").await.is_none());
    }

    #[tokio::test]
    async fn drain_empties_the_table() {
        let registry = SessionRegistry::new();
        registry.insert("a".into(), live("sess-a")).await;
        assert_eq!(registry.drain().await.len(), 1);
        assert!(registry.is_empty().await);
    }
}
