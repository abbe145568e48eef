// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end worker scenarios over the in-memory store and mock transport.

use std::sync::Arc;
use std::time::Duration;

use courier_config::model::WorkerConfig;
use courier_core::{DedupKey, ForwardError, RetryJob};
use courier_test_utils::{
    MemoryStore, MockConnection, MockConnector, PlaintextDecryptor, bot_session, relay_config,
    user_session,
};
use courier_worker::ForwardWorker;
use tokio::time::Instant;

const SOURCE: i64 = -100111;
const TARGET: i64 = -100222;

struct Harness {
    worker: ForwardWorker,
    store: Arc<MemoryStore>,
    connector: Arc<MockConnector>,
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    store.set_config(relay_config(&[SOURCE], Some(TARGET))).await;
    let connector = Arc::new(MockConnector::new());
    let worker = ForwardWorker::new(
        &WorkerConfig::default(),
        store.clone(),
        connector.clone(),
        Arc::new(PlaintextDecryptor::new()),
    );
    Harness {
        worker,
        store,
        connector,
    }
}

/// Poll `check` on the (possibly paused) clock until it holds.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..10_000 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

async fn live(h: &Harness, id: &str) -> Arc<MockConnection> {
    eventually(move || h.worker.registry().contains(id)).await;
    h.connector.connection(id).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn forwards_source_message_once() {
    let h = &harness().await;
    h.store.add_session(bot_session("a")).await;
    h.worker.start().await.unwrap();
    let conn = live(h, "a").await;

    assert!(conn.inject(SOURCE, 42).await);
    eventually(move || async move { h.store.forwarded_records().await.len() == 1 }).await;

    let records = h.store.forwarded_records().await;
    assert_eq!(records[0].key, "-100111:42");
    assert_eq!(records[0].source_chat, SOURCE);
    assert_eq!(records[0].source_message, 42);
    let calls = conn.forward_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].target, TARGET);
    eventually(move || async move {
        h.store
            .session_log("a")
            .await
            .is_some_and(|e| e.success_count == 1)
    })
    .await;

    // Redelivery of the same message is deduplicated.
    assert!(conn.inject(SOURCE, 42).await);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(conn.forward_count().await, 1);

    h.worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn non_source_messages_are_ignored() {
    let h = &harness().await;
    h.store.add_session(bot_session("a")).await;
    h.worker.start().await.unwrap();
    let conn = live(h, "a").await;

    assert!(conn.inject(-100999, 1).await);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(conn.forward_count().await, 0);
    assert!(h.store.forwarded_records().await.is_empty());
    h.worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn rate_limits_do_not_consume_retries() {
    let h = &harness().await;
    let conn = Arc::new(MockConnection::new("sess-a"));
    let rate_limited = || {
        Err(ForwardError::RateLimited {
            wait: Some(Duration::from_secs(10)),
            message: "flood wait".into(),
        })
    };
    conn.push_outcomes([rate_limited(), rate_limited()]).await;
    h.connector.prepare("a", conn.clone()).await;
    h.store.add_session(bot_session("a")).await;
    h.worker.start().await.unwrap();
    live(h, "a").await;

    let begin = Instant::now();
    assert!(conn.inject(SOURCE, 42).await);
    eventually(move || async move { h.store.forwarded_records().await.len() == 1 }).await;

    assert!(begin.elapsed() >= Duration::from_secs(20));
    assert_eq!(conn.forward_count().await, 3);
    h.worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn exhausted_inline_retries_are_dropped_by_processor() {
    let h = &harness().await;
    let conn = Arc::new(MockConnection::new("sess-a"));
    conn.push_outcomes((0..5).map(|_| {
        Err(ForwardError::Retryable {
            message: "try again".into(),
        })
    }))
    .await;
    h.connector.prepare("a", conn.clone()).await;
    h.store.add_session(bot_session("a")).await;
    h.worker.start().await.unwrap();
    live(h, "a").await;

    assert!(conn.inject(SOURCE, 42).await);
    conn.wait_for_forwards(5).await;
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(conn.forward_count().await, 5, "job at the ceiling is never retried");
    assert!(h.store.forwarded_records().await.is_empty());
    let entry = h.store.session_log("a").await.unwrap();
    assert_eq!(entry.error_count, 5);
    h.worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn protocol_error_is_recovered_by_queue() {
    let h = &harness().await;
    let conn = Arc::new(MockConnection::new("sess-a"));
    conn.push_outcomes([Err(ForwardError::Protocol {
        code: "ChatNotFound".into(),
        message: "chat not found".into(),
    })])
    .await;
    h.connector.prepare("a", conn.clone()).await;
    h.store.add_session(bot_session("a")).await;
    h.worker.start().await.unwrap();
    live(h, "a").await;

    assert!(conn.inject(SOURCE, 42).await);
    eventually(move || async move { h.store.forwarded_records().await.len() == 1 }).await;

    assert_eq!(conn.forward_count().await, 2);
    h.worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn removed_session_is_stopped_and_its_job_parked() {
    let h = &harness().await;
    h.store.add_session(bot_session("a")).await;
    h.worker.start().await.unwrap();
    let first = live(h, "a").await;

    h.store.remove_session("a").await;
    eventually(move || async move { !h.worker.registry().contains("a").await }).await;
    assert!(first.is_stopped());

    assert!(h.worker.queue().enqueue(RetryJob {
        session_name: "sess-a".into(),
        source_chat_id: SOURCE,
        source_message_id: 7,
        target_chat_id: TARGET,
        dedup_key: DedupKey::new(SOURCE, 7),
        attempts: 1,
    }));
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(h.store.forwarded_records().await.is_empty());

    h.store.add_session(bot_session("a")).await;
    let second = live(h, "a").await;
    eventually(move || async move { h.store.forwarded_records().await.len() == 1 }).await;

    assert_eq!(second.forward_count().await, 1);
    assert_eq!(first.forward_count().await, 0);
    h.worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_sessions_may_both_forward() {
    let h = &harness().await;
    let a = Arc::new(MockConnection::new("sess-a"));
    let b = Arc::new(MockConnection::new("sess-b"));
    a.set_forward_delay(Duration::from_millis(100));
    b.set_forward_delay(Duration::from_millis(100));
    h.connector.prepare("a", a.clone()).await;
    h.connector.prepare("b", b.clone()).await;
    h.store.add_session(bot_session("a")).await;
    h.store.add_session(bot_session("b")).await;
    h.worker.start().await.unwrap();
    live(h, "a").await;
    live(h, "b").await;

    assert!(a.inject(SOURCE, 42).await);
    assert!(b.inject(SOURCE, 42).await);
    a.wait_for_forwards(1).await;
    b.wait_for_forwards(1).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(a.forward_count().await + b.forward_count().await, 2);
    assert_eq!(h.store.forwarded_records().await.len(), 1);
    h.worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_start_is_isolated_and_retried() {
    let h = &harness().await;
    h.store.add_session(user_session("u")).await;
    h.store.add_session(bot_session("a")).await;
    h.connector.set_fail_connect("u", true).await;
    h.worker.start().await.unwrap();
    live(h, "a").await;
    assert!(!h.worker.registry().contains("u").await);

    h.connector.set_fail_connect("u", false).await;
    tokio::time::sleep(Duration::from_secs(21)).await;
    assert!(h.worker.registry().contains("u").await);
    h.worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_tears_down_every_connection() {
    let h = &harness().await;
    let failing = Arc::new(MockConnection::new("sess-b"));
    failing.set_fail_stop(true);
    h.connector.prepare("b", failing.clone()).await;
    h.store.add_session(bot_session("a")).await;
    h.store.add_session(bot_session("b")).await;
    h.worker.start().await.unwrap();
    let a = live(h, "a").await;
    live(h, "b").await;

    h.worker.stop().await;

    assert!(a.is_stopped());
    assert!(failing.is_stopped());
    assert!(h.worker.registry().is_empty().await);
}
