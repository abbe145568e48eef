// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric names and recording helpers.
//!
//! Recording goes through the `metrics` facade and is a no-op until the
//! binary installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, gauge};

pub const FORWARDS_TOTAL: &str = "courier_forwards_total";
pub const RETRY_JOBS_TOTAL: &str = "courier_retry_jobs_total";
pub const LIVE_SESSIONS: &str = "courier_live_sessions";
pub const RECONCILE_TOTAL: &str = "courier_reconcile_total";

/// Register metric descriptions. Call once at startup.
pub fn register_metrics() {
    describe_counter!(FORWARDS_TOTAL, "Inbound messages by delivery outcome");
    describe_counter!(RETRY_JOBS_TOTAL, "Retry queue jobs by processing outcome");
    describe_gauge!(LIVE_SESSIONS, "Currently live relay connections");
    describe_counter!(RECONCILE_TOTAL, "Reconciliation cycles by outcome");
}

pub fn record_forward(outcome: &'static str) {
    counter!(FORWARDS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_retry_job(outcome: &'static str) {
    counter!(RETRY_JOBS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn set_live_sessions(count: usize) {
    gauge!(LIVE_SESSIONS).set(count as f64);
}

pub fn record_reconcile(outcome: &'static str) {
    counter!(RECONCILE_TOTAL, "outcome" => outcome).increment(1);
}
