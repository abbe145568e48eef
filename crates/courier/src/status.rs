// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier status` command implementation.
//!
//! Reads the session log and ledger size straight from the database, so it
//! works whether or not a worker is running.

use chrono::{DateTime, Utc};
use courier_config::CourierConfig;
use courier_core::{CourierError, SessionLogEntry};
use courier_storage::SqliteStore;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub database_path: String,
    pub forwarded_total: u64,
    pub sessions: Vec<SessionLogEntry>,
}

/// Run the `courier status` command.
pub async fn run_status(config: &CourierConfig, json: bool) -> Result<(), CourierError> {
    let store = SqliteStore::open(&config.storage).await?;
    let report = StatusReport {
        database_path: config.storage.database_path.clone(),
        forwarded_total: store.forwarded_count().await?,
        sessions: store.list_session_logs().await?,
    };

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| CourierError::Internal(format!("failed to encode status: {e}")))?;
        println!("{out}");
    } else {
        print!("{}", render_report(&report, Utc::now()));
    }
    Ok(())
}

/// Format an elapsed number of seconds as a short human-readable age.
fn format_age(secs: i64) -> String {
    let secs = secs.max(0);
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h ago")
    } else if hours > 0 {
        format!("{hours}h {minutes}m ago")
    } else if minutes > 0 {
        format!("{minutes}m ago")
    } else {
        "just now".to_string()
    }
}

fn age(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    at.map(|t| format_age((now - t).num_seconds()))
        .unwrap_or_else(|| "never".to_string())
}

fn render_report(report: &StatusReport, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str("  courier status\n");
    out.push_str(&format!("  {}\n", "-".repeat(35)));
    out.push_str(&format!("    Database:  {}\n", report.database_path));
    out.push_str(&format!("    Forwarded: {}\n", report.forwarded_total));
    out.push('\n');

    if report.sessions.is_empty() {
        out.push_str("    No sessions have been started yet.\n\n");
        return out;
    }

    for entry in &report.sessions {
        out.push_str(&format!("  session {}\n", entry.session_id));
        out.push_str(&format!("    started:        {}\n", age(entry.started_at, now)));
        out.push_str(&format!(
            "    forwards:       {} ok, {} failed\n",
            entry.success_count, entry.error_count
        ));
        out.push_str(&format!(
            "    last forwarded: {}\n",
            age(entry.last_forwarded_at, now)
        ));
        if let Some(error) = &entry.last_error {
            out.push_str(&format!(
                "    last error:     {error} ({})\n",
                age(entry.last_error_at, now)
            ));
        }
        out.push('\n');
    }
    out
}
