// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve` command implementation.
//!
//! Opens SQLite storage, resolves the credential key, builds the Telegram
//! connector and runs the forwarding worker until a shutdown signal arrives.

use std::sync::Arc;

use courier_config::CourierConfig;
use courier_core::{CourierError, HealthStatus, RelayStore};
use courier_storage::SqliteStore;
use courier_telegram::TelegramConnector;
use courier_vault::CredentialVault;
use courier_worker::{ForwardWorker, shutdown};
use tracing::{error, info, warn};

/// Runs the `courier serve` command.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.log.level);

    info!(version = env!("CARGO_PKG_VERSION"), "starting courier serve");
    courier_worker::metrics::register_metrics();

    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    match store.health_check().await? {
        HealthStatus::Healthy => {}
        HealthStatus::Degraded(reason) => warn!(reason = %reason, "storage degraded"),
        HealthStatus::Unhealthy(reason) => {
            return Err(CourierError::Internal(format!("storage unhealthy: {reason}")));
        }
    }

    let vault = CredentialVault::from_config(&config.vault).map_err(|e| {
        error!(error = %e, "credential key unavailable");
        eprintln!(
            "error: set vault.credential_key or the ${} environment variable",
            config.vault.credential_key_env
        );
        e
    })?;

    let connector = TelegramConnector::new(config.telegram.clone(), config.worker.inbound_buffer);
    let worker = ForwardWorker::new(
        &config.worker,
        store.clone(),
        Arc::new(connector),
        Arc::new(vault),
    );

    let cancel = shutdown::install_signal_handler();
    worker.start().await?;
    info!(
        database = %config.storage.database_path,
        "courier running, press Ctrl+C to stop"
    );

    cancel.cancelled().await;
    info!("shutdown requested, stopping worker");
    worker.stop().await;

    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to checkpoint database on shutdown");
    }
    info!("courier stopped");
    Ok(())
}

/// Installs the global tracing subscriber. `RUST_LOG` overrides `log.level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
