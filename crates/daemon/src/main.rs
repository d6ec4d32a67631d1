// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-Term Archive coordinator daemon (ltad)
//!
//! Owns all pipeline state and serves the claim/patch/heartbeat REST API.
//!
//! Architecture:
//! - Axum listener serving the routes
//! - Reaper task releasing stale claims
//! - Checkpoint task writing zstd snapshots

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;
use std::time::Duration;

use lta_core::{RandomIds, SystemClock};
use lta_daemon::{auth::AuthConfig, reaper, AppState, Config};
use lta_storage::{Snapshot, Store};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ltad {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ltad {}", env!("CARGO_PKG_VERSION"));
                println!("Long-Term Archive coordinator daemon");
                println!();
                println!("USAGE:");
                println!("    ltad");
                println!();
                println!("All configuration comes from the environment; see");
                println!("LTA_BIND_ADDR, LTA_AUTH_SECRET, LTA_STATE_DIR,");
                println!("MAX_CLAIM_AGE_HOURS, REAPER_SLEEP_DURATION_SECONDS.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ltad [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    setup_logging(&config.log_level);
    info!("Starting coordinator");

    // Recover state from the latest snapshot, if any.
    let snapshot_path = config.snapshot_path();
    let store = match Snapshot::load(&snapshot_path)? {
        Some(snapshot) => {
            info!(
                revision = snapshot.revision,
                requests = snapshot.collections.requests.len(),
                bundles = snapshot.collections.bundles.len(),
                "loaded snapshot"
            );
            Store::from_collections(
                snapshot.collections,
                Arc::new(SystemClock),
                Arc::new(RandomIds),
            )
        }
        None => {
            info!("no snapshot found, starting with empty collections");
            Store::new()
        }
    };

    // Background tasks
    reaper::spawn(store.clone(), config.max_claim_age, config.reaper_interval);
    spawn_checkpoint(
        store.clone(),
        snapshot_path.clone(),
        config.checkpoint_interval,
    );

    let state = AppState::new(
        store.clone(),
        AuthConfig {
            secret: config.auth_secret.clone(),
            audience: config.auth_audience.clone(),
        },
    );
    let app = lta_daemon::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Coordinator ready, listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Final synchronous checkpoint so restarts pick up the latest state.
    match store.checkpoint(&snapshot_path) {
        Ok((revision, size_bytes)) => {
            info!(revision, size_bytes, "final checkpoint complete")
        }
        Err(e) => error!("final checkpoint failed: {}", e),
    }

    info!("Coordinator stopped");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGTERM handler: {}", e);
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGINT handler: {}", e);
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }
}

/// Spawn a task that periodically snapshots the collections.
///
/// Skips the write when the store revision has not moved since the last
/// checkpoint. `Store::checkpoint` only holds the lock for the clone, and
/// the serialize/compress/fsync work runs on the blocking pool.
fn spawn_checkpoint(store: Store, snapshot_path: std::path::PathBuf, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut last_revision = store.revision();

        loop {
            ticker.tick().await;

            if store.revision() == last_revision {
                continue;
            }

            let store = store.clone();
            let path = snapshot_path.clone();
            let result =
                tokio::task::spawn_blocking(move || store.checkpoint(&path)).await;

            match result {
                Ok(Ok((revision, size_bytes))) => {
                    last_revision = revision;
                    tracing::debug!(revision, size_bytes, "checkpoint complete");
                }
                Ok(Err(e)) => warn!(error = %e, "checkpoint failed"),
                Err(e) => warn!(error = %e, "checkpoint task panicked"),
            }
        }
    });
}

fn setup_logging(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
