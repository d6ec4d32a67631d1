// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-Term Archive worker (lta-worker)
//!
//! Runs one pipeline stage under the uniform harness. The stage is chosen
//! by the single positional argument; everything else comes from the
//! environment (see `WorkerConfig`).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use lta_harness::{HttpCoordinator, TokenSource, Worker, WorkerConfig, WorkerError};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let stage_name = match std::env::args().nth(1).as_deref() {
        Some("--version") | Some("-V") | Some("-v") => {
            println!("lta-worker {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Some("--help") | Some("-h") | Some("help") | None => {
            println!("lta-worker {}", env!("CARGO_PKG_VERSION"));
            println!("Long-Term Archive pipeline worker");
            println!();
            println!("USAGE:");
            println!("    lta-worker <stage>");
            println!();
            println!("STAGES:");
            for name in lta_stages::STAGE_NAMES {
                println!("    {name}");
            }
            println!();
            println!("Configuration comes from the environment; see the");
            println!("COMPONENT_NAME / INPUT_STATUS / OUTPUT_STATUS family.");
            if std::env::args().nth(1).is_none() {
                std::process::exit(1);
            }
            return;
        }
        Some(name) => name.to_string(),
    };

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    setup_logging(&config.log_level);

    let stage = match lta_stages::build(&stage_name, &config) {
        Ok(stage) => stage,
        Err(e) => {
            error!("failed to build stage: {e}");
            std::process::exit(1);
        }
    };

    let tokens = TokenSource::new(
        reqwest::Client::new(),
        &config.lta_auth_openid_url,
        &config.client_id,
        &config.client_secret,
    );
    let coordinator = match HttpCoordinator::new(
        &config.lta_rest_url,
        tokens,
        config.work_retries,
        config.work_timeout,
    ) {
        Ok(coordinator) => Arc::new(coordinator),
        Err(e) => {
            error!("failed to build coordinator client: {e}");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                error!("failed to install SIGINT handler: {e}");
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
        let _ = shutdown_tx.send(true);
    });

    match Worker::new(config, stage, coordinator).run(shutdown_rx).await {
        Ok(()) => {}
        Err(WorkerError::Auth(e)) => {
            error!("authentication failure: {e}");
            std::process::exit(2);
        }
        Err(e) => {
            error!("worker failed: {e}");
            std::process::exit(1);
        }
    }
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
