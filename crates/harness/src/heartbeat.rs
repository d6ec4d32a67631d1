// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat loop.
//!
//! Liveness is best-effort: a failed heartbeat is logged and the loop keeps
//! going, because the reaper keys off claim age, not heartbeats. Exhausting
//! the retries therefore never kills the worker.

use crate::client::Coordinator;
use crate::metrics::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct HeartbeatConfig {
    pub component_type: String,
    pub component_name: String,
    pub sleep: Duration,
    pub retries: u32,
    pub timeout: Duration,
}

/// Spawn the heartbeat task. It stops when `shutdown` flips to true.
pub fn spawn(
    coordinator: Arc<dyn Coordinator>,
    config: HeartbeatConfig,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(config.sleep) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("heartbeat stopping");
                        return;
                    }
                }
            }

            let payload = serde_json::json!({
                "claims": metrics.claims.get(),
                "completions": metrics.completions.get(),
                "quarantines": metrics.quarantines.get(),
            });

            let mut delivered = false;
            for attempt in 0..=config.retries {
                match coordinator
                    .record_heartbeat(
                        &config.component_type,
                        &config.component_name,
                        payload.clone(),
                        config.timeout,
                    )
                    .await
                {
                    Ok(()) => {
                        delivered = true;
                        break;
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "heartbeat attempt failed");
                    }
                }
            }
            if !delivered {
                // Keep running; the reaper covers us if we are truly gone.
                warn!(
                    retries = config.retries,
                    "heartbeat exhausted retries, continuing"
                );
            }
        }
    })
}
