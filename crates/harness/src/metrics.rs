// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prometheus metrics for one worker process.

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;

/// Counters every worker maintains regardless of stage.
pub struct Metrics {
    registry: Registry,
    pub claims: IntCounter,
    pub completions: IntCounter,
    pub quarantines: IntCounter,
    pub conflicts: IntCounter,
    pub defers: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let claims = IntCounter::new("lta_work_claimed_total", "Documents claimed via POP")?;
        let completions = IntCounter::new(
            "lta_work_completed_total",
            "Actions completed and patched forward",
        )?;
        let quarantines = IntCounter::new(
            "lta_work_quarantined_total",
            "Documents quarantined after action failure",
        )?;
        let conflicts = IntCounter::new(
            "lta_claim_conflicts_total",
            "PATCHes rejected because the claim was reassigned",
        )?;
        let defers = IntCounter::new(
            "lta_work_deferred_total",
            "Claims released without advancing",
        )?;

        for counter in [&claims, &completions, &quarantines, &conflicts, &defers] {
            registry.register(Box::new(counter.clone()))?;
        }

        Ok(Self {
            registry,
            claims,
            completions,
            quarantines,
            conflicts,
            defers,
        })
    }

    /// Render the registry in Prometheus text format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Serve `GET /metrics` on the configured port.
pub fn spawn_exporter(metrics: Arc<Metrics>, port: u16) -> JoinHandle<()> {
    tokio::spawn(async move {
        let app = axum::Router::new().route(
            "/metrics",
            axum::routing::get(move || {
                let metrics = Arc::clone(&metrics);
                async move { metrics.render() }
            }),
        );
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app).await {
                    error!(error = %e, "metrics exporter stopped");
                }
            }
            Err(e) => error!(error = %e, port, "failed to bind metrics exporter"),
        }
    })
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
