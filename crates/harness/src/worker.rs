// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The work loop.
//!
//! The worker is the error boundary: per-document failures quarantine the
//! document and the loop keeps going. Only configuration and authentication
//! problems are fatal, because no amount of looping fixes credentials.

use crate::client::{ClientError, Coordinator};
use crate::config::{ConfigError, Termination, WorkerConfig};
use crate::heartbeat::{self, HeartbeatConfig};
use crate::metrics::{self, Metrics};
use crate::stage::{Outcome, Stage, StageContext, Update, Work, WorkSource};
use lta_core::{BundleUpdate, RequestUpdate};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// One long-running worker process: a stage plus the uniform loop.
pub struct Worker {
    config: WorkerConfig,
    stage: Arc<dyn Stage>,
    coordinator: Arc<dyn Coordinator>,
}

impl Worker {
    pub fn new(
        config: WorkerConfig,
        stage: Arc<dyn Stage>,
        coordinator: Arc<dyn Coordinator>,
    ) -> Self {
        Self {
            config,
            stage,
            coordinator,
        }
    }

    /// Run until the termination mode says stop or `shutdown` flips true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), WorkerError> {
        let metrics = Arc::new(Metrics::new()?);
        if let Some(port) = self.config.prometheus_metrics_port {
            metrics::spawn_exporter(Arc::clone(&metrics), port);
        }

        // The heartbeat lives exactly as long as the work loop.
        let (heartbeat_stop, heartbeat_rx) = watch::channel(false);
        let heartbeat_handle = heartbeat::spawn(
            Arc::clone(&self.coordinator),
            HeartbeatConfig {
                component_type: self.stage.name().to_string(),
                component_name: self.config.component_name.clone(),
                sleep: self.config.heartbeat_sleep,
                retries: self.config.heartbeat_patch_retries,
                timeout: self.config.heartbeat_patch_timeout,
            },
            Arc::clone(&metrics),
            heartbeat_rx,
        );

        let ctx = StageContext {
            coordinator: Arc::clone(&self.coordinator),
            config: self.config.clone(),
        };

        info!(
            stage = self.stage.name(),
            component = %self.config.component_name,
            "worker starting"
        );

        let result = self.work_loop(&ctx, &metrics, &mut shutdown).await;

        let _ = heartbeat_stop.send(true);
        let _ = heartbeat_handle.await;

        match &result {
            Ok(()) => info!(stage = self.stage.name(), "worker stopped"),
            Err(e) => error!(stage = self.stage.name(), error = %e, "worker failed"),
        }
        result
    }

    async fn work_loop(
        &self,
        ctx: &StageContext,
        metrics: &Metrics,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), WorkerError> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let claimed = self.cycle(ctx, metrics).await?;

            match self.config.termination {
                Termination::OnceAndDie => return Ok(()),
                Termination::UntilNoWork if !claimed => {
                    debug!("no work remaining, exiting");
                    return Ok(());
                }
                _ => {}
            }

            // Loop straight back around while work is flowing; sleep only
            // on an empty POP.
            if !claimed {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.work_sleep) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }

    /// One claim-act-report cycle. Returns whether work was claimed.
    async fn cycle(&self, ctx: &StageContext, metrics: &Metrics) -> Result<bool, WorkerError> {
        if !self.stage.preflight(ctx).await {
            debug!(stage = self.stage.name(), "preflight not ready, skipping cycle");
            return Ok(false);
        }

        let popped = match self.stage.source() {
            WorkSource::TransferRequests => self
                .coordinator
                .pop_request(
                    &self.config.source_site,
                    &self.config.dest_site,
                    &self.config.component_name,
                )
                .await
                .map(|opt| opt.map(Work::Request)),
            WorkSource::Bundles => self
                .coordinator
                .pop_bundle(
                    &self.config.input_status,
                    &self.config.source_site,
                    &self.config.dest_site,
                    &self.config.component_name,
                )
                .await
                .map(|opt| opt.map(Work::Bundle)),
        };

        let work = match popped {
            Ok(Some(work)) => work,
            Ok(None) => return Ok(false),
            Err(ClientError::Auth(e)) => return Err(WorkerError::Auth(e)),
            Err(e) => {
                // Coordinator unavailability is transient; the next cycle
                // (after the sleep) tries again.
                error!(error = %e, "pop failed");
                return Ok(false);
            }
        };

        metrics.claims.inc();
        let uuid = work.uuid().to_string();
        info!(stage = self.stage.name(), %uuid, "claimed work");

        match self.stage.run(work.clone(), ctx).await {
            Ok(Outcome::Advance(update)) => {
                self.report(&uuid, update, metrics, "advance").await?;
                metrics.completions.inc();
            }
            Ok(Outcome::Defer) => {
                let release = match work {
                    Work::Request(_) => Update::Request(RequestUpdate::release()),
                    Work::Bundle(_) => Update::Bundle(BundleUpdate::release()),
                };
                self.report(&uuid, release, metrics, "defer").await?;
                metrics.defers.inc();
            }
            Err(stage_error) => {
                warn!(%uuid, reason = %stage_error, "action failed, quarantining");
                let quarantine = match work {
                    Work::Request(_) => {
                        Update::Request(RequestUpdate::quarantine(stage_error.to_string()))
                    }
                    Work::Bundle(_) => {
                        Update::Bundle(BundleUpdate::quarantine(stage_error.to_string()))
                    }
                };
                self.report(&uuid, quarantine, metrics, "quarantine").await?;
                metrics.quarantines.inc();
            }
        }

        Ok(true)
    }

    /// PATCH the outcome back, always releasing the claim. A lost claim is
    /// an expected race: log it and move on.
    async fn report(
        &self,
        uuid: &str,
        update: Update,
        metrics: &Metrics,
        what: &'static str,
    ) -> Result<(), WorkerError> {
        let claimant = &self.config.component_name;
        let result = match update {
            Update::Request(mut update) => {
                update.claimed.get_or_insert(false);
                self.coordinator
                    .update_request(uuid, claimant, update)
                    .await
                    .map(|_| ())
            }
            Update::Bundle(mut update) => {
                update.claimed.get_or_insert(false);
                self.coordinator
                    .update_bundle(uuid, claimant, update)
                    .await
                    .map(|_| ())
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(ClientError::ClaimLost(detail)) => {
                metrics.conflicts.inc();
                warn!(%uuid, what, detail, "claim was reassigned, dropping work");
                Ok(())
            }
            Err(ClientError::Auth(e)) => Err(WorkerError::Auth(e)),
            Err(e) => {
                // The claim stays ours until the reaper frees it; nothing
                // else to do this cycle.
                error!(%uuid, what, error = %e, "failed to report outcome");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
