// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replicator: push staged bundles to the remote site over GridFTP.
//!
//! The mover's exit code is not trusted on its own: a non-zero return is
//! checked against actual completion before the bundle is quarantined,
//! because `globus-url-copy` is known to fail spuriously after the bytes
//! have landed.

use crate::archive;
use crate::gridftp::{ByteMover, GridFtp};
use async_trait::async_trait;
use lta_core::BundleUpdate;
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const STAGE: &str = "replicator";

pub struct Replicator {
    mover: Arc<dyn ByteMover>,
    dest_url: String,
}

impl Replicator {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        let timeout = Duration::from_secs(config.var_num(
            "GRIDFTP_TIMEOUT",
            crate::subprocess::GRIDFTP_TIMEOUT.as_secs(),
        )?);
        Ok(Self::new(
            Arc::new(GridFtp { timeout }),
            config.var("GRIDFTP_DEST_URL")?.to_string(),
        ))
    }

    pub fn new(mover: Arc<dyn ByteMover>, dest_url: String) -> Self {
        Self {
            mover,
            dest_url: dest_url.trim_end_matches('/').to_string(),
        }
    }

    fn remote_url_for(&self, local: &Path) -> Result<String, StageError> {
        let name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StageError::new(STAGE, "artifact path has no file name"))?;
        Ok(format!("{}/{}", self.dest_url, name))
    }

    /// Copy one file, falling back to the completion probe on failure.
    async fn transfer(&self, local: &Path) -> Result<(), StageError> {
        let remote = self.remote_url_for(local)?;
        match self.mover.copy(local, &remote).await {
            Ok(()) => Ok(()),
            Err(reason) => {
                if self.mover.completed(local, &remote).await {
                    warn!(
                        local = %local.display(),
                        reason,
                        "mover reported failure but transfer is complete"
                    );
                    Ok(())
                } else {
                    Err(StageError::new(STAGE, reason))
                }
            }
        }
    }
}

#[async_trait]
impl Stage for Replicator {
    fn name(&self) -> &'static str {
        "replicator"
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let bundle = crate::expect_bundle(STAGE, work)?;
        let artifact = bundle
            .bundle_path
            .clone()
            .ok_or_else(|| StageError::new(STAGE, "bundle has no artifact to replicate"))?;

        self.transfer(&artifact).await?;

        // The manifest side-car follows the archive to the destination.
        let manifest = archive::manifest_path_for(&artifact);
        if manifest.exists() {
            self.transfer(&manifest).await?;
        }

        info!(bundle = %bundle.uuid, dest = %self.dest_url, "bundle replicated");

        Ok(Outcome::Advance(Update::Bundle(BundleUpdate::advance(
            crate::output_status(STAGE, ctx)?,
        ))))
    }
}

#[cfg(test)]
#[path = "replicator_tests.rs"]
mod tests;
