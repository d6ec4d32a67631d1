// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deleter: remove a site's staging copy of a completed bundle.
//!
//! Deployed twice per pipeline with different `INPUT_STATUS`/`OUTPUT_STATUS`
//! (completed → source-deleted at the source, source-deleted → deleted at
//! the destination); the code is identical, only `DELETER_BASE_PATH` and
//! the status wiring differ. Deleting an already-absent file advances the
//! bundle anyway, so a crashed attempt retries cleanly.

use crate::archive;
use async_trait::async_trait;
use lta_core::BundleUpdate;
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use std::path::PathBuf;
use tracing::{debug, info};

const STAGE: &str = "deleter";

pub struct Deleter {
    base_dir: PathBuf,
}

impl Deleter {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(PathBuf::from(config.var("DELETER_BASE_PATH")?)))
    }

    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }
}

#[async_trait]
impl Stage for Deleter {
    fn name(&self) -> &'static str {
        "deleter"
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let bundle = crate::expect_bundle(STAGE, work)?;
        let file_name = bundle
            .bundle_path
            .as_deref()
            .and_then(|p| p.file_name())
            .ok_or_else(|| StageError::new(STAGE, "bundle has no artifact path"))?;
        let artifact = self.base_dir.join(file_name);

        for path in [artifact.clone(), archive::manifest_path_for(&artifact)] {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "already absent");
                }
                Err(e) => {
                    return Err(StageError::new(
                        STAGE,
                        format!("failed to remove {}: {e}", path.display()),
                    ));
                }
            }
        }

        info!(bundle = %bundle.uuid, path = %artifact.display(), "staging copy deleted");

        Ok(Outcome::Advance(Update::Bundle(BundleUpdate::advance(
            crate::output_status(STAGE, ctx)?,
        ))))
    }
}

#[cfg(test)]
#[path = "deleter_tests.rs"]
mod tests;
