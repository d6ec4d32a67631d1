// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NERSC retriever: recall located bundles from HPSS tape into staging.

use crate::hsi::TapeClient;
use async_trait::async_trait;
use lta_core::BundleUpdate;
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const STAGE: &str = "nersc-retriever";

pub struct NerscRetriever {
    tape: Arc<dyn TapeClient>,
    staging_dir: PathBuf,
}

impl NerscRetriever {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            crate::nersc_mover::tape_from_config(config)?,
            PathBuf::from(config.var("RSE_BASE_PATH")?),
        ))
    }

    pub fn new(tape: Arc<dyn TapeClient>, staging_dir: PathBuf) -> Self {
        Self { tape, staging_dir }
    }
}

#[async_trait]
impl Stage for NerscRetriever {
    fn name(&self) -> &'static str {
        "nersc-retriever"
    }

    async fn preflight(&self, _ctx: &StageContext) -> bool {
        self.tape.available().await
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let bundle = crate::expect_bundle(STAGE, work)?;
        let tape_path = bundle
            .bundle_path
            .as_deref()
            .and_then(|p| p.to_str())
            .ok_or_else(|| StageError::new(STAGE, "located bundle has no tape path"))?;
        let file_name = std::path::Path::new(tape_path)
            .file_name()
            .ok_or_else(|| StageError::new(STAGE, "tape path has no file name"))?;
        let staged_path = self.staging_dir.join(file_name);

        self.tape
            .get(tape_path, &staged_path)
            .await
            .map_err(|reason| StageError::new(STAGE, reason))?;

        info!(bundle = %bundle.uuid, path = %staged_path.display(), "bundle recalled from tape");

        let mut update = BundleUpdate::advance(crate::output_status(STAGE, ctx)?);
        update.bundle_path = Some(staged_path);
        Ok(Outcome::Advance(Update::Bundle(update)))
    }
}
