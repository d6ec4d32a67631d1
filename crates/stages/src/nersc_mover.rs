// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NERSC mover: write verified artifacts to HPSS tape.
//!
//! Preflights `hpss_avail` before claiming so an HPSS outage idles the
//! worker instead of filling the quarantine.

use crate::hsi::{Hsi, TapeClient};
use crate::subprocess::HSI_TIMEOUT;
use async_trait::async_trait;
use lta_core::BundleUpdate;
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const STAGE: &str = "nersc-mover";

const DEFAULT_HPSS_AVAIL_PATH: &str = "/usr/common/mss/bin/hpss_avail";

pub(crate) fn tape_from_config(config: &WorkerConfig) -> Result<Arc<dyn TapeClient>, ConfigError> {
    let avail_path = config
        .var_opt("HPSS_AVAIL_PATH")
        .unwrap_or(DEFAULT_HPSS_AVAIL_PATH);
    let timeout = Duration::from_secs(config.var_num("HSI_TIMEOUT", HSI_TIMEOUT.as_secs())?);
    Ok(Arc::new(Hsi {
        avail_path: PathBuf::from(avail_path),
        timeout,
    }))
}

pub struct NerscMover {
    tape: Arc<dyn TapeClient>,
    tape_base_path: String,
}

impl NerscMover {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            tape_from_config(config)?,
            config.var("TAPE_BASE_PATH")?.to_string(),
        ))
    }

    pub fn new(tape: Arc<dyn TapeClient>, tape_base_path: String) -> Self {
        Self {
            tape,
            tape_base_path: tape_base_path.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Stage for NerscMover {
    fn name(&self) -> &'static str {
        "nersc-mover"
    }

    async fn preflight(&self, _ctx: &StageContext) -> bool {
        self.tape.available().await
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let bundle = crate::expect_bundle(STAGE, work)?;
        let artifact = bundle
            .bundle_path
            .clone()
            .ok_or_else(|| StageError::new(STAGE, "bundle has no artifact to write to tape"))?;
        let file_name = artifact
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StageError::new(STAGE, "artifact path has no file name"))?;
        let tape_path = format!("{}/{}", self.tape_base_path, file_name);

        self.tape
            .put(&artifact, &tape_path)
            .await
            .map_err(|reason| StageError::new(STAGE, reason))?;

        info!(bundle = %bundle.uuid, tape_path, "bundle written to tape");

        let mut update = BundleUpdate::advance(crate::output_status(STAGE, ctx)?);
        // From here on the tape copy is the artifact of record.
        update.bundle_path = Some(PathBuf::from(tape_path));
        Ok(Outcome::Advance(Update::Bundle(update)))
    }
}
