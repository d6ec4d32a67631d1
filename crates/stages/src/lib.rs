// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lta-stages: the pipeline stage actions (`lta-worker`).
//!
//! Every stage is one [`lta_harness::Stage`] implementation plus the
//! collaborators it drives: the File Catalog, the tar archive layer, the
//! checksum helpers, and the tape / GridFTP subprocess adapters.

pub mod archive;
pub mod catalog;
pub mod checksum;
pub mod gridftp;
pub mod hsi;
pub mod subprocess;

#[cfg(test)]
pub(crate) mod test_helpers;

pub mod bundler;
pub mod deleter;
pub mod desy_verifier;
pub mod locator;
pub mod nersc_mover;
pub mod nersc_retriever;
pub mod nersc_verifier;
pub mod picker;
pub mod rate_limiter;
pub mod replicator;
pub mod site_move_verifier;
pub mod transfer_request_finisher;
pub mod unpacker;

use lta_core::{Bundle, TransferRequest};
use lta_harness::{ConfigError, Stage, StageError, Work, WorkerConfig};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unknown stage: {0}")]
    UnknownStage(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Construct a stage by name with its production collaborators.
pub fn build(name: &str, config: &WorkerConfig) -> Result<Arc<dyn Stage>, BuildError> {
    let stage: Arc<dyn Stage> = match name {
        "picker" => Arc::new(picker::Picker::from_config(config)?),
        "locator" => Arc::new(locator::Locator::from_config(config)?),
        "bundler" => Arc::new(bundler::Bundler::from_config(config)?),
        "rate-limiter" => Arc::new(rate_limiter::RateLimiter::from_config(config)?),
        "replicator" => Arc::new(replicator::Replicator::from_config(config)?),
        "site-move-verifier" => {
            Arc::new(site_move_verifier::SiteMoveVerifier::from_config(config)?)
        }
        "nersc-mover" => Arc::new(nersc_mover::NerscMover::from_config(config)?),
        "nersc-retriever" => Arc::new(nersc_retriever::NerscRetriever::from_config(config)?),
        "nersc-verifier" => Arc::new(nersc_verifier::NerscVerifier::from_config(config)?),
        "desy-verifier" => Arc::new(desy_verifier::DesyVerifier::from_config(config)?),
        "deleter" => Arc::new(deleter::Deleter::from_config(config)?),
        "unpacker" => Arc::new(unpacker::Unpacker::from_config(config)?),
        "transfer-request-finisher" => Arc::new(
            transfer_request_finisher::TransferRequestFinisher::from_config(config)?,
        ),
        other => return Err(BuildError::UnknownStage(other.to_string())),
    };
    Ok(stage)
}

/// Names accepted by [`build`], for `--help` output.
pub const STAGE_NAMES: [&str; 13] = [
    "picker",
    "locator",
    "bundler",
    "rate-limiter",
    "replicator",
    "site-move-verifier",
    "nersc-mover",
    "nersc-retriever",
    "nersc-verifier",
    "desy-verifier",
    "deleter",
    "unpacker",
    "transfer-request-finisher",
];

/// Parse the stage's configured `OUTPUT_STATUS` into a bundle status.
pub(crate) fn output_status(
    stage: &'static str,
    ctx: &lta_harness::StageContext,
) -> Result<lta_core::BundleStatus, StageError> {
    ctx.config
        .output_status
        .parse()
        .map_err(|e: lta_core::StatusParseError| {
            StageError::new(stage, format!("bad OUTPUT_STATUS: {e}"))
        })
}

pub(crate) fn expect_bundle(stage: &'static str, work: Work) -> Result<Bundle, StageError> {
    match work {
        Work::Bundle(bundle) => Ok(bundle),
        Work::Request(request) => Err(StageError::new(
            stage,
            format!("claimed a transfer request ({}), expected a bundle", request.uuid),
        )),
    }
}

pub(crate) fn expect_request(
    stage: &'static str,
    work: Work,
) -> Result<TransferRequest, StageError> {
    match work {
        Work::Request(request) => Ok(request),
        Work::Bundle(bundle) => Err(StageError::new(
            stage,
            format!("claimed a bundle ({}), expected a transfer request", bundle.uuid),
        )),
    }
}
