// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The stage action interface.
//!
//! A stage owns exactly one thing: what to do with a claimed document. The
//! harness owns the loop, the heartbeat, the auth, and the quarantine.

use crate::client::Coordinator;
use crate::config::WorkerConfig;
use async_trait::async_trait;
use lta_core::{Bundle, BundleUpdate, RequestUpdate, TransferRequest};
use std::sync::Arc;
use thiserror::Error;

/// Which collection a stage claims from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkSource {
    /// Picker and locator expand requests into bundles.
    TransferRequests,
    /// Every other stage walks bundles through the pipeline.
    Bundles,
}

/// A claimed document, as returned by POP.
#[derive(Debug, Clone)]
pub enum Work {
    Request(TransferRequest),
    Bundle(Bundle),
}

impl Work {
    pub fn uuid(&self) -> &str {
        match self {
            Work::Request(request) => request.uuid.as_str(),
            Work::Bundle(bundle) => bundle.uuid.as_str(),
        }
    }
}

/// Field updates a successful action wants patched into its document.
#[derive(Debug, Clone)]
pub enum Update {
    Request(RequestUpdate),
    Bundle(BundleUpdate),
}

/// What the action decided.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// PATCH these updates (the harness also releases the claim).
    Advance(Update),
    /// Release the claim without advancing: quota full, artifact not yet
    /// present, or otherwise not this worker's turn.
    Defer,
}

/// A failed action; the harness quarantines the document with this reason.
#[derive(Debug, Error)]
#[error("{stage}: {message}")]
pub struct StageError {
    pub stage: &'static str,
    pub message: String,
}

impl StageError {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Everything an action may touch besides its own collaborators.
pub struct StageContext {
    pub coordinator: Arc<dyn Coordinator>,
    pub config: WorkerConfig,
}

/// One pipeline stage.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name; used as heartbeat component type and quarantine prefix.
    fn name(&self) -> &'static str;

    fn source(&self) -> WorkSource {
        WorkSource::Bundles
    }

    /// Cheap readiness probe run before claiming. Returning false skips the
    /// cycle entirely (tape down, quota exhausted) so no bundle is claimed
    /// and then quarantined for an environmental problem.
    async fn preflight(&self, _ctx: &StageContext) -> bool {
        true
    }

    /// The action: consume one claimed document, produce an outcome.
    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError>;
}
