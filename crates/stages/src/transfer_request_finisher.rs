// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer-request finisher: close the books on a finished pipeline.
//!
//! Claims bundles in `deleted`, drops their metadata rows, and marks them
//! `finished`. When the claimed bundle is the last of its request still in
//! flight, the request itself is advanced to `finished`.

use async_trait::async_trait;
use lta_core::{BundleStatus, BundleUpdate, RequestStatus, RequestUpdate};
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use tracing::info;

const STAGE: &str = "transfer-request-finisher";

pub struct TransferRequestFinisher;

impl TransferRequestFinisher {
    pub fn from_config(_config: &WorkerConfig) -> Result<Self, ConfigError> {
        Ok(Self)
    }
}

#[async_trait]
impl Stage for TransferRequestFinisher {
    fn name(&self) -> &'static str {
        "transfer-request-finisher"
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let bundle = crate::expect_bundle(STAGE, work)?;

        // The bundle is terminal; its metadata rows are no longer needed.
        let rows = ctx
            .coordinator
            .list_metadata(bundle.uuid.as_str())
            .await
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        if !rows.is_empty() {
            let uuids: Vec<String> = rows.into_iter().map(|m| m.uuid).collect();
            ctx.coordinator
                .bulk_delete_metadata(uuids)
                .await
                .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        }

        // If every sibling is already finished, this claim finishes the
        // whole request.
        let siblings = ctx
            .coordinator
            .list_bundles(Some(bundle.request.as_str()), None)
            .await
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        let all_others_finished = siblings
            .iter()
            .filter(|b| b.uuid != bundle.uuid)
            .all(|b| b.status == BundleStatus::Finished);
        if all_others_finished {
            ctx.coordinator
                .update_request(
                    bundle.request.as_str(),
                    &ctx.config.component_name,
                    RequestUpdate::advance(RequestStatus::Finished),
                )
                .await
                .map_err(|e| StageError::new(STAGE, e.to_string()))?;
            info!(request = %bundle.request, "transfer request finished");
        }

        Ok(Outcome::Advance(Update::Bundle(BundleUpdate::advance(
            crate::output_status(STAGE, ctx)?,
        ))))
    }
}

#[cfg(test)]
#[path = "transfer_request_finisher_tests.rs"]
mod tests;
