// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable in-memory [`Coordinator`] for tests in this crate and in the
//! stage crate (via the `test-support` feature).

#![allow(clippy::unwrap_used)]

use crate::client::{ClientError, Coordinator};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use lta_core::{
    Bundle, BundleId, BundleStatus, BundleUpdate, MetadataRecord, NewBundle, NewMetadataRecord,
    RequestId, RequestStatus, RequestUpdate, TransferRequest,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Recorded `update_bundle` call.
#[derive(Debug, Clone)]
pub struct RecordedBundlePatch {
    pub uuid: String,
    pub claimant: String,
    pub update: BundleUpdate,
}

/// Recorded `update_request` call.
#[derive(Debug, Clone)]
pub struct RecordedRequestPatch {
    pub uuid: String,
    pub claimant: String,
    pub update: RequestUpdate,
}

/// In-memory coordinator double.
///
/// Queues feed POP; every mutation is recorded for assertions. Errors can
/// be scripted per call with `pop_errors` / `patch_errors`.
#[derive(Default)]
pub struct FakeCoordinator {
    pub poppable_bundles: Mutex<VecDeque<Bundle>>,
    pub poppable_requests: Mutex<VecDeque<TransferRequest>>,
    /// Backing table for `list_bundles`.
    pub bundles: Mutex<Vec<Bundle>>,
    /// Backing table for `list_metadata`.
    pub metadata: Mutex<Vec<MetadataRecord>>,
    pub bundle_patches: Mutex<Vec<RecordedBundlePatch>>,
    pub request_patches: Mutex<Vec<RecordedRequestPatch>>,
    pub created_bundles: Mutex<Vec<NewBundle>>,
    pub created_metadata: Mutex<Vec<NewMetadataRecord>>,
    pub deleted_metadata: Mutex<Vec<String>>,
    pub pop_errors: Mutex<VecDeque<ClientError>>,
    pub patch_errors: Mutex<VecDeque<ClientError>>,
    pub heartbeats: Mutex<u32>,
}

impl FakeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A claimed bundle ready to be handed out by POP.
    pub fn claimed_bundle(uuid: &str, status: BundleStatus, claimant: &str) -> Bundle {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let mut bundle = Bundle::create(
            BundleId::new(uuid),
            NewBundle {
                request: RequestId::new("req-1"),
                source: "WIPAC".to_string(),
                dest: "NERSC".to_string(),
                path: "/data/exp/IceCube/2013/filtered/PFFilt/1109".to_string(),
                status,
                files: Vec::new(),
                bundle_path: None,
                size: None,
                checksum: None,
            },
            now,
        );
        bundle.claim.take(claimant, now);
        bundle
    }

    /// A claimed transfer request ready to be handed out by POP.
    pub fn claimed_request(uuid: &str, claimant: &str) -> TransferRequest {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let mut request = TransferRequest::create(
            RequestId::new(uuid),
            lta_core::NewTransferRequest {
                source: "WIPAC".to_string(),
                dest: "NERSC".to_string(),
                path: "/data/exp/IceCube/2013/filtered/PFFilt/1109".to_string(),
            },
            now,
        );
        request.claim.take(claimant, now);
        request
    }
}

#[async_trait]
impl Coordinator for FakeCoordinator {
    async fn pop_request(
        &self,
        _source: &str,
        _dest: &str,
        _claimant: &str,
    ) -> Result<Option<TransferRequest>, ClientError> {
        if let Some(err) = self.pop_errors.lock().pop_front() {
            return Err(err);
        }
        Ok(self.poppable_requests.lock().pop_front())
    }

    async fn pop_bundle(
        &self,
        _status: &str,
        _source: &str,
        _dest: &str,
        _claimant: &str,
    ) -> Result<Option<Bundle>, ClientError> {
        if let Some(err) = self.pop_errors.lock().pop_front() {
            return Err(err);
        }
        Ok(self.poppable_bundles.lock().pop_front())
    }

    async fn update_request(
        &self,
        uuid: &str,
        claimant: &str,
        update: RequestUpdate,
    ) -> Result<TransferRequest, ClientError> {
        if let Some(err) = self.patch_errors.lock().pop_front() {
            return Err(err);
        }
        self.request_patches.lock().push(RecordedRequestPatch {
            uuid: uuid.to_string(),
            claimant: claimant.to_string(),
            update: update.clone(),
        });
        let mut request = Self::claimed_request(uuid, claimant);
        request.claim.release();
        if let Some(status) = update.status {
            request.status = status;
        }
        Ok(request)
    }

    async fn update_bundle(
        &self,
        uuid: &str,
        claimant: &str,
        update: BundleUpdate,
    ) -> Result<Bundle, ClientError> {
        if let Some(err) = self.patch_errors.lock().pop_front() {
            return Err(err);
        }
        self.bundle_patches.lock().push(RecordedBundlePatch {
            uuid: uuid.to_string(),
            claimant: claimant.to_string(),
            update: update.clone(),
        });
        let mut bundle =
            Self::claimed_bundle(uuid, update.status.unwrap_or(BundleStatus::Specified), claimant);
        bundle.claim.release();
        Ok(bundle)
    }

    async fn bulk_create_bundles(
        &self,
        bundles: Vec<NewBundle>,
    ) -> Result<Vec<Bundle>, ClientError> {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let mut created = Vec::new();
        let mut store = self.created_bundles.lock();
        for (i, new) in bundles.into_iter().enumerate() {
            store.push(new.clone());
            created.push(Bundle::create(
                BundleId::new(format!("created-{}", store.len() + i)),
                new,
                now,
            ));
        }
        Ok(created)
    }

    async fn bulk_create_metadata(
        &self,
        records: Vec<NewMetadataRecord>,
    ) -> Result<usize, ClientError> {
        let count = records.len();
        self.created_metadata.lock().extend(records);
        Ok(count)
    }

    async fn bulk_delete_metadata(&self, uuids: Vec<String>) -> Result<usize, ClientError> {
        let count = uuids.len();
        self.deleted_metadata.lock().extend(uuids);
        Ok(count)
    }

    async fn list_bundles(
        &self,
        request: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<Bundle>, ClientError> {
        Ok(self
            .bundles
            .lock()
            .iter()
            .filter(|b| request.is_none_or(|r| b.request.as_str() == r))
            .filter(|b| status.is_none_or(|s| b.status.to_string() == s))
            .cloned()
            .collect())
    }

    async fn list_metadata(&self, bundle_uuid: &str) -> Result<Vec<MetadataRecord>, ClientError> {
        Ok(self
            .metadata
            .lock()
            .iter()
            .filter(|m| m.bundle_uuid.as_str() == bundle_uuid)
            .cloned()
            .collect())
    }

    async fn record_heartbeat(
        &self,
        _component_type: &str,
        _component_name: &str,
        _payload: serde_json::Value,
        _timeout: Duration,
    ) -> Result<(), ClientError> {
        *self.heartbeats.lock() += 1;
        Ok(())
    }
}
