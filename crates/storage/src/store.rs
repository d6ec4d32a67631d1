// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The document store: atomic claims, fenced updates, and the reaper body.
//!
//! One `parking_lot::Mutex` guards all collections. Every public operation
//! acquires it once, reads and writes inside it, and releases it before
//! returning, so POP's select-and-claim is a single conditional update and
//! there is no read-then-write window anywhere.

use crate::collections::Collections;
use crate::query::{BundleFilter, Page, RequestFilter};
use chrono::{DateTime, Duration, Utc};
use lta_core::{
    Bundle, BundleId, BundleStatus, BundleUpdate, Clock, HeartbeatRecord, IdMinter,
    MetadataRecord, NewBundle, NewMetadataRecord, NewTransferRequest, RandomIds, RequestId,
    RequestStatus, RequestUpdate, SystemClock, TransferRequest,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced to the REST layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("claim conflict on {uuid} (held by {holder:?})")]
    ClaimConflict { uuid: String, holder: Option<String> },
    #[error("invalid transition on {uuid}: {from} -> {to}")]
    InvalidTransition {
        uuid: String,
        from: String,
        to: String,
    },
    #[error("checksum already recorded on {0} and is immutable")]
    ChecksumImmutable(String),
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
}

/// Who is performing a mutation.
///
/// Workers pass `Claimant`; the update is rejected unless that worker holds
/// the live claim. `Admin` bypasses the fence but not the transition and
/// immutability checks.
#[derive(Debug, Clone, Copy)]
pub enum Fence<'a> {
    Admin,
    Claimant(&'a str),
}

/// Handle to the coordinator's state. Cheap to clone; all clones share the
/// same collections.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Collections>>,
    revision: Arc<Mutex<u64>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdMinter>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(SystemClock), Arc::new(RandomIds))
    }

    pub fn with_parts(clock: Arc<dyn Clock>, ids: Arc<dyn IdMinter>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Collections::default())),
            revision: Arc::new(Mutex::new(0)),
            clock,
            ids,
        }
    }

    /// Rebuild a store from snapshot contents.
    pub fn from_collections(
        collections: Collections,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdMinter>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(collections)),
            revision: Arc::new(Mutex::new(0)),
            clock,
            ids,
        }
    }

    /// Snapshot the collections for checkpointing.
    pub fn clone_collections(&self) -> Collections {
        self.inner.lock().clone()
    }

    /// Monotonic mutation counter; the checkpoint task skips writes when it
    /// has not moved.
    pub fn revision(&self) -> u64 {
        *self.revision.lock()
    }

    /// Durably snapshot the current collections to `path`.
    ///
    /// The store lock is held only for the clone; serialization,
    /// compression, and I/O run without it, so callers can checkpoint from
    /// a blocking task without stalling claims. Returns the revision that
    /// was captured and the compressed size in bytes.
    pub fn checkpoint(&self, path: &std::path::Path) -> Result<(u64, u64), crate::SnapshotError> {
        // Revision first: a mutation landing between the two reads then
        // stamps the snapshot older than its contents, and the caller
        // simply checkpoints again next tick.
        let revision = self.revision();
        let collections = self.clone_collections();
        let size_bytes = crate::Snapshot::new(revision, collections).write(path)?;
        Ok((revision, size_bytes))
    }

    fn bump_revision(&self) {
        *self.revision.lock() += 1;
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // === Transfer requests ===

    pub fn create_request(&self, new: NewTransferRequest) -> TransferRequest {
        let now = self.now();
        let uuid = self.ids.mint();
        let request = TransferRequest::create(RequestId::new(uuid.clone()), new, now);
        let mut state = self.inner.lock();
        let seq = state.bump_seq();
        state.request_seq.insert(uuid.clone(), seq);
        state.requests.insert(uuid, request.clone());
        drop(state);
        self.bump_revision();
        info!(request = %request.uuid, source = %request.source, dest = %request.dest, "created transfer request");
        request
    }

    pub fn get_request(&self, uuid: &str) -> Result<TransferRequest, StoreError> {
        self.inner
            .lock()
            .requests
            .get(uuid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))
    }

    pub fn list_requests(&self, filter: &RequestFilter) -> Vec<TransferRequest> {
        let state = self.inner.lock();
        let mut requests: Vec<_> = state
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        requests
    }

    /// Atomically claim the oldest unclaimed ethereal request.
    pub fn pop_request(
        &self,
        source: Option<&str>,
        dest: Option<&str>,
        claimant: &str,
    ) -> Option<TransferRequest> {
        let now = self.now();
        let mut state = self.inner.lock();
        let candidate = state
            .requests
            .values()
            .filter(|r| {
                r.status == RequestStatus::Ethereal
                    && !r.claim.claimed
                    && source.is_none_or(|s| r.source == s)
                    && dest.is_none_or(|d| r.dest == d)
            })
            .min_by_key(|r| {
                (
                    r.work_priority_timestamp,
                    state.request_seq(r.uuid.as_str()),
                )
            })
            .map(|r| r.uuid.as_str().to_string())?;

        let request = state.requests.get_mut(&candidate)?;
        request.claim.take(claimant, now);
        request.update_timestamp = now;
        let claimed = request.clone();
        drop(state);
        self.bump_revision();
        debug!(request = %claimed.uuid, claimant, "request claimed");
        Some(claimed)
    }

    pub fn update_request(
        &self,
        uuid: &str,
        fence: Fence<'_>,
        update: RequestUpdate,
    ) -> Result<TransferRequest, StoreError> {
        let now = self.now();
        let mut state = self.inner.lock();
        let request = state
            .requests
            .get_mut(uuid)
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;

        check_fence(&fence, request.claim.holder(), uuid)?;

        if let Some(next) = update.status {
            apply_request_status(request, next, update.reason.as_deref(), now)?;
        } else if let Some(reason) = &update.reason {
            request.reason = Some(reason.clone());
        }
        if let Some(ts) = update.work_priority_timestamp {
            request.work_priority_timestamp = ts;
        }
        match update.claimed {
            Some(false) => request.claim.release(),
            Some(true) => {
                return Err(StoreError::InvalidUpdate(
                    "claims are only taken through pop".to_string(),
                ))
            }
            None => {}
        }
        request.update_timestamp = now;
        let updated = request.clone();
        drop(state);
        self.bump_revision();
        Ok(updated)
    }

    pub fn delete_request(&self, uuid: &str) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        state
            .requests
            .remove(uuid)
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;
        state.request_seq.remove(uuid);
        drop(state);
        self.bump_revision();
        Ok(())
    }

    // === Bundles ===

    /// Atomically insert the bundles produced by one picker/locator run,
    /// externalizing each bundle's file list into the metadata side-table.
    pub fn bulk_create_bundles(&self, new: Vec<NewBundle>) -> Vec<Bundle> {
        let now = self.now();
        let mut state = self.inner.lock();
        let mut created = Vec::with_capacity(new.len());
        for item in new {
            let uuid = self.ids.mint();
            let files = item.files.clone();
            let bundle = Bundle::create(BundleId::new(uuid.clone()), item, now);
            let seq = state.bump_seq();
            state.bundle_seq.insert(uuid.clone(), seq);
            for file_uuid in files {
                let metadata_uuid = self.ids.mint();
                state.metadata.insert(
                    metadata_uuid.clone(),
                    MetadataRecord {
                        uuid: metadata_uuid,
                        bundle_uuid: bundle.uuid.clone(),
                        file_catalog_uuid: file_uuid,
                    },
                );
            }
            state.bundles.insert(uuid, bundle.clone());
            created.push(bundle);
        }
        drop(state);
        self.bump_revision();
        info!(count = created.len(), "bulk-created bundles");
        created
    }

    pub fn get_bundle(&self, uuid: &str) -> Result<Bundle, StoreError> {
        self.inner
            .lock()
            .bundles
            .get(uuid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))
    }

    pub fn list_bundles(&self, filter: &BundleFilter, page: &Page) -> Vec<Bundle> {
        let state = self.inner.lock();
        let mut bundles: Vec<_> = state
            .bundles
            .values()
            .filter(|b| filter.matches(b))
            .filter(|b| {
                page.after
                    .as_deref()
                    .is_none_or(|after| b.uuid.as_str() > after)
            })
            .cloned()
            .collect();
        bundles.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        if let Some(limit) = page.limit {
            bundles.truncate(limit);
        }
        bundles
    }

    pub fn bundles_for_request(&self, request: &str) -> Vec<Bundle> {
        let state = self.inner.lock();
        let mut bundles: Vec<_> = state
            .bundles_for_request(request)
            .into_iter()
            .cloned()
            .collect();
        bundles.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        bundles
    }

    /// The POP primitive: atomically select and claim at most one unclaimed
    /// bundle in `status`, oldest work priority first, insertion order as
    /// the tie-break.
    pub fn pop_bundle(
        &self,
        status: BundleStatus,
        source: Option<&str>,
        dest: Option<&str>,
        claimant: &str,
    ) -> Option<Bundle> {
        let now = self.now();
        let mut state = self.inner.lock();
        let candidate = state
            .bundles
            .values()
            .filter(|b| {
                b.status == status
                    && !b.claim.claimed
                    && source.is_none_or(|s| b.source == s)
                    && dest.is_none_or(|d| b.dest == d)
            })
            .min_by_key(|b| (b.work_priority_timestamp, state.bundle_seq(b.uuid.as_str())))
            .map(|b| b.uuid.as_str().to_string())?;

        let bundle = state.bundles.get_mut(&candidate)?;
        bundle.claim.take(claimant, now);
        bundle.update_timestamp = now;
        let claimed = bundle.clone();
        drop(state);
        self.bump_revision();
        debug!(bundle = %claimed.uuid, status = %status, claimant, "bundle claimed");
        Some(claimed)
    }

    pub fn update_bundle(
        &self,
        uuid: &str,
        fence: Fence<'_>,
        update: BundleUpdate,
    ) -> Result<Bundle, StoreError> {
        let now = self.now();
        let mut state = self.inner.lock();
        let bundle = state
            .bundles
            .get_mut(uuid)
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;

        check_fence(&fence, bundle.claim.holder(), uuid)?;

        // Checksums are write-once.
        if let Some(checksum) = &update.checksum {
            match &bundle.checksum {
                Some(existing) if existing != checksum => {
                    return Err(StoreError::ChecksumImmutable(uuid.to_string()));
                }
                _ => bundle.checksum = Some(checksum.clone()),
            }
        }

        if let Some(next) = update.status {
            apply_bundle_status(bundle, next, update.reason.as_deref(), now)?;
        } else if let Some(reason) = &update.reason {
            bundle.reason = Some(reason.clone());
        }
        if let Some(path) = update.bundle_path {
            bundle.bundle_path = Some(path);
        }
        if let Some(size) = update.size {
            bundle.size = Some(size);
        }
        if let Some(verified) = update.verified {
            bundle.verified = verified;
        }
        if let Some(ts) = update.work_priority_timestamp {
            bundle.work_priority_timestamp = ts;
        }
        match update.claimed {
            Some(false) => bundle.claim.release(),
            Some(true) => {
                return Err(StoreError::InvalidUpdate(
                    "claims are only taken through pop".to_string(),
                ))
            }
            None => {}
        }
        bundle.update_timestamp = now;
        let updated = bundle.clone();
        drop(state);
        self.bump_revision();
        Ok(updated)
    }

    pub fn delete_bundle(&self, uuid: &str) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        state
            .bundles
            .remove(uuid)
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;
        state.bundle_seq.remove(uuid);
        state.metadata.retain(|_, m| m.bundle_uuid.as_str() != uuid);
        drop(state);
        self.bump_revision();
        Ok(())
    }

    // === Metadata side-table ===

    pub fn bulk_create_metadata(&self, new: Vec<NewMetadataRecord>) -> Vec<MetadataRecord> {
        let mut state = self.inner.lock();
        let mut created = Vec::with_capacity(new.len());
        for item in new {
            let uuid = self.ids.mint();
            let record = MetadataRecord {
                uuid: uuid.clone(),
                bundle_uuid: item.bundle_uuid,
                file_catalog_uuid: item.file_catalog_uuid,
            };
            state.metadata.insert(uuid, record.clone());
            created.push(record);
        }
        drop(state);
        self.bump_revision();
        created
    }

    pub fn list_metadata(&self, bundle: Option<&str>) -> Vec<MetadataRecord> {
        let state = self.inner.lock();
        let mut records: Vec<_> = match bundle {
            Some(uuid) => state
                .metadata_for_bundle(uuid)
                .into_iter()
                .cloned()
                .collect(),
            None => state.metadata.values().cloned().collect(),
        };
        records.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        records
    }

    pub fn bulk_delete_metadata(&self, uuids: &[String]) -> usize {
        let mut state = self.inner.lock();
        let before = state.metadata.len();
        for uuid in uuids {
            state.metadata.remove(uuid);
        }
        let removed = before - state.metadata.len();
        drop(state);
        if removed > 0 {
            self.bump_revision();
        }
        removed
    }

    pub fn delete_metadata_for_bundle(&self, bundle: &str) -> usize {
        let mut state = self.inner.lock();
        let before = state.metadata.len();
        state
            .metadata
            .retain(|_, m| m.bundle_uuid.as_str() != bundle);
        let removed = before - state.metadata.len();
        drop(state);
        if removed > 0 {
            self.bump_revision();
        }
        removed
    }

    // === Heartbeats ===

    pub fn record_heartbeat(
        &self,
        component_type: &str,
        component_name: &str,
        payload: serde_json::Value,
    ) {
        let now = self.now();
        let mut state = self.inner.lock();
        state
            .heartbeats
            .entry(component_type.to_string())
            .or_default()
            .insert(
                component_name.to_string(),
                HeartbeatRecord {
                    component_type: component_type.to_string(),
                    component_name: component_name.to_string(),
                    timestamp: now,
                    payload,
                },
            );
        drop(state);
        self.bump_revision();
    }

    pub fn heartbeats(&self) -> Vec<HeartbeatRecord> {
        let state = self.inner.lock();
        let mut records: Vec<_> = state
            .heartbeats
            .values()
            .flat_map(|by_name| by_name.values().cloned())
            .collect();
        records.sort_by(|a, b| {
            (&a.component_type, &a.component_name).cmp(&(&b.component_type, &b.component_name))
        });
        records
    }

    pub fn heartbeats_for(&self, component_type: &str) -> Vec<HeartbeatRecord> {
        let state = self.inner.lock();
        let mut records: Vec<_> = state
            .heartbeats
            .get(component_type)
            .map(|by_name| by_name.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| a.component_name.cmp(&b.component_name));
        records
    }

    /// Drop heartbeat records older than the cutoff. Admin tooling calls
    /// this to cull workers that were renamed or retired.
    pub fn prune_heartbeats(&self, older_than: DateTime<Utc>) -> usize {
        let mut state = self.inner.lock();
        let mut removed = 0;
        for by_name in state.heartbeats.values_mut() {
            let before = by_name.len();
            by_name.retain(|_, hb| hb.timestamp >= older_than);
            removed += before - by_name.len();
        }
        state.heartbeats.retain(|_, by_name| !by_name.is_empty());
        drop(state);
        if removed > 0 {
            self.bump_revision();
        }
        removed
    }

    // === Reaper and dashboards ===

    /// Release claims older than `max_age` on requests and bundles.
    ///
    /// Idempotent; racing a claimant is safe because the claimant's next
    /// PATCH is fenced and will be rejected once someone else re-claims.
    pub fn release_stale_claims(&self, max_age: Duration) -> Vec<String> {
        let now = self.now();
        let mut state = self.inner.lock();
        let mut released = Vec::new();

        for request in state.requests.values_mut() {
            if request.claim.claimed && request.claim.age(now) > Some(max_age) {
                request.claim.release();
                request.update_timestamp = now;
                released.push(request.uuid.as_str().to_string());
            }
        }
        for bundle in state.bundles.values_mut() {
            if bundle.claim.claimed && bundle.claim.age(now) > Some(max_age) {
                bundle.claim.release();
                bundle.update_timestamp = now;
                released.push(bundle.uuid.as_str().to_string());
            }
        }
        drop(state);
        if !released.is_empty() {
            self.bump_revision();
            info!(count = released.len(), "reaped stale claims");
        }
        released
    }

    /// Bundle counts per status, for `GET /status`.
    pub fn bundle_status_counts(&self) -> BTreeMap<String, usize> {
        let state = self.inner.lock();
        let mut counts = BTreeMap::new();
        for bundle in state.bundles.values() {
            *counts.entry(bundle.status.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Live worker counts per component type, for `GET /status/{type}/count`.
    pub fn component_counts(&self) -> BTreeMap<String, usize> {
        let state = self.inner.lock();
        state
            .heartbeats
            .iter()
            .map(|(component_type, by_name)| (component_type.clone(), by_name.len()))
            .collect()
    }
}

/// Reject a claimant's write only when somebody else holds the claim.
///
/// A write to an unclaimed document is allowed: a reaped claim simply became
/// available again, and the original worker's PATCH is still the right
/// outcome as long as no new claimant has taken over.
fn check_fence(fence: &Fence<'_>, holder: Option<&str>, uuid: &str) -> Result<(), StoreError> {
    match (fence, holder) {
        (Fence::Admin, _) => Ok(()),
        (Fence::Claimant(_), None) => Ok(()),
        (Fence::Claimant(claimant), Some(holder)) if holder == *claimant => Ok(()),
        (Fence::Claimant(_), Some(holder)) => Err(StoreError::ClaimConflict {
            uuid: uuid.to_string(),
            holder: Some(holder.to_string()),
        }),
    }
}

fn apply_bundle_status(
    bundle: &mut Bundle,
    next: BundleStatus,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    if next == BundleStatus::Quarantined {
        bundle.quarantine(reason.unwrap_or("quarantined"), now);
        return Ok(());
    }
    if bundle.status == BundleStatus::Quarantined {
        // Only the pre-quarantine status may be restored.
        if bundle.original_status == Some(next) {
            bundle.unquarantine(now);
            return Ok(());
        }
        return Err(StoreError::InvalidTransition {
            uuid: bundle.uuid.as_str().to_string(),
            from: bundle.status.to_string(),
            to: next.to_string(),
        });
    }
    if !bundle.status.can_advance_to(next) {
        return Err(StoreError::InvalidTransition {
            uuid: bundle.uuid.as_str().to_string(),
            from: bundle.status.to_string(),
            to: next.to_string(),
        });
    }
    bundle.status = next;
    if let Some(reason) = reason {
        bundle.reason = Some(reason.to_string());
    }
    Ok(())
}

fn apply_request_status(
    request: &mut TransferRequest,
    next: RequestStatus,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    if next == RequestStatus::Quarantined {
        request.quarantine(reason.unwrap_or("quarantined"), now);
        return Ok(());
    }
    if request.status == RequestStatus::Quarantined {
        if request.original_status == Some(next) {
            request.unquarantine(now);
            return Ok(());
        }
        return Err(StoreError::InvalidTransition {
            uuid: request.uuid.as_str().to_string(),
            from: request.status.to_string(),
            to: next.to_string(),
        });
    }
    if !request.status.can_advance_to(next) {
        return Err(StoreError::InvalidTransition {
            uuid: request.uuid.as_str().to_string(),
            from: request.status.to_string(),
            to: next.to_string(),
        });
    }
    request.status = next;
    if let Some(reason) = reason {
        request.reason = Some(reason.to_string());
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
