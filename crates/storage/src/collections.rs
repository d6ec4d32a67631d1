// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory document collections.
//!
//! Plain data plus queries; all policy (claim fencing, status transitions,
//! checksum immutability) lives in [`crate::store::Store`], which owns the
//! mutex these collections sit behind.

use lta_core::{Bundle, HeartbeatRecord, MetadataRecord, TransferRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Every document table the coordinator persists.
///
/// `*_seq` record insertion order: POP breaks work-priority ties by it, and
/// it survives snapshots so restarts do not reshuffle the queue.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Collections {
    pub requests: HashMap<String, TransferRequest>,
    pub bundles: HashMap<String, Bundle>,
    pub metadata: HashMap<String, MetadataRecord>,
    /// component_type → component_name → latest heartbeat.
    pub heartbeats: HashMap<String, HashMap<String, HeartbeatRecord>>,
    #[serde(default)]
    pub request_seq: HashMap<String, u64>,
    #[serde(default)]
    pub bundle_seq: HashMap<String, u64>,
    #[serde(default)]
    pub next_seq: u64,
}

impl Collections {
    /// Allocate the next insertion sequence number.
    pub fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn request_seq(&self, uuid: &str) -> u64 {
        self.request_seq.get(uuid).copied().unwrap_or(u64::MAX)
    }

    pub fn bundle_seq(&self, uuid: &str) -> u64 {
        self.bundle_seq.get(uuid).copied().unwrap_or(u64::MAX)
    }

    /// All bundles belonging to a transfer request.
    pub fn bundles_for_request(&self, request: &str) -> Vec<&Bundle> {
        self.bundles
            .values()
            .filter(|b| b.request.as_str() == request)
            .collect()
    }

    /// All metadata rows belonging to a bundle.
    pub fn metadata_for_bundle(&self, bundle: &str) -> Vec<&MetadataRecord> {
        self.metadata
            .values()
            .filter(|m| m.bundle_uuid.as_str() == bundle)
            .collect()
    }
}
