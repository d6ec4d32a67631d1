// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bundles: groups of warehouse files assembled into one archive artifact.

use crate::claim::ClaimState;
use crate::id::{BundleId, RequestId};
use crate::status::BundleStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Checksums recorded when a bundle artifact is materialized.
///
/// Immutable once set; the store rejects any PATCH that would change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleChecksums {
    /// Lowercase hex SHA-512 of the archive bytes.
    pub sha512: String,
    /// Lowercase hex ADLER-32 of the archive bytes.
    pub adler32: String,
}

/// One entry of `POST /Bundles/actions/bulk_create`.
///
/// `files` lists the File-Catalog identifiers belonging to the bundle; the
/// store turns them into Metadata side-table rows and never embeds them in
/// the bundle document itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBundle {
    pub request: RequestId,
    pub source: String,
    pub dest: String,
    pub path: String,
    pub status: BundleStatus,
    #[serde(default)]
    pub files: Vec<String>,
    /// Known artifact location (set by the locator for archived bundles).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<BundleChecksums>,
}

/// A bundle document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub uuid: BundleId,
    /// The transfer request this bundle expands.
    pub request: RequestId,
    pub source: String,
    pub dest: String,
    pub path: String,
    /// On-disk artifact, once materialized by the bundler (or known from
    /// the archive, for retrievals).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_path: Option<PathBuf>,
    /// Deprecated embedded file list. The Metadata side-table is the
    /// authority; this stays only so old snapshots still deserialize.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<BundleChecksums>,
    pub status: BundleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_status: Option<BundleStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Set by a verifier stage after an independent re-checksum.
    #[serde(default)]
    pub verified: bool,
    #[serde(flatten)]
    pub claim: ClaimState,
    pub work_priority_timestamp: DateTime<Utc>,
    pub create_timestamp: DateTime<Utc>,
    pub update_timestamp: DateTime<Utc>,
}

impl Bundle {
    pub fn create(uuid: BundleId, new: NewBundle, now: DateTime<Utc>) -> Self {
        Self {
            uuid,
            request: new.request,
            source: new.source,
            dest: new.dest,
            path: new.path,
            bundle_path: new.bundle_path,
            files: Vec::new(),
            size: new.size,
            checksum: new.checksum,
            status: new.status,
            original_status: None,
            reason: None,
            verified: false,
            claim: ClaimState::default(),
            work_priority_timestamp: now,
            create_timestamp: now,
            update_timestamp: now,
        }
    }

    /// Move to quarantine, remembering the prior status and releasing the claim.
    pub fn quarantine(&mut self, reason: &str, now: DateTime<Utc>) {
        if self.status != BundleStatus::Quarantined {
            self.original_status = Some(self.status);
        }
        self.status = BundleStatus::Quarantined;
        self.reason = Some(reason.to_string());
        self.claim.release();
        self.update_timestamp = now;
    }

    /// Restore the pre-quarantine status. Returns false when not quarantined.
    pub fn unquarantine(&mut self, now: DateTime<Utc>) -> bool {
        let Some(original) = self.original_status.take() else {
            return false;
        };
        self.status = original;
        self.reason = None;
        self.update_timestamp = now;
        true
    }
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
