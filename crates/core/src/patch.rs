// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Partial-update bodies for `PATCH /Bundles/{uuid}` and
//! `PATCH /TransferRequests/{uuid}`.
//!
//! Every field is optional; absent fields are left untouched. Setting
//! `claimed: false` releases the caller's claim; `claimed: true` is never
//! accepted (claims are only taken through POP).

use crate::bundle::BundleChecksums;
use crate::status::{BundleStatus, RequestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BundleStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<BundleChecksums>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_priority_timestamp: Option<DateTime<Utc>>,
}

impl BundleUpdate {
    /// Update that advances the status and releases the claim in one PATCH,
    /// the shape every stage sends on success.
    pub fn advance(status: BundleStatus) -> Self {
        Self {
            status: Some(status),
            claimed: Some(false),
            ..Self::default()
        }
    }

    /// Update that quarantines with a reason and releases the claim.
    pub fn quarantine(reason: impl Into<String>) -> Self {
        Self {
            status: Some(BundleStatus::Quarantined),
            reason: Some(reason.into()),
            claimed: Some(false),
            ..Self::default()
        }
    }

    /// Update that only releases the claim (defer without advancing).
    pub fn release() -> Self {
        Self {
            claimed: Some(false),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_priority_timestamp: Option<DateTime<Utc>>,
}

impl RequestUpdate {
    pub fn advance(status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            claimed: Some(false),
            ..Self::default()
        }
    }

    pub fn quarantine(reason: impl Into<String>) -> Self {
        Self {
            status: Some(RequestStatus::Quarantined),
            reason: Some(reason.into()),
            claimed: Some(false),
            ..Self::default()
        }
    }

    pub fn release() -> Self {
        Self {
            claimed: Some(false),
            ..Self::default()
        }
    }
}
