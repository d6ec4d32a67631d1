// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer requests: the user-submitted unit of archival or retrieval work.

use crate::claim::ClaimState;
use crate::id::RequestId;
use crate::status::RequestStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /TransferRequests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransferRequest {
    /// Site the dataset currently lives at (e.g. `WIPAC`).
    pub source: String,
    /// Site the dataset should be archived to or retrieved to.
    pub dest: String,
    /// Warehouse path identifying the dataset.
    pub path: String,
}

/// A transfer request document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub uuid: RequestId,
    pub source: String,
    pub dest: String,
    pub path: String,
    pub status: RequestStatus,
    /// Status held before quarantine; set iff `status` is quarantined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_status: Option<RequestStatus>,
    /// Human-readable quarantine explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub claim: ClaimState,
    /// Age-biasing key for POP ordering; defaults to creation time,
    /// resettable by admins to promote or demote work.
    pub work_priority_timestamp: DateTime<Utc>,
    pub create_timestamp: DateTime<Utc>,
    pub update_timestamp: DateTime<Utc>,
}

impl TransferRequest {
    pub fn create(uuid: RequestId, new: NewTransferRequest, now: DateTime<Utc>) -> Self {
        Self {
            uuid,
            source: new.source,
            dest: new.dest,
            path: new.path,
            status: RequestStatus::Ethereal,
            original_status: None,
            reason: None,
            claim: ClaimState::default(),
            work_priority_timestamp: now,
            create_timestamp: now,
            update_timestamp: now,
        }
    }

    /// Move to quarantine, remembering the prior status and releasing the claim.
    pub fn quarantine(&mut self, reason: &str, now: DateTime<Utc>) {
        if self.status != RequestStatus::Quarantined {
            self.original_status = Some(self.status);
        }
        self.status = RequestStatus::Quarantined;
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
#[path = "request_tests.rs"]
mod tests;
