// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive, time-bounded claims on documents.
//!
//! Invariant: `claimed`, `claimant`, and `claim_timestamp` are all set or
//! all clear. The store only mutates claims through [`ClaimState::take`] and
//! [`ClaimState::release`], which cannot produce a mixed state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claim fields shared by transfer requests and bundles.
///
/// Flattened into the owning document, so the wire shape stays the flat
/// `claimed`/`claimant`/`claim_timestamp` triple dashboards expect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimState {
    #[serde(default)]
    pub claimed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_timestamp: Option<DateTime<Utc>>,
}

impl ClaimState {
    /// Take the claim for `claimant`. Callers must have already checked
    /// `!self.claimed` under the store lock.
    pub fn take(&mut self, claimant: &str, now: DateTime<Utc>) {
        self.claimed = true;
        self.claimant = Some(claimant.to_string());
        self.claim_timestamp = Some(now);
    }

    /// Clear all claim fields.
    pub fn release(&mut self) {
        self.claimed = false;
        self.claimant = None;
        self.claim_timestamp = None;
    }

    /// Whether `claimant` currently holds a live claim.
    pub fn is_held_by(&self, claimant: &str) -> bool {
        self.claimed && self.claimant.as_deref() == Some(claimant)
    }

    /// Current holder, if the claim is live.
    pub fn holder(&self) -> Option<&str> {
        if self.claimed {
            self.claimant.as_deref()
        } else {
            None
        }
    }

    /// Age of the claim relative to `now`, if held.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.claim_timestamp.map(|since| now - since)
    }

    /// Invariant check: all three fields set, or none.
    pub fn is_consistent(&self) -> bool {
        if self.claimed {
            self.claimant.is_some() && self.claim_timestamp.is_some()
        } else {
            self.claimant.is_none() && self.claim_timestamp.is_none()
        }
    }
}

#[cfg(test)]
#[path = "claim_tests.rs"]
mod tests;
