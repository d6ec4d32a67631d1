// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-component heartbeat records.
//!
//! Heartbeats feed dashboards only. The stale-claim reaper keys off
//! `claim_timestamp`, never off these records, so a heartbeat outage cannot
//! steal work from a healthy worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest heartbeat from one named worker instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    /// Worker type, e.g. `bundler` or `nersc-mover`.
    pub component_type: String,
    /// Instance name (`COMPONENT_NAME`).
    pub component_name: String,
    pub timestamp: DateTime<Utc>,
    /// Component-supplied status payload, passed through verbatim.
    #[serde(default)]
    pub payload: serde_json::Value,
}
