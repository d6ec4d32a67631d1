// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline status enums and the transition graphs between them.
//!
//! The coordinator is the only writer of status fields, and it only accepts
//! transitions that are edges of these graphs (plus the quarantine side-moves,
//! which are handled separately because they must preserve `original_status`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a status string (env config, query parameters).
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status: {0}")]
pub struct StatusParseError(pub String);

/// Status of a bundle as it walks its pipeline.
///
/// Archival pipelines run specified → … → finished; retrieval pipelines
/// start at `located`, rejoin at `staged`, and branch through `unpacking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleStatus {
    Specified,
    Created,
    Staged,
    Transferring,
    Taping,
    Verifying,
    Completed,
    Unpacking,
    Located,
    SourceDeleted,
    Deleted,
    Finished,
    Quarantined,
}

impl BundleStatus {
    /// All statuses, for parameterized tests and admin tooling.
    pub const ALL: [BundleStatus; 13] = [
        BundleStatus::Specified,
        BundleStatus::Created,
        BundleStatus::Staged,
        BundleStatus::Transferring,
        BundleStatus::Taping,
        BundleStatus::Verifying,
        BundleStatus::Completed,
        BundleStatus::Unpacking,
        BundleStatus::Located,
        BundleStatus::SourceDeleted,
        BundleStatus::Deleted,
        BundleStatus::Finished,
        BundleStatus::Quarantined,
    ];

    /// Whether `next` is a forward edge of the pipeline graph.
    ///
    /// Quarantine moves are not forward edges; they go through the dedicated
    /// quarantine/restore operations so `original_status` is preserved.
    pub fn can_advance_to(self, next: BundleStatus) -> bool {
        use BundleStatus::*;
        matches!(
            (self, next),
            (Specified, Created)
                | (Created, Staged)
                | (Located, Staged)
                | (Staged, Transferring)
                | (Transferring, Taping)
                | (Transferring, Unpacking)
                | (Taping, Verifying)
                | (Verifying, Completed)
                | (Unpacking, Completed)
                | (Completed, SourceDeleted)
                | (SourceDeleted, Deleted)
                | (Deleted, Finished)
        )
    }

    /// Terminal statuses never advance again.
    pub fn is_terminal(self) -> bool {
        matches!(self, BundleStatus::Finished)
    }
}

impl fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BundleStatus::Specified => "specified",
            BundleStatus::Created => "created",
            BundleStatus::Staged => "staged",
            BundleStatus::Transferring => "transferring",
            BundleStatus::Taping => "taping",
            BundleStatus::Verifying => "verifying",
            BundleStatus::Completed => "completed",
            BundleStatus::Unpacking => "unpacking",
            BundleStatus::Located => "located",
            BundleStatus::SourceDeleted => "source-deleted",
            BundleStatus::Deleted => "deleted",
            BundleStatus::Finished => "finished",
            BundleStatus::Quarantined => "quarantined",
        };
        write!(f, "{s}")
    }
}

impl FromStr for BundleStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "specified" => Ok(BundleStatus::Specified),
            "created" => Ok(BundleStatus::Created),
            "staged" => Ok(BundleStatus::Staged),
            "transferring" => Ok(BundleStatus::Transferring),
            "taping" => Ok(BundleStatus::Taping),
            "verifying" => Ok(BundleStatus::Verifying),
            "completed" => Ok(BundleStatus::Completed),
            "unpacking" => Ok(BundleStatus::Unpacking),
            "located" => Ok(BundleStatus::Located),
            "source-deleted" => Ok(BundleStatus::SourceDeleted),
            "deleted" => Ok(BundleStatus::Deleted),
            "finished" => Ok(BundleStatus::Finished),
            "quarantined" => Ok(BundleStatus::Quarantined),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// Status of a transfer request.
///
/// Requests are born `ethereal`, become `processing` once the picker or
/// locator has expanded them into bundles, and end `finished` when every
/// bundle of the request is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Ethereal,
    Processing,
    Finished,
    Quarantined,
}

impl RequestStatus {
    pub fn can_advance_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!((self, next), (Ethereal, Processing) | (Processing, Finished))
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Finished)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestStatus::Ethereal => "ethereal",
            RequestStatus::Processing => "processing",
            RequestStatus::Finished => "finished",
            RequestStatus::Quarantined => "quarantined",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RequestStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ethereal" => Ok(RequestStatus::Ethereal),
            "processing" => Ok(RequestStatus::Processing),
            "finished" => Ok(RequestStatus::Finished),
            "quarantined" => Ok(RequestStatus::Quarantined),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
