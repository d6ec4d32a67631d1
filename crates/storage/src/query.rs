// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listing filters and pagination.

use lta_core::{Bundle, BundleStatus, RequestStatus, TransferRequest};

/// Filter for `GET /TransferRequests`.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub source: Option<String>,
    pub dest: Option<String>,
}

impl RequestFilter {
    pub fn matches(&self, req: &TransferRequest) -> bool {
        self.status.is_none_or(|s| req.status == s)
            && self.source.as_deref().is_none_or(|s| req.source == s)
            && self.dest.as_deref().is_none_or(|d| req.dest == d)
    }
}

/// Filter for `GET /Bundles`.
#[derive(Debug, Clone, Default)]
pub struct BundleFilter {
    pub status: Option<BundleStatus>,
    pub source: Option<String>,
    pub dest: Option<String>,
    pub verified: Option<bool>,
    pub request: Option<String>,
}

impl BundleFilter {
    pub fn matches(&self, bundle: &Bundle) -> bool {
        self.status.is_none_or(|s| bundle.status == s)
            && self.source.as_deref().is_none_or(|s| bundle.source == s)
            && self.dest.as_deref().is_none_or(|d| bundle.dest == d)
            && self.verified.is_none_or(|v| bundle.verified == v)
            && self
                .request
                .as_deref()
                .is_none_or(|r| bundle.request.as_str() == r)
    }
}

/// Uuid-ordered pagination for bundle listings.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Return documents with uuid strictly greater than this.
    pub after: Option<String>,
    pub limit: Option<usize>,
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
