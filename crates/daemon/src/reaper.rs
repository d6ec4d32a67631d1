// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stale-claim reaper task.
//!
//! A claim that outlives `MAX_CLAIM_AGE` belongs to a worker that died or
//! lost its network; releasing it puts the document back in the POP pool.
//! Racing the original worker is safe because its PATCHes are fenced by
//! claimant identity.

use lta_storage::Store;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Spawn the periodic reaper.
pub fn spawn(store: Store, max_claim_age: chrono::Duration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a restart does not
        // reap before the listener is even up.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let released = store.release_stale_claims(max_claim_age);
            if !released.is_empty() {
                debug!(released = ?released, "reaper released stale claims");
            }
        }
    })
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
