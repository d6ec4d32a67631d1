// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lta-harness: the uniform worker executor.
//!
//! Every pipeline stage is the same process shape: load config from the
//! environment, obtain a bearer token, run a heartbeat task beside the work
//! loop, claim work from the coordinator, apply the stage action, report the
//! result. The harness owns all of that; a stage supplies only its action.

pub mod client;
pub mod config;
pub mod heartbeat;
pub mod metrics;
pub mod stage;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod token;
pub mod worker;

pub use client::{ClientError, Coordinator, HttpCoordinator};
pub use config::{ConfigError, WorkerConfig};
pub use metrics::Metrics;
pub use stage::{Outcome, Stage, StageContext, StageError, Update, Work, WorkSource};
pub use token::TokenSource;
pub use worker::{Worker, WorkerError};
