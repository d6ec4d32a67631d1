// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::checksum::checksum_file;
use crate::test_helpers::{stage_ctx, write_file};
use lta_core::BundleStatus;
use lta_harness::test_support::FakeCoordinator;
use std::sync::Arc;

fn transferred_bundle(dest_dir: &std::path::Path, payload: &[u8]) -> Work {
    let received = write_file(dest_dir, "b-1.tar", payload);
    let (checksum, size) = checksum_file(&received).unwrap();
    let mut bundle =
        FakeCoordinator::claimed_bundle("b-1", BundleStatus::Transferring, "test-worker");
    bundle.bundle_path = Some(std::path::PathBuf::from("/staging/b-1.tar"));
    bundle.checksum = Some(checksum);
    bundle.size = Some(size);
    Work::Bundle(bundle)
}

#[tokio::test]
async fn matching_checksum_advances_to_configured_output() {
    let dir = tempfile::tempdir().unwrap();
    let work = transferred_bundle(dir.path(), b"received bytes");

    let verifier = SiteMoveVerifier::new(dir.path().to_path_buf());
    let ctx = stage_ctx(Arc::new(FakeCoordinator::new()), "taping");

    let Outcome::Advance(Update::Bundle(update)) = verifier.run(work, &ctx).await.unwrap() else {
        panic!("expected bundle advance");
    };
    assert_eq!(update.status, Some(BundleStatus::Taping));
    assert_eq!(update.bundle_path, Some(dir.path().join("b-1.tar")));
}

#[tokio::test]
async fn retrieval_pipeline_advances_to_unpacking() {
    let dir = tempfile::tempdir().unwrap();
    let work = transferred_bundle(dir.path(), b"received bytes");

    let verifier = SiteMoveVerifier::new(dir.path().to_path_buf());
    let ctx = stage_ctx(Arc::new(FakeCoordinator::new()), "unpacking");

    let Outcome::Advance(Update::Bundle(update)) = verifier.run(work, &ctx).await.unwrap() else {
        panic!("expected bundle advance");
    };
    assert_eq!(update.status, Some(BundleStatus::Unpacking));
}

#[tokio::test]
async fn corrupted_artifact_quarantines() {
    let dir = tempfile::tempdir().unwrap();
    let work = transferred_bundle(dir.path(), b"received bytes");
    // Corrupt the artifact after its checksum was recorded.
    std::fs::write(dir.path().join("b-1.tar"), b"corrupted bytes!").unwrap();

    let verifier = SiteMoveVerifier::new(dir.path().to_path_buf());
    let ctx = stage_ctx(Arc::new(FakeCoordinator::new()), "taping");

    let err = verifier.run(work, &ctx).await.unwrap_err();
    assert!(err.to_string().contains("checksum mismatch"));
}

#[tokio::test]
async fn bundle_without_recorded_checksum_quarantines() {
    let dir = tempfile::tempdir().unwrap();
    let mut bundle =
        FakeCoordinator::claimed_bundle("b-1", BundleStatus::Transferring, "test-worker");
    bundle.bundle_path = Some(std::path::PathBuf::from("/staging/b-1.tar"));

    let verifier = SiteMoveVerifier::new(dir.path().to_path_buf());
    let ctx = stage_ctx(Arc::new(FakeCoordinator::new()), "taping");

    let err = verifier.run(Work::Bundle(bundle), &ctx).await.unwrap_err();
    assert!(err.to_string().contains("no recorded checksum"));
}
