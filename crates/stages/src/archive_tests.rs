// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::write_file;
use std::path::PathBuf;

fn sample_entries(dir: &std::path::Path) -> Vec<(PathBuf, String)> {
    vec![
        (
            write_file(dir, "warehouse/data/exp/file_a.dat", b"payload a"),
            "/data/exp/file_a.dat".to_string(),
        ),
        (
            write_file(dir, "warehouse/data/exp/sub/file_b.dat", b"payload bb"),
            "/data/exp/sub/file_b.dat".to_string(),
        ),
    ]
}

#[test]
fn archive_round_trips_contents_and_layout() {
    let dir = tempfile::tempdir().unwrap();
    let entries = sample_entries(dir.path());
    let archive_path = dir.path().join("outbox/bundle.tar");

    let size = write_archive(&archive_path, &entries).unwrap();
    assert!(size > 0);
    assert_eq!(size, std::fs::metadata(&archive_path).unwrap().len());

    let unpack_dir = dir.path().join("unpacked");
    let extracted = unpack_archive(&archive_path, &unpack_dir).unwrap();
    assert_eq!(extracted.len(), 2);

    assert_eq!(
        std::fs::read(unpack_dir.join("data/exp/file_a.dat")).unwrap(),
        b"payload a"
    );
    assert_eq!(
        std::fs::read(unpack_dir.join("data/exp/sub/file_b.dat")).unwrap(),
        b"payload bb"
    );
}

#[test]
fn rebuilding_an_archive_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let entries = sample_entries(dir.path());
    let first = dir.path().join("first.tar");
    let second = dir.path().join("second.tar");

    write_archive(&first, &entries).unwrap();
    write_archive(&second, &entries).unwrap();

    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}

#[test]
fn manifest_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = BundleManifest {
        uuid: "b-1".to_string(),
        request: "req-1".to_string(),
        source: "WIPAC".to_string(),
        dest: "NERSC".to_string(),
        path: "/data/exp".to_string(),
        files: vec![ManifestFile {
            uuid: "f-1".to_string(),
            logical_name: "/data/exp/file_a.dat".to_string(),
            size: 9,
            sha512: "abc".to_string(),
        }],
        checksum: Some(lta_core::BundleChecksums {
            sha512: "feed".to_string(),
            adler32: "0001".to_string(),
        }),
    };

    let path = dir.path().join("bundle.metadata.json");
    write_manifest(&path, &manifest).unwrap();
    assert_eq!(read_manifest(&path).unwrap(), manifest);
}

#[test]
fn manifest_path_sits_beside_the_archive() {
    assert_eq!(
        manifest_path_for(std::path::Path::new("/outbox/b-1.tar")),
        std::path::Path::new("/outbox/b-1.metadata.json")
    );
}
