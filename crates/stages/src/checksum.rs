// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming SHA-512 + ADLER-32 of on-disk artifacts.
//!
//! Both digests are computed in a single pass; bundles can be hundreds of
//! gigabytes and get checksummed at least three times across the pipeline
//! (bundler, site-move verifier, tape verifier).

use lta_core::BundleChecksums;
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 256 * 1024;

/// Checksum a file, returning the digests and the byte count.
pub fn checksum_file(path: &Path) -> io::Result<(BundleChecksums, u64)> {
    let mut file = File::open(path)?;
    let mut sha = Sha512::new();
    let mut adler = adler32::RollingAdler32::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        sha.update(&buffer[..n]);
        adler.update_buffer(&buffer[..n]);
        total += n as u64;
    }

    Ok((
        BundleChecksums {
            sha512: hex::encode(sha.finalize()),
            adler32: format!("{:08x}", adler.hash()),
        },
        total,
    ))
}

/// SHA-512 only, for per-file manifest entries.
pub fn sha512_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut sha = Sha512::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        sha.update(&buffer[..n]);
    }
    Ok(hex::encode(sha.finalize()))
}

#[cfg(test)]
#[path = "checksum_tests.rs"]
mod tests;
