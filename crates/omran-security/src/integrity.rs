// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Integrity digests: SHA-256, lowercase hex. Shared by the machine
// fingerprint and the backup checksum gate.

use omran_core::error::OmranError;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Verify that `data` matches the expected SHA-256 hex digest.
///
/// The comparison is exact: an uppercase `expected_hex` does not match.
/// Returns `Err(OmranError::ChecksumMismatch)` carrying both values when
/// the digests differ.
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<(), OmranError> {
    let actual = hash_bytes(data);
    if actual == expected_hex {
        Ok(())
    } else {
        Err(OmranError::ChecksumMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}
