// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the Omran host process.

use thiserror::Error;

/// Top-level error type for all host-process operations.
///
/// Display strings are what the UI receives in a failed bridge reply, so
/// they stay short and free of internal paths where possible.
#[derive(Debug, Error)]
pub enum OmranError {
    // -- Backup writer --
    #[error("invalid backup structure: {0}")]
    InvalidStructure(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("invalid backup id: {0}")]
    InvalidBackupId(String),

    #[error("backup directory not allowed: {0}")]
    DirectoryNotAllowed(String),

    // -- Device identity --
    #[error("machine fingerprint unavailable: {0}")]
    Fingerprint(String),

    #[error("device lock error: {0}")]
    DeviceLock(String),

    // -- Process lifecycle --
    #[error("single-instance arbitration failed: {0}")]
    Instance(String),

    #[error("configuration error: {0}")]
    Config(String),

    // -- Trust boundary --
    #[error("bridge request rejected: {0}")]
    Bridge(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OmranError>;
