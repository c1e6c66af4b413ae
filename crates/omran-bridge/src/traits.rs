// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The capability surface offered to the rendering context.
//
// Exactly three one-shot operations. No file reads, no arbitrary writes,
// no process control, no environment access.

use serde::{Deserialize, Serialize};

/// Operations the untrusted UI may request from the host process.
///
/// Implementations must not let failures escape as panics: every error is
/// folded into the return value.
pub trait PrivilegedBridge: Send + Sync {
    /// Fingerprint of this machine (or the `unknown-machine` sentinel).
    fn get_machine_id(&self) -> String;

    /// Default backup directory, created if absent.
    fn get_default_backup_dir(&self) -> String;

    /// Validate and atomically persist a backup envelope.
    fn save_backup(&self, backup_id: &str, json: &str, dir: Option<&str>) -> SaveBackupResponse;
}

/// Result of [`PrivilegedBridge::save_backup`] as the UI sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveBackupResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveBackupResponse {
    pub fn saved(path: impl Into<String>) -> Self {
        Self {
            success: true,
            path: Some(path.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            path: None,
            error: Some(error.into()),
        }
    }
}
