// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Omran host process.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OmranError, Result};

/// Identity returned when machine attributes cannot be collected.
pub const UNKNOWN_MACHINE: &str = "unknown-machine";

/// Lock file name inside the per-installation application data directory.
pub const DEVICE_LOCK_FILE: &str = "device.lock.json";

/// Extension of every backup file written by the host.
pub const BACKUP_EXTENSION: &str = "json";

/// Longest backup id the host accepts.
pub const MAX_BACKUP_ID_LEN: usize = 128;

/// Stable identity of the physical machine the host runs on.
///
/// Either a 64-character lowercase hex SHA-256 digest or the
/// [`UNKNOWN_MACHINE`] sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineFingerprint(String);

impl MachineFingerprint {
    /// Wrap an already computed hex digest.
    pub fn from_digest(hex_digest: impl Into<String>) -> Self {
        Self(hex_digest.into())
    }

    /// The sentinel identity used when collection fails.
    pub fn unknown() -> Self {
        Self(UNKNOWN_MACHINE.to_owned())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_MACHINE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MachineFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted single-device lock, one per installation.
///
/// Parsing is strict: `machineId` is required and unknown fields are
/// rejected, so a file of any other shape reads as unparseable rather than
/// as a lock. An empty `machine_id` never triggers a mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeviceLockRecord {
    pub machine_id: String,
    /// RFC 3339 UTC timestamp with millisecond precision.
    #[serde(default)]
    pub created_at: String,
}

impl DeviceLockRecord {
    pub fn new(machine_id: &MachineFingerprint, created_at: DateTime<Utc>) -> Self {
        Self {
            machine_id: machine_id.as_str().to_owned(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Whether this record pins the installation to a different machine.
    pub fn conflicts_with(&self, current: &MachineFingerprint) -> bool {
        !self.machine_id.is_empty() && self.machine_id != current.as_str()
    }
}

/// Result of the startup device-lock check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// Continue starting up.
    Proceed,
    /// The installation is pinned to another machine. The process must exit
    /// without creating a window.
    Mismatch { expected: String, actual: String },
}

impl LockOutcome {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}

/// Allow/deny verdict for a single outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EgressDecision {
    Allow,
    Deny,
}

impl EgressDecision {
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

/// Validated name of a backup file (without extension).
///
/// Ids come from the untrusted UI and become file names, so anything that
/// could escape the backup directory or hide the file is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupId(String);

impl BackupId {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(OmranError::InvalidBackupId("empty".into()));
        }
        if raw.len() > MAX_BACKUP_ID_LEN {
            return Err(OmranError::InvalidBackupId(format!(
                "longer than {MAX_BACKUP_ID_LEN} characters"
            )));
        }
        if raw.starts_with('.') {
            return Err(OmranError::InvalidBackupId(format!("{raw:?} starts with '.'")));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(OmranError::InvalidBackupId(format!(
                "{raw:?} contains {bad:?}"
            )));
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<id>.json`
    pub fn file_name(&self) -> String {
        format!("{}.{BACKUP_EXTENSION}", self.0)
    }
}

impl std::fmt::Display for BackupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
