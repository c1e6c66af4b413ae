// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-device lock. The first successful start pins the installation to
// the machine's fingerprint; later starts on a different machine are
// refused.
//
// A confirmed mismatch is fatal, but an unreadable lock is not: read and
// parse errors are logged and startup continues without rewriting the
// file. Write errors on first run are likewise logged and ignored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use omran_core::error::{OmranError, Result};
use omran_core::types::{DeviceLockRecord, LockOutcome, MachineFingerprint};
use tracing::{error, info, instrument, warn};

use crate::atomic::write_atomic;

/// Reads and writes the per-installation `device.lock.json`.
pub struct DeviceLockStore {
    path: PathBuf,
}

impl DeviceLockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the startup check against `current`. Call once, before any
    /// window exists.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn initialize(&self, current: &MachineFingerprint) -> LockOutcome {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(error = %e, "could not create lock directory");
            }
        }

        match self.read() {
            Ok(Some(record)) => {
                if record.conflicts_with(current) {
                    error!("device lock belongs to another machine");
                    LockOutcome::Mismatch {
                        expected: record.machine_id,
                        actual: current.as_str().to_owned(),
                    }
                } else {
                    LockOutcome::Proceed
                }
            }
            Ok(None) => {
                match self.create(current) {
                    Ok(()) => info!("device lock created"),
                    Err(e) => warn!(error = %e, "could not write device lock"),
                }
                LockOutcome::Proceed
            }
            Err(e) => {
                warn!(error = %e, "device lock unreadable, skipping check");
                LockOutcome::Proceed
            }
        }
    }

    /// The stored record, or `None` if no lock file exists.
    pub fn read(&self) -> Result<Option<DeviceLockRecord>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(OmranError::DeviceLock(format!("read failed: {e}"))),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| OmranError::DeviceLock(format!("parse failed: {e}")))
    }

    fn create(&self, current: &MachineFingerprint) -> Result<()> {
        let record = DeviceLockRecord::new(current, Utc::now());
        let json = serde_json::to_string_pretty(&record)?;
        write_atomic(&self.path, json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omran_core::types::DEVICE_LOCK_FILE;

    fn store(dir: &Path) -> DeviceLockStore {
        DeviceLockStore::new(dir.join("OmranApp").join(DEVICE_LOCK_FILE))
    }

    #[test]
    fn first_run_creates_lock() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let current = MachineFingerprint::from_digest("def456");

        assert_eq!(store.initialize(&current), LockOutcome::Proceed);

        let record = store.read().unwrap().expect("lock written");
        assert_eq!(record.machine_id, "def456");
        assert!(record.created_at.ends_with('Z'));
    }

    #[test]
    fn same_machine_proceeds_and_keeps_record() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let current = MachineFingerprint::from_digest("def456");

        store.initialize(&current);
        let before = fs::read_to_string(store.path()).unwrap();
        assert_eq!(store.initialize(&current), LockOutcome::Proceed);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn other_machine_is_a_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            r#"{"machineId":"abc123","createdAt":"2026-01-01T00:00:00.000Z"}"#,
        )
        .unwrap();

        let outcome = store.initialize(&MachineFingerprint::from_digest("def456"));
        assert_eq!(
            outcome,
            LockOutcome::Mismatch {
                expected: "abc123".into(),
                actual: "def456".into(),
            }
        );
    }

    /// Corrupt lock files fail open: the check is skipped and the file is
    /// left exactly as found.
    #[test]
    fn corrupt_lock_fails_open_without_rewrite() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        let outcome = store.initialize(&MachineFingerprint::from_digest("def456"));
        assert_eq!(outcome, LockOutcome::Proceed);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{not json");
        assert!(store.read().is_err());
    }

    #[test]
    fn record_without_machine_id_proceeds() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"createdAt":"2026-01-01T00:00:00.000Z"}"#).unwrap();

        let outcome = store.initialize(&MachineFingerprint::from_digest("def456"));
        assert_eq!(outcome, LockOutcome::Proceed);
        assert!(store.read().is_err());
    }

    #[test]
    fn unwritable_location_still_proceeds() {
        let tmp = tempfile::tempdir().unwrap();
        // Parent "directory" is a regular file, so neither mkdir nor the
        // write can succeed.
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = DeviceLockStore::new(blocker.join(DEVICE_LOCK_FILE));

        let outcome = store.initialize(&MachineFingerprint::from_digest("def456"));
        assert_eq!(outcome, LockOutcome::Proceed);
    }
}
