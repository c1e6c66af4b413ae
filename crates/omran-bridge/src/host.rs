// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host-side implementation of the privileged bridge.

use omran_security::{BackupWriter, FingerprintGenerator};
use tracing::{info, warn};

use crate::traits::{PrivilegedBridge, SaveBackupResponse};

/// Bridge backed by the real fingerprint generator and backup writer.
pub struct HostBridge {
    fingerprint: FingerprintGenerator,
    writer: BackupWriter,
}

impl HostBridge {
    pub fn new(fingerprint: FingerprintGenerator, writer: BackupWriter) -> Self {
        Self {
            fingerprint,
            writer,
        }
    }
}

impl PrivilegedBridge for HostBridge {
    fn get_machine_id(&self) -> String {
        self.fingerprint.compute().to_string()
    }

    fn get_default_backup_dir(&self) -> String {
        self.writer.default_dir().display().to_string()
    }

    fn save_backup(&self, backup_id: &str, json: &str, dir: Option<&str>) -> SaveBackupResponse {
        match self.writer.write(backup_id, json, dir) {
            Ok(path) => {
                info!(backup_id, "backup saved via bridge");
                SaveBackupResponse::saved(path.display().to_string())
            }
            Err(e) => {
                warn!(backup_id, error = %e, "backup rejected");
                SaveBackupResponse::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omran_core::error::Result;
    use omran_security::fingerprint::{MachineAttributes, MachineProbe};
    use omran_security::hash_bytes;
    use std::path::Path;

    struct FixedProbe;

    impl MachineProbe for FixedProbe {
        fn probe(&self) -> Result<MachineAttributes> {
            Ok(MachineAttributes {
                hostname: "till-01".into(),
                arch: "aarch64".into(),
                platform: "macos".into(),
                release: "24.1.0".into(),
                username: "owner".into(),
                mac_addresses: vec!["aa:bb:cc:dd:ee:ff".into()],
            })
        }
    }

    fn bridge(root: &Path) -> HostBridge {
        HostBridge::new(
            FingerprintGenerator::with_probe(FixedProbe),
            BackupWriter::new(root.join("OmranBackups"), vec![root.to_path_buf()]),
        )
    }

    #[test]
    fn machine_id_is_stable() {
        let tmp = tempfile::tempdir().unwrap();
        let bridge = bridge(tmp.path());
        assert_eq!(bridge.get_machine_id(), bridge.get_machine_id());
        assert_eq!(
            bridge.get_machine_id(),
            hash_bytes(b"till-01|aarch64|macos|24.1.0|owner|aa:bb:cc:dd:ee:ff")
        );
    }

    #[test]
    fn default_dir_is_created_and_returned() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = bridge(tmp.path()).get_default_backup_dir();
        assert!(Path::new(&dir).is_dir());
        assert!(dir.ends_with("OmranBackups"));
    }

    #[test]
    fn save_failure_is_a_structured_response() {
        let tmp = tempfile::tempdir().unwrap();
        let response = bridge(tmp.path()).save_backup("b", "{oops", None);
        assert!(!response.success);
        assert!(response.path.is_none());
        assert!(response.error.unwrap().starts_with("invalid backup structure"));
    }

    #[test]
    fn save_success_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let checksum = hash_bytes(br#"{"a":1}"#);
        let json = format!(r#"{{"metadata":{{"checksum":"{checksum}"}},"data":{{"a":1}}}}"#);

        let response = bridge(tmp.path()).save_backup("b", &json, None);
        assert!(response.success, "{response:?}");
        let path = response.path.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), json);
    }
}
