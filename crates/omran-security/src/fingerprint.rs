// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Machine fingerprint: a SHA-256 digest over stable local attributes.
//
// Attribute order is fixed: hostname, CPU architecture, OS platform, OS
// release, user name, then hardware interface addresses. Addresses are
// sorted before hashing because interface enumeration order is not stable
// across OS updates or driver reloads.

use omran_core::error::{OmranError, Result};
use omran_core::types::MachineFingerprint;
use sysinfo::{Networks, System};
use tracing::{debug, warn};

use crate::integrity::hash_bytes;

/// Separator between attributes in the hashed source string.
const DELIMITER: &str = "|";

/// Address reported for interfaces without hardware (loopback, tunnels).
const PLACEHOLDER_MAC: &str = "00:00:00:00:00:00";

/// Raw machine attributes a fingerprint is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineAttributes {
    pub hostname: String,
    pub arch: String,
    pub platform: String,
    pub release: String,
    pub username: String,
    pub mac_addresses: Vec<String>,
}

impl MachineAttributes {
    /// The exact string that gets hashed.
    pub fn fingerprint_source(&self) -> String {
        let mut macs: Vec<String> = self
            .mac_addresses
            .iter()
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty() && m != PLACEHOLDER_MAC)
            .collect();
        macs.sort();
        macs.dedup();

        let mut parts = vec![
            self.hostname.as_str(),
            self.arch.as_str(),
            self.platform.as_str(),
            self.release.as_str(),
            self.username.as_str(),
        ];
        parts.extend(macs.iter().map(String::as_str));
        parts.join(DELIMITER)
    }
}

/// Source of machine attributes.
pub trait MachineProbe: Send + Sync {
    fn probe(&self) -> Result<MachineAttributes>;
}

/// Reads attributes from the running system.
pub struct SystemProbe;

impl MachineProbe for SystemProbe {
    fn probe(&self) -> Result<MachineAttributes> {
        let hostname = System::host_name()
            .ok_or_else(|| OmranError::Fingerprint("hostname unavailable".into()))?;
        let release = System::kernel_version()
            .ok_or_else(|| OmranError::Fingerprint("OS release unavailable".into()))?;
        let username = whoami::fallible::username()
            .map_err(|e| OmranError::Fingerprint(format!("user name unavailable: {e}")))?;

        let networks = Networks::new_with_refreshed_list();
        let mac_addresses = networks
            .list()
            .values()
            .map(|data| data.mac_address())
            .filter(|mac| !mac.is_unspecified())
            .map(|mac| mac.to_string())
            .collect();

        Ok(MachineAttributes {
            hostname,
            arch: std::env::consts::ARCH.to_owned(),
            platform: std::env::consts::OS.to_owned(),
            release,
            username,
            mac_addresses,
        })
    }
}

/// Derives the [`MachineFingerprint`] of the current machine.
pub struct FingerprintGenerator {
    probe: Box<dyn MachineProbe>,
}

impl Default for FingerprintGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintGenerator {
    pub fn new() -> Self {
        Self::with_probe(SystemProbe)
    }

    pub fn with_probe(probe: impl MachineProbe + 'static) -> Self {
        Self {
            probe: Box::new(probe),
        }
    }

    /// Compute the fingerprint. Never fails: a probe error is logged and
    /// the `unknown-machine` sentinel is returned instead.
    pub fn compute(&self) -> MachineFingerprint {
        match self.probe.probe() {
            Ok(attrs) => {
                let digest = hash_bytes(attrs.fingerprint_source().as_bytes());
                debug!(interfaces = attrs.mac_addresses.len(), "machine fingerprint computed");
                MachineFingerprint::from_digest(digest)
            }
            Err(e) => {
                warn!(error = %e, "machine attributes unavailable, using sentinel identity");
                MachineFingerprint::unknown()
            }
        }
    }
}

/// Fingerprint of the current machine using the system probe.
pub fn compute() -> MachineFingerprint {
    FingerprintGenerator::new().compute()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(MachineAttributes);

    impl MachineProbe for FixedProbe {
        fn probe(&self) -> Result<MachineAttributes> {
            Ok(self.0.clone())
        }
    }

    struct FailingProbe;

    impl MachineProbe for FailingProbe {
        fn probe(&self) -> Result<MachineAttributes> {
            Err(OmranError::Fingerprint("no interfaces".into()))
        }
    }

    fn attrs(macs: &[&str]) -> MachineAttributes {
        MachineAttributes {
            hostname: "till-01".into(),
            arch: "x86_64".into(),
            platform: "linux".into(),
            release: "6.8.0-45-generic".into(),
            username: "cashier".into(),
            mac_addresses: macs.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn source_string_has_fixed_order() {
        let a = attrs(&["aa:bb:cc:dd:ee:ff", "00:00:00:00:00:00", "11:22:33:44:55:66"]);
        assert_eq!(
            a.fingerprint_source(),
            "till-01|x86_64|linux|6.8.0-45-generic|cashier|11:22:33:44:55:66|aa:bb:cc:dd:ee:ff"
        );
    }

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        let a = attrs(&["aa:bb:cc:dd:ee:ff"]);
        let fp = FingerprintGenerator::with_probe(FixedProbe(a.clone())).compute();
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(fp.as_str(), hash_bytes(a.fingerprint_source().as_bytes()));
    }

    #[test]
    fn interface_order_does_not_matter() {
        let a = FingerprintGenerator::with_probe(FixedProbe(attrs(&[
            "aa:bb:cc:dd:ee:ff",
            "11:22:33:44:55:66",
        ])))
        .compute();
        let b = FingerprintGenerator::with_probe(FixedProbe(attrs(&[
            "11:22:33:44:55:66",
            "AA:BB:CC:DD:EE:FF",
            "11:22:33:44:55:66",
        ])))
        .compute();
        assert_eq!(a, b);
    }

    #[test]
    fn different_attributes_differ() {
        let a = FingerprintGenerator::with_probe(FixedProbe(attrs(&[]))).compute();
        let mut other = attrs(&[]);
        other.username = "manager".into();
        let b = FingerprintGenerator::with_probe(FixedProbe(other)).compute();
        assert_ne!(a, b);
    }

    #[test]
    fn probe_failure_yields_sentinel() {
        let fp = FingerprintGenerator::with_probe(FailingProbe).compute();
        assert!(fp.is_unknown());
    }

    #[test]
    fn system_fingerprint_is_deterministic() {
        assert_eq!(compute(), compute());
    }
}
