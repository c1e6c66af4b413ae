// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// omran-security: the privileged side of the trust boundary.
//
// Machine fingerprinting, the single-device lock, single-instance
// arbitration, the egress allowlist, and the integrity-checked atomic
// backup writer. Nothing in this crate is reachable from the rendering
// surface except through `omran-bridge`.

pub mod atomic;
pub mod backup;
pub mod device_lock;
pub mod egress;
pub mod fingerprint;
pub mod instance;
pub mod integrity;

pub use backup::BackupWriter;
pub use device_lock::DeviceLockStore;
pub use egress::EgressFilter;
pub use fingerprint::{FingerprintGenerator, MachineAttributes, MachineProbe, SystemProbe};
pub use instance::{Acquisition, InstanceGuard, SingleInstanceArbiter, WindowHandle};
pub use integrity::{hash_bytes, verify_hash};
