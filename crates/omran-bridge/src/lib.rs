// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// omran-bridge: the single chokepoint between the rendering context and the
// host process.
//
// `traits` defines the three permitted operations, `host` implements them
// over omran-security, and `ipc` decodes page-script messages into calls.

pub mod host;
pub mod ipc;
pub mod traits;

pub use host::HostBridge;
pub use ipc::{BridgeReply, BridgeRequest, dispatch, dispatch_str};
pub use traits::{PrivilegedBridge, SaveBackupResponse};
