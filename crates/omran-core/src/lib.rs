// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Omran: core types, errors, and configuration shared by the host crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, RunMode, WindowConfig};
pub use error::OmranError;
pub use types::*;
