// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Services handed to the Dioxus root component as context.
//
// The bridge is `Sync` and shared by `Arc`. The activation receiver is
// taken exactly once by the window task, so it sits behind a `Mutex<Option<_>>`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use omran_bridge::HostBridge;
use omran_core::AppConfig;
use omran_security::{BackupWriter, FingerprintGenerator};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use super::data_dir::AppPaths;

#[derive(Clone)]
pub struct AppServices {
    bridge: Arc<HostBridge>,
    activations: Arc<Mutex<Option<UnboundedReceiver<()>>>>,
    port_file: PathBuf,
}

impl AppServices {
    /// Backups go to the default directory or below an explicitly
    /// configured root. The application directory is never writable
    /// through the bridge.
    pub fn new(
        paths: &AppPaths,
        config: &AppConfig,
        fingerprint: FingerprintGenerator,
        activations: UnboundedReceiver<()>,
        port_file: PathBuf,
    ) -> Self {
        let writer = BackupWriter::new(
            paths.default_backup_dir.clone(),
            config.backup_roots.clone(),
        )
        .protect(paths.app_dir.clone());

        Self {
            bridge: Arc::new(HostBridge::new(fingerprint, writer)),
            activations: Arc::new(Mutex::new(Some(activations))),
            port_file,
        }
    }

    pub fn bridge(&self) -> Arc<HostBridge> {
        Arc::clone(&self.bridge)
    }

    /// Remove the activation port file. Called when the main window goes
    /// away, since the desktop event loop exits the process without
    /// unwinding `main`.
    pub fn release_instance(&self) {
        match std::fs::remove_file(&self.port_file) {
            Ok(()) => debug!(path = %self.port_file.display(), "instance port file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "could not remove instance port file"),
        }
    }

    /// Hand out the activation receiver. Returns `None` after the first call.
    pub fn take_activations(&self) -> Option<UnboundedReceiver<()>> {
        match self.activations.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Read `config.json` (if any), then apply environment overrides.
///
/// A malformed file or override is logged and skipped; startup never fails
/// on configuration alone.
pub fn load_config(config_file: &Path) -> AppConfig {
    let mut config = match std::fs::read_to_string(config_file) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(config) => {
                info!(path = %config_file.display(), "loaded config");
                config
            }
            Err(e) => {
                warn!(path = %config_file.display(), error = %e, "malformed config, using defaults");
                AppConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(e) => {
            warn!(path = %config_file.display(), error = %e, "unreadable config, using defaults");
            AppConfig::default()
        }
    };

    if let Err(e) = config.apply_env() {
        warn!(error = %e, "ignoring environment override");
    }
    config
}
