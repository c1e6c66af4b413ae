// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware directory resolution.
//
// The application directory lives under the per-user roaming config root
// (`%APPDATA%`, `~/Library/Application Support`, `$XDG_CONFIG_HOME`), the
// same place desktop shells put per-installation state.

use std::path::{Path, PathBuf};

use directories::{BaseDirs, UserDirs};
use omran_core::error::{OmranError, Result};
use omran_core::types::DEVICE_LOCK_FILE;

pub const APP_DIR_NAME: &str = "OmranApp";
pub const BACKUP_DIR_NAME: &str = "OmranBackups";
pub const CONFIG_FILE: &str = "config.json";

/// Every path the host process touches.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Per-installation state: lock file, instance files, config.
    pub app_dir: PathBuf,
    pub lock_file: PathBuf,
    pub config_file: PathBuf,
    /// `<documents>/OmranBackups`
    pub default_backup_dir: PathBuf,
}

impl AppPaths {
    /// Resolve against the current user's platform directories.
    pub fn resolve() -> Result<Self> {
        let base = BaseDirs::new()
            .ok_or_else(|| OmranError::Config("no home directory for current user".into()))?;
        let documents = UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| base.home_dir().join("Documents"));

        Ok(Self::from_parts(base.config_dir(), &documents))
    }

    /// Build from explicit roots (for testing).
    pub fn from_parts(app_data: &Path, documents: &Path) -> Self {
        let app_dir = app_data.join(APP_DIR_NAME);
        Self {
            lock_file: app_dir.join(DEVICE_LOCK_FILE),
            config_file: app_dir.join(CONFIG_FILE),
            default_backup_dir: documents.join(BACKUP_DIR_NAME),
            app_dir,
        }
    }

    /// Create the application directory. Best effort.
    pub fn ensure_app_dir(&self) {
        if let Err(e) = std::fs::create_dir_all(&self.app_dir) {
            tracing::warn!(error = %e, path = %self.app_dir.display(), "could not create app directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let paths = AppPaths::from_parts(
            Path::new("/home/u/.config"),
            Path::new("/home/u/Documents"),
        );
        assert_eq!(paths.app_dir, Path::new("/home/u/.config/OmranApp"));
        assert_eq!(paths.lock_file, Path::new("/home/u/.config/OmranApp/device.lock.json"));
        assert_eq!(paths.config_file, Path::new("/home/u/.config/OmranApp/config.json"));
        assert_eq!(paths.default_backup_dir, Path::new("/home/u/Documents/OmranBackups"));
    }
}
