// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{OmranError, Result};

/// Selects the development or production egress policy and UI source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    /// Development for debug builds, production for release builds.
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl std::str::FromStr for RunMode {
    type Err = OmranError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(OmranError::Config(format!("unknown run mode {other:?}"))),
        }
    }
}

/// Main window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub width: f64,
    pub height: f64,
    pub min_width: f64,
    pub min_height: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            min_width: 800.0,
            min_height: 600.0,
        }
    }
}

/// Host settings, read from `config.json` and then overridden from the
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Egress policy and UI source selection.
    pub mode: RunMode,
    /// Module script that boots the UI from the dev server. Development only.
    pub dev_entry: String,
    /// Module script that boots the bundled UI. Production only.
    pub ui_entry: String,
    /// Extra directories a caller-supplied backup directory may sit in,
    /// besides the default backup directory. Empty by default.
    pub backup_roots: Vec<PathBuf>,
    pub window: WindowConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::from_build(),
            dev_entry: "http://localhost:5173/src/main.tsx".into(),
            ui_entry: "dist/index.js".into(),
            backup_roots: Vec::new(),
            window: WindowConfig::default(),
        }
    }
}

/// Environment variable selecting [`RunMode`].
pub const ENV_MODE: &str = "OMRAN_ENV";
/// Environment variable replacing [`AppConfig::backup_roots`] (platform path list).
pub const ENV_BACKUP_ROOTS: &str = "OMRAN_BACKUP_ROOTS";

impl AppConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides with a custom lookup (for testing).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_MODE) {
            self.mode = mode.parse()?;
        }
        if let Some(roots) = lookup(ENV_BACKUP_ROOTS) {
            self.backup_roots = std::env::split_paths(&roots)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        Ok(())
    }

    /// The module script the main window boots the UI from.
    pub fn ui_source(&self) -> &str {
        match self.mode {
            RunMode::Development => &self.dev_entry,
            RunMode::Production => &self.ui_entry,
        }
    }
}
