// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Crash-safe file replacement: write a unique temporary file beside the
// target, fsync it, then rename it over the target. Readers see either the
// previous complete file or the new complete file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

/// A fully written temporary file that has not yet replaced its target.
///
/// Dropping it without [`StagedFile::commit`] removes the temporary file.
pub struct StagedFile {
    tmp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Write `bytes` to a fresh temporary file in the target's directory.
    pub fn stage(target: &Path, bytes: &[u8]) -> io::Result<Self> {
        let tmp = temp_path_for(target)?;
        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .and_then(|mut file| {
                file.write_all(bytes)?;
                file.sync_all()
            });

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        Ok(Self {
            tmp,
            target: target.to_path_buf(),
            committed: false,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.tmp
    }

    /// Atomically move the temporary file over the target.
    pub fn commit(mut self) -> io::Result<()> {
        fs::rename(&self.tmp, &self.target)?;
        self.committed = true;
        sync_parent(&self.target);
        debug!(path = %self.target.display(), "atomic replace committed");
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

/// Replace `target` with `bytes` in one step.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    StagedFile::stage(target, bytes)?.commit()
}

/// `<dir>/.<name>.<pid>.<uuid>.tmp`, unique per call so that concurrent
/// writers to the same target never share a temporary file.
fn temp_path_for(target: &Path) -> io::Result<PathBuf> {
    let name = target.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", target.display()),
        )
    })?;
    Ok(target.with_file_name(format!(
        ".{}.{}.{}.tmp",
        name.to_string_lossy(),
        std::process::id(),
        uuid::Uuid::new_v4().as_simple()
    )))
}

/// Persist the rename itself. Best effort; only meaningful on Unix.
fn sync_parent(target: &Path) {
    #[cfg(unix)]
    {
        if let Some(Ok(dir)) = target.parent().map(fs::File::open) {
            let _ = dir.sync_all();
        }
    }
    #[cfg(not(unix))]
    let _ = target;
}
