// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Integrity-checked backup writer.
//
// Every request comes from the untrusted UI. Each step below is a hard
// gate, and nothing touches the final path until all of them pass:
//
//   1. resolve the target directory (confined to the backup roots)
//   2. validate the backup id
//   3. parse the envelope and require `metadata` and `data`
//   4. SHA-256 over the canonical serialization of `data`
//   5. compare with `metadata.checksum`
//   6. write the caller's exact bytes via temp file + rename

use std::fs;
use std::path::{Component, Path, PathBuf};

use omran_core::error::{OmranError, Result};
use omran_core::types::BackupId;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::atomic::StagedFile;
use crate::integrity::verify_hash;

/// Writes validated backup envelopes to disk.
#[derive(Debug, Clone)]
pub struct BackupWriter {
    default_dir: PathBuf,
    roots: Vec<PathBuf>,
    protected: Vec<PathBuf>,
}

impl BackupWriter {
    /// `default_dir` receives backups when the caller names no directory.
    /// A caller-supplied directory must lie inside `default_dir` or one of
    /// `roots`.
    pub fn new(default_dir: impl Into<PathBuf>, roots: Vec<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
            roots,
            protected: Vec::new(),
        }
    }

    /// Never write into `dir` or below it, even when a root contains it.
    pub fn protect(mut self, dir: impl Into<PathBuf>) -> Self {
        self.protected.push(dir.into());
        self
    }

    /// Resolve and create the default backup directory.
    pub fn default_dir(&self) -> PathBuf {
        if let Err(e) = fs::create_dir_all(&self.default_dir) {
            warn!(error = %e, path = %self.default_dir.display(), "could not create default backup directory");
        }
        self.default_dir.clone()
    }

    /// Validate `envelope` and atomically persist it as `<dir>/<id>.json`.
    ///
    /// Returns the final path. On error nothing at the final path has
    /// changed and no temporary file is left behind.
    #[instrument(skip_all, fields(backup_id = id, envelope_len = envelope.len()))]
    pub fn write(&self, id: &str, envelope: &str, target_dir: Option<&str>) -> Result<PathBuf> {
        let dir = self.resolve_dir(target_dir)?;
        let id = BackupId::parse(id)?;

        validate_envelope(envelope)?;

        let path = dir.join(id.file_name());
        let staged = StagedFile::stage(&path, envelope.as_bytes())?;
        staged.commit()?;

        info!(path = %path.display(), "backup written");
        Ok(path)
    }

    fn resolve_dir(&self, requested: Option<&str>) -> Result<PathBuf> {
        let dir = match requested.filter(|d| !d.is_empty()) {
            Some(raw) => self.confine(Path::new(raw))?,
            None => self.default_dir.clone(),
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Reject caller directories that are relative, contain `..`, fall
    /// outside every allowed root, or reach a protected directory. Roots are
    /// matched lexically; protected directories are also matched
    /// case-insensitively and after resolving symlinks.
    fn confine(&self, dir: &Path) -> Result<PathBuf> {
        if !dir.is_absolute() {
            return Err(OmranError::DirectoryNotAllowed(format!(
                "{} is not absolute",
                dir.display()
            )));
        }
        if dir.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(OmranError::DirectoryNotAllowed(format!(
                "{} contains '..'",
                dir.display()
            )));
        }

        let inside = std::iter::once(&self.default_dir)
            .chain(self.roots.iter())
            .any(|root| dir.starts_with(root));
        if !inside {
            return Err(OmranError::DirectoryNotAllowed(format!(
                "{} is outside the backup roots",
                dir.display()
            )));
        }
        if self.is_protected(dir) {
            return Err(OmranError::DirectoryNotAllowed(format!(
                "{} holds host state",
                dir.display()
            )));
        }
        Ok(dir.to_path_buf())
    }

    fn is_protected(&self, dir: &Path) -> bool {
        let real = real_path(dir);
        self.protected.iter().any(|p| {
            starts_with_ignore_case(dir, p) || starts_with_ignore_case(&real, &real_path(p))
        })
    }
}

/// `path` with its longest existing ancestor canonicalized and the
/// not-yet-created tail appended unchanged.
fn real_path(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut tail = Vec::new();
    loop {
        if let Ok(mut real) = fs::canonicalize(existing) {
            real.extend(tail.iter().rev());
            return real;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn starts_with_ignore_case(path: &Path, prefix: &Path) -> bool {
    let fold = |c: Component<'_>| c.as_os_str().to_string_lossy().to_lowercase();
    let mut path = path.components();
    prefix
        .components()
        .all(|p| path.next().is_some_and(|c| fold(c) == fold(p)))
}

/// Structural and checksum gates for an envelope.
pub fn validate_envelope(envelope: &str) -> Result<()> {
    let parsed: Value = serde_json::from_str(envelope)
        .map_err(|e| OmranError::InvalidStructure(format!("not valid JSON: {e}")))?;

    let metadata = parsed
        .get("metadata")
        .filter(|v| is_truthy(v))
        .ok_or_else(|| OmranError::InvalidStructure("missing metadata".into()))?;
    let data = parsed
        .get("data")
        .filter(|v| is_truthy(v))
        .ok_or_else(|| OmranError::InvalidStructure("missing data".into()))?;

    let declared = metadata
        .get("checksum")
        .and_then(Value::as_str)
        .unwrap_or_default();

    verify_hash(canonical_json(data)?.as_bytes(), declared)
}

/// Compact JSON with object keys in document order and numbers printed the
/// way ECMAScript `Number::toString` prints them. This is the form the UI
/// hashes when it builds the envelope.
pub fn canonical_json(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(u), _, _) => out.push_str(&u.to_string()),
            (None, Some(i), _) => out.push_str(&i.to_string()),
            (None, None, Some(f)) => out.push_str(&js_number(f)),
            (None, None, None) => out.push_str(&n.to_string()),
        },
        Value::String(s) => out.push_str(&serde_json::to_string(s)?),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(item, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

/// ECMAScript `Number::toString(10)` for a finite double.
///
/// Rust's `{:e}` yields the shortest round-trip digits; only the layout
/// differs. Positional for exponents in `-7 < e < 21`, exponential with an
/// explicit sign otherwise.
fn js_number(f: f64) -> String {
    if f == 0.0 {
        return "0".to_owned();
    }
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exp: i32 = exp.parse().unwrap_or(0);

    let k = digits.len() as i32;
    let n = exp + 1;
    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{lead}e{sign}{}", (n - 1).abs())
        } else {
            format!("{lead}.{rest}e{sign}{}", (n - 1).abs())
        }
    };

    if f.is_sign_negative() {
        format!("-{body}")
    } else {
        body
    }
}

/// JavaScript truthiness, which the UI's envelope contract is defined in.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
