//! Folder backend: let the user pick a directory, then write each unit
//! into it as an individual file.
//!
//! Picking a directory is the one interactive, cancellable step of a save.
//! It sits behind [`DirectoryPicker`] so the library works the same with a
//! fixed directory (CLI `--out-dir`), a native dialog (`dialog` feature), or
//! a test double.

use crate::error::ScanError;
use crate::log::RunLog;
use crate::pipeline::naming::ConversionUnit;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Why no directory was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    /// The user dismissed the picker. Terminal for the run.
    #[error("Directory selection was cancelled")]
    Cancelled,

    /// The capability exists but could not be used; the run falls back to
    /// the archive.
    #[error("Directory selection unavailable: {0}")]
    Unavailable(String),
}

/// Supplies a writable directory for the folder backend.
#[async_trait]
pub trait DirectoryPicker: Send + Sync {
    /// Ask for a directory. `suggested` is a hint the picker may show or
    /// start in; it is never created or required.
    async fn pick(&self, suggested: Option<&str>) -> Result<PathBuf, PickError>;
}

/// Always returns the same directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct FixedDirectory {
    dir: PathBuf,
}

impl FixedDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DirectoryPicker for FixedDirectory {
    async fn pick(&self, _suggested: Option<&str>) -> Result<PathBuf, PickError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PickError::Unavailable(format!("{}: {}", self.dir.display(), e)))?;
        Ok(self.dir.clone())
    }
}

/// Whether a native folder dialog can be shown in this process.
///
/// Windows and macOS always have one. Elsewhere a display server is
/// required: `WAYLAND_DISPLAY` or `DISPLAY` must be set and non-empty.
pub fn dialog_backend_available() -> bool {
    display_present(|key| std::env::var_os(key))
}

fn display_present(lookup: impl Fn(&str) -> Option<OsString>) -> bool {
    if cfg!(any(target_os = "windows", target_os = "macos")) {
        return true;
    }
    ["WAYLAND_DISPLAY", "DISPLAY"]
        .iter()
        .any(|key| lookup(*key).is_some_and(|v| !v.is_empty()))
}

/// Native folder dialog.
///
/// Without a usable dialog backend the pick is [`PickError::Unavailable`];
/// `Cancelled` is reserved for a dialog the user actually dismissed.
#[cfg(feature = "dialog")]
#[derive(Debug, Clone, Default)]
pub struct DialogPicker {
    title: Option<String>,
}

#[cfg(feature = "dialog")]
impl DialogPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[cfg(feature = "dialog")]
#[async_trait]
impl DirectoryPicker for DialogPicker {
    async fn pick(&self, suggested: Option<&str>) -> Result<PathBuf, PickError> {
        if !dialog_backend_available() {
            return Err(PickError::Unavailable(
                "no display server for a folder dialog".to_string(),
            ));
        }
        let mut dialog = rfd::AsyncFileDialog::new();
        if let Some(title) = &self.title {
            dialog = dialog.set_title(title.as_str());
        }
        if let Some(dir) = suggested.map(Path::new).filter(|p| p.is_dir()) {
            dialog = dialog.set_directory(dir);
        }
        dialog
            .pick_folder()
            .await
            .map(|handle| handle.path().to_path_buf())
            .ok_or(PickError::Cancelled)
    }
}

/// Write every unit into `dir` in sequence order, overwriting same-named
/// files. One `Saved <name>` log line per file.
///
/// Stops at the first failure; files written before it stay on disk.
pub async fn write_units(
    dir: &Path,
    units: &[ConversionUnit],
    log: &mut RunLog,
) -> Result<usize, ScanError> {
    for unit in units {
        let path = dir.join(&unit.name);
        tokio::fs::write(&path, &unit.bytes)
            .await
            .map_err(|source| ScanError::OutputWriteFailed {
                path: path.clone(),
                source,
            })?;
        debug!(
            "Wrote {} from '{}' ({} bytes)",
            path.display(),
            unit.label,
            unit.bytes.len()
        );
        log.success(format!("Saved {}", unit.name));
    }
    info!("Wrote {} files to {}", units.len(), dir.display());
    Ok(units.len())
}
