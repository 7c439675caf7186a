//! Persistence strategy selection.
//!
//! ```text
//! idle ──▶ selecting-backend ──▶ writing ──▶ succeeded
//!                 │                  │
//!                 │ cancelled        │ write error / unavailable
//!                 ▼                  ▼
//!             cancelled        archive backend ──▶ succeeded | failed
//! ```
//!
//! * [`folder`] is tried first whenever a [`DirectoryPicker`] is configured.
//!   Cancelling the picker ends the run; any other problem falls back.
//! * [`archive`] is always available and is the last resort.
//!
//! [`commit`] never returns an error. Everything that goes wrong is logged
//! with the error marker and reported through [`PersistenceOutcome`].

pub mod archive;
pub mod folder;

use crate::log::RunLog;
use crate::pipeline::naming::ConversionUnit;
use folder::{DirectoryPicker, PickError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Which backend produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Folder,
    Archive,
}

/// Terminal status of one persistence run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Cancelled,
    Failed,
}

/// Result of one persistence run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceOutcome {
    pub backend: Backend,
    /// Number of units written (0 unless `status` is `Succeeded`).
    pub written: usize,
    pub status: RunStatus,
    /// Directory (folder backend) or archive path (archive backend).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PersistenceOutcome {
    fn succeeded(backend: Backend, written: usize, location: PathBuf) -> Self {
        Self {
            backend,
            written,
            status: RunStatus::Succeeded,
            location: Some(location),
            error: None,
        }
    }

    fn cancelled() -> Self {
        Self {
            backend: Backend::Folder,
            written: 0,
            status: RunStatus::Cancelled,
            location: None,
            error: None,
        }
    }

    fn failed(backend: Backend, error: String) -> Self {
        Self {
            backend,
            written: 0,
            status: RunStatus::Failed,
            location: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

/// Where and how a run may be persisted.
#[derive(Clone, Copy)]
pub struct Destination<'a> {
    pub picker: Option<&'a dyn DirectoryPicker>,
    pub suggested_folder: Option<&'a str>,
    pub download_dir: &'a Path,
}

/// Persist named units, choosing the backend at runtime.
pub async fn commit(
    units: &[ConversionUnit],
    dest: Destination<'_>,
    log: &mut RunLog,
) -> PersistenceOutcome {
    match dest.picker {
        Some(picker) => {
            match dest.suggested_folder {
                Some(hint) => log.info(format!("Select a folder to save into... (recommended: {hint})")),
                None => log.info("Select a folder to save into..."),
            }
            match picker.pick(dest.suggested_folder).await {
                Ok(dir) => match folder::write_units(&dir, units, log).await {
                    Ok(n) => {
                        log.success(format!("Folder save complete ({n} files)"));
                        return PersistenceOutcome::succeeded(Backend::Folder, n, dir);
                    }
                    Err(e) => {
                        warn!("Folder write failed: {}", e);
                        log.error(&e);
                        log.notice("Folder save failed; switching to ZIP download");
                    }
                },
                Err(PickError::Cancelled) => {
                    info!("Directory selection cancelled");
                    log.info("Save cancelled");
                    return PersistenceOutcome::cancelled();
                }
                Err(PickError::Unavailable(reason)) => {
                    log.notice(format!(
                        "Folder selection unavailable ({reason}); switching to ZIP download"
                    ));
                }
            }
        }
        None => log.notice("Folder selection unavailable; switching to ZIP download"),
    }

    log.info("Compressing ZIP...");
    match archive::save_archive(dest.download_dir, units).await {
        Ok(path) => {
            log.success(format!(
                "{} download complete ({} files)",
                archive::ARCHIVE_FILE_NAME,
                units.len()
            ));
            PersistenceOutcome::succeeded(Backend::Archive, units.len(), path)
        }
        Err(e) => {
            warn!("Archive delivery failed: {}", e);
            log.error(format!("File save failed: {e}"));
            PersistenceOutcome::failed(Backend::Archive, e.to_string())
        }
    }
}
