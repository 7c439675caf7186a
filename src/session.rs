//! The pipeline orchestrator.
//!
//! A [`ScanSession`] owns the one registered [`InputFile`], the run log and
//! the pipeline state. `save` drives a full run:
//!
//! ```text
//! Idle ──save──▶ Converting ──▶ Persisting ──▶ Done   (succeeded / cancelled)
//!                                         └──▶ Failed (archive error)
//! ```
//!
//! Every method takes `&mut self`, so a session is driven by one task at a
//! time and needs no locking. A run can be started again from any terminal
//! state without a reset.

use crate::config::{LaunchConfig, SessionConfig};
use crate::convert::{convert, ConvertProgress};
use crate::engine;
use crate::error::ScanError;
use crate::launch::{self, LaunchOutcome, ProtocolOpener};
use crate::log::RunLog;
use crate::persist::{self, Destination, PersistenceOutcome, RunStatus};
use crate::pipeline::input::{format_file_size, InputFile, InputKind};
use crate::pipeline::naming::{PendingUnit, SequenceNamer, UnitOrigin};
use crate::pipeline::render::PdfRasterizer;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a session is in its save cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    #[default]
    Idle,
    Converting,
    Persisting,
    Done,
    Failed,
}

/// One user's scan workspace: at most one input, its log, its state.
#[derive(Debug)]
pub struct ScanSession {
    config: SessionConfig,
    input: Option<InputFile>,
    state: PipelineState,
    log: RunLog,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl ScanSession {
    pub fn new(config: SessionConfig) -> Self {
        let log = RunLog::new(config.observer.clone());
        Self {
            config,
            input: None,
            state: PipelineState::Idle,
            log,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The registered file, if any.
    pub fn input(&self) -> Option<&InputFile> {
        self.input.as_ref()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    // ── Input slot ───────────────────────────────────────────────────────

    /// Register `file`, replacing any previous one.
    ///
    /// An unsupported file is rejected and the current registration is
    /// left untouched.
    pub fn register(&mut self, file: InputFile) -> Result<(), ScanError> {
        if file.kind() == InputKind::Unsupported {
            self.log.error(format!("Unsupported file: {}", file.name()));
            return Err(ScanError::UnsupportedFormat {
                name: file.name().to_string(),
            });
        }

        self.log.info(format!(
            "Registered {} ({})",
            file.name(),
            format_file_size(file.size())
        ));
        if let Some(previous) = self.input.replace(file) {
            info!("Replaced previously registered '{}'", previous.name());
        }
        self.state = PipelineState::Idle;
        Ok(())
    }

    /// Read a file from disk and register it.
    pub async fn register_path(
        &mut self,
        path: impl AsRef<Path>,
        media_type: Option<String>,
    ) -> Result<(), ScanError> {
        match InputFile::from_path(path, media_type).await {
            Ok(file) => self.register(file),
            Err(e) => {
                self.log.error(&e);
                Err(e)
            }
        }
    }

    /// Register the first of several dropped files.
    ///
    /// Only one file is accepted at a time; extra files are ignored with a
    /// notice. An empty drop does nothing.
    pub fn register_dropped(&mut self, files: Vec<InputFile>) -> Result<(), ScanError> {
        let count = files.len();
        let Some(first) = files.into_iter().next() else {
            return Ok(());
        };
        if count > 1 {
            self.log.notice(format!(
                "Only one file can be registered; using {} and ignoring {} more",
                first.name(),
                count - 1
            ));
        }
        self.register(first)
    }

    /// Clear the input slot, returning the removed file.
    pub fn remove_input(&mut self) -> Option<InputFile> {
        let removed = self.input.take();
        if let Some(ref file) = removed {
            self.log.info(format!("Removed {}", file.name()));
            self.state = PipelineState::Idle;
        }
        removed
    }

    /// Back to a fresh session: no input, empty log, `Idle`.
    pub fn reset(&mut self) {
        self.input = None;
        self.log.clear();
        self.state = PipelineState::Idle;
        info!("Session reset");
    }

    // ── Save ─────────────────────────────────────────────────────────────

    /// Convert the registered file and persist the result.
    ///
    /// # Errors
    /// `ScanError::NoInput` when nothing is registered; state and log are
    /// left unchanged. Every other problem is reported through the returned
    /// [`PersistenceOutcome`] and the log.
    pub async fn save(&mut self) -> Result<PersistenceOutcome, ScanError> {
        let Some(input) = self.input.as_ref() else {
            return Err(ScanError::NoInput);
        };

        // ── Convert ──────────────────────────────────────────────────────
        self.state = PipelineState::Converting;
        self.log.info("Starting PNG conversion...");
        match input.kind() {
            InputKind::PdfDocument => self.log.info(format!("Converting PDF: {}", input.name())),
            _ => self.log.info(format!("Converting to PNG: {}", input.name())),
        }

        let rasterizer = match input.kind() {
            InputKind::PdfDocument => pdf_engine(self.config.rasterizer.as_ref()).await,
            _ => None,
        };

        let results = {
            let log = &mut self.log;
            let mut on_progress = |p: ConvertProgress| match p {
                ConvertProgress::PageCount(_) => log.info(p.to_string()),
                ConvertProgress::PageDone { .. } => log.success(p.to_string()),
            };
            convert(input, rasterizer, Some(&mut on_progress)).await
        };
        let results = match results {
            Ok(r) => r,
            Err(e) => {
                self.log.error(&e);
                self.state = PipelineState::Failed;
                return Err(e);
            }
        };

        let mut pending = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(unit) => pending.push(unit),
                Err(e) => {
                    warn!("Substituting original bytes: {}", e);
                    self.log.error(&e);
                    pending.push(PendingUnit::fallback(
                        input.bytes().to_vec(),
                        input.fallback_extension(),
                    ));
                }
            }
        }

        // ── Name ─────────────────────────────────────────────────────────
        let mut namer = SequenceNamer::new(input.stem());
        let units = namer.assign_all(pending);
        for unit in &units {
            match unit.origin {
                UnitOrigin::PassThrough => self.log.success(format!(
                    "Conversion complete: {} (original PNG: {})",
                    unit.name,
                    input.name()
                )),
                UnitOrigin::Reencoded => self.log.success(format!(
                    "Conversion complete: {} ({} → PNG)",
                    unit.name,
                    input.name()
                )),
                UnitOrigin::PdfPage(_) | UnitOrigin::Fallback => {}
            }
        }
        self.log
            .success(format!("Conversion complete: {} files total", namer.issued()));

        // ── Persist ──────────────────────────────────────────────────────
        self.state = PipelineState::Persisting;
        let dest = Destination {
            picker: self.config.picker.as_deref(),
            suggested_folder: self.config.suggested_folder.as_deref(),
            download_dir: &self.config.download_dir,
        };
        let outcome = persist::commit(&units, dest, &mut self.log).await;

        self.state = match outcome.status {
            RunStatus::Succeeded | RunStatus::Cancelled => PipelineState::Done,
            RunStatus::Failed => PipelineState::Failed,
        };
        info!(
            "Save finished: {:?} via {:?}, {} files",
            outcome.status, outcome.backend, outcome.written
        );
        Ok(outcome)
    }

    // ── Login ────────────────────────────────────────────────────────────

    /// Hand a login off to the registered protocol handler, logging into
    /// this session's run log. Credentials are not retained.
    pub async fn trigger_login(
        &mut self,
        employee_id: &str,
        password: &str,
        config: &LaunchConfig,
        opener: &dyn ProtocolOpener,
    ) -> Result<LaunchOutcome, ScanError> {
        launch::trigger_login(employee_id, password, config, opener, &mut self.log).await
    }
}

/// The injected rasterizer, or the shared pdfium engine.
async fn pdf_engine(configured: Option<&Arc<dyn PdfRasterizer>>) -> Option<Arc<dyn PdfRasterizer>> {
    if let Some(r) = configured {
        return Some(Arc::clone(r));
    }
    if !engine::is_initialized() {
        info!("Binding pdfium for the first PDF of this process");
    }
    match engine::shared_rasterizer().await {
        Ok(r) => Some(r),
        Err(e) => {
            warn!("PDF engine unavailable: {}", e);
            None
        }
    }
}
