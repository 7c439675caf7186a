//! Configuration types for scan sessions and the login trigger.
//!
//! Everything a [`crate::session::ScanSession`] needs from its host is
//! injected through [`SessionConfig`]: where archives are delivered, whether
//! a directory picker exists, which PDF engine to use and who observes the
//! run log. Build it with [`SessionConfig::builder()`] or take
//! [`SessionConfig::default()`] (archive-only, shared pdfium engine, no
//! observer).

use crate::error::ScanError;
use crate::log::LogObserver;
use crate::persist::folder::DirectoryPicker;
use crate::pipeline::render::PdfRasterizer;
use protocol_setup::DEFAULT_PROTOCOL;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Folder suggested to the user when a picker is shown.
pub const DEFAULT_SUGGESTED_FOLDER: &str = r"C:\ScanKBB\scan";

/// Configuration for a [`crate::session::ScanSession`].
///
/// # Example
/// ```rust
/// use scan2png::{FixedDirectory, SessionConfig};
/// use std::sync::Arc;
///
/// let config = SessionConfig::builder()
///     .picker(Arc::new(FixedDirectory::new("./scan")))
///     .download_dir("./downloads")
///     .build()
///     .unwrap();
/// assert!(config.picker.is_some());
/// ```
#[derive(Clone)]
pub struct SessionConfig {
    /// Directory capability for the folder backend. `None` means the folder
    /// backend is unavailable and every save goes to the archive.
    pub picker: Option<Arc<dyn DirectoryPicker>>,

    /// Hint shown with the picker. Default: `C:\ScanKBB\scan`.
    pub suggested_folder: Option<String>,

    /// Where `scan-files.zip` is delivered. Default: `.`.
    pub download_dir: PathBuf,

    /// PDF engine. `None` uses the process-wide pdfium binding from
    /// [`crate::engine::shared_rasterizer`].
    pub rasterizer: Option<Arc<dyn PdfRasterizer>>,

    /// Receives each run-log entry as it is appended.
    pub observer: Option<Arc<dyn LogObserver>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            picker: None,
            suggested_folder: Some(DEFAULT_SUGGESTED_FOLDER.to_string()),
            download_dir: PathBuf::from("."),
            rasterizer: None,
            observer: None,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("picker", &self.picker.as_ref().map(|_| "<dyn DirectoryPicker>"))
            .field("suggested_folder", &self.suggested_folder)
            .field("download_dir", &self.download_dir)
            .field(
                "rasterizer",
                &self.rasterizer.as_ref().map(|_| "<dyn PdfRasterizer>"),
            )
            .field("observer", &self.observer.as_ref().map(|_| "<dyn LogObserver>"))
            .finish()
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn picker(mut self, picker: Arc<dyn DirectoryPicker>) -> Self {
        self.config.picker = Some(picker);
        self
    }

    pub fn suggested_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.suggested_folder = Some(folder.into());
        self
    }

    pub fn no_suggested_folder(mut self) -> Self {
        self.config.suggested_folder = None;
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.download_dir = dir.into();
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PdfRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LogObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SessionConfig, ScanError> {
        let c = &self.config;
        if c.download_dir.as_os_str().is_empty() {
            return Err(ScanError::InvalidConfig(
                "download directory must not be empty".into(),
            ));
        }
        if c.suggested_folder.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ScanError::InvalidConfig(
                "suggested folder must not be blank".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Login trigger ────────────────────────────────────────────────────────

/// How long a protocol handoff may take before it counts as unclaimed.
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Settings for [`crate::launch::trigger_login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Custom URL scheme, without `://`. Default: `kyoboscan`.
    pub protocol: String,
    /// Handoff timeout. Default: 3 s.
    pub timeout: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL.to_string(),
            timeout: DEFAULT_LAUNCH_TIMEOUT,
        }
    }
}

impl LaunchConfig {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
