//! # scan2png
//!
//! Normalise a scanned document into sequentially named PNG pages and save
//! them into a folder, or into `scan-files.zip` when no folder is available.
//!
//! One file is registered at a time. PNGs pass through untouched; JPEGs are
//! re-encoded and PDFs rendered page by page at twice their native scale.
//! A unit that fails to convert is replaced by the original bytes, so a
//! save never silently drops a page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Register  classify once: PNG / raster / PDF / unsupported
//!  ├─ 2. Convert   pass-through, re-encode, or render via pdfium (spawn_blocking)
//!  ├─ 3. Name      01.png, 02.png, … shared counter, fallbacks included
//!  └─ 4. Persist   picked folder ──(cancel: stop)──(failure)──▶ scan-files.zip
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2png::{FixedDirectory, ScanSession, SessionConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::builder()
//!         .picker(Arc::new(FixedDirectory::new("./scan")))
//!         .build()?;
//!     let mut session = ScanSession::new(config);
//!
//!     session.register_path("invoice.pdf", None).await?;
//!     let outcome = session.save().await?;
//!     eprintln!("{:?}: {} files via {:?}", outcome.status, outcome.written, outcome.backend);
//!     for entry in session.log().entries() {
//!         println!("{entry}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `scan2png` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `dialog` | off     | Native folder picker ([`persist::folder::DialogPicker`]) via `rfd` |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! scan2png = { version = "0.3", default-features = false }
//! ```
//!
//! ## PDF engine
//!
//! PDF pages are rendered with pdfium, bound once per process (see
//! [`engine`]). Point `PDFIUM_LIB_PATH` at the shared library, or place it
//! in the working directory. Without it, a PDF is saved as-is.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod launch;
pub mod log;
pub mod persist;
pub mod pipeline;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{LaunchConfig, SessionConfig, SessionConfigBuilder};
pub use convert::{convert, ConvertProgress};
pub use error::{ScanError, UnitError};
pub use launch::{trigger_login, LaunchOutcome, ProtocolOpener, SystemOpener};
pub use log::{LogEntry, LogObserver, RunLog, Severity};
#[cfg(feature = "dialog")]
pub use persist::folder::DialogPicker;
pub use persist::folder::{DirectoryPicker, FixedDirectory, PickError};
pub use persist::{Backend, PersistenceOutcome, RunStatus};
pub use pipeline::input::{InputFile, InputKind};
pub use pipeline::naming::{file_name, ConversionUnit, UnitOrigin};
pub use pipeline::render::{PdfRasterizer, PdfiumRasterizer, RasterEvent, PDF_RENDER_SCALE};
pub use session::{PipelineState, ScanSession};
