//! Error types for the scan2png library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ScanError`] is **fatal** for the requested operation, e.g. an
//!   unsupported file or an archive that could not be written. Returned as
//!   `Err(ScanError)` from session operations, or carried as text inside a
//!   failed [`crate::persist::PersistenceOutcome`].
//!
//! * [`UnitError`] is **non-fatal**: one image or one PDF page could not be
//!   converted. The orchestrator logs it and substitutes a fallback unit made
//!   of the original bytes, so a save always produces at least one file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scan2png library.
///
/// Per-unit conversion failures use [`UnitError`] and never abort a run.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Neither the media type nor the extension is in the accepted set.
    #[error("Unsupported file type: '{name}'\nAccepted: PNG, JPG/JPEG, PDF.")]
    UnsupportedFormat { name: String },

    /// `save` was requested with no registered file.
    #[error("No file to save. Register a file first.")]
    NoInput,

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other read failure.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Persistence errors ────────────────────────────────────────────────
    /// Building or delivering the ZIP archive failed. Terminal for a run.
    #[error("Archive error: {0}")]
    ArchiveError(String),

    /// Could not write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Login trigger errors ──────────────────────────────────────────────
    /// Employee ID or password does not meet the login requirements.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The protocol URL could not be handed to the system opener.
    #[error("Failed to open '{url}': {reason}")]
    LaunchFailed { url: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF pages cannot be rendered without pdfium. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place the platform library (libpdfium.so / libpdfium.dylib / pdfium.dll)\n\
    in the working directory.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal conversion error for one unit.
///
/// The session turns each of these into a fallback unit carrying the
/// original bytes, so the output count never drops below one per page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum UnitError {
    /// The raster image could not be loaded.
    #[error("Image load failed: {detail}")]
    Decode { detail: String },

    /// PNG encoding failed or produced no data.
    #[error("PNG conversion failed: {detail}")]
    Encode { detail: String },

    /// The PDF could not be opened at all (or no PDF engine is available).
    #[error("PDF conversion failed: {detail}")]
    DocumentOpen { detail: String },

    /// One PDF page failed to render or encode.
    #[error("PDF page {page} conversion failed: {detail}")]
    PageRender { page: usize, detail: String },
}
