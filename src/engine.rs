//! Process-wide PDF engine acquisition.
//!
//! The pdfium library is located and test-bound once per process.
//! [`shared_rasterizer`] is safe to call from any number of tasks: the first
//! caller performs the binding, concurrent callers wait for that same
//! attempt, and everyone afterwards gets the cached rasterizer.
//!
//! Resolution order:
//!
//! 1. `PDFIUM_LIB_PATH`, when set and pointing at an existing file
//! 2. the platform library name in the working directory
//!    (`libpdfium.so`, `libpdfium.dylib`, `pdfium.dll`)
//! 3. the system library search path
//!
//! A failed attempt is not cached; the next call tries again.

use crate::error::ScanError;
use crate::pipeline::render::{LibrarySource, PdfRasterizer, PdfiumRasterizer};
use pdfium_render::prelude::Pdfium;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Environment variable naming an explicit pdfium library file.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

static ENGINE: OnceCell<Arc<PdfiumRasterizer>> = OnceCell::const_new();

/// Acquire the shared pdfium rasterizer, binding it on first use.
pub async fn shared_rasterizer() -> Result<Arc<dyn PdfRasterizer>, ScanError> {
    let engine = ENGINE
        .get_or_try_init(|| async {
            tokio::task::spawn_blocking(bind_first_available)
                .await
                .map_err(|e| ScanError::Internal(format!("pdfium init task panicked: {e}")))?
                .map(Arc::new)
        })
        .await?;
    Ok(engine.clone() as Arc<dyn PdfRasterizer>)
}

/// Whether a previous call already bound the engine.
pub fn is_initialized() -> bool {
    ENGINE.initialized()
}

/// Library locations to try, in order.
pub fn candidate_sources() -> Vec<LibrarySource> {
    let mut sources = Vec::with_capacity(3);

    if let Ok(env_path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        let p = PathBuf::from(env_path);
        if p.exists() {
            sources.push(LibrarySource::Path(p));
        } else {
            warn!("{} '{}' not found; ignoring", PDFIUM_LIB_PATH_ENV, p.display());
        }
    }

    let local = PathBuf::from(Pdfium::pdfium_platform_library_name_at_path("./"));
    if local.exists() {
        sources.push(LibrarySource::Path(local));
    }

    sources.push(LibrarySource::System);
    sources
}

fn bind_first_available() -> Result<PdfiumRasterizer, ScanError> {
    let mut failures = Vec::new();
    for source in candidate_sources() {
        debug!("Trying pdfium from {}", source);
        match PdfiumRasterizer::bind(source) {
            Ok(r) => return Ok(r),
            Err(ScanError::PdfiumBindingFailed(reason)) => failures.push(reason),
            Err(other) => return Err(other),
        }
    }
    Err(ScanError::PdfiumBindingFailed(failures.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_library_is_always_the_last_candidate() {
        let sources = candidate_sources();
        assert_eq!(sources.last(), Some(&LibrarySource::System));
    }

    #[tokio::test]
    async fn failed_binding_is_not_cached() {
        if shared_rasterizer().await.is_err() {
            assert!(!is_initialized());
        } else {
            assert!(is_initialized());
        }
    }
}
