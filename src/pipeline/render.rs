//! PDF rasterisation: render every page of a PDF to `DynamicImage`.
//!
//! Rendering sits behind the [`PdfRasterizer`] trait. Production code uses
//! [`PdfiumRasterizer`]; tests drive the converter with fakes that emit
//! scripted page counts and failures.
//!
//! The trait is blocking. pdfium keeps thread-local state and must not be
//! driven from a Tokio worker, so the converter calls
//! [`PdfRasterizer::rasterize`] from inside `spawn_blocking` and forwards
//! each [`RasterEvent`] to the async side over a channel.

use crate::error::ScanError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Pages are rendered at twice the document's native scale.
pub const PDF_RENDER_SCALE: f32 = 2.0;

/// What a rasterizer reports while it works.
#[derive(Debug)]
pub enum RasterEvent {
    /// Document opened; emitted exactly once, before any page.
    Opened { page_count: usize },
    /// Page `page` (1-based) settled, successfully or not.
    Page {
        page: usize,
        image: Result<DynamicImage, String>,
    },
}

/// A blocking PDF page renderer.
///
/// `rasterize` opens `pdf`, emits [`RasterEvent::Opened`], then one
/// [`RasterEvent::Page`] per page in page order. A page failure is reported
/// through its event and rendering continues with the next page. `Err` is
/// returned only when the document cannot be opened at all, in which case
/// no event is emitted.
pub trait PdfRasterizer: Send + Sync {
    fn rasterize(
        &self,
        pdf: &[u8],
        scale: f32,
        on_event: &mut dyn FnMut(RasterEvent),
    ) -> Result<(), String>;
}

/// Where the pdfium shared library is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySource {
    /// An explicit library file.
    Path(PathBuf),
    /// Whatever the system loader finds.
    System,
}

impl fmt::Display for LibrarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibrarySource::Path(p) => write!(f, "{}", p.display()),
            LibrarySource::System => f.write_str("system library"),
        }
    }
}

/// pdfium-backed rasterizer.
///
/// Only the library location is stored. Each `rasterize` call binds its own
/// `Pdfium` on the calling (blocking) thread and drops it on return.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    source: LibrarySource,
}

impl PdfiumRasterizer {
    /// Bind once to prove the library loads, then keep only its location.
    pub fn bind(source: LibrarySource) -> Result<Self, ScanError> {
        let rasterizer = Self { source };
        rasterizer
            .pdfium()
            .map_err(ScanError::PdfiumBindingFailed)?;
        info!("pdfium bound from {}", rasterizer.source);
        Ok(rasterizer)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        Self::bind(LibrarySource::Path(path.as_ref().to_path_buf()))
    }

    pub fn source(&self) -> &LibrarySource {
        &self.source
    }

    fn pdfium(&self) -> Result<Pdfium, String> {
        let bindings = match &self.source {
            LibrarySource::Path(p) => Pdfium::bind_to_library(p),
            LibrarySource::System => Pdfium::bind_to_system_library(),
        };
        bindings
            .map(Pdfium::new)
            .map_err(|e| format!("{}: {:?}", self.source, e))
    }
}

impl PdfRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf: &[u8],
        scale: f32,
        on_event: &mut dyn FnMut(RasterEvent),
    ) -> Result<(), String> {
        let pdfium = self.pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| format!("{:?}", e))?;

        let pages = document.pages();
        let page_count = pages.len() as usize;
        info!("PDF loaded: {} pages", page_count);
        on_event(RasterEvent::Opened { page_count });

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        for (idx, page) in pages.iter().enumerate() {
            let image = page
                .render_with_config(&render_config)
                .map(|bitmap| bitmap.as_image())
                .map_err(|e| format!("{:?}", e));

            if let Ok(ref img) = image {
                debug!("Rendered page {} → {}x{} px", idx + 1, img.width(), img.height());
            }
            on_event(RasterEvent::Page {
                page: idx + 1,
                image,
            });
        }

        Ok(())
    }
}
