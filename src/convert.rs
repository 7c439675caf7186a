//! Format conversion: one registered file in, an ordered list of units out.
//!
//! [`convert`] dispatches on the file's [`InputKind`]:
//!
//! | Kind | Output |
//! |------|--------|
//! | `PngImage` | the original bytes, one unit |
//! | `RasterImage` | decoded, converted to RGBA, re-encoded as PNG, one unit |
//! | `PdfDocument` | one PNG per page at [`PDF_RENDER_SCALE`], in page order |
//!
//! Failures are per unit. The caller receives a `Result` for every unit and
//! decides what a failure turns into (the session substitutes a fallback).
//! A PDF that cannot be opened yields a single `Err(UnitError::DocumentOpen)`.

use crate::error::{ScanError, UnitError};
use crate::pipeline::encode::encode_png;
use crate::pipeline::input::{InputFile, InputKind};
use crate::pipeline::naming::{PendingUnit, UnitOrigin};
use crate::pipeline::raster::reencode_to_png;
use crate::pipeline::render::{PdfRasterizer, RasterEvent, PDF_RENDER_SCALE};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outcome of converting one unit.
pub type UnitResult = Result<PendingUnit, UnitError>;

/// Progress reported while a PDF is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertProgress {
    /// The document opened and has this many pages.
    PageCount(usize),
    /// Page `page` of `total` was rendered and encoded.
    PageDone { page: usize, total: usize },
}

impl fmt::Display for ConvertProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertProgress::PageCount(n) => write!(f, "PDF page count: {n}"),
            ConvertProgress::PageDone { page, total } => {
                write!(f, "PDF page {page}/{total} → PNG complete")
            }
        }
    }
}

/// Optional progress sink. `None` means no events are produced.
pub type ProgressSink<'a> = Option<&'a mut (dyn FnMut(ConvertProgress) + Send)>;

/// Convert a registered file into pending units.
///
/// `rasterizer` is only consulted for PDFs; `None` there means no PDF
/// engine is available and the document counts as unopenable.
///
/// # Errors
/// Returns `Err(ScanError::UnsupportedFormat)` for an unsupported file.
/// Conversion failures never surface here; they are the inner `Err`s.
pub async fn convert(
    input: &InputFile,
    rasterizer: Option<Arc<dyn PdfRasterizer>>,
    progress: ProgressSink<'_>,
) -> Result<Vec<UnitResult>, ScanError> {
    info!("Converting '{}' ({:?})", input.name(), input.kind());

    match input.kind() {
        InputKind::PngImage => {
            debug!("PNG pass-through: {} bytes", input.size());
            Ok(vec![Ok(PendingUnit::png(
                input.bytes().to_vec(),
                UnitOrigin::PassThrough,
            ))])
        }
        InputKind::RasterImage => {
            let png = convert_raster(input.bytes().to_vec()).await;
            Ok(vec![png.map(|b| PendingUnit::png(b, UnitOrigin::Reencoded))])
        }
        InputKind::PdfDocument => {
            let Some(rasterizer) = rasterizer else {
                return Ok(vec![Err(UnitError::DocumentOpen {
                    detail: "no PDF engine available".into(),
                })]);
            };
            match convert_pdf(rasterizer, input.bytes().to_vec(), progress).await {
                Ok(pages) => Ok(pages
                    .into_iter()
                    .enumerate()
                    .map(|(idx, page)| {
                        page.map(|b| PendingUnit::png(b, UnitOrigin::PdfPage(idx + 1)))
                    })
                    .collect()),
                Err(e) => Ok(vec![Err(e)]),
            }
        }
        InputKind::Unsupported => Err(ScanError::UnsupportedFormat {
            name: input.name().to_string(),
        }),
    }
}

/// Re-encode a raster image as PNG on the blocking pool.
pub async fn convert_raster(bytes: Vec<u8>) -> Result<Vec<u8>, UnitError> {
    tokio::task::spawn_blocking(move || reencode_to_png(&bytes))
        .await
        .map_err(|e| UnitError::Encode {
            detail: format!("conversion task panicked: {e}"),
        })?
}

enum RenderMsg {
    Opened(usize),
    Page(usize, Result<Vec<u8>, UnitError>),
}

/// Render and encode every page of a PDF, in page order.
///
/// The rasterizer runs on the blocking pool and hands each page back over a
/// channel. Pages are encoded on that same thread, so the async side only
/// forwards progress and collects bytes.
///
/// # Errors
/// `UnitError::DocumentOpen` when the document cannot be opened or has no
/// pages. Individual page failures are `Err(UnitError::PageRender)` entries
/// in the returned list.
pub async fn convert_pdf(
    rasterizer: Arc<dyn PdfRasterizer>,
    pdf: Vec<u8>,
    mut progress: ProgressSink<'_>,
) -> Result<Vec<Result<Vec<u8>, UnitError>>, UnitError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<RenderMsg>();

    let handle = tokio::task::spawn_blocking(move || {
        rasterizer.rasterize(&pdf, PDF_RENDER_SCALE, &mut |event| {
            let msg = match event {
                RasterEvent::Opened { page_count } => RenderMsg::Opened(page_count),
                RasterEvent::Page { page, image } => {
                    let png = image
                        .map_err(|detail| UnitError::PageRender { page, detail })
                        .and_then(|img| {
                            encode_png(&img).map_err(|e| UnitError::PageRender {
                                page,
                                detail: e.to_string(),
                            })
                        });
                    RenderMsg::Page(page, png)
                }
            };
            // Receiver outlives the render task.
            let _ = tx.send(msg);
        })
    });

    let mut total = 0usize;
    let mut pages = Vec::new();
    while let Some(msg) = rx.recv().await {
        match msg {
            RenderMsg::Opened(n) => {
                total = n;
                info!("PDF has {} pages", n);
                if let Some(cb) = progress.as_mut() {
                    cb(ConvertProgress::PageCount(n));
                }
            }
            RenderMsg::Page(page, result) => {
                match &result {
                    Ok(bytes) => {
                        debug!("Page {}/{} → {} bytes PNG", page, total, bytes.len());
                        if let Some(cb) = progress.as_mut() {
                            cb(ConvertProgress::PageDone { page, total });
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
                pages.push(result);
            }
        }
    }

    handle
        .await
        .map_err(|e| UnitError::DocumentOpen {
            detail: format!("render task panicked: {e}"),
        })?
        .map_err(|detail| UnitError::DocumentOpen { detail })?;

    if pages.is_empty() {
        return Err(UnitError::DocumentOpen {
            detail: "document has no pages".into(),
        });
    }
    Ok(pages)
}
