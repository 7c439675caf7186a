//! Pipeline stages for scan normalisation.
//!
//! Each submodule implements one step. The orchestration lives in
//! [`crate::convert`] and [`crate::session`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ raster / render ──▶ encode ──▶ naming
//! (classify)  (JPEG / pdfium)     (PNG)    (01.png, 02.png, …)
//! ```
//!
//! 1. [`input`]: hold the registered file and its [`input::InputKind`]
//! 2. [`raster`]: decode a raster image and re-encode it as PNG
//! 3. [`render`]: rasterise every PDF page; blocking, run via `spawn_blocking`
//! 4. [`encode`]: `DynamicImage` → PNG bytes
//! 5. [`naming`]: assign run-wide sequence numbers and file names

pub mod encode;
pub mod input;
pub mod naming;
pub mod raster;
pub mod render;
