//! Input gate: the registered file and its classification.
//!
//! A file is classified exactly once, when it is registered. Everything
//! downstream matches on [`InputKind`] instead of re-reading media types
//! or file names.

use crate::error::ScanError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Media types accepted by the input gate.
pub const ACCEPTED_MEDIA_TYPES: [&str; 4] =
    ["image/png", "image/jpeg", "image/jpg", "application/pdf"];

/// Extensions accepted when the media type is absent or unreliable.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "pdf"];

/// What kind of source a file is, decided once at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InputKind {
    /// Already PNG; passed through untouched.
    PngImage,
    /// Any other accepted raster image (JPEG); re-encoded to PNG.
    RasterImage,
    /// Multi-page document; one PNG per page.
    PdfDocument,
    /// Not in the accepted set.
    Unsupported,
}

/// Classify a file from its declared media type and its name.
///
/// A file is accepted when either its media type or its extension is in
/// the accepted set. Among accepted files PDF wins over PNG, and anything
/// else accepted is treated as a raster image.
pub fn classify(name: &str, media_type: Option<&str>) -> InputKind {
    let media = media_type
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());
    let ext = extension_of(name);

    let accepted = media
        .as_deref()
        .is_some_and(|m| ACCEPTED_MEDIA_TYPES.contains(&m))
        || ext
            .as_deref()
            .is_some_and(|e| ACCEPTED_EXTENSIONS.contains(&e));
    if !accepted {
        return InputKind::Unsupported;
    }

    let is = |mime: &str, extension: &str| {
        media.as_deref() == Some(mime) || ext.as_deref() == Some(extension)
    };

    if is("application/pdf", "pdf") {
        InputKind::PdfDocument
    } else if is("image/png", "png") {
        InputKind::PngImage
    } else {
        InputKind::RasterImage
    }
}

/// Lower-cased extension of a file name, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
}

/// Human-readable size: `512B`, `1.5KB`, `2.3MB`.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes}B")
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    }
}

/// The single user-supplied document awaiting conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    name: String,
    media_type: Option<String>,
    bytes: Vec<u8>,
    kind: InputKind,
}

impl InputFile {
    /// Wrap in-memory bytes. The kind is computed here and never again.
    pub fn from_bytes(name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let kind = classify(&name, media_type.as_deref());
        debug!("Classified '{}' as {:?}", name, kind);
        Self {
            name,
            media_type,
            bytes,
            kind,
        }
    }

    /// Read a local file. The display name is the file name component.
    pub async fn from_path(
        path: impl AsRef<Path>,
        media_type: Option<String>,
    ) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| map_read_error(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, media_type, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    /// File name without its extension; the base label of every unit.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }

    /// Extension used when the original bytes are kept as a fallback unit.
    pub fn fallback_extension(&self) -> String {
        match self.kind {
            InputKind::PdfDocument => "pdf".to_string(),
            _ => extension_of(&self.name).unwrap_or_else(|| "jpg".to_string()),
        }
    }
}

fn map_read_error(path: &Path, e: std::io::Error) -> ScanError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied { path },
        _ => ScanError::ReadFailed { path, source: e },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_media_type() {
        assert_eq!(classify("scan", Some("application/pdf")), InputKind::PdfDocument);
        assert_eq!(classify("scan", Some("image/png")), InputKind::PngImage);
        assert_eq!(classify("scan", Some("image/jpeg")), InputKind::RasterImage);
        assert_eq!(classify("scan", Some("image/jpg")), InputKind::RasterImage);
    }

    #[test]
    fn classify_by_extension_case_insensitive() {
        assert_eq!(classify("Invoice.PDF", None), InputKind::PdfDocument);
        assert_eq!(classify("page.Png", None), InputKind::PngImage);
        assert_eq!(classify("photo.JPEG", None), InputKind::RasterImage);
        assert_eq!(classify("photo.jpg", Some("")), InputKind::RasterImage);
    }

    #[test]
    fn classify_rejects_everything_else() {
        assert_eq!(classify("notes.docx", None), InputKind::Unsupported);
        assert_eq!(classify("noext", None), InputKind::Unsupported);
        assert_eq!(classify("anim.gif", Some("image/gif")), InputKind::Unsupported);
    }

    #[test]
    fn unreliable_media_type_falls_back_to_extension() {
        assert_eq!(
            classify("scan.pdf", Some("application/octet-stream")),
            InputKind::PdfDocument
        );
    }

    #[test]
    fn pdf_wins_over_png() {
        assert_eq!(classify("scan.pdf", Some("image/png")), InputKind::PdfDocument);
    }

    #[test]
    fn file_size_formatting() {
        assert_eq!(format_file_size(512), "512B");
        assert_eq!(format_file_size(1536), "1.5KB");
        assert_eq!(format_file_size(5 * 1024 * 1024 / 2), "2.5MB");
    }

    #[test]
    fn stem_and_fallback_extension() {
        let f = InputFile::from_bytes("receipt.2024.JPG", None, vec![1, 2, 3]);
        assert_eq!(f.stem(), "receipt.2024");
        assert_eq!(f.fallback_extension(), "jpg");
        assert_eq!(f.size(), 3);

        let pdf = InputFile::from_bytes("doc", Some("application/pdf".into()), vec![]);
        assert_eq!(pdf.stem(), "doc");
        assert_eq!(pdf.fallback_extension(), "pdf");

        let bare = InputFile::from_bytes("scan", Some("image/jpeg".into()), vec![]);
        assert_eq!(bare.fallback_extension(), "jpg");
    }

    #[tokio::test]
    async fn from_path_maps_missing_file() {
        let err = InputFile::from_path("/definitely/not/here.png", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn from_path_reads_name_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        std::fs::write(&path, b"\x89PNG").unwrap();
        let f = InputFile::from_path(&path, None).await.unwrap();
        assert_eq!(f.name(), "page.png");
        assert_eq!(f.kind(), InputKind::PngImage);
        assert_eq!(f.bytes(), b"\x89PNG");
    }
}
