//! End-to-end pipeline tests for scan2png.
//!
//! Every test drives a real [`ScanSession`] against temporary directories.
//! PDFs are rendered by scripted fake rasterizers so no pdfium library is
//! needed; images are generated in memory with `image`.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use scan2png::{
    Backend, DirectoryPicker, FixedDirectory, InputFile, LogEntry, LogObserver, PdfRasterizer,
    PickError, PipelineState, RasterEvent, RunStatus, ScanError, ScanSession, SessionConfig,
    Severity, UnitOrigin, PDF_RENDER_SCALE,
};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_test::{assert_err, assert_ok};
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library tracing to the test harness; `RUST_LOG=scan2png=debug`
/// together with `--nocapture` shows it.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn jpeg_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 200, 90])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

const FAKE_PDF: &[u8] = b"%PDF-1.7 fake";

/// Renders `pages` pages of `page_w × page_h` at the requested scale.
/// Pages listed in `failing` report an error instead.
struct FakeRasterizer {
    pages: usize,
    failing: Vec<usize>,
    open_error: Option<String>,
    calls: AtomicUsize,
}

impl FakeRasterizer {
    fn pages(n: usize) -> Arc<Self> {
        Arc::new(Self {
            pages: n,
            failing: Vec::new(),
            open_error: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(n: usize, failing: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            pages: n,
            failing,
            open_error: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn unopenable() -> Arc<Self> {
        Arc::new(Self {
            pages: 0,
            failing: Vec::new(),
            open_error: Some("file is not a PDF".into()),
            calls: AtomicUsize::new(0),
        })
    }
}

const PAGE_W: u32 = 20;
const PAGE_H: u32 = 30;

impl PdfRasterizer for FakeRasterizer {
    fn rasterize(
        &self,
        _pdf: &[u8],
        scale: f32,
        on_event: &mut dyn FnMut(RasterEvent),
    ) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref e) = self.open_error {
            return Err(e.clone());
        }
        on_event(RasterEvent::Opened {
            page_count: self.pages,
        });
        let (w, h) = (
            (PAGE_W as f32 * scale) as u32,
            (PAGE_H as f32 * scale) as u32,
        );
        for page in 1..=self.pages {
            let image = if self.failing.contains(&page) {
                Err(format!("page {page} is corrupt"))
            } else {
                Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                    w,
                    h,
                    Rgba([page as u8, 0, 0, 255]),
                )))
            };
            on_event(RasterEvent::Page { page, image });
        }
        Ok(())
    }
}

/// Picker that always answers with the same error.
struct RefusingPicker(PickError);

#[async_trait]
impl DirectoryPicker for RefusingPicker {
    async fn pick(&self, _suggested: Option<&str>) -> Result<PathBuf, PickError> {
        Err(self.0.clone())
    }
}

#[derive(Default)]
struct CollectingObserver {
    lines: Mutex<Vec<String>>,
}

impl LogObserver for CollectingObserver {
    fn on_entry(&self, entry: &LogEntry) {
        self.lines.lock().unwrap().push(entry.message.clone());
    }
}

struct Harness {
    _tmp: tempfile::TempDir,
    out_dir: PathBuf,
    download_dir: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let out_dir = tmp.path().join("out");
        let download_dir = tmp.path().join("downloads");
        Self {
            _tmp: tmp,
            out_dir,
            download_dir,
        }
    }

    fn archive_path(&self) -> PathBuf {
        self.download_dir.join("scan-files.zip")
    }

    fn session(
        &self,
        picker: Option<Arc<dyn DirectoryPicker>>,
        rasterizer: Option<Arc<dyn PdfRasterizer>>,
    ) -> ScanSession {
        let mut builder = SessionConfig::builder().download_dir(&self.download_dir);
        if let Some(p) = picker {
            builder = builder.picker(p);
        }
        if let Some(r) = rasterizer {
            builder = builder.rasterizer(r);
        }
        ScanSession::new(builder.build().unwrap())
    }

    fn folder_picker(&self) -> Arc<dyn DirectoryPicker> {
        Arc::new(FixedDirectory::new(&self.out_dir))
    }
}

fn zip_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let file = std::fs::File::open(path).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut entry = zip.by_index(i).unwrap();
            let mut body = Vec::new();
            entry.read_to_end(&mut body).unwrap();
            (entry.name().to_string(), body)
        })
        .collect()
}

fn sorted_dir(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── Image inputs ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_png_passes_through_byte_identical() {
    let h = Harness::new();
    let mut s = h.session(Some(h.folder_picker()), None);
    let original = png_bytes();
    s.register(InputFile::from_bytes("page.png", Some("image/png".into()), original.clone()))
        .unwrap();

    let outcome = s.save().await.unwrap();
    assert_eq!(outcome.backend, Backend::Folder);
    assert_eq!(outcome.written, 1);
    assert_eq!(std::fs::read(h.out_dir.join("01.png")).unwrap(), original);
    assert_eq!(s.state(), PipelineState::Done);
}

#[tokio::test]
async fn test_jpeg_becomes_png_with_same_dimensions() {
    let h = Harness::new();
    let mut s = h.session(Some(h.folder_picker()), None);
    s.register(InputFile::from_bytes("photo.JPG", None, jpeg_bytes(41, 17)))
        .unwrap();

    let outcome = s.save().await.unwrap();
    assert!(outcome.is_success());

    let png = std::fs::read(h.out_dir.join("01.png")).unwrap();
    let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (41, 17));
}

#[tokio::test]
async fn test_undecodable_jpeg_falls_back_to_original_bytes() {
    let h = Harness::new();
    let mut s = h.session(None, None);
    let junk = b"JFIF? no".to_vec();
    s.register(InputFile::from_bytes("broken.jpeg", None, junk.clone()))
        .unwrap();

    let outcome = s.save().await.unwrap();
    assert_eq!(outcome.backend, Backend::Archive);
    assert_eq!(zip_entries(&h.archive_path()), vec![("01.jpeg".to_string(), junk)]);
    assert!(s
        .log()
        .entries()
        .iter()
        .any(|e| e.severity == Severity::Error && e.message.contains("Image load failed")));
}

// ── PDF inputs ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_three_page_pdf_to_archive_when_folder_unavailable() {
    init_tracing();
    let h = Harness::new();
    let mut s = h.session(None, Some(FakeRasterizer::pages(3)));
    s.register(InputFile::from_bytes("invoice.pdf", None, FAKE_PDF.to_vec()))
        .unwrap();

    let outcome = s.save().await.unwrap();
    assert_eq!(outcome.backend, Backend::Archive);
    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(outcome.written, 3);
    assert_eq!(outcome.location.as_deref(), Some(h.archive_path().as_path()));

    let entries = zip_entries(&h.archive_path());
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["01.png", "02.png", "03.png"]);

    // Rendered at the fixed upscale factor.
    let page = image::load_from_memory(&entries[0].1).unwrap();
    assert_eq!(
        (page.width(), page.height()),
        (
            (PAGE_W as f32 * PDF_RENDER_SCALE) as u32,
            (PAGE_H as f32 * PDF_RENDER_SCALE) as u32
        )
    );
}

#[tokio::test]
async fn test_pdf_progress_lines_in_order() {
    let h = Harness::new();
    let observer = Arc::new(CollectingObserver::default());
    let config = SessionConfig::builder()
        .download_dir(&h.download_dir)
        .rasterizer(FakeRasterizer::pages(2))
        .observer(observer.clone())
        .build()
        .unwrap();
    let mut s = ScanSession::new(config);
    s.register(InputFile::from_bytes("doc.pdf", None, FAKE_PDF.to_vec()))
        .unwrap();
    s.save().await.unwrap();

    let lines = observer.lines.lock().unwrap();
    let pos = |needle: &str| {
        lines
            .iter()
            .position(|l| l == needle)
            .unwrap_or_else(|| panic!("missing log line {needle:?} in {lines:#?}"))
    };
    assert!(pos("PDF page count: 2") < pos("PDF page 1/2 → PNG complete"));
    assert!(pos("PDF page 1/2 → PNG complete") < pos("PDF page 2/2 → PNG complete"));
    assert!(pos("PDF page 2/2 → PNG complete") < pos("scan-files.zip download complete (2 files)"));

    // Observer and stored log see the same stream.
    let stored: Vec<&str> = s.log().entries().iter().map(|e| e.message.as_str()).collect();
    assert_eq!(stored, *lines);
}

#[tokio::test]
async fn test_failed_page_keeps_count_and_sequence() {
    init_tracing();
    let h = Harness::new();
    let mut s = h.session(Some(h.folder_picker()), Some(FakeRasterizer::failing(3, vec![2])));
    s.register(InputFile::from_bytes("scan.pdf", None, FAKE_PDF.to_vec()))
        .unwrap();

    let outcome = s.save().await.unwrap();
    assert_eq!(outcome.written, 3);
    assert_eq!(sorted_dir(&h.out_dir), ["01.png", "02.pdf", "03.png"]);
    assert_eq!(std::fs::read(h.out_dir.join("02.pdf")).unwrap(), FAKE_PDF);

    let errors: Vec<&LogEntry> = s
        .log()
        .entries()
        .iter()
        .filter(|e| e.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("page 2"));
}

#[tokio::test]
async fn test_unopenable_pdf_yields_single_pdf_fallback() {
    let h = Harness::new();
    let mut s = h.session(None, Some(FakeRasterizer::unopenable()));
    s.register(InputFile::from_bytes("bad.pdf", None, FAKE_PDF.to_vec()))
        .unwrap();

    let outcome = s.save().await.unwrap();
    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(
        zip_entries(&h.archive_path()),
        vec![("01.pdf".to_string(), FAKE_PDF.to_vec())]
    );
    assert!(s
        .log()
        .entries()
        .iter()
        .any(|e| e.message == "[error] PDF conversion failed: file is not a PDF"));
}

// ── Persistence strategy ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancelled_picker_writes_nothing() {
    let h = Harness::new();
    let mut s = h.session(
        Some(Arc::new(RefusingPicker(PickError::Cancelled))),
        Some(FakeRasterizer::pages(2)),
    );
    s.register(InputFile::from_bytes("scan.pdf", None, FAKE_PDF.to_vec()))
        .unwrap();

    let outcome = s.save().await.unwrap();
    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert_eq!(outcome.written, 0);
    assert!(!h.archive_path().exists());
    assert!(!h.out_dir.exists());
    assert_eq!(s.state(), PipelineState::Done);
}

#[tokio::test]
async fn test_unavailable_picker_falls_back_to_archive() {
    let h = Harness::new();
    let mut s = h.session(
        Some(Arc::new(RefusingPicker(PickError::Unavailable(
            "permission denied".into(),
        )))),
        None,
    );
    s.register(InputFile::from_bytes("page.png", None, png_bytes()))
        .unwrap();

    let outcome = s.save().await.unwrap();
    assert_eq!(outcome.backend, Backend::Archive);
    assert!(outcome.is_success());
    assert!(s
        .log()
        .entries()
        .iter()
        .any(|e| e.message.starts_with("[notice] Folder selection unavailable")));
}

#[tokio::test]
async fn test_folder_write_failure_falls_back_to_archive() {
    let h = Harness::new();
    // A regular file where the picked directory should be.
    std::fs::create_dir_all(h.out_dir.parent().unwrap()).unwrap();
    std::fs::write(&h.out_dir, b"not a directory").unwrap();

    struct BlindPicker(PathBuf);

    #[async_trait]
    impl DirectoryPicker for BlindPicker {
        async fn pick(&self, _suggested: Option<&str>) -> Result<PathBuf, PickError> {
            Ok(self.0.clone())
        }
    }

    let mut s = h.session(Some(Arc::new(BlindPicker(h.out_dir.clone()))), None);
    s.register(InputFile::from_bytes("page.png", None, png_bytes()))
        .unwrap();

    let outcome = s.save().await.unwrap();
    assert_eq!(outcome.backend, Backend::Archive);
    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(zip_entries(&h.archive_path()).len(), 1);
}

#[tokio::test]
async fn test_archive_failure_marks_session_failed_but_usable() {
    let h = Harness::new();
    std::fs::create_dir_all(h.download_dir.parent().unwrap()).unwrap();
    std::fs::write(&h.download_dir, b"blocker").unwrap();

    let mut s = h.session(None, None);
    s.register(InputFile::from_bytes("page.png", None, png_bytes()))
        .unwrap();

    init_tracing();
    let outcome = assert_ok!(s.save().await);
    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(s.state(), PipelineState::Failed);
    assert_eq!(s.log().entries().last().unwrap().severity, Severity::Error);

    // Clear the blocker and save again without a reset.
    std::fs::remove_file(&h.download_dir).unwrap();
    let retry = s.save().await.unwrap();
    assert_eq!(retry.status, RunStatus::Succeeded);
    assert_eq!(s.state(), PipelineState::Done);
}

// ── Session lifecycle ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_each_save_restarts_numbering() {
    let h = Harness::new();
    let mut s = h.session(Some(h.folder_picker()), Some(FakeRasterizer::pages(2)));
    s.register(InputFile::from_bytes("a.pdf", None, FAKE_PDF.to_vec()))
        .unwrap();
    s.save().await.unwrap();

    s.register(InputFile::from_bytes("b.png", None, png_bytes()))
        .unwrap();
    s.save().await.unwrap();

    // The second run overwrote 01.png instead of writing 03.png.
    assert_eq!(sorted_dir(&h.out_dir), ["01.png", "02.png"]);
    assert_eq!(std::fs::read(h.out_dir.join("01.png")).unwrap(), png_bytes());
}

#[tokio::test]
async fn test_save_without_input_is_rejected() {
    let h = Harness::new();
    let mut s = h.session(None, None);
    let err = assert_err!(s.save().await);
    assert!(matches!(err, ScanError::NoInput));
    assert_eq!(s.state(), PipelineState::Idle);
    assert!(s.log().is_empty());
    assert!(!h.download_dir.exists());
}

#[tokio::test]
async fn test_register_path_reads_from_disk() {
    let h = Harness::new();
    let src = h._tmp.path().join("from-disk.png");
    std::fs::write(&src, png_bytes()).unwrap();

    let mut s = h.session(None, None);
    assert_ok!(s.register_path(&src, None).await);
    assert_eq!(s.input().unwrap().name(), "from-disk.png");

    let missing = s.register_path(h._tmp.path().join("nope.pdf"), None).await;
    assert!(matches!(missing, Err(ScanError::FileNotFound { .. })));
    assert_eq!(s.input().unwrap().name(), "from-disk.png");
}

#[tokio::test]
async fn test_reset_is_idempotent_and_pdf_engine_is_not_touched_for_images() {
    let h = Harness::new();
    let raster = FakeRasterizer::pages(1);
    let mut s = h.session(None, Some(raster.clone()));
    s.register(InputFile::from_bytes("p.png", None, png_bytes()))
        .unwrap();
    s.save().await.unwrap();
    assert_eq!(raster.calls.load(Ordering::SeqCst), 0);

    s.reset();
    let after_one = (s.input().is_none(), s.log().len(), s.state());
    s.reset();
    assert_eq!((s.input().is_none(), s.log().len(), s.state()), after_one);
    assert_eq!(after_one, (true, 0, PipelineState::Idle));
}

/// Messages and severities of a session's log, timestamps dropped.
fn log_lines(s: &ScanSession) -> Vec<(Severity, String)> {
    s.log()
        .entries()
        .iter()
        .map(|e| (e.severity, e.message.clone()))
        .collect()
}

fn written_names(h: &Harness, use_folder: bool) -> Vec<String> {
    if use_folder {
        sorted_dir(&h.out_dir)
    } else {
        zip_entries(&h.archive_path()).into_iter().map(|(n, _)| n).collect()
    }
}

#[tokio::test]
async fn test_run_after_reset_matches_a_fresh_session() {
    init_tracing();
    for use_folder in [true, false] {
        let h = Harness::new();
        let picker = use_folder.then(|| h.folder_picker());
        let input = || InputFile::from_bytes("scan.pdf", None, FAKE_PDF.to_vec());

        let mut reused = h.session(picker.clone(), Some(FakeRasterizer::failing(3, vec![2])));
        reused.register(input()).unwrap();
        reused.save().await.unwrap();
        reused.reset();
        reused.register(input()).unwrap();
        let again = reused.save().await.unwrap();
        let again_files = written_names(&h, use_folder);

        let mut fresh = h.session(picker, Some(FakeRasterizer::failing(3, vec![2])));
        fresh.register(input()).unwrap();
        let first = fresh.save().await.unwrap();
        let fresh_files = written_names(&h, use_folder);

        assert_eq!(again, first);
        assert_eq!(again_files, fresh_files);
        assert_eq!(fresh_files, ["01.png", "02.pdf", "03.png"]);
        assert_eq!(log_lines(&reused), log_lines(&fresh));
        assert_eq!(reused.state(), fresh.state());
    }
}

#[test]
fn test_unit_origin_is_public() {
    // Downstream code can match on where a unit came from.
    let origin = UnitOrigin::PdfPage(4);
    assert!(matches!(origin, UnitOrigin::PdfPage(4)));
}
