//! Archive backend: pack every unit into `scan-files.zip` and deliver it.
//!
//! There is no partial success here. Either the whole archive lands in the
//! download directory or the run fails with [`ScanError::ArchiveError`].

use crate::error::ScanError;
use crate::pipeline::naming::ConversionUnit;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Fixed name of the delivered archive.
pub const ARCHIVE_FILE_NAME: &str = "scan-files.zip";

/// Build the archive in memory. Entry names are the unit names, in order.
pub fn build_archive(units: &[ConversionUnit]) -> Result<Vec<u8>, ScanError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for unit in units {
        writer
            .start_file(unit.name.as_str(), options)
            .map_err(|e| ScanError::ArchiveError(format!("{}: {}", unit.name, e)))?;
        writer
            .write_all(&unit.bytes)
            .map_err(|e| ScanError::ArchiveError(format!("{}: {}", unit.name, e)))?;
    }

    let bytes = writer
        .finish()
        .map_err(|e| ScanError::ArchiveError(e.to_string()))?
        .into_inner();
    debug!("Built archive: {} entries, {} bytes", units.len(), bytes.len());
    Ok(bytes)
}

/// Write `bytes` as `<download_dir>/<file_name>` atomically.
///
/// The data goes to a temporary sibling first and is renamed into place, so
/// an interrupted delivery never leaves a truncated archive behind.
pub async fn deliver(
    download_dir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, ScanError> {
    tokio::fs::create_dir_all(download_dir)
        .await
        .map_err(|e| ScanError::ArchiveError(format!("{}: {}", download_dir.display(), e)))?;

    let target = download_dir.join(file_name);
    let tmp = download_dir.join(format!(".{file_name}.tmp"));

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        discard_temp(&tmp).await;
        return Err(ScanError::ArchiveError(format!("{}: {}", tmp.display(), e)));
    }
    if let Err(e) = tokio::fs::rename(&tmp, &target).await {
        discard_temp(&tmp).await;
        return Err(ScanError::ArchiveError(format!("{}: {}", target.display(), e)));
    }

    info!("Delivered {} ({} bytes)", target.display(), bytes.len());
    Ok(target)
}

/// Best-effort removal of a half-written temporary file.
async fn discard_temp(tmp: &Path) {
    if let Err(e) = tokio::fs::remove_file(tmp).await {
        debug!("Could not remove {}: {}", tmp.display(), e);
    }
}

/// Build `scan-files.zip` from `units` and deliver it into `download_dir`.
pub async fn save_archive(
    download_dir: &Path,
    units: &[ConversionUnit],
) -> Result<PathBuf, ScanError> {
    let bytes = build_archive(units)?;
    deliver(download_dir, ARCHIVE_FILE_NAME, &bytes).await
}
