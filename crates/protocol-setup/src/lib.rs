//! # protocol-setup
//!
//! Everything needed to hand a login off to the legacy image-archival
//! system through a registered custom URL scheme:
//!
//! 1. [`build_bundle`] packs a one-time installer (`ie-setup.zip`) that the
//!    user extracts and runs on their workstation. It copies a VBScript
//!    launcher to the install directory and imports a registry entry that
//!    binds `<protocol>://` to that launcher.
//! 2. [`login_url`] builds the `<protocol>://login?id=..&pw=..` URL the
//!    launcher understands, and [`masked_login_url`] produces the same URL
//!    with the password hidden, for logs.
//!
//! ## Usage
//!
//! ```rust
//! use protocol_setup::{build_bundle, login_url, SetupParams};
//!
//! let params = SetupParams::default();
//! let zip_bytes = build_bundle(&params).expect("bundle");
//! assert!(!zip_bytes.is_empty());
//!
//! let url = login_url(&params.protocol, "12345", "p@ss word");
//! assert_eq!(url, "kyoboscan://login?id=12345&pw=p%40ss%20word");
//! ```

mod templates;

use std::io::{Cursor, Write};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub use templates::{install_bat, launcher_vbs, registry_file, uninstall_bat};

// ── Public constants ─────────────────────────────────────────────────────────

/// File name the installer bundle is delivered under.
pub const BUNDLE_FILE_NAME: &str = "ie-setup.zip";

/// Launcher script name, both inside the bundle and in the install directory.
pub const LAUNCHER_FILE_NAME: &str = "ie-launcher.vbs";

/// Registry import file name inside the bundle.
pub const REGISTRY_FILE_NAME: &str = "scanner.reg";

pub const INSTALL_FILE_NAME: &str = "install.bat";
pub const UNINSTALL_FILE_NAME: &str = "uninstall.bat";

/// Default custom URL scheme.
pub const DEFAULT_PROTOCOL: &str = "kyoboscan";

/// Default install directory on the workstation.
pub const DEFAULT_INSTALL_DIR: &str = r"C:\ScanKBB";

/// Default login page the launcher navigates to.
pub const DEFAULT_TARGET_URL: &str = "http://iscan.kyobobook.co.kr/kbb/intro";

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
///
/// The launcher's URL decoder was written against that encoding, so the
/// same set is used here.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned while assembling the installer bundle.
#[derive(Error, Debug)]
pub enum SetupError {
    /// A parameter would produce a broken script or registry entry.
    #[error("Invalid setup parameter '{field}': {reason}")]
    InvalidParam { field: &'static str, reason: String },

    /// ZIP construction failed.
    #[error("Failed to build installer archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Writing an entry into the in-memory archive failed.
    #[error("Failed to write archive entry '{name}': {source}")]
    Entry {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

// ── Parameters ───────────────────────────────────────────────────────────────

/// The three values the bundle templates are parameterized by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupParams {
    /// URL scheme without `://`, e.g. `kyoboscan`.
    pub protocol: String,
    /// Windows directory the launcher is copied into, e.g. `C:\ScanKBB`.
    pub install_dir: String,
    /// Login page opened by the launcher.
    pub target_url: String,
}

impl Default for SetupParams {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL.to_string(),
            install_dir: DEFAULT_INSTALL_DIR.to_string(),
            target_url: DEFAULT_TARGET_URL.to_string(),
        }
    }
}

impl SetupParams {
    /// Reject values that cannot be substituted into the templates safely.
    ///
    /// A URL scheme must start with a letter and contain only letters,
    /// digits, `+`, `-` or `.`. The install directory must be non-empty and
    /// free of double quotes, which would terminate the quoted strings in
    /// the `.reg` and `.bat` files.
    pub fn validate(&self) -> Result<(), SetupError> {
        let mut chars = self.protocol.chars();
        let valid_scheme = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return Err(SetupError::InvalidParam {
                field: "protocol",
                reason: format!("'{}' is not a valid URL scheme", self.protocol),
            });
        }

        let dir = self.install_dir.trim_end_matches('\\');
        if dir.is_empty() || dir.contains('"') {
            return Err(SetupError::InvalidParam {
                field: "install_dir",
                reason: format!("'{}' is not a usable directory", self.install_dir),
            });
        }

        if self.target_url.is_empty() || self.target_url.contains('"') {
            return Err(SetupError::InvalidParam {
                field: "target_url",
                reason: format!("'{}' is not a usable URL", self.target_url),
            });
        }
        Ok(())
    }

    /// Install directory without a trailing backslash.
    pub(crate) fn install_dir(&self) -> &str {
        self.install_dir.trim_end_matches('\\')
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Build the `ie-setup.zip` bundle bytes.
///
/// Entries, in order: `install.bat`, `ie-launcher.vbs`, `uninstall.bat`,
/// `scanner.reg`.
pub fn build_bundle(params: &SetupParams) -> Result<Vec<u8>, SetupError> {
    params.validate()?;

    let entries: [(&'static str, String); 4] = [
        (INSTALL_FILE_NAME, install_bat(params)),
        (LAUNCHER_FILE_NAME, launcher_vbs(params)),
        (UNINSTALL_FILE_NAME, uninstall_bat(params)),
        (REGISTRY_FILE_NAME, registry_file(params)),
    ];

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, body) in entries {
        writer.start_file(name, options)?;
        writer
            .write_all(body.as_bytes())
            .map_err(|source| SetupError::Entry { name, source })?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Percent-encode a URL query component the way `encodeURIComponent` does.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Build `<protocol>://login?id=<id>&pw=<password>` with both values encoded.
pub fn login_url(protocol: &str, id: &str, password: &str) -> String {
    format!(
        "{protocol}://login?id={}&pw={}",
        encode_component(id),
        encode_component(password)
    )
}

/// Same as [`login_url`] with the password replaced by `****`.
pub fn masked_login_url(protocol: &str, id: &str) -> String {
    format!("{protocol}://login?id={}&pw=****", encode_component(id))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
