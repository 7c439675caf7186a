//! The session run log: an ordered, timestamped stream of progress lines.
//!
//! Every step of a save appends a [`LogEntry`] to the session's [`RunLog`].
//! The log is plain data. Front ends read it back through
//! [`crate::session::ScanSession::log`], or receive each entry as it is
//! appended by injecting an [`Arc<dyn LogObserver>`] via
//! [`crate::config::SessionConfigBuilder::observer`].
//!
//! Entries are also mirrored to `tracing` (info / error level), so a
//! subscriber sees the same story without an observer.
//!
//! # Example
//!
//! ```rust
//! use scan2png::{LogEntry, LogObserver, SessionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     seen: AtomicUsize,
//! }
//!
//! impl LogObserver for CountingObserver {
//!     fn on_entry(&self, entry: &LogEntry) {
//!         self.seen.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{entry}");
//!     }
//! }
//!
//! let config = SessionConfig::builder()
//!     .observer(Arc::new(CountingObserver { seen: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Marker prefixed to every error line.
pub const ERROR_MARKER: &str = "[error]";

/// Marker prefixed to informational notices (fallbacks, hints).
pub const NOTICE_MARKER: &str = "[notice]";

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
    Success,
}

/// Fixed leading wording of every success line the pipeline writes.
const SUCCESS_PREFIXES: &[&str] = &[
    "Saved ",
    "Conversion complete",
    "Folder save complete",
    "scan-files.zip download complete",
    "IE auto login launch complete",
];

impl Severity {
    /// Infer a severity from message text alone.
    ///
    /// Only the fixed wording a line starts with is read: a line opening
    /// with [`ERROR_MARKER`] is an error, one opening with a known
    /// completion phrase (or a finished PDF page) is a success, and
    /// anything else is informational. File names embedded later in a
    /// line never change the result. Front ends that only keep the
    /// rendered text use this to colour it.
    pub fn infer(message: &str) -> Self {
        if message.starts_with(ERROR_MARKER) {
            Severity::Error
        } else if SUCCESS_PREFIXES.iter().any(|p| message.starts_with(p))
            || (message.starts_with("PDF page ") && message.ends_with("→ PNG complete"))
        {
            Severity::Success
        } else {
            Severity::Info
        }
    }
}

/// One line of the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Receives each log entry as it is appended.
///
/// Implementations must be `Send + Sync` so a session can be moved into a
/// spawned task. The single method has a default no-op implementation.
pub trait LogObserver: Send + Sync {
    /// Called once per appended entry, in append order.
    fn on_entry(&self, entry: &LogEntry) {
        let _ = entry;
    }
}

/// A no-op observer for callers that only read the log afterwards.
pub struct NoopObserver;

impl LogObserver for NoopObserver {}

/// Append-only log owned by one session.
#[derive(Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
    observer: Option<Arc<dyn LogObserver>>,
}

impl fmt::Debug for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLog")
            .field("entries", &self.entries.len())
            .field("observer", &self.observer.as_ref().map(|_| "<dyn LogObserver>"))
            .finish()
    }
}

impl RunLog {
    pub fn new(observer: Option<Arc<dyn LogObserver>>) -> Self {
        Self {
            entries: Vec::new(),
            observer,
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message.into());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Severity::Success, message.into());
    }

    /// Append an error line; the [`ERROR_MARKER`] is prefixed here.
    pub fn error(&mut self, message: impl fmt::Display) {
        self.push(Severity::Error, format!("{ERROR_MARKER} {message}"));
    }

    /// Append an informational notice; the [`NOTICE_MARKER`] is prefixed here.
    pub fn notice(&mut self, message: impl fmt::Display) {
        self.push(Severity::Info, format!("{NOTICE_MARKER} {message}"));
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all history. Only a full session reset calls this.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, severity: Severity, message: String) {
        match severity {
            Severity::Error => error!(target: "scan2png::log", "{}", message),
            _ => info!(target: "scan2png::log", "{}", message),
        }

        let entry = LogEntry {
            timestamp: Local::now(),
            severity,
            message,
        };
        if let Some(ref observer) = self.observer {
            observer.on_entry(&entry);
        }
        self.entries.push(entry);
    }
}
