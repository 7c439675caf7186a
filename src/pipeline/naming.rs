//! Naming assigner: turns pending units into named [`ConversionUnit`]s.
//!
//! One [`SequenceNamer`] lives for exactly one persistence run. Its counter
//! starts at 1 and advances once per unit, fallback units included, so the
//! names of a run are always `01.*, 02.*, …` with no gaps.

use serde::{Deserialize, Serialize};

/// Where a unit's bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitOrigin {
    /// Original PNG bytes, untouched.
    PassThrough,
    /// A raster image decoded and re-encoded as PNG.
    Reencoded,
    /// One rendered PDF page (1-based).
    PdfPage(usize),
    /// Conversion failed; the original input bytes are kept as-is.
    Fallback,
}

/// Converter output that has not been named yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUnit {
    pub bytes: Vec<u8>,
    pub extension: String,
    pub origin: UnitOrigin,
}

impl PendingUnit {
    pub fn png(bytes: Vec<u8>, origin: UnitOrigin) -> Self {
        Self {
            bytes,
            extension: "png".to_string(),
            origin,
        }
    }

    pub fn fallback(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            bytes,
            extension: extension.into(),
            origin: UnitOrigin::Fallback,
        }
    }
}

/// One output file of a persistence run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionUnit {
    /// Stem of the source file; shows up in trace output for the write.
    pub label: String,
    /// 1-based position within the run.
    pub sequence: usize,
    /// Final file name, e.g. `03.png`.
    pub name: String,
    pub bytes: Vec<u8>,
    pub extension: String,
    pub origin: UnitOrigin,
}

/// `<sequence, zero-padded to two digits>.<extension>`.
///
/// ```rust
/// use scan2png::pipeline::naming::file_name;
///
/// assert_eq!(file_name(1, "png"), "01.png");
/// assert_eq!(file_name(100, "pdf"), "100.pdf");
/// ```
pub fn file_name(sequence: usize, extension: &str) -> String {
    format!("{sequence:02}.{extension}")
}

/// Per-run sequence counter.
#[derive(Debug)]
pub struct SequenceNamer {
    label: String,
    next: usize,
}

impl SequenceNamer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            next: 1,
        }
    }

    /// Name one unit and advance the counter.
    pub fn assign(&mut self, unit: PendingUnit) -> ConversionUnit {
        let sequence = self.next;
        self.next += 1;
        ConversionUnit {
            label: self.label.clone(),
            sequence,
            name: file_name(sequence, &unit.extension),
            bytes: unit.bytes,
            extension: unit.extension,
            origin: unit.origin,
        }
    }

    /// Name every unit in order.
    pub fn assign_all(&mut self, units: Vec<PendingUnit>) -> Vec<ConversionUnit> {
        units.into_iter().map(|u| self.assign(u)).collect()
    }

    /// How many names this run has handed out.
    pub fn issued(&self) -> usize {
        self.next - 1
    }
}
