//! # 1D Barcode Row Scanning
//!
//! The harness binarizes once, samples five horizontal rows (10/30/50/70/90%
//! of the image height), extracts run lengths into a reusable buffer and
//! offers the runs to every enabled symbology decoder. Decoders never error:
//! an unmatched row yields `None` and exhaustion is the harness caller's
//! detection failure.

pub mod codabar;
pub mod code128;
pub mod code39;
pub mod ean;
pub mod itf;

use serde::Serialize;

use crate::common::{runs, BitMatrix};
use crate::decoder::BarcodeFormat;

/// The supported 1D symbologies, for enabling/disabling decoders.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize)]
pub enum Symbology {
    Ean13,
    Ean8,
    UpcA,
    Code128,
    Code39,
    Itf,
    Codabar,
}

/// Every supported symbology, the default configuration.
pub const ALL_SYMBOLOGIES: [Symbology; 7] = [
    Symbology::Ean13,
    Symbology::Ean8,
    Symbology::UpcA,
    Symbology::Code128,
    Symbology::Code39,
    Symbology::Itf,
    Symbology::Codabar,
];

/// Options threaded down to the row decoders.
#[derive(Clone, Debug)]
pub struct ScanOptions {
    pub symbologies: Vec<Symbology>,
    /// Require and strip the Code 39 mod-43 check digit.
    pub code39_check_digit: bool,
}

impl ScanOptions {
    fn wants(&self, symbology: Symbology) -> bool {
        self.symbologies.contains(&symbology)
    }
}

/// A 1D decoder hit: text, symbology label and coarse location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneDResult {
    pub text: String,
    pub format: BarcodeFormat,
    pub start_x: usize,
    pub end_x: usize,
    pub row_y: usize,
}

/// Scan the sample rows, first hit wins.
pub fn scan(matrix: &BitMatrix, options: &ScanOptions) -> Option<OneDResult> {
    let mut run_buf = Vec::with_capacity(256);
    for y in sample_rows(matrix.height()) {
        runs::row_runs(matrix, y, &mut run_buf);
        if let Some(result) = scan_runs(&run_buf, y, options) {
            return Some(result);
        }
    }
    None
}

/// Scan the sample rows collecting every distinct (format, text) hit.
pub fn scan_all(matrix: &BitMatrix, options: &ScanOptions) -> Vec<OneDResult> {
    let mut run_buf = Vec::with_capacity(256);
    let mut results: Vec<OneDResult> = Vec::new();
    for y in sample_rows(matrix.height()) {
        runs::row_runs(matrix, y, &mut run_buf);
        // Several symbols can sit side by side on one row; rescan the tail
        // after each hit. `offset` is a run index and stays even so the
        // white-first convention holds for the sub-slice.
        let mut offset = 0;
        while offset < run_buf.len() {
            let base_px = offset_of(&run_buf, offset);
            let Some(mut result) = scan_runs(&run_buf[offset..], y, options) else {
                break;
            };
            result.start_x += base_px;
            result.end_x += base_px;
            let end_px = result.end_x;
            let duplicate = results
                .iter()
                .any(|r| r.format == result.format && r.text == result.text);
            if !duplicate {
                results.push(result);
            }
            // Advance to the first run starting at or after the symbol end.
            let mut x = 0;
            let mut next = run_buf.len();
            for (idx, &run) in run_buf.iter().enumerate() {
                if x >= end_px && idx > offset {
                    next = idx;
                    break;
                }
                x += run as usize;
            }
            let next = next + next % 2;
            if next <= offset {
                break;
            }
            offset = next;
        }
    }
    results
}

/// Try every enabled decoder against one row of runs.
fn scan_runs(row_runs: &[u16], row_y: usize, options: &ScanOptions) -> Option<OneDResult> {
    let want_ean13 = options.wants(Symbology::Ean13);
    let want_upca = options.wants(Symbology::UpcA);
    if want_ean13 || want_upca {
        if let Some(r) = ean::decode_ean13_row(row_runs, row_y, want_ean13, want_upca) {
            return Some(r);
        }
    }
    if options.wants(Symbology::Ean8) {
        if let Some(r) = ean::decode_ean8_row(row_runs, row_y) {
            return Some(r);
        }
    }
    if options.wants(Symbology::Code128) {
        if let Some(r) = code128::decode_row(row_runs, row_y) {
            return Some(r);
        }
    }
    if options.wants(Symbology::Code39) {
        if let Some(r) = code39::decode_row(row_runs, row_y, options.code39_check_digit) {
            return Some(r);
        }
    }
    if options.wants(Symbology::Itf) {
        if let Some(r) = itf::decode_row(row_runs, row_y) {
            return Some(r);
        }
    }
    if options.wants(Symbology::Codabar) {
        if let Some(r) = codabar::decode_row(row_runs, row_y) {
            return Some(r);
        }
    }
    None
}

/// The five sampled row positions.
fn sample_rows(height: usize) -> [usize; 5] {
    [
        height / 10,
        3 * height / 10,
        height / 2,
        7 * height / 10,
        9 * height / 10,
    ]
}

// ----------------------------------------------------------------------------
// Shared run-matching primitives
// ----------------------------------------------------------------------------

/// Normalized total variance between observed runs and an expected module
/// pattern, or `f32::MAX` when any single element strays past
/// `max_individual` (in modules).
pub(crate) fn pattern_variance(observed: &[u16], pattern: &[u8], max_individual: f32) -> f32 {
    debug_assert_eq!(observed.len(), pattern.len());
    let total: u32 = observed.iter().map(|&r| r as u32).sum();
    let pattern_total: u32 = pattern.iter().map(|&p| p as u32).sum();
    if total == 0 {
        return f32::MAX;
    }
    let unit = total as f32 / pattern_total as f32;
    let max_individual = max_individual * unit;
    let mut total_variance = 0.0;
    for (&run, &expected) in observed.iter().zip(pattern.iter()) {
        let variance = (run as f32 - expected as f32 * unit).abs();
        if variance > max_individual {
            return f32::MAX;
        }
        total_variance += variance;
    }
    total_variance / total as f32
}

/// Pixel offset of the start of run `index`.
pub(crate) fn offset_of(row_runs: &[u16], index: usize) -> usize {
    row_runs[..index].iter().map(|&r| r as usize).sum()
}

/// Quiet-zone check: the white run at `index - 1` (or the left image edge)
/// must span at least `needed` pixels.
pub(crate) fn leading_quiet_ok(row_runs: &[u16], start_index: usize, needed: f32) -> bool {
    debug_assert!(start_index % 2 == 1, "start run must be dark");
    row_runs[start_index - 1] as f32 >= needed
}

/// The white run following `index` must span at least `needed` pixels.
pub(crate) fn trailing_quiet_ok(row_runs: &[u16], after_index: usize, needed: f32) -> bool {
    match row_runs.get(after_index) {
        Some(&white) => white as f32 >= needed,
        None => false,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_variance_exact_match() {
        assert!(pattern_variance(&[3, 3, 9, 3, 3], &[1, 1, 3, 1, 1], 0.5) < 1e-6);
    }

    #[test]
    fn test_pattern_variance_rejects_outlier() {
        assert_eq!(pattern_variance(&[3, 3, 3, 3, 3], &[1, 1, 3, 1, 1], 0.5), f32::MAX);
    }

    #[test]
    fn test_pattern_variance_tolerates_slack() {
        let v = pattern_variance(&[4, 3, 8, 3, 3], &[1, 1, 3, 1, 1], 0.7);
        assert!(v > 0.0 && v < 0.3, "variance = {v}");
    }

    #[test]
    fn test_offset_of() {
        assert_eq!(offset_of(&[10, 2, 3], 0), 0);
        assert_eq!(offset_of(&[10, 2, 3], 2), 12);
    }

    #[test]
    fn test_sample_rows_spread() {
        assert_eq!(sample_rows(100), [10, 30, 50, 70, 90]);
        assert_eq!(sample_rows(10), [1, 3, 5, 7, 9]);
    }
}
