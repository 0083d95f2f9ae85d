//! # ITF (Interleaved 2 of 5)
//!
//! Digits travel in pairs: five bars carry one digit, the five interleaved
//! spaces the next. Each pair therefore spans ten runs holding exactly four
//! wide and six narrow elements, which pins the narrow/wide threshold at the
//! midpoint of the sixth and seventh sorted widths. A 14-digit symbol with a
//! valid mod-10 check relabels itself ITF-14.

use super::{leading_quiet_ok, offset_of, trailing_quiet_ok, OneDResult};
use crate::decoder::BarcodeFormat;
use crate::oned::ean::mod10_weight31_ok;

/// Wide-element patterns for digits 0..=9 (1 = wide).
const DIGIT_PATTERNS: [[u8; 5]; 10] = [
    [0, 0, 1, 1, 0],
    [1, 0, 0, 0, 1],
    [0, 1, 0, 0, 1],
    [1, 1, 0, 0, 0],
    [0, 0, 1, 0, 1],
    [1, 0, 1, 0, 0],
    [0, 1, 1, 0, 0],
    [0, 0, 0, 1, 1],
    [1, 0, 0, 1, 0],
    [0, 1, 0, 1, 0],
];

/// Decode an ITF symbol from one row of runs.
pub fn decode_row(row: &[u16], row_y: usize) -> Option<OneDResult> {
    let mut i = 1;
    while i + 4 <= row.len() {
        if let Some(result) = try_decode_at(row, i, row_y) {
            return Some(result);
        }
        i += 2;
    }
    None
}

fn try_decode_at(row: &[u16], start: usize, row_y: usize) -> Option<OneDResult> {
    // Start pattern: four narrow runs.
    let guard = row.get(start..start + 4)?;
    let narrow = guard.iter().map(|&r| r as f32).sum::<f32>() / 4.0;
    if narrow < 1.0 {
        return None;
    }
    if guard
        .iter()
        .any(|&r| (r as f32 - narrow).abs() >= narrow / 2.0)
    {
        return None;
    }
    if !leading_quiet_ok(row, start, 10.0 * narrow) {
        return None;
    }

    let mut digits: Vec<u8> = Vec::new();
    let mut index = start + 4;
    // Pairs keep coming until only the three end-pattern runs (plus the
    // trailing quiet zone) remain.
    loop {
        if let Some(end) = row.get(index..index + 3) {
            if is_end_pattern(end, narrow)
                && trailing_quiet_ok(row, index + 3, 10.0 * narrow)
            {
                break;
            }
        }
        let pair = row.get(index..index + 10)?;
        let (first, second) = decode_pair(pair)?;
        digits.push(first);
        digits.push(second);
        index += 10;
    }
    let end_index = index + 3;

    if digits.len() < 6 {
        return None;
    }
    let format = if digits.len() == 14 {
        // ITF-14 carries a mandatory mod-10 check digit.
        if !mod10_weight31_ok(&digits) {
            return None;
        }
        BarcodeFormat::Itf14
    } else {
        BarcodeFormat::Itf
    };

    Some(OneDResult {
        text: digits.iter().map(|&d| (b'0' + d) as char).collect(),
        format,
        start_x: offset_of(row, start),
        end_x: offset_of(row, end_index),
        row_y,
    })
}

/// End pattern: wide bar, narrow space, narrow bar.
fn is_end_pattern(runs: &[u16], narrow: f32) -> bool {
    let wide_ok = (1.8..=4.5).contains(&(runs[0] as f32 / narrow));
    let narrow_ok = |r: u16| (0.5..=1.5).contains(&(r as f32 / narrow));
    wide_ok && narrow_ok(runs[1]) && narrow_ok(runs[2])
}

/// Decode ten interleaved runs into two digits. The bars (even offsets)
/// carry the first digit, the spaces the second.
fn decode_pair(runs: &[u16]) -> Option<(u8, u8)> {
    let mut sorted: [u16; 10] = runs.try_into().ok()?;
    sorted.sort_unstable();
    if sorted[0] == 0 {
        return None;
    }
    // Exactly six narrow and four wide elements per pair.
    let threshold = (sorted[5] as f32 + sorted[6] as f32) / 2.0;
    if sorted[5] as f32 >= threshold || (sorted[6] as f32) < threshold {
        return None;
    }

    let mut bars = [0u8; 5];
    let mut spaces = [0u8; 5];
    for k in 0..5 {
        bars[k] = (runs[2 * k] as f32 > threshold) as u8;
        spaces[k] = (runs[2 * k + 1] as f32 > threshold) as u8;
    }
    let first = DIGIT_PATTERNS.iter().position(|p| *p == bars)? as u8;
    let second = DIGIT_PATTERNS.iter().position(|p| *p == spaces)? as u8;
    Some((first, second))
}

// ============================================================================
// TESTS
// ============================================================================
