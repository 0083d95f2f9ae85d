//! # Codabar
//!
//! Seven elements per character (four bars, three spaces). The A-D letters
//! appear only as start/stop guards and are stripped from the text. No
//! checksum is defined by the symbology.

use super::{leading_quiet_ok, offset_of, trailing_quiet_ok, OneDResult};
use crate::decoder::BarcodeFormat;

const ALPHABET: &[u8; 20] = b"0123456789-$:/.+ABCD";

/// Wide-element masks, bit `6 - i` set when element `i` is wide.
#[rustfmt::skip]
const CHARACTER_MASKS: [u8; 20] = [
    0x03, 0x06, 0x09, 0x60, 0x12, 0x42, 0x21, 0x24, 0x30, 0x48, // 0-9
    0x0C, 0x18, 0x45, 0x51, 0x54, 0x15,                         // - $ : / . +
    0x1A, 0x29, 0x0B, 0x0E,                                     // A B C D
];

/// Indices of the start/stop guard letters in [`ALPHABET`].
const GUARD_RANGE: std::ops::Range<usize> = 16..20;

/// Decode a Codabar symbol from one row of runs.
pub fn decode_row(row: &[u16], row_y: usize) -> Option<OneDResult> {
    let mut i = 1;
    while i + 7 <= row.len() {
        if let Some(result) = try_decode_at(row, i, row_y) {
            return Some(result);
        }
        i += 2;
    }
    None
}

fn try_decode_at(row: &[u16], start: usize, row_y: usize) -> Option<OneDResult> {
    let (first, narrow) = classify(row.get(start..start + 7)?)?;
    if !GUARD_RANGE.contains(&first) {
        return None;
    }
    if !leading_quiet_ok(row, start, 10.0 * narrow) {
        return None;
    }

    let mut chars: Vec<usize> = Vec::new();
    let mut index = start + 7;
    loop {
        let gap = *row.get(index)?;
        if gap as f32 > 2.0 * narrow {
            return None;
        }
        index += 1;
        let (position, _) = classify(row.get(index..index + 7)?)?;
        index += 7;
        if GUARD_RANGE.contains(&position) {
            break; // closing guard letter
        }
        chars.push(position);
    }
    if !trailing_quiet_ok(row, index, 10.0 * narrow) {
        return None;
    }
    if chars.is_empty() {
        return None;
    }

    Some(OneDResult {
        text: chars.iter().map(|&c| ALPHABET[c] as char).collect(),
        format: BarcodeFormat::Codabar,
        start_x: offset_of(row, start),
        end_x: offset_of(row, index),
        row_y,
    })
}

/// Classify seven elements: narrow is the mean of the four smallest widths,
/// wide the mean of the three largest, ratio in [1.5, 4.0].
fn classify(elements: &[u16]) -> Option<(usize, f32)> {
    let mut sorted: [u16; 7] = elements.try_into().ok()?;
    sorted.sort_unstable();
    if sorted[0] == 0 {
        return None;
    }
    let narrow = sorted[..4].iter().map(|&w| w as f32).sum::<f32>() / 4.0;
    let wide = sorted[4..].iter().map(|&w| w as f32).sum::<f32>() / 3.0;
    let ratio = wide / narrow;
    if !(1.5..=4.0).contains(&ratio) {
        return None;
    }
    let threshold = (narrow + wide) / 2.0;
    let mut mask = 0u8;
    for (i, &width) in elements.iter().enumerate() {
        if width as f32 > threshold {
            mask |= 1 << (6 - i);
        }
    }
    let position = CHARACTER_MASKS.iter().position(|&m| m == mask)?;
    Some((position, narrow))
}

// ============================================================================
// TESTS
// ============================================================================
