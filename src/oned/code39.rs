//! # Code 39
//!
//! Nine elements per character (five bars, four spaces), exactly three of
//! them wide. Narrow and wide widths are derived locally per character from
//! the sorted element widths, so the symbology tolerates width drift along
//! the row. `*` delimits the symbol; an optional mod-43 check digit can be
//! required and stripped.

use super::{leading_quiet_ok, offset_of, trailing_quiet_ok, OneDResult};
use crate::decoder::BarcodeFormat;

/// Character set in mod-43 index order, with the `*` delimiter at index 43.
const ALPHABET: &[u8; 44] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%*";

/// Wide-element masks, bit `8 - i` set when element `i` is wide.
#[rustfmt::skip]
const CHARACTER_MASKS: [u16; 44] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, // 0-9
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, // A-J
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, // K-T
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4,        // U-Z, -, ., space
    0x0A8, 0x0A2, 0x08A, 0x02A, 0x094,                                    // $, /, +, %, *
];

const STAR_MASK: u16 = 0x094;

/// Decode a Code 39 symbol from one row of runs.
pub fn decode_row(row: &[u16], row_y: usize, check_digit: bool) -> Option<OneDResult> {
    let mut i = 1;
    while i + 9 <= row.len() {
        if let Some(result) = try_decode_at(row, i, row_y, check_digit) {
            return Some(result);
        }
        i += 2;
    }
    None
}

fn try_decode_at(
    row: &[u16],
    start: usize,
    row_y: usize,
    check_digit: bool,
) -> Option<OneDResult> {
    let (mask, narrow) = classify(row.get(start..start + 9)?)?;
    if mask != STAR_MASK {
        return None;
    }
    if !leading_quiet_ok(row, start, 10.0 * narrow) {
        return None;
    }

    let mut chars: Vec<u8> = Vec::new();
    let mut index = start + 9;
    loop {
        // Inter-character gap.
        let gap = *row.get(index)?;
        if gap as f32 > 2.0 * narrow {
            return None;
        }
        index += 1;
        let (mask, _) = classify(row.get(index..index + 9)?)?;
        let position = CHARACTER_MASKS.iter().position(|&m| m == mask)?;
        index += 9;
        if position == 43 {
            break; // closing '*'
        }
        chars.push(position as u8);
    }
    if !trailing_quiet_ok(row, index, 10.0 * narrow) {
        return None;
    }
    if chars.len() < 2 {
        return None;
    }

    if check_digit {
        let (&check, payload) = chars.split_last()?;
        let sum: usize = payload.iter().map(|&c| c as usize).sum();
        if sum % 43 != check as usize {
            return None;
        }
        chars.pop();
    }

    Some(OneDResult {
        text: chars.iter().map(|&c| ALPHABET[c as usize] as char).collect(),
        format: BarcodeFormat::Code39,
        start_x: offset_of(row, start),
        end_x: offset_of(row, index),
        row_y,
    })
}

/// Classify nine elements into a wide-element mask. Narrow is the mean of
/// the six smallest widths, wide the mean of the three largest; their ratio
/// must land in [1.5, 4.0].
fn classify(elements: &[u16]) -> Option<(u16, f32)> {
    let mut sorted: [u16; 9] = elements.try_into().ok()?;
    sorted.sort_unstable();
    if sorted[0] == 0 {
        return None;
    }
    let narrow = sorted[..6].iter().map(|&w| w as f32).sum::<f32>() / 6.0;
    let wide = sorted[6..].iter().map(|&w| w as f32).sum::<f32>() / 3.0;
    let ratio = wide / narrow;
    if !(1.5..=4.0).contains(&ratio) {
        return None;
    }
    let threshold = (narrow + wide) / 2.0;
    let mut mask = 0u16;
    for (i, &width) in elements.iter().enumerate() {
        if width as f32 > threshold {
            mask |= 1 << (8 - i);
        }
    }
    Some((mask, narrow))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Build runs from a module string (wide = 2 or 3 narrow), quiet-zoned.
    fn runs_for(modules: &str, quiet: u16, scale: u16) -> Vec<u16> {
        let mut runs: Vec<u16> = vec![quiet * scale];
        let mut last = '0';
        for c in modules.chars() {
            if c == last {
                *runs.last_mut().unwrap() += scale;
            } else {
                runs.push(scale);
                last = c;
            }
        }
        runs.push(quiet * scale);
        runs
    }

    // "*CODE39W*" rendered with wide = 2 narrow, 1-narrow gaps.
    const CODE39W: &str = "10010110110101101101001010110101101001010101100101101101011001010110110010101010110010110101100110101010100101101101";

    #[test]
    fn test_decode_plain() {
        let row = runs_for(CODE39W, 12, 2);
        let result = decode_row(&row, 3, false).unwrap();
        assert_eq!(result.text, "CODE39W");
        assert_eq!(result.format, BarcodeFormat::Code39);
        assert_eq!(result.row_y, 3);
    }

    #[test]
    fn test_check_digit_validated_and_stripped() {
        // "CODE39" check character is 'W' (sum 75, 75 mod 43 = 32).
        let row = runs_for(CODE39W, 12, 2);
        let result = decode_row(&row, 0, true).unwrap();
        assert_eq!(result.text, "CODE39");
    }

    #[test]
    fn test_bad_check_digit_rejected() {
        // "CODE39A": 'A' is not the mod-43 check for "CODE39".
        let modules = encode(b"CODE39A");
        let row = runs_for(&modules, 12, 2);
        assert!(decode_row(&row, 0, true).is_none());
        // Without enforcement it reads fine.
        assert_eq!(decode_row(&row, 0, false).unwrap().text, "CODE39A");
    }

    #[test]
    fn test_quiet_zone_enforced() {
        let row = runs_for(CODE39W, 5, 2);
        assert!(decode_row(&row, 0, false).is_none());
    }

    #[test]
    fn test_minimum_length() {
        // A single payload character is under the length floor.
        let modules = encode(b"7");
        let row = runs_for(&modules, 12, 2);
        assert!(decode_row(&row, 0, false).is_none());
        let modules = encode(b"77");
        let row = runs_for(&modules, 12, 2);
        assert_eq!(decode_row(&row, 0, false).unwrap().text, "77");
    }

    #[test]
    fn test_wide_gap_rejected() {
        // Stretch the first inter-character gap to 5 narrow units.
        let star = encode_char(43);
        let seven = encode_char(7);
        let modules = format!("{star}00000{seven}0{seven}0{star}");
        let row = runs_for(&modules, 12, 2);
        assert!(decode_row(&row, 0, false).is_none());
    }

    #[test]
    fn test_classify_ratio_bounds() {
        // Wide:narrow of 5 is outside the accepted envelope.
        let elements = [1u16, 1, 5, 1, 5, 1, 5, 1, 1];
        assert!(classify(&elements).is_none());
        let elements = [2u16, 2, 5, 2, 5, 2, 5, 2, 2];
        assert!(classify(&elements).is_some());
    }

    /// Reference encoder for fixtures: wide = 2, gap = 1 narrow, with
    /// start/stop stars.
    fn encode(payload: &[u8]) -> String {
        let mut parts = vec![encode_char(43)];
        for &b in payload {
            let idx = ALPHABET.iter().position(|&a| a == b).unwrap();
            parts.push(encode_char(idx));
        }
        parts.push(encode_char(43));
        parts.join("0")
    }

    fn encode_char(index: usize) -> String {
        let mask = CHARACTER_MASKS[index];
        let mut s = String::new();
        for i in 0..9 {
            let wide = mask & (1 << (8 - i)) != 0;
            let c = if i % 2 == 0 { '1' } else { '0' };
            for _ in 0..if wide { 2 } else { 1 } {
                s.push(c);
            }
        }
        s
    }

    #[test]
    fn test_fixture_encoder_matches_reference_string() {
        assert_eq!(encode(b"CODE39W"), CODE39W);
    }
}
