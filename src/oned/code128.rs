//! # Code 128
//!
//! Every character is 11 modules in 6 runs (bar-space alternating, starting
//! on a bar); the stop pattern is 13 modules in 7 runs. Characters decode by
//! smallest total absolute-module error against the pattern table. Code-set
//! switches are honoured, FNC1 is emitted as GS (0x1D) in every set, and the
//! other FNC/shift codes are skipped in text output.

use super::{leading_quiet_ok, offset_of, trailing_quiet_ok, OneDResult};
use crate::decoder::BarcodeFormat;

const START_A: u8 = 103;
const START_B: u8 = 104;
const START_C: u8 = 105;
const CODE_FNC1: u8 = 102;
const CODE_SWITCH_A: u8 = 101;
const CODE_SWITCH_B: u8 = 100;
const CODE_SWITCH_C: u8 = 99;

/// ASCII Group Separator, the GS1-128 representation of FNC1.
const GS: char = '\u{1D}';

/// Largest accepted total absolute-module error for one character.
const MAX_MODULE_ERROR: f32 = 3.0;

/// Run widths of code values 0..=105, 11 modules each.
#[rustfmt::skip]
const CODE_PATTERNS: [[u8; 6]; 106] = [
    [2, 1, 2, 2, 2, 2], [2, 2, 2, 1, 2, 2], [2, 2, 2, 2, 2, 1], [1, 2, 1, 2, 2, 3],
    [1, 2, 1, 3, 2, 2], [1, 3, 1, 2, 2, 2], [1, 2, 2, 2, 1, 3], [1, 2, 2, 3, 1, 2],
    [1, 3, 2, 2, 1, 2], [2, 2, 1, 2, 1, 3], [2, 2, 1, 3, 1, 2], [2, 3, 1, 2, 1, 2],
    [1, 1, 2, 2, 3, 2], [1, 2, 2, 1, 3, 2], [1, 2, 2, 2, 3, 1], [1, 1, 3, 2, 2, 2],
    [1, 2, 3, 1, 2, 2], [1, 2, 3, 2, 2, 1], [2, 2, 3, 2, 1, 1], [2, 2, 1, 1, 3, 2],
    [2, 2, 1, 2, 3, 1], [2, 1, 3, 2, 1, 2], [2, 2, 3, 1, 1, 2], [3, 1, 2, 1, 3, 1],
    [3, 1, 1, 2, 2, 2], [3, 2, 1, 1, 2, 2], [3, 2, 1, 2, 2, 1], [3, 1, 2, 2, 1, 2],
    [3, 2, 2, 1, 1, 2], [3, 2, 2, 2, 1, 1], [2, 1, 2, 1, 2, 3], [2, 1, 2, 3, 2, 1],
    [2, 3, 2, 1, 2, 1], [1, 1, 1, 3, 2, 3], [1, 3, 1, 1, 2, 3], [1, 3, 1, 3, 2, 1],
    [1, 1, 2, 3, 1, 3], [1, 3, 2, 1, 1, 3], [1, 3, 2, 3, 1, 1], [2, 1, 1, 3, 1, 3],
    [2, 3, 1, 1, 1, 3], [2, 3, 1, 3, 1, 1], [1, 1, 2, 1, 3, 3], [1, 1, 2, 3, 3, 1],
    [1, 3, 2, 1, 3, 1], [1, 1, 3, 1, 2, 3], [1, 1, 3, 3, 2, 1], [1, 3, 3, 1, 2, 1],
    [3, 1, 3, 1, 2, 1], [2, 1, 1, 3, 3, 1], [2, 3, 1, 1, 3, 1], [2, 1, 3, 1, 1, 3],
    [2, 1, 3, 3, 1, 1], [2, 1, 3, 1, 3, 1], [3, 1, 1, 1, 2, 3], [3, 1, 1, 3, 2, 1],
    [3, 3, 1, 1, 2, 1], [3, 1, 2, 1, 1, 3], [3, 1, 2, 3, 1, 1], [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1], [2, 2, 1, 4, 1, 1], [4, 3, 1, 1, 1, 1], [1, 1, 1, 2, 2, 4],
    [1, 1, 1, 4, 2, 2], [1, 2, 1, 1, 2, 4], [1, 2, 1, 4, 2, 1], [1, 4, 1, 1, 2, 2],
    [1, 4, 1, 2, 2, 1], [1, 1, 2, 2, 1, 4], [1, 1, 2, 4, 1, 2], [1, 2, 2, 1, 1, 4],
    [1, 2, 2, 4, 1, 1], [1, 4, 2, 1, 1, 2], [1, 4, 2, 2, 1, 1], [2, 4, 1, 2, 1, 1],
    [2, 2, 1, 1, 1, 4], [4, 1, 3, 1, 1, 1], [2, 4, 1, 1, 1, 2], [1, 3, 4, 1, 1, 1],
    [1, 1, 1, 2, 4, 2], [1, 2, 1, 1, 4, 2], [1, 2, 1, 2, 4, 1], [1, 1, 4, 2, 1, 2],
    [1, 2, 4, 1, 1, 2], [1, 2, 4, 2, 1, 1], [4, 1, 1, 2, 1, 2], [4, 2, 1, 1, 1, 2],
    [4, 2, 1, 2, 1, 1], [2, 1, 2, 1, 4, 1], [2, 1, 4, 1, 2, 1], [4, 1, 2, 1, 2, 1],
    [1, 1, 1, 1, 4, 3], [1, 1, 1, 3, 4, 1], [1, 3, 1, 1, 4, 1], [1, 1, 4, 1, 1, 3],
    [1, 1, 4, 3, 1, 1], [4, 1, 1, 1, 1, 3], [4, 1, 1, 3, 1, 1], [1, 1, 3, 1, 4, 1],
    [1, 1, 4, 1, 3, 1], [3, 1, 1, 1, 4, 1], [4, 1, 1, 1, 3, 1], [2, 1, 1, 4, 1, 2],
    [2, 1, 1, 2, 1, 4], [2, 1, 1, 2, 3, 2],
];

/// Stop pattern, 13 modules in 7 runs.
const STOP_PATTERN: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

/// Decode a Code 128 symbol from one row of runs.
pub fn decode_row(row: &[u16], row_y: usize) -> Option<OneDResult> {
    let mut i = 1;
    while i + 6 <= row.len() {
        if let Some(result) = try_decode_at(row, i, row_y) {
            return Some(result);
        }
        i += 2;
    }
    None
}

fn try_decode_at(row: &[u16], start: usize, row_y: usize) -> Option<OneDResult> {
    let start_code = decode_char(row.get(start..start + 6)?)?;
    if !(START_A..=START_C).contains(&start_code) {
        return None;
    }
    let module = module_width(row.get(start..start + 6)?, 11);
    if !leading_quiet_ok(row, start, 10.0 * module) {
        return None;
    }

    let mut codes = vec![start_code];
    let mut index = start + 6;
    loop {
        // Stop pattern first: its 7-run shape would otherwise shadow a
        // plausible 6-run character.
        if let Some(stop) = row.get(index..index + 7) {
            if stop_error(stop) <= MAX_MODULE_ERROR {
                break;
            }
        }
        let code = decode_char(row.get(index..index + 6)?)?;
        codes.push(code);
        index += 6;
    }
    let stop_end = index + 7;
    if !trailing_quiet_ok(row, stop_end, 10.0 * module) {
        return None;
    }

    // The code before the stop is the mod-103 check character.
    if codes.len() < 3 {
        return None;
    }
    let check = codes[codes.len() - 1];
    let mut sum = codes[0] as usize;
    for (position, &code) in codes[1..codes.len() - 1].iter().enumerate() {
        sum += (position + 1) * code as usize;
    }
    if sum % 103 != check as usize {
        return None;
    }

    let text = assemble_text(&codes[..codes.len() - 1])?;
    if text.is_empty() {
        return None;
    }
    Some(OneDResult {
        text,
        format: BarcodeFormat::Code128,
        start_x: offset_of(row, start),
        end_x: offset_of(row, stop_end),
        row_y,
    })
}

/// Total absolute-module error of six runs against every code pattern;
/// smallest error at most [`MAX_MODULE_ERROR`] wins.
fn decode_char(observed: &[u16]) -> Option<u8> {
    let total: u32 = observed.iter().map(|&r| r as u32).sum();
    if total == 0 {
        return None;
    }
    let mut best = MAX_MODULE_ERROR;
    let mut best_code = None;
    for (code, pattern) in CODE_PATTERNS.iter().enumerate() {
        let mut error = 0.0f32;
        for (&run, &expected) in observed.iter().zip(pattern.iter()) {
            error += (run as f32 * 11.0 / total as f32 - expected as f32).abs();
        }
        if error < best {
            best = error;
            best_code = Some(code as u8);
        }
    }
    best_code
}

fn stop_error(observed: &[u16]) -> f32 {
    let total: u32 = observed.iter().map(|&r| r as u32).sum();
    if total == 0 {
        return f32::MAX;
    }
    let mut error = 0.0f32;
    for (&run, &expected) in observed.iter().zip(STOP_PATTERN.iter()) {
        error += (run as f32 * 13.0 / total as f32 - expected as f32).abs();
    }
    error
}

fn module_width(observed: &[u16], modules: u32) -> f32 {
    let total: u32 = observed.iter().map(|&r| r as u32).sum();
    total as f32 / modules as f32
}

/// Expand the code sequence (start + data, check excluded) into text.
///
/// Code-set bookkeeping follows the label semantics: 99/100/101 switch to
/// C/B/A in every set, FNC1 maps to GS everywhere, and the remaining
/// shift/FNC codes (96..=98 in sets A and B) produce no output.
fn assemble_text(codes: &[u8]) -> Option<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Set {
        A,
        B,
        C,
    }
    let mut set = match codes[0] {
        START_A => Set::A,
        START_B => Set::B,
        START_C => Set::C,
        _ => return None,
    };
    let mut text = String::new();
    for &code in &codes[1..] {
        match (set, code) {
            (_, CODE_FNC1) => text.push(GS),
            (_, CODE_SWITCH_C) if set != Set::C => set = Set::C,
            (Set::C, value) if value < 100 => {
                text.push((b'0' + value / 10) as char);
                text.push((b'0' + value % 10) as char);
            }
            (Set::C, CODE_SWITCH_B) => set = Set::B,
            (Set::C, CODE_SWITCH_A) => set = Set::A,
            (_, value) if value <= 63 => text.push((b' ' + value) as char),
            (Set::A, value) if value <= 95 => text.push((value - 64) as char),
            (Set::B, value) if value <= 95 => text.push((value + 32) as char),
            (_, 96..=98) => {} // FNC2, FNC3, shifts: skipped in text output
            (_, CODE_SWITCH_B) => set = Set::B,
            (_, CODE_SWITCH_A) => set = Set::A,
            _ => return None,
        }
    }
    Some(text)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(quiet: u16, body: &[&[u8]], scale: u16) -> Vec<u16> {
        // Character groups are bar-first with an even run count (the stop
        // pattern excepted), so adjacent groups never merge runs.
        let mut out = vec![quiet * scale];
        for group in body {
            for &w in group.iter() {
                out.push(w as u16 * scale);
            }
        }
        out.push(quiet * scale);
        out
    }

    #[test]
    fn test_single_char_set_b() {
        // Start B, 'A' (33), check 34, stop; 20-module quiet zones.
        let body: Vec<&[u8]> = vec![
            &[2, 1, 1, 2, 1, 4],
            &[1, 1, 1, 3, 2, 3],
            &[1, 3, 1, 1, 2, 3],
            &[2, 3, 3, 1, 1, 1, 2],
        ];
        let row = runs(20, &body, 2);
        let result = decode_row(&row, 0).unwrap();
        assert_eq!(result.text, "A");
        assert_eq!(result.format, BarcodeFormat::Code128);
        assert_eq!(result.start_x, 40);
        assert_eq!(result.end_x, 40 + (11 * 3 + 13) * 2);
    }

    #[test]
    fn test_bad_check_char_rejected() {
        // Same symbol with the check pattern replaced by code 35.
        let body: Vec<&[u8]> = vec![
            &[2, 1, 1, 2, 1, 4],
            &[1, 1, 1, 3, 2, 3],
            &[1, 3, 1, 3, 2, 1],
            &[2, 3, 3, 1, 1, 1, 2],
        ];
        let row = runs(20, &body, 2);
        assert!(decode_row(&row, 0).is_none());
    }

    #[test]
    fn test_set_c_digit_pairs() {
        // Start C, "12" (12), "34" (34), check, stop.
        // check = (105 + 1*12 + 2*34) mod 103 = 185 mod 103 = 82.
        let body: Vec<&[u8]> = vec![
            CODE_PATTERNS[105].as_slice(),
            CODE_PATTERNS[12].as_slice(),
            CODE_PATTERNS[34].as_slice(),
            CODE_PATTERNS[82].as_slice(),
            STOP_PATTERN.as_slice(),
        ];
        let row = runs(15, &body, 3);
        let result = decode_row(&row, 0).unwrap();
        assert_eq!(result.text, "1234");
    }

    #[test]
    fn test_set_switch_c_to_b() {
        // Start C, "99" (99 is data in set C), switch B (100), 'a' (65),
        // check = (105 + 1*99 + 2*100 + 3*65) mod 103 = 599 mod 103 = 84.
        let body: Vec<&[u8]> = vec![
            CODE_PATTERNS[105].as_slice(),
            CODE_PATTERNS[99].as_slice(),
            CODE_PATTERNS[100].as_slice(),
            CODE_PATTERNS[65].as_slice(),
            CODE_PATTERNS[84].as_slice(),
            STOP_PATTERN.as_slice(),
        ];
        let row = runs(12, &body, 2);
        let result = decode_row(&row, 0).unwrap();
        assert_eq!(result.text, "99a");
    }

    #[test]
    fn test_fnc1_emits_gs() {
        // Start C, FNC1 (102), "01" (1), check = (105 + 102 + 2*1) % 103 = 3.
        let body: Vec<&[u8]> = vec![
            CODE_PATTERNS[105].as_slice(),
            CODE_PATTERNS[102].as_slice(),
            CODE_PATTERNS[1].as_slice(),
            CODE_PATTERNS[3].as_slice(),
            STOP_PATTERN.as_slice(),
        ];
        let row = runs(12, &body, 2);
        let result = decode_row(&row, 0).unwrap();
        assert_eq!(result.text, "\u{1D}01");
    }

    #[test]
    fn test_set_a_control_chars() {
        // Start A, 'H'-64?... value 40 is 'H' (32+40=72). Value 73 is
        // ASCII 9 (TAB) in set A.
        // check = (103 + 1*40 + 2*73) mod 103 = 289 mod 103 = 83.
        let body: Vec<&[u8]> = vec![
            CODE_PATTERNS[103].as_slice(),
            CODE_PATTERNS[40].as_slice(),
            CODE_PATTERNS[73].as_slice(),
            CODE_PATTERNS[83].as_slice(),
            STOP_PATTERN.as_slice(),
        ];
        let row = runs(12, &body, 2);
        let result = decode_row(&row, 0).unwrap();
        assert_eq!(result.text, "H\u{9}");
    }

    #[test]
    fn test_quiet_zone_enforced() {
        let body: Vec<&[u8]> = vec![
            &[2, 1, 1, 2, 1, 4],
            &[1, 1, 1, 3, 2, 3],
            &[1, 3, 1, 1, 2, 3],
            &[2, 3, 3, 1, 1, 1, 2],
        ];
        // 5-module quiet is under the 10-module floor.
        let row = runs(5, &body, 2);
        assert!(decode_row(&row, 0).is_none());
    }
}
