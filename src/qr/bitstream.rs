//! # Bitstream Parser
//!
//! Parses the corrected data codewords into text: a sequence of segments,
//! each a 4-bit mode indicator, a version-dependent character count and the
//! payload, ended by the terminator or by running out of bits.

use crate::common::BitSource;
use crate::error::{DecodeKind, LectoraError};
use crate::qr::kanji;
use crate::qr::version::Version;

const ALPHANUMERIC_CHARS: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

// Mode indicators.
const MODE_TERMINATOR: u32 = 0x0;
const MODE_NUMERIC: u32 = 0x1;
const MODE_ALPHANUMERIC: u32 = 0x2;
const MODE_BYTE: u32 = 0x4;
const MODE_KANJI: u32 = 0x8;

/// Parsed payload of one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStream {
    pub text: String,
    /// Raw bytes of every Byte-mode segment, in order.
    pub byte_segments: Vec<Vec<u8>>,
}

/// Character-count field width for a mode at a version.
fn count_bits(mode: u32, version: Version) -> usize {
    let band = match version.number() {
        1..=9 => 0,
        10..=26 => 1,
        _ => 2,
    };
    match mode {
        MODE_NUMERIC => [10, 12, 14][band],
        MODE_ALPHANUMERIC => [9, 11, 13][band],
        MODE_BYTE => [8, 16, 16][band],
        MODE_KANJI => [8, 10, 12][band],
        _ => 0,
    }
}

/// Parse corrected data codewords into text and byte segments.
pub fn parse(bytes: &[u8], version: Version) -> Result<ParsedStream, LectoraError> {
    let mut bits = BitSource::new(bytes);
    let mut text = String::new();
    let mut byte_segments = Vec::new();

    loop {
        let mode = if bits.available() < 4 {
            MODE_TERMINATOR
        } else {
            bits.read_bits(4)?
        };
        if mode == MODE_TERMINATOR {
            break;
        }
        if !matches!(mode, MODE_NUMERIC | MODE_ALPHANUMERIC | MODE_BYTE | MODE_KANJI) {
            // ECI, FNC1, structured append, Hanzi.
            return Err(LectoraError::Decode(DecodeKind::UnsupportedMode));
        }
        let count = bits.read_bits(count_bits(mode, version))? as usize;
        match mode {
            MODE_NUMERIC => decode_numeric(&mut bits, count, &mut text)?,
            MODE_ALPHANUMERIC => decode_alphanumeric(&mut bits, count, &mut text)?,
            MODE_BYTE => {
                let segment = decode_byte(&mut bits, count, &mut text)?;
                byte_segments.push(segment);
            }
            _ => decode_kanji(&mut bits, count, &mut text)?,
        }
    }
    Ok(ParsedStream { text, byte_segments })
}

/// Digits in groups of three (10 bits), two (7 bits), one (4 bits),
/// zero-padded on the left within each group.
fn decode_numeric(
    bits: &mut BitSource<'_>,
    mut count: usize,
    text: &mut String,
) -> Result<(), LectoraError> {
    use std::fmt::Write;
    while count >= 3 {
        let group = bits.read_bits(10)?;
        if group >= 1000 {
            return Err(LectoraError::Decode(DecodeKind::Structure));
        }
        let _ = write!(text, "{group:03}");
        count -= 3;
    }
    if count == 2 {
        let group = bits.read_bits(7)?;
        if group >= 100 {
            return Err(LectoraError::Decode(DecodeKind::Structure));
        }
        let _ = write!(text, "{group:02}");
    } else if count == 1 {
        let digit = bits.read_bits(4)?;
        if digit >= 10 {
            return Err(LectoraError::Decode(DecodeKind::Structure));
        }
        let _ = write!(text, "{digit}");
    }
    Ok(())
}

/// Character pairs packed as `first * 45 + second` in 11 bits, trailing
/// single in 6.
fn decode_alphanumeric(
    bits: &mut BitSource<'_>,
    mut count: usize,
    text: &mut String,
) -> Result<(), LectoraError> {
    let push = |text: &mut String, value: u32| -> Result<(), LectoraError> {
        if value >= 45 {
            return Err(LectoraError::Decode(DecodeKind::Structure));
        }
        text.push(ALPHANUMERIC_CHARS[value as usize] as char);
        Ok(())
    };
    while count >= 2 {
        let pair = bits.read_bits(11)?;
        if pair >= 45 * 45 {
            return Err(LectoraError::Decode(DecodeKind::Structure));
        }
        push(text, pair / 45)?;
        push(text, pair % 45)?;
        count -= 2;
    }
    if count == 1 {
        let single = bits.read_bits(6)?;
        push(text, single)?;
    }
    Ok(())
}

/// Raw bytes, interpreted as UTF-8 with a Latin-1 fallback. The text
/// interpretation never fails the decode; the raw segment is kept either
/// way.
fn decode_byte(
    bits: &mut BitSource<'_>,
    count: usize,
    text: &mut String,
) -> Result<Vec<u8>, LectoraError> {
    let mut segment = Vec::with_capacity(count);
    for _ in 0..count {
        segment.push(bits.read_bits(8)? as u8);
    }
    match std::str::from_utf8(&segment) {
        Ok(s) => text.push_str(s),
        Err(_) => text.extend(segment.iter().map(|&b| b as char)),
    }
    Ok(segment)
}

/// 13-bit values unpacked back into Shift-JIS pairs.
fn decode_kanji(
    bits: &mut BitSource<'_>,
    count: usize,
    text: &mut String,
) -> Result<(), LectoraError> {
    for _ in 0..count {
        let value = bits.read_bits(13)?;
        let assembled = ((value / 0xC0) << 8) | (value % 0xC0);
        let sjis = assembled + if assembled < 0x1F00 { 0x8140 } else { 0xC140 };
        text.push(kanji::decode_pair((sjis >> 8) as u8, (sjis & 0xFF) as u8));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
