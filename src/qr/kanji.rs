//! # Shift-JIS to Unicode
//!
//! Decoding support for QR Kanji mode, whose 13-bit values always unpack to
//! Shift-JIS double-byte pairs. Coverage is deliberately partial: the two
//! JIS X 0208 rows that Kanji-mode payloads overwhelmingly use in the wild
//! (row 4 hiragana, row 5 katakana). Everything else maps to U+FFFD rather
//! than failing the decode.

/// Decode one Shift-JIS double-byte pair.
pub fn decode_pair(lead: u8, trail: u8) -> char {
    let Some((row, cell)) = sjis_to_jis(lead, trail) else {
        return char::REPLACEMENT_CHARACTER;
    };
    match row {
        // Row 4: hiragana, cells 1..=83 -> U+3041..U+3093.
        4 if (1..=83).contains(&cell) => {
            char::from_u32(0x3041 + cell as u32 - 1).unwrap_or(char::REPLACEMENT_CHARACTER)
        }
        // Row 5: katakana, cells 1..=86 -> U+30A1..U+30F6.
        5 if (1..=86).contains(&cell) => {
            char::from_u32(0x30A1 + cell as u32 - 1).unwrap_or(char::REPLACEMENT_CHARACTER)
        }
        _ => char::REPLACEMENT_CHARACTER,
    }
}

/// Shift-JIS lead/trail to JIS X 0208 (row, cell), both 1-based.
fn sjis_to_jis(lead: u8, trail: u8) -> Option<(u8, u8)> {
    let valid_lead = matches!(lead, 0x81..=0x9F | 0xE0..=0xEF);
    let valid_trail = matches!(trail, 0x40..=0x7E | 0x80..=0xFC);
    if !valid_lead || !valid_trail {
        return None;
    }
    let lead = if lead >= 0xE0 { lead - 0x40 } else { lead };
    let k = lead - 0x81;
    let t = trail - if trail >= 0x80 { 0x41 } else { 0x40 };
    let row = 2 * k + 1 + (t >= 94) as u8;
    let cell = t % 94 + 1;
    Some((row, cell))
}
