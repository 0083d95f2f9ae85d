//! # QR Decoding Pipeline
//!
//! From a binarized image to text: finder-pattern search, geometric
//! detection and resampling, format/version recovery, data-mask removal,
//! codeword extraction, Reed-Solomon correction and bitstream parsing.
//!
//! Detection failures ([`crate::error::LectoraError::Detection`]) mean no
//! symbol is present; decode failures mean a symbol was found but its data
//! is damaged beyond recovery. Callers must not treat the latter as license
//! to keep searching.

pub mod bitstream;
pub mod codewords;
pub mod detect;
pub mod finder;
pub mod format;
pub mod function;
pub mod kanji;
pub mod mask;
pub mod perspective;
pub mod version;

use crate::common::BitMatrix;
use crate::error::LectoraError;
use format::EcLevel;
use mask::DataMask;

/// A successfully decoded QR symbol.
#[derive(Debug, Clone)]
pub struct QrDecoded {
    pub text: String,
    pub byte_segments: Vec<Vec<u8>>,
    pub ec_level: EcLevel,
    pub top_left: (f32, f32),
    pub top_right: (f32, f32),
    pub bottom_left: (f32, f32),
    pub alignment: Option<(f32, f32)>,
}

/// Detect and decode the single best QR symbol in a binarized image.
pub fn decode(matrix: &BitMatrix) -> Result<QrDecoded, LectoraError> {
    let triplet = finder::find(matrix)?;
    let mut detection = detect::detect(matrix, &triplet)?;
    let (parsed, ec_level) = decode_grid(&mut detection.bits)?;
    log::debug!("QR decoded: {} chars, EC {ec_level}", parsed.text.chars().count());
    Ok(QrDecoded {
        text: parsed.text,
        byte_segments: parsed.byte_segments,
        ec_level,
        top_left: detection.top_left,
        top_right: detection.top_right,
        bottom_left: detection.bottom_left,
        alignment: detection.alignment,
    })
}

/// Detect and decode every QR symbol in the image. Symbols that detect but
/// fail to decode are skipped.
pub fn decode_all(matrix: &BitMatrix) -> Vec<QrDecoded> {
    let mut results = Vec::new();
    for triplet in finder::find_all(matrix) {
        let Ok(mut detection) = detect::detect(matrix, &triplet) else {
            continue;
        };
        if let Ok((parsed, ec_level)) = decode_grid(&mut detection.bits) {
            results.push(QrDecoded {
                text: parsed.text,
                byte_segments: parsed.byte_segments,
                ec_level,
                top_left: detection.top_left,
                top_right: detection.top_right,
                bottom_left: detection.bottom_left,
                alignment: detection.alignment,
            });
        }
    }
    results
}

/// Decode a sampled module grid in place. The data mask is stripped for the
/// read and re-applied before returning on every path, leaving the grid as
/// it arrived.
pub fn decode_grid(
    bits: &mut BitMatrix,
) -> Result<(bitstream::ParsedStream, EcLevel), LectoraError> {
    let version = codewords::read_version(bits)?;
    let info = codewords::read_format_info(bits)?;
    let mask = DataMask::new(info.mask_id);

    mask.apply(bits);
    let result = (|| {
        let raw = codewords::read_codewords(bits, version)?;
        let data = codewords::correct_and_assemble(&raw, version, info.ec_level)?;
        bitstream::parse(&data, version)
    })();
    mask.apply(bits);

    Ok((result?, info.ec_level))
}

// ============================================================================
// TESTS
// ============================================================================
