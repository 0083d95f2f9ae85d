//! # Decoder Façade
//!
//! The public entry points: configuration, result types and the dispatch
//! between the QR and 1D pipelines.
//!
//! ## Fallback policy
//!
//! A combined call runs QR first. A *detection* miss falls through - first
//! to a mirrored-image retry (mirror-oriented symbols), then to the 1D row
//! scanner. A *decode* failure surfaces immediately: a located symbol with
//! corrupt data means damaged input, and scanning for barcodes instead would
//! mask it.
//!
//! ## Example
//!
//! ```no_run
//! use lectora::{decode, DecodeOptions, LumaPlane};
//!
//! # fn main() -> Result<(), lectora::LectoraError> {
//! let gray = vec![255u8; 640 * 480];
//! let plane = LumaPlane::from_raw(&gray, 640, 480, 640)?;
//! let options = DecodeOptions::new().code39_check_digit(true);
//! match decode(&plane, &options) {
//!     Ok(result) => println!("{}: {}", result.format, result.text),
//!     Err(err) => eprintln!("{err}"),
//! }
//! # Ok(())
//! # }
//! ```

use serde::Serialize;

use crate::binarize;
use crate::error::LectoraError;
use crate::luma::LumaPlane;
use crate::oned::{self, OneDResult, ScanOptions, Symbology, ALL_SYMBOLOGIES};
use crate::qr::{self, format::EcLevel, QrDecoded};

/// Symbology label of a decode result.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize)]
pub enum BarcodeFormat {
    QrCode,
    Ean13,
    Ean8,
    UpcA,
    Code128,
    Code39,
    Itf,
    Itf14,
    Codabar,
}

impl std::fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BarcodeFormat::QrCode => "QR_CODE",
            BarcodeFormat::Ean13 => "EAN_13",
            BarcodeFormat::Ean8 => "EAN_8",
            BarcodeFormat::UpcA => "UPC_A",
            BarcodeFormat::Code128 => "CODE_128",
            BarcodeFormat::Code39 => "CODE_39",
            BarcodeFormat::Itf => "ITF",
            BarcodeFormat::Itf14 => "ITF_14",
            BarcodeFormat::Codabar => "CODABAR",
        };
        f.write_str(label)
    }
}

/// Where a symbol sat in the image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Location {
    /// QR corner points (finder centers) plus the alignment-pattern center
    /// when one was used.
    Points {
        top_left: (f32, f32),
        top_right: (f32, f32),
        bottom_left: (f32, f32),
        alignment: Option<(f32, f32)>,
    },
    /// 1D coarse location: the scanned row and the symbol's x extent.
    Row {
        start_x: usize,
        end_x: usize,
        row_y: usize,
    },
}

/// A successfully decoded symbol.
#[derive(Clone, Debug, Serialize)]
pub struct Decoded {
    /// Decoded payload text.
    pub text: String,
    /// Raw bytes of QR Byte-mode segments; empty for 1D symbols.
    pub byte_segments: Vec<Vec<u8>>,
    /// QR error-correction level; `None` for 1D symbols.
    pub ec_level: Option<EcLevel>,
    /// Symbology label.
    pub format: BarcodeFormat,
    pub location: Location,
}

/// Decoder configuration, built in the fluent style.
///
/// ```
/// use lectora::DecodeOptions;
/// use lectora::oned::Symbology;
///
/// let options = DecodeOptions::new()
///     .qr(false)
///     .symbologies(&[Symbology::Ean13, Symbology::UpcA])
///     .code39_check_digit(true);
/// # let _ = options;
/// ```
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    qr: bool,
    symbologies: Vec<Symbology>,
    code39_check_digit: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            qr: true,
            symbologies: ALL_SYMBOLOGIES.to_vec(),
            code39_check_digit: false,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include or exclude the QR pipeline.
    pub fn qr(mut self, enabled: bool) -> Self {
        self.qr = enabled;
        self
    }

    /// Restrict the enabled 1D symbologies. An empty slice disables 1D
    /// scanning entirely.
    pub fn symbologies(mut self, symbologies: &[Symbology]) -> Self {
        self.symbologies = symbologies.to_vec();
        self
    }

    /// Require and strip the Code 39 mod-43 check digit.
    pub fn code39_check_digit(mut self, required: bool) -> Self {
        self.code39_check_digit = required;
        self
    }

    fn validate(&self) -> Result<(), LectoraError> {
        if !self.qr && self.symbologies.is_empty() {
            return Err(LectoraError::InvalidInput(
                "no decoder enabled: QR disabled and symbology list empty".into(),
            ));
        }
        Ok(())
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            symbologies: self.symbologies.clone(),
            code39_check_digit: self.code39_check_digit,
        }
    }
}

/// Decode the single best symbol in the image.
pub fn decode(plane: &LumaPlane<'_>, options: &DecodeOptions) -> Result<Decoded, LectoraError> {
    options.validate()?;
    let working = plane.downsampled();
    let scale = plane.width() / working.width();
    let matrix = binarize::binarize(&working);

    if options.qr {
        match qr::decode(&matrix) {
            Ok(decoded) => return Ok(from_qr(decoded, scale)),
            Err(upright_err) => {
                // Mirror-oriented symbols detect fine but fail on format
                // info, so the mirrored retry runs on any upright failure.
                let mirrored = matrix.mirror_x();
                match qr::decode(&mirrored) {
                    Ok(decoded) => {
                        let unflipped = mirror_back(decoded, matrix.width());
                        return Ok(from_qr(unflipped, scale));
                    }
                    Err(mirrored_err) => {
                        // A decode failure on either pass means a damaged
                        // symbol; 1D fallback would mask it.
                        if upright_err.is_decode_failure() {
                            return Err(upright_err);
                        }
                        if mirrored_err.is_decode_failure() {
                            return Err(mirrored_err);
                        }
                    }
                }
            }
        }
    }

    if !options.symbologies.is_empty() {
        if let Some(result) = oned::scan(&matrix, &options.scan_options()) {
            return Ok(from_oned(result, scale));
        }
    }
    Err(LectoraError::Detection)
}

/// Decode every symbol in the image. Exhaustion yields an empty list, not an
/// error; only invalid input errors.
pub fn decode_all(
    plane: &LumaPlane<'_>,
    options: &DecodeOptions,
) -> Result<Vec<Decoded>, LectoraError> {
    options.validate()?;
    let working = plane.downsampled();
    let scale = plane.width() / working.width();
    let matrix = binarize::binarize(&working);

    let mut results = Vec::new();
    if options.qr {
        for decoded in qr::decode_all(&matrix) {
            results.push(from_qr(decoded, scale));
        }
    }
    if !options.symbologies.is_empty() {
        for result in oned::scan_all(&matrix, &options.scan_options()) {
            results.push(from_oned(result, scale));
        }
    }
    Ok(results)
}

fn from_qr(decoded: QrDecoded, scale: usize) -> Decoded {
    let s = scale as f32;
    let scale_point = |(x, y): (f32, f32)| (x * s, y * s);
    Decoded {
        text: decoded.text,
        byte_segments: decoded.byte_segments,
        ec_level: Some(decoded.ec_level),
        format: BarcodeFormat::QrCode,
        location: Location::Points {
            top_left: scale_point(decoded.top_left),
            top_right: scale_point(decoded.top_right),
            bottom_left: scale_point(decoded.bottom_left),
            alignment: decoded.alignment.map(scale_point),
        },
    }
}

fn from_oned(result: OneDResult, scale: usize) -> Decoded {
    Decoded {
        text: result.text,
        byte_segments: Vec::new(),
        ec_level: None,
        format: result.format,
        location: Location::Row {
            start_x: result.start_x * scale,
            end_x: result.end_x * scale,
            row_y: result.row_y * scale,
        },
    }
}

/// Translate corner coordinates found on a mirrored matrix back into the
/// original frame.
fn mirror_back(mut decoded: QrDecoded, width: usize) -> QrDecoded {
    let flip = |(x, y): (f32, f32)| (width as f32 - 1.0 - x, y);
    decoded.top_left = flip(decoded.top_left);
    decoded.top_right = flip(decoded.top_right);
    decoded.bottom_left = flip(decoded.bottom_left);
    decoded.alignment = decoded.alignment.map(flip);
    decoded
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default_enables_everything() {
        let options = DecodeOptions::default();
        assert!(options.qr);
        assert_eq!(options.symbologies.len(), 7);
        assert!(!options.code39_check_digit);
    }

    #[test]
    fn test_empty_configuration_is_invalid() {
        let plane_bytes = vec![255u8; 100 * 100];
        let plane = LumaPlane::from_raw(&plane_bytes, 100, 100, 100).unwrap();
        let options = DecodeOptions::new().qr(false).symbologies(&[]);
        match decode(&plane, &options) {
            Err(LectoraError::InvalidInput(_)) => {}
            other => panic!("expected invalid input, got {other:?}"),
        }
        assert!(decode_all(&plane, &options).is_err());
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(BarcodeFormat::QrCode.to_string(), "QR_CODE");
        assert_eq!(BarcodeFormat::Ean13.to_string(), "EAN_13");
        assert_eq!(BarcodeFormat::UpcA.to_string(), "UPC_A");
        assert_eq!(BarcodeFormat::Itf14.to_string(), "ITF_14");
        assert_eq!(BarcodeFormat::Codabar.to_string(), "CODABAR");
    }

    #[test]
    fn test_blank_image_detection_semantics() {
        let plane_bytes = vec![255u8; 200 * 200];
        let plane = LumaPlane::from_raw(&plane_bytes, 200, 200, 200).unwrap();
        let options = DecodeOptions::default();
        match decode(&plane, &options) {
            Err(LectoraError::Detection) => {}
            other => panic!("expected Detection, got {other:?}"),
        }
        assert!(decode_all(&plane, &options).unwrap().is_empty());
    }
}
