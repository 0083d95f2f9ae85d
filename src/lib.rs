//! # Lectora - QR Code and 1D Barcode Decoder
//!
//! Lectora decodes QR codes (model 2, versions 1-40) and seven 1D barcode
//! symbologies (EAN-13, EAN-8, UPC-A, Code 128, Code 39, ITF, Codabar) from a
//! single static raster image. It provides:
//!
//! - **Binarization**: local-adaptive thresholding robust to uneven lighting
//! - **QR pipeline**: finder-pattern search, perspective sampling, data-mask
//!   removal, Reed-Solomon correction, bitstream parsing
//! - **1D pipeline**: run-length row scanning with per-symbology pattern
//!   matching, quiet-zone and checksum enforcement
//!
//! ## Quick Start
//!
//! ```no_run
//! use lectora::{decode, DecodeOptions, LumaPlane};
//!
//! # fn main() -> Result<(), lectora::LectoraError> {
//! let pixels: Vec<u8> = std::fs::read("frame.gray").unwrap();
//! let plane = LumaPlane::from_raw(&pixels, 640, 480, 640)?;
//!
//! let result = decode(&plane, &DecodeOptions::default())?;
//! println!("{}: {}", result.format, result.text);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`decoder`] | Public façade: options, results, dispatch |
//! | [`luma`] | Grayscale plane input and pixel-format adapters |
//! | [`binarize`] | Local-adaptive binarizer |
//! | [`common`] | Bit matrix, bit source, run-length extraction |
//! | [`ec`] | GF(256) arithmetic and Reed-Solomon |
//! | [`qr`] | QR detection and decoding pipeline |
//! | [`oned`] | 1D row harness and symbology decoders |
//! | [`error`] | Error types |

pub mod binarize;
pub mod common;
pub mod decoder;
pub mod ec;
pub mod error;
pub mod luma;
pub mod oned;
pub mod qr;

// Re-exports for convenience
pub use decoder::{decode, decode_all, BarcodeFormat, DecodeOptions, Decoded, Location};
pub use error::LectoraError;
pub use luma::LumaPlane;
