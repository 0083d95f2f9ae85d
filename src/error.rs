//! # Error Types
//!
//! This module defines the error taxonomy used throughout the lectora library.
//!
//! The top-level distinction that matters to callers is **detection** versus
//! **decode**: a `Detection` error means no symbol was found and it is safe to
//! try something else (another frame, another symbology family); a `Decode` or
//! `ReedSolomon` error means a symbol *was* found but its data is corrupt, and
//! falling back would hide real damage.

use thiserror::Error;

/// Main error type for lectora operations
#[derive(Debug, Error)]
pub enum LectoraError {
    /// Malformed input (dimensions, buffer size, row stride, options)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No QR finder triplet and no 1D start pattern matched anywhere
    #[error("no barcode or QR code found")]
    Detection,

    /// Structural data corruption found after successful detection
    #[error("decode failed: {0}")]
    Decode(DecodeKind),

    /// Reed-Solomon correction failure (a sub-kind of decode failure)
    #[error("error correction failed: {0}")]
    ReedSolomon(RsKind),
}

impl LectoraError {
    /// True for errors that mean "a symbol was detected but its data is
    /// corrupt". These must never trigger a fallback to another pipeline.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, LectoraError::Decode(_) | LectoraError::ReedSolomon(_))
    }
}

/// What exactly went wrong while decoding a detected QR symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeKind {
    /// Neither copy of the 15-bit format info survived BCH recovery
    #[error("format information unreadable")]
    FormatInfo,

    /// Both copies of the 18-bit version info failed BCH recovery and the
    /// provisional dimension is out of range
    #[error("version information unreadable")]
    VersionInfo,

    /// The data region did not yield the expected number of codewords
    #[error("codeword stream exhausted")]
    CodewordsExhausted,

    /// A segment declared more payload than the bitstream holds
    #[error("insufficient bits for segment")]
    InsufficientBits,

    /// ECI, FNC1, structured-append or Hanzi mode indicator encountered
    #[error("unsupported mode indicator")]
    UnsupportedMode,

    /// Any other structural violation (bad digit group, bad pair value, ...)
    #[error("malformed bitstream structure")]
    Structure,
}

/// Why Reed-Solomon correction gave up on a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RsKind {
    /// More errors than the block's correction capacity
    #[error("error count exceeds correction capacity")]
    TooManyErrors,

    /// Chien search found fewer roots than the locator degree
    #[error("error locator degree mismatch")]
    LocatorDegreeMismatch,

    /// Forney produced an error position outside the block
    #[error("bad error position")]
    BadErrorPosition,
}
