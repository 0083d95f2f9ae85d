//! # Error Correction
//!
//! GF(256) arithmetic and the Reed-Solomon decoder used by the QR pipeline.
//! The field is fixed to the QR code polynomial 0x11D with generator base
//! exponent 0.

pub mod gf256;
pub mod poly;
pub mod reed_solomon;

pub use poly::GfPoly;
pub use reed_solomon::{decode, encode};
