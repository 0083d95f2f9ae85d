//! # QR Version Table
//!
//! Per-version parameters for QR model 2, versions 1..=40: symbol dimension,
//! alignment-pattern center coordinates and the error-correction block
//! layout for each of the four EC levels.
//!
//! The two raw tables below (EC codewords per block, number of blocks) are
//! the published QR constants; everything else is derived arithmetically,
//! which keeps the version record small and makes the block-sum invariant
//! checkable in tests.

use crate::error::{DecodeKind, LectoraError};
use crate::qr::format::EcLevel;

/// A QR symbol version, 1..=40.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Version(u8);

/// Error-correction block layout for one (version, EC level) pair.
///
/// `groups` lists `(block_count, data_codewords_per_block)`; blocks come in
/// at most two group sizes, the longer one holding one extra data codeword.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcBlocks {
    pub ec_per_block: usize,
    pub groups: Vec<(usize, usize)>,
}

impl EcBlocks {
    pub fn total_blocks(&self) -> usize {
        self.groups.iter().map(|&(count, _)| count).sum()
    }

    pub fn total_data_codewords(&self) -> usize {
        self.groups.iter().map(|&(count, len)| count * len).sum()
    }
}

impl Version {
    pub fn new(number: usize) -> Result<Version, LectoraError> {
        if (1..=40).contains(&number) {
            Ok(Version(number as u8))
        } else {
            Err(LectoraError::Decode(DecodeKind::VersionInfo))
        }
    }

    /// The version whose symbol is `dimension` modules on a side.
    pub fn for_dimension(dimension: usize) -> Result<Version, LectoraError> {
        if dimension % 4 != 1 {
            return Err(LectoraError::Decode(DecodeKind::VersionInfo));
        }
        Version::new((dimension - 17) / 4)
    }

    pub fn number(&self) -> usize {
        self.0 as usize
    }

    pub fn dimension(&self) -> usize {
        17 + 4 * self.number()
    }

    /// Alignment-pattern center coordinates, ascending, used on both axes.
    /// Empty for version 1.
    pub fn alignment_centers(&self) -> Vec<usize> {
        let ver = self.number();
        if ver == 1 {
            return Vec::new();
        }
        let num_align = ver / 7 + 2;
        let step = if ver == 32 {
            26
        } else {
            (ver * 4 + num_align * 2 + 1) / (2 * num_align - 2) * 2
        };
        let mut centers = vec![6];
        let mut pos = ver * 4 + 10;
        for _ in 0..num_align - 1 {
            centers.insert(1, pos);
            pos -= step;
        }
        centers
    }

    /// Total codewords in the symbol (data + error correction).
    pub fn total_codewords(&self) -> usize {
        let ver = self.number();
        let mut modules = (16 * ver + 128) * ver + 64;
        if ver >= 2 {
            let num_align = ver / 7 + 2;
            modules -= (25 * num_align - 10) * num_align - 55;
            if ver >= 7 {
                modules -= 36;
            }
        }
        modules / 8
    }

    /// Block layout for the given EC level.
    pub fn ec_blocks(&self, level: EcLevel) -> EcBlocks {
        let ver = self.number();
        let ec_per_block = ECC_CODEWORDS_PER_BLOCK[level.ordinal()][ver] as usize;
        let num_blocks = NUM_ERROR_CORRECTION_BLOCKS[level.ordinal()][ver] as usize;
        let data_total = self.total_codewords() - ec_per_block * num_blocks;
        let short_len = data_total / num_blocks;
        let num_long = data_total % num_blocks;
        let mut groups = Vec::with_capacity(2);
        if num_blocks > num_long {
            groups.push((num_blocks - num_long, short_len));
        }
        if num_long > 0 {
            groups.push((num_long, short_len + 1));
        }
        EcBlocks { ec_per_block, groups }
    }

    /// Recover a version from one copy of the 18-bit version info. Accepts
    /// up to 3 bit errors against the BCH-protected codewords.
    pub fn decode_version_info(bits: u32) -> Option<Version> {
        let mut best: Option<(u32, usize)> = None;
        for number in 7..=40usize {
            let codeword = version_info_codeword(number);
            if codeword == bits {
                return Some(Version(number as u8));
            }
            let distance = (codeword ^ bits).count_ones();
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, number));
            }
        }
        match best {
            Some((distance, number)) if distance <= 3 => Some(Version(number as u8)),
            _ => None,
        }
    }
}

/// 18-bit version info: the 6-bit version number followed by the 12-bit
/// remainder of v * x^12 modulo the generator x^12+x^11+x^10+x^9+x^8+x^5+x^2+1.
fn version_info_codeword(number: usize) -> u32 {
    let mut remainder = number as u32;
    for _ in 0..12 {
        remainder = (remainder << 1) ^ ((remainder >> 11) * 0x1F25);
    }
    ((number as u32) << 12) | (remainder & 0xFFF)
}

// Rows are EC levels in ordinal order L, M, Q, H; columns are versions, with
// index 0 unused.
#[rustfmt::skip]
static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [-1,  7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],
    [-1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28],
    [-1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],
    [-1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],
];

#[rustfmt::skip]
static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [-1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4,  4,  4,  4,  4,  6,  6,  6,  6,  7,  8,  8,  9,  9, 10, 12, 12, 12, 13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25],
    [-1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5,  5,  8,  9,  9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21, 23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49],
    [-1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8,  8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68],
    [-1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81],
];

// ============================================================================
// TESTS
// ============================================================================
