//! # Codeword Extraction and Correction
//!
//! Everything between a sampled module grid and a corrected data stream:
//! reading the format and version fields, walking the data region in the
//! zig-zag codeword order, de-interleaving into error-correction blocks and
//! running Reed-Solomon over each block.

use crate::common::BitMatrix;
use crate::ec;
use crate::error::{DecodeKind, LectoraError};
use crate::qr::format::FormatInfo;
use crate::qr::function::function_pattern_mask;
use crate::qr::version::Version;

/// Read both copies of the 15-bit format field and recover EC level and
/// mask id.
pub fn read_format_info(bits: &BitMatrix) -> Result<FormatInfo, LectoraError> {
    let dimension = bits.height();

    // Copy 1: the ring around the top-left finder.
    let mut main = 0u32;
    for x in 0..6 {
        main = (main << 1) | bits.get(x, 8) as u32;
    }
    main = (main << 1) | bits.get(7, 8) as u32;
    main = (main << 1) | bits.get(8, 8) as u32;
    main = (main << 1) | bits.get(8, 7) as u32;
    for y in (0..6).rev() {
        main = (main << 1) | bits.get(8, y) as u32;
    }

    // Copy 2: split between the bottom-left and top-right strips.
    let mut side = 0u32;
    for y in (dimension - 7..dimension).rev() {
        side = (side << 1) | bits.get(8, y) as u32;
    }
    for x in dimension - 8..dimension {
        side = (side << 1) | bits.get(x, 8) as u32;
    }

    FormatInfo::decode(main, side)
        .ok_or(LectoraError::Decode(DecodeKind::FormatInfo))
}

/// Determine the symbol version: from the dimension alone below version 7,
/// otherwise from the two 18-bit version-info regions with a fallback to the
/// provisional dimension-derived version when both copies are unreadable.
pub fn read_version(bits: &BitMatrix) -> Result<Version, LectoraError> {
    let dimension = bits.height();
    let provisional = Version::for_dimension(dimension)?;
    if provisional.number() < 7 {
        return Ok(provisional);
    }

    // Top-right block, 3 wide by 6 tall.
    let mut top_right = 0u32;
    for y in (0..6).rev() {
        for x in (dimension - 11..dimension - 8).rev() {
            top_right = (top_right << 1) | bits.get(x, y) as u32;
        }
    }
    if let Some(version) = Version::decode_version_info(top_right) {
        if version.dimension() == dimension {
            return Ok(version);
        }
    }

    // Bottom-left block, 6 wide by 3 tall.
    let mut bottom_left = 0u32;
    for x in (0..6).rev() {
        for y in (dimension - 11..dimension - 8).rev() {
            bottom_left = (bottom_left << 1) | bits.get(x, y) as u32;
        }
    }
    if let Some(version) = Version::decode_version_info(bottom_left) {
        if version.dimension() == dimension {
            return Ok(version);
        }
    }

    // Both copies corrupt beyond BCH recovery.
    Ok(provisional)
}

/// Walk the data region and collect raw codewords.
///
/// Column pairs run right to left, skipping the vertical timing column;
/// the vertical direction alternates per pair and the right column of each
/// pair is read before the left. Function modules are skipped via the cached
/// per-version mask. Bits accumulate MSB-first.
pub fn read_codewords(bits: &BitMatrix, version: Version) -> Result<Vec<u8>, LectoraError> {
    let dimension = version.dimension();
    if bits.height() != dimension {
        return Err(LectoraError::Decode(DecodeKind::CodewordsExhausted));
    }
    let function = function_pattern_mask(version);
    let total = version.total_codewords();
    let mut result = Vec::with_capacity(total);

    let mut bits_read = 0u32;
    let mut current = 0u8;
    let mut reading_up = true;

    let mut j = dimension as isize - 1;
    while j > 0 {
        if j == 6 {
            // Vertical timing pattern.
            j -= 1;
        }
        for count in 0..dimension {
            let y = if reading_up { dimension - 1 - count } else { count };
            for col in 0..2 {
                let x = (j as usize) - col;
                if function.get(x, y) {
                    continue;
                }
                current = (current << 1) | bits.get(x, y) as u8;
                bits_read += 1;
                if bits_read == 8 {
                    result.push(current);
                    current = 0;
                    bits_read = 0;
                }
            }
        }
        reading_up = !reading_up;
        j -= 2;
    }

    if result.len() != total {
        return Err(LectoraError::Decode(DecodeKind::CodewordsExhausted));
    }
    Ok(result)
}

/// One error-correction block: data codewords followed by EC codewords.
struct DataBlock {
    codewords: Vec<u8>,
    data_len: usize,
}

/// De-interleave raw codewords into blocks, correct each block and return
/// the concatenated data bytes.
pub fn correct_and_assemble(
    raw: &[u8],
    version: Version,
    ec_level: crate::qr::format::EcLevel,
) -> Result<Vec<u8>, LectoraError> {
    let layout = version.ec_blocks(ec_level);
    let ec_per_block = layout.ec_per_block;

    let mut blocks: Vec<DataBlock> = Vec::with_capacity(layout.total_blocks());
    for &(count, data_len) in &layout.groups {
        for _ in 0..count {
            blocks.push(DataBlock {
                codewords: Vec::with_capacity(data_len + ec_per_block),
                data_len,
            });
        }
    }

    let max_data = blocks.iter().map(|b| b.data_len).max().unwrap_or(0);
    let mut raw_iter = raw.iter();
    let mut next = || -> Result<u8, LectoraError> {
        raw_iter
            .next()
            .copied()
            .ok_or(LectoraError::Decode(DecodeKind::CodewordsExhausted))
    };

    // Data portion round-robin: column i of every block that has one.
    for i in 0..max_data {
        for block in blocks.iter_mut() {
            if i < block.data_len {
                let byte = next()?;
                block.codewords.push(byte);
            }
        }
    }
    // EC portion round-robin.
    for _ in 0..ec_per_block {
        for block in blocks.iter_mut() {
            let byte = next()?;
            block.codewords.push(byte);
        }
    }

    let mut data = Vec::with_capacity(layout.total_data_codewords());
    let mut corrected_total = 0;
    for block in blocks.iter_mut() {
        corrected_total += ec::decode(&mut block.codewords, ec_per_block)?;
        data.extend_from_slice(&block.codewords[..block.data_len]);
    }
    if corrected_total > 0 {
        log::debug!("corrected {corrected_total} codeword errors");
    }
    Ok(data)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::format::EcLevel;

    #[test]
    fn test_read_codewords_counts_every_version() {
        // An all-white sampled grid still yields exactly the right number of
        // codewords (all zero) for any version.
        for number in [1, 2, 7, 25, 40] {
            let version = Version::new(number).unwrap();
            let bits = BitMatrix::square(version.dimension());
            let codewords = read_codewords(&bits, version).unwrap();
            assert_eq!(codewords.len(), version.total_codewords());
            assert!(codewords.iter().all(|&c| c == 0));
        }
    }

    #[test]
    fn test_read_codewords_first_codeword_order() {
        // The first codeword is read from the bottom-right corner, right
        // column before left, moving upward. Set those 4 rows x 2 columns
        // to a known pattern: bits in read order are (x,y) pairs
        // (20,20),(19,20),(20,19),(19,19),(20,18),(19,18),(20,17),(19,17).
        let version = Version::new(1).unwrap();
        let mut bits = BitMatrix::square(21);
        bits.set(20, 20); // bit 7 (MSB)
        bits.set(19, 19); // bit 4
        bits.set(20, 17); // bit 1
        let codewords = read_codewords(&bits, version).unwrap();
        assert_eq!(codewords[0], 0b1001_0010);
    }

    #[test]
    fn test_deinterleave_single_block() {
        let version = Version::new(1).unwrap();
        // v1-L: one block, 19 data + 7 EC.
        let data: Vec<u8> = (0u8..19).collect();
        let mut raw = data.clone();
        raw.extend(ec::encode(&data, 7));
        let out = correct_and_assemble(&raw, version, EcLevel::L).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_deinterleave_multi_block_round_trip() {
        // v6-L: 2 blocks of 68 data codewords, 18 EC each. Interleave two
        // encoded blocks the way the symbol would store them, then check the
        // pipeline reassembles the original data stream.
        let version = Version::new(6).unwrap();
        let layout = version.ec_blocks(EcLevel::L);
        assert_eq!(layout.groups, vec![(2, 68)]);

        let block_a: Vec<u8> = (0u8..68).collect();
        let block_b: Vec<u8> = (100u8..168).collect();
        let ec_a = ec::encode(&block_a, 18);
        let ec_b = ec::encode(&block_b, 18);

        let mut raw = Vec::new();
        for i in 0..68 {
            raw.push(block_a[i]);
            raw.push(block_b[i]);
        }
        for i in 0..18 {
            raw.push(ec_a[i]);
            raw.push(ec_b[i]);
        }

        let out = correct_and_assemble(&raw, version, EcLevel::L).unwrap();
        let expected: Vec<u8> = block_a.iter().chain(block_b.iter()).copied().collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_uneven_blocks_deinterleave() {
        // v5-Q: 2 blocks of 15 + 2 blocks of 16 data codewords, 18 EC each.
        let version = Version::new(5).unwrap();
        let layout = version.ec_blocks(EcLevel::Q);
        assert_eq!(layout.groups, vec![(2, 15), (2, 16)]);

        let blocks: Vec<Vec<u8>> = vec![
            (0u8..15).collect(),
            (20u8..35).collect(),
            (40u8..56).collect(),
            (60u8..76).collect(),
        ];
        let ecs: Vec<Vec<u8>> = blocks.iter().map(|b| ec::encode(b, 18)).collect();

        let mut raw = Vec::new();
        for i in 0..16 {
            for block in &blocks {
                if i < block.len() {
                    raw.push(block[i]);
                }
            }
        }
        for i in 0..18 {
            for ec in &ecs {
                raw.push(ec[i]);
            }
        }
        assert_eq!(raw.len(), version.total_codewords());

        let out = correct_and_assemble(&raw, version, EcLevel::Q).unwrap();
        let expected: Vec<u8> = blocks.concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_corrupt_block_is_corrected() {
        let version = Version::new(1).unwrap();
        let data: Vec<u8> = (50u8..69).collect();
        let mut raw = data.clone();
        raw.extend(ec::encode(&data, 7));
        // 3 symbol errors, within the 7-EC block's capacity.
        raw[0] ^= 0xFF;
        raw[5] ^= 0x42;
        raw[22] ^= 0x17;
        let out = correct_and_assemble(&raw, version, EcLevel::L).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_hopeless_corruption_is_reed_solomon_error() {
        let version = Version::new(1).unwrap();
        let data: Vec<u8> = (0u8..19).collect();
        let mut raw = data.clone();
        raw.extend(ec::encode(&data, 7));
        for byte in raw.iter_mut().take(10) {
            *byte ^= 0xA5;
        }
        match correct_and_assemble(&raw, version, EcLevel::L) {
            Err(LectoraError::ReedSolomon(_)) => {}
            Ok(_) => panic!("uncorrectable block decoded"),
            Err(other) => panic!("wrong error kind: {other:?}"),
        }
    }
}
