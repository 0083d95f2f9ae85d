//! MSB-first bit reader over a byte buffer, used by the QR bitstream parser.

use crate::error::{DecodeKind, LectoraError};

/// Reads 1..=32 bits at a time from a byte slice, most significant bit first.
pub struct BitSource<'a> {
    bytes: &'a [u8],
    byte_offset: usize,
    bit_offset: usize,
}

impl<'a> BitSource<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        BitSource { bytes, byte_offset: 0, bit_offset: 0 }
    }

    /// Number of bits left to read.
    pub fn available(&self) -> usize {
        8 * (self.bytes.len() - self.byte_offset) - self.bit_offset
    }

    /// Read the next `count` bits (1..=32) as an unsigned value.
    ///
    /// Short reads are a decode failure: a segment header promised more
    /// payload than the codeword stream holds.
    pub fn read_bits(&mut self, count: usize) -> Result<u32, LectoraError> {
        assert!(count >= 1 && count <= 32, "bit count out of range: {count}");
        if count > self.available() {
            return Err(LectoraError::Decode(DecodeKind::InsufficientBits));
        }

        let mut result: u32 = 0;
        let mut remaining = count;

        // Finish the partially consumed byte first.
        if self.bit_offset > 0 {
            let bits_left = 8 - self.bit_offset;
            let to_read = remaining.min(bits_left);
            let shift = bits_left - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.bytes[self.byte_offset] >> shift) & mask;
            result = bits as u32;
            remaining -= to_read;
            self.bit_offset += to_read;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
        }

        while remaining >= 8 {
            result = (result << 8) | self.bytes[self.byte_offset] as u32;
            self.byte_offset += 1;
            remaining -= 8;
        }

        if remaining > 0 {
            let shift = 8 - remaining;
            let mask = ((1u32 << remaining) - 1) as u8;
            let bits = (self.bytes[self.byte_offset] >> shift) & mask;
            result = (result << remaining) | bits as u32;
            self.bit_offset = remaining;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_first_order() {
        let mut src = BitSource::new(&[0b1010_1100, 0b0011_0101]);
        assert_eq!(src.read_bits(1).unwrap(), 1);
        assert_eq!(src.read_bits(3).unwrap(), 0b010);
        assert_eq!(src.read_bits(4).unwrap(), 0b1100);
        assert_eq!(src.read_bits(8).unwrap(), 0b0011_0101);
    }

    #[test]
    fn test_straddles_byte_boundary() {
        let mut src = BitSource::new(&[0xFF, 0x00, 0xFF]);
        assert_eq!(src.read_bits(4).unwrap(), 0xF);
        assert_eq!(src.read_bits(12).unwrap(), 0xF00);
        assert_eq!(src.read_bits(8).unwrap(), 0xFF);
        assert_eq!(src.available(), 0);
    }

    #[test]
    fn test_wide_read() {
        let mut src = BitSource::new(&[0x12, 0x34, 0x56, 0x78, 0x9A]);
        assert_eq!(src.read_bits(4).unwrap(), 0x1);
        assert_eq!(src.read_bits(32).unwrap(), 0x2345_6789);
        assert_eq!(src.available(), 4);
    }

    #[test]
    fn test_available_tracks_reads() {
        let mut src = BitSource::new(&[0xAB, 0xCD]);
        assert_eq!(src.available(), 16);
        src.read_bits(5).unwrap();
        assert_eq!(src.available(), 11);
        src.read_bits(11).unwrap();
        assert_eq!(src.available(), 0);
    }

    #[test]
    fn test_overread_is_insufficient_bits() {
        let mut src = BitSource::new(&[0xAB]);
        src.read_bits(6).unwrap();
        match src.read_bits(3) {
            Err(LectoraError::Decode(DecodeKind::InsufficientBits)) => {}
            other => panic!("expected insufficient bits, got {other:?}"),
        }
    }
}
