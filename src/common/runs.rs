//! # Run-Length Extraction
//!
//! Converts one row of a [`BitMatrix`] into a sequence of consecutive
//! same-colour pixel counts. The 1D decoders work entirely on these runs.
//!
//! ## Convention
//!
//! Even indices are white runs, odd indices are dark runs. When the row's
//! first pixel is dark, a zero-length white run is emitted in front so the
//! parity convention holds; a symbol at the very edge of the image then fails
//! its quiet-zone check naturally instead of being misread.

use super::BitMatrix;

/// Extract run lengths for row `y` into `buf`, reusing its capacity.
///
/// Runs longer than `u16::MAX` pixels are saturated; no real symbol module
/// gets anywhere near that.
pub fn row_runs(matrix: &BitMatrix, y: usize, buf: &mut Vec<u16>) {
    buf.clear();
    let width = matrix.width();
    let row = matrix.row(y);

    let mut dark = matrix.get(0, y);
    if dark {
        buf.push(0);
    }

    let mut run: u32 = 0;
    let mut x = 0;
    while x < width {
        // 32-pixel fast path on aligned, uniform words.
        if x & 31 == 0 && x + 32 <= width {
            let word = row[x >> 5];
            if word == 0 && !dark {
                run += 32;
                x += 32;
                continue;
            }
            if word == u32::MAX && dark {
                run += 32;
                x += 32;
                continue;
            }
        }
        if matrix.get(x, y) == dark {
            run += 1;
            x += 1;
        } else {
            buf.push(run.min(u16::MAX as u32) as u16);
            dark = !dark;
            run = 0;
        }
    }
    buf.push(run.min(u16::MAX as u32) as u16);
}
