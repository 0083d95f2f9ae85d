//! # Local-Adaptive Binarization
//!
//! Converts a grayscale plane into a black/white [`BitMatrix`] using a
//! windowed-mean threshold computed in O(1) per pixel from an integral image.
//!
//! ## Algorithm
//!
//! A pixel is dark when its luminance falls below the mean of its local
//! window by a small relative margin. The windowed mean keeps the threshold
//! tracking illumination gradients, so a symbol lit unevenly across the frame
//! still binarizes cleanly.
//!
//! Flat regions are the failure mode of any local threshold: with no edges in
//! the window, the mean hugs the pixel value and noise decides the output.
//! Pixels whose whole window neighbourhood has less than
//! [`MIN_DYNAMIC_RANGE`] of contrast are therefore forced white, which keeps
//! blank paper, sky and the deep interior of oversized blobs from spawning
//! phantom runs. Symbol features are never hit by this: the window is sized
//! so that it always sees past the widest solid feature of a decodable
//! symbol (3 modules for a QR finder center, a few modules for 1D bars).

use crate::common::BitMatrix;
use crate::luma::LumaPlane;

/// Contrast floor below which a neighbourhood is considered flat.
const MIN_DYNAMIC_RANGE: u8 = 24;

/// Relative margin: dark means `pixel < mean * (100 - MARGIN_PERCENT) / 100`.
const MARGIN_PERCENT: u64 = 12;

/// Contrast is tracked on this block grid (8x8 pixels).
const BLOCK_SHIFT: usize = 3;

/// Binarize a grayscale plane. Output is the same size, 1 = dark.
pub fn binarize(plane: &LumaPlane<'_>) -> BitMatrix {
    let width = plane.width();
    let height = plane.height();
    let mut out = BitMatrix::new(width, height);

    // Window radius scaled to the shorter image side.
    let radius = (width.min(height) / 8).clamp(8, 128);

    let flat = flat_blocks(plane, radius);
    let blocks_x = width.div_ceil(1 << BLOCK_SHIFT);
    let integral = IntegralImage::build(plane);

    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(height);
        let block_row = (y >> BLOCK_SHIFT) * blocks_x;
        let row = plane.row(y);
        for (x, &pixel) in row.iter().enumerate() {
            if flat[block_row + (x >> BLOCK_SHIFT)] {
                continue; // forced white
            }
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(width);
            let count = ((x1 - x0) * (y1 - y0)) as u64;
            let sum = integral.window_sum(x0, y0, x1, y1);
            // pixel < mean * (1 - k), kept in integer arithmetic.
            if (pixel as u64) * count * 100 < sum * (100 - MARGIN_PERCENT) {
                out.set(x, y);
            }
        }
    }
    out
}

/// For every 8x8 block, whether the contrast over all blocks within the
/// window radius stays under the dynamic-range floor.
fn flat_blocks(plane: &LumaPlane<'_>, radius: usize) -> Vec<bool> {
    let blocks_x = plane.width().div_ceil(1 << BLOCK_SHIFT);
    let blocks_y = plane.height().div_ceil(1 << BLOCK_SHIFT);

    let mut mins = vec![u8::MAX; blocks_x * blocks_y];
    let mut maxs = vec![u8::MIN; blocks_x * blocks_y];
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let y_end = ((by + 1) << BLOCK_SHIFT).min(plane.height());
            let x_end = ((bx + 1) << BLOCK_SHIFT).min(plane.width());
            let mut min = u8::MAX;
            let mut max = u8::MIN;
            for y in by << BLOCK_SHIFT..y_end {
                let row = plane.row(y);
                for &p in &row[bx << BLOCK_SHIFT..x_end] {
                    min = min.min(p);
                    max = max.max(p);
                }
            }
            mins[by * blocks_x + bx] = min;
            maxs[by * blocks_x + bx] = max;
        }
    }

    let block_radius = (radius >> BLOCK_SHIFT) + 1;
    let mut flat = vec![false; blocks_x * blocks_y];
    for by in 0..blocks_y {
        let ny0 = by.saturating_sub(block_radius);
        let ny1 = (by + block_radius + 1).min(blocks_y);
        for bx in 0..blocks_x {
            let nx0 = bx.saturating_sub(block_radius);
            let nx1 = (bx + block_radius + 1).min(blocks_x);
            let mut min = u8::MAX;
            let mut max = u8::MIN;
            for ny in ny0..ny1 {
                for nx in nx0..nx1 {
                    min = min.min(mins[ny * blocks_x + nx]);
                    max = max.max(maxs[ny * blocks_x + nx]);
                }
            }
            flat[by * blocks_x + bx] = max - min < MIN_DYNAMIC_RANGE;
        }
    }
    flat
}

/// Summed-area table with a zero border row/column, so any window sum is four
/// lookups.
struct IntegralImage {
    width: usize,
    sums: Vec<u64>,
}

impl IntegralImage {
    fn build(plane: &LumaPlane<'_>) -> Self {
        let w = plane.width() + 1;
        let h = plane.height() + 1;
        let mut sums = vec![0u64; w * h];
        for y in 0..plane.height() {
            let row = plane.row(y);
            let mut row_sum: u64 = 0;
            for (x, &p) in row.iter().enumerate() {
                row_sum += p as u64;
                sums[(y + 1) * w + x + 1] = sums[y * w + x + 1] + row_sum;
            }
        }
        IntegralImage { width: w, sums }
    }

    /// Sum over the half-open window [x0, x1) x [y0, y1).
    #[inline]
    fn window_sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        let w = self.width;
        self.sums[y1 * w + x1] + self.sums[y0 * w + x0]
            - self.sums[y0 * w + x1]
            - self.sums[y1 * w + x0]
    }
}

// ============================================================================
// TESTS
// ============================================================================
