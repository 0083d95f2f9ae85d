//! # Luminance Input
//!
//! The decoding core consumes a plain grayscale byte plane with an explicit
//! row stride. This module owns input validation, the pixel-format adapters
//! (the [`image`] crate types most callers already hold), and the fused
//! box-filter downsample applied to planes over one megapixel.

use std::borrow::Cow;

use image::{GrayImage, RgbaImage};

use crate::error::LectoraError;

/// Planes above this pixel count get downsampled before binarization.
const MAX_PIXELS: usize = 1 << 20;

/// A grayscale byte plane: `width` columns, `height` rows, rows `stride`
/// bytes apart. Borrows the caller's buffer where possible.
#[derive(Clone)]
pub struct LumaPlane<'a> {
    bytes: Cow<'a, [u8]>,
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> LumaPlane<'a> {
    /// Wrap a raw grayscale buffer without copying.
    pub fn from_raw(
        bytes: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<Self, LectoraError> {
        if width == 0 || height == 0 {
            return Err(LectoraError::InvalidInput(format!(
                "image dimensions must be non-zero, got {width}x{height}"
            )));
        }
        if stride < width {
            return Err(LectoraError::InvalidInput(format!(
                "row stride {stride} is smaller than width {width}"
            )));
        }
        let needed = stride * (height - 1) + width;
        if bytes.len() < needed {
            return Err(LectoraError::InvalidInput(format!(
                "buffer holds {} bytes, {} needed for {}x{} with stride {}",
                bytes.len(),
                needed,
                width,
                height,
                stride
            )));
        }
        Ok(LumaPlane { bytes: Cow::Borrowed(bytes), width, height, stride })
    }

    /// Adopt a grayscale image from the `image` crate.
    pub fn from_gray_image(img: &GrayImage) -> Result<LumaPlane<'static>, LectoraError> {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(LectoraError::InvalidInput(
                "image dimensions must be non-zero, got 0x0".into(),
            ));
        }
        Ok(LumaPlane {
            bytes: Cow::Owned(img.as_raw().clone()),
            width: w as usize,
            height: h as usize,
            stride: w as usize,
        })
    }

    /// Convert an RGBA image using BT.601 luma weights.
    pub fn from_rgba_image(img: &RgbaImage) -> Result<LumaPlane<'static>, LectoraError> {
        let (w, h) = img.dimensions();
        let mut bytes = Vec::with_capacity(w as usize * h as usize);
        for pixel in img.pixels() {
            let [r, g, b, _] = pixel.0;
            let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
            bytes.push(luma as u8);
        }
        if w == 0 || h == 0 {
            return Err(LectoraError::InvalidInput(
                "image dimensions must be non-zero, got 0x0".into(),
            ));
        }
        Ok(LumaPlane {
            bytes: Cow::Owned(bytes),
            width: w as usize,
            height: h as usize,
            stride: w as usize,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        debug_assert!(x < self.width && y < self.height);
        self.bytes[y * self.stride + x]
    }

    /// One row of pixels, stride trimmed off.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.bytes[start..start + self.width]
    }

    /// Shrink oversized planes with a fused `n x n` box filter so the
    /// result stays at or under one megapixel. Returns a borrowed view of
    /// `self` when no shrinking is needed.
    pub fn downsampled(&self) -> LumaPlane<'_> {
        let pixels = self.width * self.height;
        if pixels <= MAX_PIXELS {
            return LumaPlane {
                bytes: Cow::Borrowed(self.bytes.as_ref()),
                width: self.width,
                height: self.height,
                stride: self.stride,
            };
        }
        let mut factor = 2;
        while (self.width / factor) * (self.height / factor) > MAX_PIXELS {
            factor += 1;
        }
        let out_w = self.width / factor;
        let out_h = self.height / factor;
        let area = (factor * factor) as u32;
        let mut bytes = Vec::with_capacity(out_w * out_h);
        for oy in 0..out_h {
            for ox in 0..out_w {
                let mut sum: u32 = 0;
                for dy in 0..factor {
                    let row = self.row(oy * factor + dy);
                    for dx in 0..factor {
                        sum += row[ox * factor + dx] as u32;
                    }
                }
                bytes.push((sum / area) as u8);
            }
        }
        log::debug!(
            "downsampled {}x{} by {} to {}x{}",
            self.width,
            self.height,
            factor,
            out_w,
            out_h
        );
        LumaPlane { bytes: Cow::Owned(bytes), width: out_w, height: out_h, stride: out_w }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(LumaPlane::from_raw(&[0; 12], 4, 3, 4).is_ok());
        // Stride shorter than width
        assert!(LumaPlane::from_raw(&[0; 12], 4, 3, 3).is_err());
        // Buffer too small
        assert!(LumaPlane::from_raw(&[0; 11], 4, 3, 4).is_err());
        // Zero dimension
        assert!(LumaPlane::from_raw(&[0; 12], 0, 3, 4).is_err());
        // Stride padding only needed between rows, not after the last one
        assert!(LumaPlane::from_raw(&[0; 14], 4, 3, 5).is_ok());
    }

    #[test]
    fn test_get_respects_stride() {
        let bytes: Vec<u8> = (0..20).collect();
        let plane = LumaPlane::from_raw(&bytes, 3, 4, 5).unwrap();
        assert_eq!(plane.get(0, 0), 0);
        assert_eq!(plane.get(2, 0), 2);
        assert_eq!(plane.get(0, 1), 5);
        assert_eq!(plane.get(2, 3), 17);
        assert_eq!(plane.row(2), &[10, 11, 12]);
    }

    #[test]
    fn test_small_plane_not_downsampled() {
        let bytes = vec![128u8; 100 * 100];
        let plane = LumaPlane::from_raw(&bytes, 100, 100, 100).unwrap();
        let ds = plane.downsampled();
        assert_eq!(ds.width(), 100);
        assert_eq!(ds.height(), 100);
    }

    #[test]
    fn test_large_plane_downsampled_under_cap() {
        let w = 2048usize;
        let h = 1536usize;
        let bytes = vec![200u8; w * h];
        let plane = LumaPlane::from_raw(&bytes, w, h, w).unwrap();
        let ds = plane.downsampled();
        assert!(ds.width() * ds.height() <= super::MAX_PIXELS);
        assert_eq!(ds.get(0, 0), 200);
        // 2048x1536 needs factor 2: 1024x768 fits the cap.
        assert_eq!(ds.width(), 1024);
        assert_eq!(ds.height(), 768);
    }

    #[test]
    fn test_box_filter_averages() {
        // 4x2 plane shrunk... too small to trigger on its own, so exercise
        // the filter arithmetic directly through a synthetic oversize plane
        // whose top-left 2x2 block we can predict.
        let w = 2048usize;
        let h = 1024usize + 1;
        let mut bytes = vec![0u8; w * h];
        bytes[0] = 100;
        bytes[1] = 200;
        bytes[w] = 50;
        bytes[w + 1] = 150;
        let plane = LumaPlane::from_raw(&bytes, w, h, w).unwrap();
        let ds = plane.downsampled();
        assert_eq!(ds.get(0, 0), ((100u32 + 200 + 50 + 150) / 4) as u8);
        assert_eq!(ds.get(1, 0), 0);
    }
}
