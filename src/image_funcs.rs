// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use image::{GrayImage, RgbImage, RgbaImage};

/// Perceived brightness of an RGB pixel, on the same 0..255 scale as the
/// channels.
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Read-only view of an image as per-pixel brightness values. Star detection
/// and threshold estimation operate on any `PixelField`.
pub trait PixelField {
    /// Width x height, in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Brightness of the pixel at column `x`, row `y`. The caller guarantees
    /// that (x, y) is within `dimensions()`.
    fn brightness(&self, x: u32, y: u32) -> f64;
}

impl PixelField for GrayImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
    fn brightness(&self, x: u32, y: u32) -> f64 {
        self.get_pixel(x, y).0[0] as f64
    }
}

impl PixelField for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
    fn brightness(&self, x: u32, y: u32) -> f64 {
        let [r, g, b] = self.get_pixel(x, y).0;
        luminance(r, g, b)
    }
}

// Alpha is ignored.
impl PixelField for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
    fn brightness(&self, x: u32, y: u32) -> f64 {
        let [r, g, b, _a] = self.get_pixel(x, y).0;
        luminance(r, g, b)
    }
}

/// A pixel field whose brightness values have already been computed, e.g. by
/// a camera pipeline that delivers luminance directly.
#[derive(Clone, Debug)]
pub struct LuminanceField {
    width: u32,
    height: u32,
    values: Vec<f64>,  // Row major.
}

impl LuminanceField {
    /// # Panics
    /// If `values` does not hold exactly `width * height` entries.
    pub fn new(width: u32, height: u32, values: Vec<f64>) -> LuminanceField {
        assert_eq!(values.len(), width as usize * height as usize,
                   "LuminanceField {}x{} needs {} values, got {}",
                   width, height, width as usize * height as usize,
                   values.len());
        LuminanceField{width, height, values}
    }

    pub fn from_rgb(image: &RgbImage) -> LuminanceField {
        let values = image.pixels().map(|p| luminance(p.0[0], p.0[1], p.0[2]))
            .collect();
        LuminanceField{width: image.width(), height: image.height(), values}
    }
}

impl PixelField for LuminanceField {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
    fn brightness(&self, x: u32, y: u32) -> f64 {
        self.values[y as usize * self.width as usize + x as usize]
    }
}

/// Average brightness over the whole field. Returns 0 for an empty field.
pub fn mean_brightness<F: PixelField>(field: &F) -> f64 {
    let (width, height) = field.dimensions();
    let num_pixels = width as usize * height as usize;
    if num_pixels == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for y in 0..height {
        for x in 0..width {
            total += field.brightness(x, y);
        }
    }
    total / num_pixels as f64
}

// mod tests.
