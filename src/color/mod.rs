//! Host-side color model adapter.
//!
//! The equalizer expects a luminance-like channel 0, chrominance-like channels 1-2 and alpha in
//! channel 3. This module maps 8-bit sRGB buffers into that layout: linear light, BT.601 luma
//! weights, luminance scaled to `[0, 100]` and chrominance to `[-50, 50]`, which is the range the
//! planner defaults are tuned for.

use crate::foundation::core::{Image, Pixel};
use crate::foundation::error::{AtrousError, AtrousResult};

/// Luminance of linear white after [`rgb_to_ycc`].
pub const LUMA_RANGE: f32 = 100.0;

const KR: f32 = 0.299;
const KG: f32 = 0.587;
const KB: f32 = 0.114;

/// Linear RGB in `[0, 1]` to scaled luminance/chrominance.
pub fn rgb_to_ycc([r, g, b]: [f32; 3]) -> [f32; 3] {
    let y = KR * r + KG * g + KB * b;
    let cb = 0.5 * (b - y) / (1.0 - KB);
    let cr = 0.5 * (r - y) / (1.0 - KR);
    [LUMA_RANGE * y, LUMA_RANGE * cb, LUMA_RANGE * cr]
}

/// Inverse of [`rgb_to_ycc`].
pub fn ycc_to_rgb([y, cb, cr]: [f32; 3]) -> [f32; 3] {
    let (y, cb, cr) = (y / LUMA_RANGE, cb / LUMA_RANGE, cr / LUMA_RANGE);
    let r = y + 2.0 * (1.0 - KR) * cr;
    let b = y + 2.0 * (1.0 - KB) * cb;
    let g = (y - KR * r - KB * b) / KG;
    [r, g, b]
}

/// sRGB transfer function, encoded to linear.
pub fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.040_45 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB transfer function, linear to encoded.
pub fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

impl Image {
    /// Convert an 8-bit sRGB image into equalizer channel layout.
    pub fn from_rgba8(src: &image::RgbaImage) -> AtrousResult<Self> {
        let (width, height) = src.dimensions();
        let n = crate::foundation::core::pixel_count(width, height)?;
        let mut pixels = crate::foundation::core::alloc_pixels(n)?;
        pixels.extend(src.pixels().map(|p| {
            let [r, g, b, a] = p.0;
            let lin = [r, g, b].map(|c| srgb_to_linear(f32::from(c) / 255.0));
            let [y, cb, cr] = rgb_to_ycc(lin);
            [y, cb, cr, f32::from(a) / 255.0]
        }));
        Image::from_pixels(width, height, pixels)
    }

    /// Convert back to 8-bit sRGB, clamping out-of-gamut values.
    pub fn to_rgba8(&self) -> AtrousResult<image::RgbaImage> {
        let mut raw = Vec::new();
        raw.try_reserve_exact(self.byte_len() / 4).map_err(|e| {
            AtrousError::allocation(format!("failed to reserve 8-bit output: {e}"))
        })?;
        for &px in self.pixels() {
            raw.extend_from_slice(&encode_rgba8(px));
        }
        image::RgbaImage::from_raw(self.width(), self.height(), raw)
            .ok_or_else(|| AtrousError::validation("8-bit buffer does not match image size"))
    }
}

fn encode_rgba8([y, cb, cr, a]: Pixel) -> [u8; 4] {
    let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    let [r, g, b] = ycc_to_rgb([y, cb, cr]).map(|c| linear_to_srgb(c.clamp(0.0, 1.0)));
    [quantize(r), quantize(g), quantize(b), quantize(a)]
}

#[cfg(test)]
#[path = "../../tests/unit/color/mod.rs"]
mod tests;
