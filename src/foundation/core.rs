use crate::foundation::error::{AtrousError, AtrousResult};

/// One pixel: channel 0 luminance-like, channels 1-2 chrominance-like, channel 3 alpha.
pub type Pixel = [f32; 4];

/// Size in bytes of one [`Pixel`].
pub const PIXEL_BYTES: usize = std::mem::size_of::<Pixel>();

/// Dense, row-major, four-channel `f32` image.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl Image {
    /// Allocate a zero-filled image.
    ///
    /// Allocation failure is reported as [`AtrousError::Allocation`] instead of aborting.
    pub fn new(width: u32, height: u32) -> AtrousResult<Self> {
        Self::filled(width, height, [0.0; 4])
    }

    /// Allocate an image with every pixel set to `px`.
    pub fn filled(width: u32, height: u32, px: Pixel) -> AtrousResult<Self> {
        let n = pixel_count(width, height)?;
        let mut pixels = alloc_pixels(n)?;
        pixels.resize(n, px);
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Wrap an existing pixel vector, checking it matches `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Pixel>) -> AtrousResult<Self> {
        let n = pixel_count(width, height)?;
        if pixels.len() != n {
            return Err(AtrousError::validation(format!(
                "pixel buffer holds {} pixels, expected {width}x{height} = {n}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Copy the image, reporting allocation failure instead of aborting.
    pub fn try_clone(&self) -> AtrousResult<Self> {
        let mut pixels = alloc_pixels(self.pixels.len())?;
        pixels.extend_from_slice(&self.pixels);
        Ok(Self {
            width: self.width,
            height: self.height,
            pixels,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Always `false` for a constructed image; present for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// All pixels, row-major, mutable.
    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    /// Consume the image and return its pixel vector.
    pub fn into_pixels(self) -> Vec<Pixel> {
        self.pixels
    }

    /// One row of pixels.
    ///
    /// Panics when `y >= height`.
    pub fn row(&self, y: u32) -> &[Pixel] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }

    /// Pixel at `(x, y)`.
    ///
    /// Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Size of the pixel storage in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len() * PIXEL_BYTES
    }

    pub(crate) fn same_shape(&self, other: &Image) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Rectangular region of interest handed over by the host pipeline.
///
/// `x`/`y` locate the tile inside the full image at processing resolution; `scale` is the ratio of
/// processing resolution to the module's full input buffer (the zoom level).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Roi {
    /// Tile offset along x.
    pub x: i32,
    /// Tile offset along y.
    pub y: i32,
    /// Tile width in pixels.
    pub width: u32,
    /// Tile height in pixels.
    pub height: u32,
    /// Processing scale factor, must be finite and > 0.
    pub scale: f32,
}

impl Roi {
    /// A full-resolution ROI at the origin.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            scale: 1.0,
        }
    }

    /// Same ROI with a different processing scale.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Same ROI moved to `(x, y)`.
    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Reject empty tiles and unusable scale factors.
    pub fn validate(&self) -> AtrousResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AtrousError::validation("roi width and height must be > 0"));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(AtrousError::validation("roi scale must be finite and > 0"));
        }
        Ok(())
    }
}

/// Full-image geometry the tile belongs to.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PieceGeometry {
    /// Width of the module's full input buffer.
    pub full_width: u32,
    /// Height of the module's full input buffer.
    pub full_height: u32,
    /// Native image pixels per input-buffer pixel (1.0 = no upstream resampling).
    pub input_scale: f32,
}

impl PieceGeometry {
    /// Geometry with no upstream resampling.
    pub fn new(full_width: u32, full_height: u32) -> Self {
        Self {
            full_width,
            full_height,
            input_scale: 1.0,
        }
    }

    /// Effective scale of `roi` relative to the native image.
    pub fn processing_scale(&self, roi: &Roi) -> f32 {
        roi.scale / self.input_scale
    }

    /// Shorter side of the full image expressed in native pixels.
    pub fn min_full_dim(&self) -> f32 {
        self.full_width.min(self.full_height) as f32 * self.input_scale
    }

    /// Reject zero-sized images and unusable scale factors.
    pub fn validate(&self) -> AtrousResult<()> {
        if self.full_width == 0 || self.full_height == 0 {
            return Err(AtrousError::validation(
                "full image width and height must be > 0",
            ));
        }
        if !self.input_scale.is_finite() || self.input_scale <= 0.0 {
            return Err(AtrousError::validation(
                "input scale must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// `width * height`, rejecting empty and overflowing sizes.
pub(crate) fn pixel_count(width: u32, height: u32) -> AtrousResult<usize> {
    if width == 0 || height == 0 {
        return Err(AtrousError::validation("image width and height must be > 0"));
    }
    let n = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| AtrousError::allocation("image pixel count overflow"))?;
    n.checked_mul(PIXEL_BYTES)
        .ok_or_else(|| AtrousError::allocation("image byte size overflow"))?;
    Ok(n)
}

/// Reserve room for `n` pixels without aborting on failure.
pub(crate) fn alloc_pixels(n: usize) -> AtrousResult<Vec<Pixel>> {
    let mut v = Vec::new();
    v.try_reserve_exact(n).map_err(|e| {
        AtrousError::allocation(format!("failed to reserve {n} pixels: {e}"))
    })?;
    Ok(v)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
