use crate::{
    foundation::core::{PIXEL_BYTES, PieceGeometry, Roi},
    foundation::error::{AtrousError, AtrousResult},
};

/// Memory and overlap contract a host must honor when tiling the equalizer.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TilingDescriptor {
    /// Number of full-tile-sized buffers alive at once.
    pub buffer_multiplier: f32,
    /// Context pixels required around each tile, on every side.
    pub overlap: u32,
    /// Tile origin granularity along x.
    pub align_x: u32,
    /// Tile origin granularity along y.
    pub align_y: u32,
}

impl TilingDescriptor {
    /// Bytes needed to process a `width x height` tile.
    pub fn bytes_for(&self, width: u32, height: u32) -> AtrousResult<u64> {
        let px = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|v| v.checked_mul(PIXEL_BYTES as u64))
            .ok_or_else(|| AtrousError::allocation("tile byte size overflow"))?;
        Ok((px as f64 * f64::from(self.buffer_multiplier)).ceil() as u64)
    }

    /// Grow `roi` by [`TilingDescriptor::overlap`] on all sides, clamped to the full image.
    pub fn padded_roi(&self, roi: &Roi, geometry: &PieceGeometry) -> Roi {
        let full_w = (geometry.full_width as f32 * roi.scale).round() as i64;
        let full_h = (geometry.full_height as f32 * roi.scale).round() as i64;
        let o = i64::from(self.overlap);

        let x0 = (i64::from(roi.x) - o).max(0);
        let y0 = (i64::from(roi.y) - o).max(0);
        let x1 = (i64::from(roi.x) + i64::from(roi.width) + o).min(full_w.max(x0 + 1));
        let y1 = (i64::from(roi.y) + i64::from(roi.height) + o).min(full_h.max(y0 + 1));

        Roi {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0).max(1) as u32,
            height: (y1 - y0).max(1) as u32,
            scale: roi.scale,
        }
    }
}

/// Derives the tiling contract from the planned number of scales.
#[derive(Clone, Copy, Debug, Default)]
pub struct TilingAdvisor;

impl TilingAdvisor {
    /// Contract for a pyramid with `num_scales` scales.
    ///
    /// Input, output and one working buffer are always alive, plus one detail buffer per scale.
    /// The overlap saturates at `u32::MAX` for counts no planner produces.
    pub fn advise(num_scales: usize) -> TilingDescriptor {
        let overlap = if num_scales < 31 {
            2u32 << num_scales
        } else {
            u32::MAX
        };
        TilingDescriptor {
            buffer_multiplier: 3.0 + num_scales as f32,
            overlap,
            align_x: 1,
            align_y: 1,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/plan/tiling.rs"]
mod tests;
