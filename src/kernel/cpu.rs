use rayon::prelude::*;

use crate::{
    foundation::core::{Image, Pixel},
    foundation::error::{AtrousError, AtrousResult},
    foundation::math::{FILTER, add4, div4, fast_expf, mul4, soft_threshold, sub4},
    kernel::{Backend, PyramidKernels},
    plan::scales::ScaleParameters,
};

/// Largest accepted scale index; `2^scale` must stay addressable.
const MAX_SCALE_INDEX: u32 = 30;

/// Row-parallel host kernels.
///
/// Work runs on whichever rayon pool is current, so callers wrap a pyramid in `pool.install`.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CpuKernels;

impl PyramidKernels for CpuKernels {
    type Buffer = Image;

    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn alloc(&mut self, width: u32, height: u32) -> AtrousResult<Image> {
        Image::new(width, height)
    }

    fn decompose(
        &mut self,
        coarse_out: &mut Image,
        fine_in: &Image,
        detail_out: &mut Image,
        scale: u32,
        sharpen: f32,
    ) -> AtrousResult<()> {
        decompose(coarse_out, fine_in, detail_out, scale, sharpen)
    }

    fn synthesize(
        &mut self,
        out: &mut Image,
        coarse_in: &Image,
        detail_in: &Image,
        params: &ScaleParameters,
    ) -> AtrousResult<()> {
        synthesize(out, coarse_in, detail_in, &params.threshold, &params.boost)
    }
}

/// One level of the edge-aware à-trous transform.
///
/// Taps sit `2^scale` pixels apart. Each tap is weighted by the separable filter times an
/// edge-stopping term: luminance differences drive lane 0, chrominance differences drive lanes
/// 1-2, and alpha is weighted by the filter alone. Out-of-range taps replicate the border pixel.
pub(crate) fn decompose(
    coarse_out: &mut Image,
    fine_in: &Image,
    detail_out: &mut Image,
    scale: u32,
    sharpen: f32,
) -> AtrousResult<()> {
    if !coarse_out.same_shape(fine_in) || !detail_out.same_shape(fine_in) {
        return Err(AtrousError::validation(
            "decompose buffers must share the input dimensions",
        ));
    }
    if scale > MAX_SCALE_INDEX {
        return Err(AtrousError::validation(format!(
            "scale index {scale} exceeds {MAX_SCALE_INDEX}"
        )));
    }
    if !sharpen.is_finite() || sharpen < 0.0 {
        return Err(AtrousError::validation("sharpen must be finite and >= 0"));
    }

    let w = fine_in.width() as usize;
    let h = fine_in.height() as usize;
    let mult = 1usize << scale;
    let src = fine_in.pixels();

    coarse_out
        .pixels_mut()
        .par_chunks_mut(w)
        .zip(detail_out.pixels_mut().par_chunks_mut(w))
        .enumerate()
        .for_each(|(y, (coarse_row, detail_row))| {
            decompose_row(src, w, h, y, mult, sharpen, coarse_row, detail_row);
        });
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decompose_row(
    src: &[Pixel],
    w: usize,
    h: usize,
    y: usize,
    mult: usize,
    sharpen: f32,
    coarse_row: &mut [Pixel],
    detail_row: &mut [Pixel],
) {
    let reach = 2 * mult;
    let row_interior = y >= reach && y + reach < h;
    let (lo, hi) = if row_interior && w > 2 * reach {
        (reach, w - reach)
    } else {
        (w, w)
    };

    let mut emit = |x: usize, coarse: Pixel| {
        coarse_row[x] = coarse;
        detail_row[x] = sub4(src[y * w + x], coarse);
    };

    for x in (0..lo).chain(hi..w) {
        let c = accumulate(src, y * w + x, sharpen, |i, j| {
            let sx = clamp_tap(x, i, mult, w);
            let sy = clamp_tap(y, j, mult, h);
            sy * w + sx
        });
        emit(x, c);
    }
    for x in lo..hi {
        let c = accumulate(src, y * w + x, sharpen, |i, j| {
            (y + j * mult - reach) * w + x + i * mult - reach
        });
        emit(x, c);
    }
}

/// Tap `k` (0..5) around `pos`, replicating the border.
#[inline]
fn clamp_tap(pos: usize, k: usize, mult: usize, len: usize) -> usize {
    let p = pos as i64 + (k as i64 - 2) * mult as i64;
    p.clamp(0, len as i64 - 1) as usize
}

/// Normalized edge-aware weighted mean around `src[center]`; `index(i, j)` maps tap column `i`
/// and tap row `j` to a buffer index.
#[inline(always)]
fn accumulate(
    src: &[Pixel],
    center: usize,
    sharpen: f32,
    index: impl Fn(usize, usize) -> usize,
) -> Pixel {
    let c = src[center];
    let mut sum = [0.0f32; 4];
    let mut wsum = [0.0f32; 4];
    for (j, fj) in FILTER.iter().enumerate() {
        for (i, fi) in FILTER.iter().enumerate() {
            let px = src[index(i, j)];
            let wgt = edge_weight(c, px, sharpen, fi * fj);
            sum = add4(sum, mul4(wgt, px));
            wsum = add4(wsum, wgt);
        }
    }
    // The center tap always contributes a positive weight, so `wsum` is never zero.
    div4(sum, wsum)
}

#[inline(always)]
fn edge_weight(center: Pixel, px: Pixel, sharpen: f32, spatial: f32) -> Pixel {
    let d = sub4(center, px);
    let wl = fast_expf(-sharpen * (d[0] * d[0]));
    let wc = fast_expf(-sharpen * (d[1] * d[1] + d[2] * d[2]));
    [spatial * wl, spatial * wc, spatial * wc, spatial]
}

/// One level of reconstruction: `out = coarse_in + boost * soft_threshold(detail_in, threshold)`.
pub(crate) fn synthesize(
    out: &mut Image,
    coarse_in: &Image,
    detail_in: &Image,
    threshold: &[f32; 4],
    boost: &[f32; 4],
) -> AtrousResult<()> {
    if !out.same_shape(coarse_in) || !detail_in.same_shape(coarse_in) {
        return Err(AtrousError::validation(
            "synthesize buffers must share the input dimensions",
        ));
    }

    let w = coarse_in.width() as usize;
    out.pixels_mut()
        .par_chunks_mut(w)
        .zip(coarse_in.pixels().par_chunks(w))
        .zip(detail_in.pixels().par_chunks(w))
        .for_each(|((out_row, coarse_row), detail_row)| {
            for ((o, c), d) in out_row.iter_mut().zip(coarse_row).zip(detail_row) {
                for ch in 0..4 {
                    o[ch] = c[ch] + boost[ch] * soft_threshold(d[ch], threshold[ch]);
                }
            }
        });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/cpu.rs"]
mod tests;
