use crate::foundation::core::Pixel;

/// Separable B3-like low-pass taps `[1, 4, 6, 4, 1] / 16`.
///
/// All taps and their pairwise products are dyadic, so weight sums are exact in `f32`.
pub const FILTER: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

const ONE_BITS: i32 = 0x3f80_0000;
const E_BITS: i32 = 0x402d_f854;

/// Fast `exp(x)` for `x <= 0` by linear interpolation of the IEEE-754 bit pattern.
///
/// Exactly `1.0` at `x = 0`, monotone non-increasing as `x` decreases, never negative, and `0.0`
/// below roughly `-93`. Inputs are clamped to `[-100, 0]`; the GPU kernel evaluates the same
/// expression.
#[inline]
pub fn fast_expf(x: f32) -> f32 {
    let x = x.clamp(-100.0, 0.0);
    let k = ONE_BITS + (x * (E_BITS - ONE_BITS) as f32) as i32;
    f32::from_bits(k.max(0) as u32)
}

/// `sign(d) * max(0, |d| - t)`.
#[inline]
pub fn soft_threshold(d: f32, t: f32) -> f32 {
    (d.abs() - t).max(0.0).copysign(d)
}

/// `log2(x)`, with every `x <= 0` (and NaN) mapped to negative infinity.
#[inline]
pub fn log2f(x: f32) -> f32 {
    if x > 0.0 { x.log2() } else { f32::NEG_INFINITY }
}

#[inline]
pub(crate) fn add4(a: Pixel, b: Pixel) -> Pixel {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]]
}

#[inline]
pub(crate) fn sub4(a: Pixel, b: Pixel) -> Pixel {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2], a[3] - b[3]]
}

#[inline]
pub(crate) fn mul4(a: Pixel, b: Pixel) -> Pixel {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]]
}

#[inline]
pub(crate) fn div4(a: Pixel, b: Pixel) -> Pixel {
    [a[0] / b[0], a[1] / b[1], a[2] / b[2], a[3] / b[3]]
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
