use crate::foundation::error::{AtrousError, AtrousResult};

/// Maximum number of control points per curve.
pub const MAX_CURVE_POINTS: usize = 20;

/// One curve control point; both coordinates live in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CurvePoint {
    /// Detail index.
    pub x: f32,
    /// Curve value.
    pub y: f32,
}

impl CurvePoint {
    /// Shorthand constructor.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Cubic Catmull-Rom curve through user control points.
///
/// Tangents are finite differences of the neighboring points (one-sided at the ends). Values are
/// held constant outside the control-point range and clamped to `[0, 1]`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Curve {
    points: Vec<CurvePoint>,
}

impl Curve {
    /// Build a validated curve.
    pub fn new(points: Vec<CurvePoint>) -> AtrousResult<Self> {
        let curve = Self { points };
        curve.validate()?;
        Ok(curve)
    }

    /// `n` evenly spaced points at height `y` (at least two points).
    pub fn flat(y: f32, n: usize) -> Self {
        let n = n.clamp(2, MAX_CURVE_POINTS);
        let y = y.clamp(0.0, 1.0);
        let points = (0..n)
            .map(|k| CurvePoint::new(k as f32 / (n - 1) as f32, y))
            .collect();
        Self { points }
    }

    /// Evenly spaced points (from `x = 0` to `x = 1`) with the given heights.
    pub fn from_bands(ys: &[f32]) -> AtrousResult<Self> {
        if ys.len() < 2 {
            return Err(AtrousError::validation("a band curve needs at least 2 values"));
        }
        let last = (ys.len() - 1) as f32;
        Self::new(
            ys.iter()
                .enumerate()
                .map(|(k, &y)| CurvePoint::new(k as f32 / last, y))
                .collect(),
        )
    }

    /// Control points, sorted by `x`.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Check point count, ordering and ranges.
    pub fn validate(&self) -> AtrousResult<()> {
        if self.points.is_empty() || self.points.len() > MAX_CURVE_POINTS {
            return Err(AtrousError::validation(format!(
                "curve must have 1..={MAX_CURVE_POINTS} control points, got {}",
                self.points.len()
            )));
        }
        for p in &self.points {
            if !(0.0..=1.0).contains(&p.x) || !(0.0..=1.0).contains(&p.y) {
                return Err(AtrousError::validation(
                    "curve control points must lie in [0,1]x[0,1]",
                ));
            }
        }
        if self.points.windows(2).any(|w| w[1].x <= w[0].x) {
            return Err(AtrousError::validation(
                "curve control point x must be strictly increasing",
            ));
        }
        Ok(())
    }

    /// Curve value at `t`.
    pub fn evaluate(&self, t: f32) -> f32 {
        let p = &self.points;
        let (first, last) = match (p.first(), p.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return 0.0,
        };
        if p.len() == 1 || t <= first.x {
            return first.y;
        }
        if t >= last.x {
            return last.y;
        }

        // Segment k with p[k].x <= t < p[k + 1].x.
        let k = p.partition_point(|q| q.x <= t).saturating_sub(1);
        let (p0, p1) = (p[k], p[k + 1]);
        let h = p1.x - p0.x;
        let s = (t - p0.x) / h;

        let m0 = self.tangent(k) * h;
        let m1 = self.tangent(k + 1) * h;

        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        (h00 * p0.y + h10 * m0 + h01 * p1.y + h11 * m1).clamp(0.0, 1.0)
    }

    fn tangent(&self, k: usize) -> f32 {
        let p = &self.points;
        let lo = k.saturating_sub(1);
        let hi = (k + 1).min(p.len() - 1);
        let dx = p[hi].x - p[lo].x;
        if dx <= 0.0 {
            return 0.0;
        }
        (p[hi].y - p[lo].y) / dx
    }
}

#[cfg(test)]
#[path = "../../tests/unit/curve/spline.rs"]
mod tests;
