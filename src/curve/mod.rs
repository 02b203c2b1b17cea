//! Curves mapping a normalized detail index to per-scale strengths.
//!
//! The engine only consumes [`CurveSource`]; [`CurveSet`] is a concrete control-point
//! implementation for hosts that do not bring their own evaluator.

pub(crate) mod set;
pub(crate) mod spline;

pub use set::{CurvePreset, CurveSet, PRESET_BANDS};
pub use spline::{Curve, CurvePoint, MAX_CURVE_POINTS};

/// The five independent equalizer curves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveId {
    /// Luminance contrast boost.
    LumaBoost,
    /// Chrominance saturation boost.
    ChromaBoost,
    /// Edge sensitivity of the decomposition.
    Sharpness,
    /// Luminance noise threshold.
    LumaThreshold,
    /// Chrominance noise threshold.
    ChromaThreshold,
}

impl CurveId {
    /// All curve ids in storage order.
    pub const ALL: [CurveId; 5] = [
        CurveId::LumaBoost,
        CurveId::ChromaBoost,
        CurveId::Sharpness,
        CurveId::LumaThreshold,
        CurveId::ChromaThreshold,
    ];
}

/// Source of curve values.
///
/// `t` is the detail index in `[0, 1]` (1 = finest scale, 0 = coarsest). Implementations must be
/// deterministic and free of side effects for a fixed parameter set.
pub trait CurveSource {
    /// Value of curve `id` at `t`.
    fn evaluate(&self, id: CurveId, t: f32) -> f32;
}

impl<T: CurveSource + ?Sized> CurveSource for &T {
    fn evaluate(&self, id: CurveId, t: f32) -> f32 {
        (**self).evaluate(id, t)
    }
}

/// Adapter turning a closure into a [`CurveSource`].
#[derive(Clone, Copy, Debug)]
pub struct FnCurves<F>(pub F);

impl<F> CurveSource for FnCurves<F>
where
    F: Fn(CurveId, f32) -> f32,
{
    fn evaluate(&self, id: CurveId, t: f32) -> f32 {
        (self.0)(id, t)
    }
}
