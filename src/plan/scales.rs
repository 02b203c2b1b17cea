use crate::{
    curve::{CurveId, CurveSource},
    foundation::core::{PieceGeometry, Roi},
    foundation::error::{AtrousError, AtrousResult},
    foundation::math::log2f,
};

/// Policy constants of the scale planner.
///
/// The defaults are tuned for luminance in `[0, 100]` and chrominance in roughly `[-100, 100]`;
/// changing them changes how soft reconstructions look.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlannerOpts {
    /// Hard cap on the number of pyramid scales.
    pub max_scales: u32,
    /// Largest filter support, as a fraction of the shorter side of the full image.
    pub support_fraction: f32,
    /// Luminance threshold gain.
    pub luma_threshold_gain: f32,
    /// Chrominance threshold gain.
    pub chroma_threshold_gain: f32,
    /// Thresholds fall off as `2^(-falloff * (1 - t))` toward coarse scales.
    pub threshold_falloff: f32,
    /// Sharpness curve to edge-stopping strength.
    pub sharpen_gain: f32,
}

impl Default for PlannerOpts {
    fn default() -> Self {
        Self {
            max_scales: 8,
            support_fraction: 0.2,
            luma_threshold_gain: 10.0,
            chroma_threshold_gain: 20.0,
            threshold_falloff: 7.0,
            sharpen_gain: 0.0025,
        }
    }
}

impl PlannerOpts {
    /// Upper bound accepted for [`PlannerOpts::max_scales`].
    pub const MAX_SCALES_LIMIT: u32 = 12;

    /// Reject out-of-range policy values.
    pub fn validate(&self) -> AtrousResult<()> {
        if self.max_scales == 0 || self.max_scales > Self::MAX_SCALES_LIMIT {
            return Err(AtrousError::validation(format!(
                "max_scales must be in 1..={}",
                Self::MAX_SCALES_LIMIT
            )));
        }
        if !self.support_fraction.is_finite()
            || self.support_fraction <= 0.0
            || self.support_fraction > 1.0
        {
            return Err(AtrousError::validation(
                "support_fraction must be in (0, 1]",
            ));
        }
        for (name, v) in [
            ("luma_threshold_gain", self.luma_threshold_gain),
            ("chroma_threshold_gain", self.chroma_threshold_gain),
            ("threshold_falloff", self.threshold_falloff),
            ("sharpen_gain", self.sharpen_gain),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(AtrousError::validation(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }
}

/// Per-scale thresholds, boosts and edge sensitivity.
///
/// Channels 0 and 3 always share a value, as do channels 1 and 2: the record broadcasts a
/// luminance/chrominance pair to four lanes.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScaleParameters {
    /// Soft-threshold per channel.
    pub threshold: [f32; 4],
    /// Multiplier applied to the thresholded detail, per channel.
    pub boost: [f32; 4],
    /// Edge-stopping strength used while decomposing this scale.
    pub sharpen: f32,
}

impl ScaleParameters {
    /// Broadcast luminance/chrominance values into the four-lane layout.
    pub fn from_channels(
        luma_threshold: f32,
        chroma_threshold: f32,
        luma_boost: f32,
        chroma_boost: f32,
        sharpen: f32,
    ) -> Self {
        Self {
            threshold: [
                luma_threshold,
                chroma_threshold,
                chroma_threshold,
                luma_threshold,
            ],
            boost: [luma_boost, chroma_boost, chroma_boost, luma_boost],
            sharpen,
        }
    }

    /// Zero thresholds and unit boosts: reconstruction reproduces the input.
    pub fn passthrough(sharpen: f32) -> Self {
        Self::from_channels(0.0, 0.0, 1.0, 1.0, sharpen)
    }

    pub(crate) fn validate(&self) -> AtrousResult<()> {
        let finite = self
            .threshold
            .iter()
            .chain(self.boost.iter())
            .chain(std::iter::once(&self.sharpen))
            .all(|v| v.is_finite());
        if !finite {
            return Err(AtrousError::validation(
                "scale parameters must be finite",
            ));
        }
        if self.threshold.iter().any(|&t| t < 0.0) || self.sharpen < 0.0 {
            return Err(AtrousError::validation(
                "thresholds and sharpen must be >= 0",
            ));
        }
        Ok(())
    }
}

/// Output of the planner: one [`ScaleParameters`] per accepted scale.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScalePlan {
    /// Parameters, finest scale first.
    pub scales: Vec<ScaleParameters>,
    /// Detail index per scale; empty for hand-built plans.
    pub detail_index: Vec<f32>,
}

impl ScalePlan {
    /// A plan with explicit parameters and no detail indices.
    pub fn from_scales(scales: Vec<ScaleParameters>) -> Self {
        Self {
            scales,
            detail_index: Vec::new(),
        }
    }

    /// Number of pyramid scales.
    pub fn num_scales(&self) -> usize {
        self.scales.len()
    }

    /// Half-support, in pixels, of the coarsest filter (`2 * 2^(N-1)`); 0 for an empty plan.
    pub fn max_half_support(&self) -> u32 {
        match self.num_scales() {
            0 => 0,
            n => 2u32 << (n - 1),
        }
    }

    pub(crate) fn validate(&self) -> AtrousResult<()> {
        if self.scales.len() > PlannerOpts::MAX_SCALES_LIMIT as usize {
            return Err(AtrousError::validation(format!(
                "plan has {} scales, at most {} are supported",
                self.scales.len(),
                PlannerOpts::MAX_SCALES_LIMIT
            )));
        }
        self.scales.iter().try_for_each(ScaleParameters::validate)
    }
}

/// Chooses how many scales fit a tile and samples the curves for each of them.
#[derive(Clone, Debug, Default)]
pub struct ScalePlanner {
    opts: PlannerOpts,
}

impl ScalePlanner {
    /// Create a planner with validated options.
    pub fn new(opts: PlannerOpts) -> AtrousResult<Self> {
        opts.validate()?;
        Ok(Self { opts })
    }

    /// Active options.
    pub fn opts(&self) -> &PlannerOpts {
        &self.opts
    }

    /// Detail index of every usable scale, without sampling curves.
    ///
    /// Uses the same stopping rule as [`ScalePlanner::plan`].
    pub fn sample(&self, geometry: &PieceGeometry, roi: &Roi) -> AtrousResult<Vec<f32>> {
        geometry.validate()?;
        roi.validate()?;
        Ok(self.detail_indices(geometry, roi))
    }

    /// Plan the pyramid for `roi`.
    pub fn plan(
        &self,
        geometry: &PieceGeometry,
        roi: &Roi,
        curves: &dyn CurveSource,
    ) -> AtrousResult<ScalePlan> {
        self.plan_with_diagnostics(geometry, roi, curves, false)
    }

    /// Plan the pyramid, logging every scale at debug level when `diagnostics_requested`.
    pub fn plan_with_diagnostics(
        &self,
        geometry: &PieceGeometry,
        roi: &Roi,
        curves: &dyn CurveSource,
        diagnostics_requested: bool,
    ) -> AtrousResult<ScalePlan> {
        let detail_index = self.sample(geometry, roi)?;
        let mut scales = Vec::with_capacity(detail_index.len());
        for (i, &t) in detail_index.iter().enumerate() {
            let params = self.sample_curves(curves, t)?;
            if diagnostics_requested {
                tracing::debug!(
                    scale = i,
                    detail_index = t,
                    luma_boost = params.boost[0],
                    chroma_boost = params.boost[1],
                    luma_threshold = params.threshold[0],
                    chroma_threshold = params.threshold[1],
                    sharpen = params.sharpen,
                    "planned scale"
                );
            }
            scales.push(params);
        }
        Ok(ScalePlan {
            scales,
            detail_index,
        })
    }

    fn detail_indices(&self, geometry: &PieceGeometry, roi: &Roi) -> Vec<f32> {
        // Zooming past 1:1 does not reveal finer original detail; plan as if at 1:1.
        let scale = geometry.processing_scale(roi).min(1.0);
        let max_scales = self.opts.max_scales.min(PlannerOpts::MAX_SCALES_LIMIT);

        // Largest wanted support on the unscaled image.
        let cap = support(max_scales - 1) as f32;
        let supp0 = cap.min(self.opts.support_fraction * geometry.min_full_dim());
        let i0 = log2f((supp0 - 1.0) * 0.5);
        if i0 <= 0.0 {
            return Vec::new();
        }

        let tile_min = u64::from(roi.width.min(roi.height));
        let mut out = Vec::new();
        for i in 0..max_scales {
            if !fits_tile(i + 1, tile_min) {
                break;
            }
            let supp = support(i);
            let supp_in = supp as f32 / scale;
            let i_in = log2f((supp_in - 1.0) * 0.5) - 1.0;
            let t = 1.0 - (i_in + 0.5) / i0;
            if t < 0.0 {
                break;
            }
            out.push(t);
        }
        out
    }

    fn sample_curves(&self, curves: &dyn CurveSource, t: f32) -> AtrousResult<ScaleParameters> {
        let eval = |id: CurveId| -> AtrousResult<f32> {
            let v = curves.evaluate(id, t);
            if !v.is_finite() {
                return Err(AtrousError::validation(format!(
                    "curve {id:?} returned a non-finite value at t={t}"
                )));
            }
            Ok(v)
        };

        let luma_boost = 2.0 * eval(CurveId::LumaBoost)?;
        let chroma_boost = 2.0 * eval(CurveId::ChromaBoost)?;
        let falloff = (-self.opts.threshold_falloff * (1.0 - t)).exp2();
        let luma_threshold =
            falloff * self.opts.luma_threshold_gain * eval(CurveId::LumaThreshold)?;
        let chroma_threshold =
            falloff * self.opts.chroma_threshold_gain * eval(CurveId::ChromaThreshold)?;
        let sharpen = self.opts.sharpen_gain * eval(CurveId::Sharpness)?;

        let params = ScaleParameters::from_channels(
            luma_threshold.max(0.0),
            chroma_threshold.max(0.0),
            luma_boost * luma_boost,
            chroma_boost * chroma_boost,
            sharpen.max(0.0),
        );
        Ok(params)
    }
}

/// Filter support of scale `i` on the processed buffer: `2 * 2^(i+1) + 1`.
pub(crate) fn support(i: u32) -> u64 {
    2 * (2u64 << i) + 1
}

/// A pyramid of `num_scales` scales fits when twice its coarsest half-support, `4 * 2^num_scales`,
/// is within the shorter tile side.
pub(crate) fn fits_tile(num_scales: u32, tile_min: u64) -> bool {
    num_scales < 62 && (4u64 << num_scales) <= tile_min
}

#[cfg(test)]
#[path = "../../tests/unit/plan/scales.rs"]
mod tests;
