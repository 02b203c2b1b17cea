use crate::{
    curve::{CurveId, CurveSource, spline::Curve},
    foundation::error::{AtrousError, AtrousResult},
};

/// Number of evenly spaced bands used by the built-in presets.
pub const PRESET_BANDS: usize = 6;

/// Built-in curve presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurvePreset {
    /// Identity: unit boost, no thresholds, no edge sensitivity.
    Neutral,
    /// Local contrast on medium scales.
    Clarity,
    /// Boost of the finest scales.
    Sharpen,
    /// Soft-thresholding strongest at fine scales.
    Denoise,
    /// Fine detail attenuated, coarse structure lifted.
    Bloom,
}

impl CurvePreset {
    /// Every preset, in declaration order.
    pub const ALL: [CurvePreset; 5] = [
        CurvePreset::Neutral,
        CurvePreset::Clarity,
        CurvePreset::Sharpen,
        CurvePreset::Denoise,
        CurvePreset::Bloom,
    ];

    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Clarity => "clarity",
            Self::Sharpen => "sharpen",
            Self::Denoise => "denoise",
            Self::Bloom => "bloom",
        }
    }
}

/// One [`Curve`] per [`CurveId`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CurveSet {
    /// Luminance boost, `0.5` = unchanged.
    pub luma_boost: Curve,
    /// Chrominance boost, `0.5` = unchanged.
    pub chroma_boost: Curve,
    /// Edge sensitivity, `0` = plain (non edge-aware) wavelets.
    pub sharpness: Curve,
    /// Luminance noise threshold.
    pub luma_threshold: Curve,
    /// Chrominance noise threshold.
    pub chroma_threshold: Curve,
}

impl Default for CurveSet {
    fn default() -> Self {
        Self::neutral()
    }
}

impl CurveSet {
    /// Curves that leave the image unchanged.
    pub fn neutral() -> Self {
        Self {
            luma_boost: Curve::flat(0.5, PRESET_BANDS),
            chroma_boost: Curve::flat(0.5, PRESET_BANDS),
            sharpness: Curve::flat(0.0, PRESET_BANDS),
            luma_threshold: Curve::flat(0.0, PRESET_BANDS),
            chroma_threshold: Curve::flat(0.0, PRESET_BANDS),
        }
    }

    /// Curves for a built-in preset.
    pub fn preset(preset: CurvePreset) -> Self {
        let mut set = Self::neutral();
        // Band 0 is the coarsest scale, band 5 the finest.
        let bands: &[(CurveId, [f32; PRESET_BANDS])] = match preset {
            CurvePreset::Neutral => &[],
            CurvePreset::Clarity => &[
                (CurveId::LumaBoost, [0.5, 0.56, 0.62, 0.62, 0.56, 0.5]),
                (CurveId::Sharpness, [0.25; PRESET_BANDS]),
            ],
            CurvePreset::Sharpen => &[
                (CurveId::LumaBoost, [0.5, 0.5, 0.5, 0.53, 0.6, 0.66]),
                (CurveId::Sharpness, [0.3; PRESET_BANDS]),
            ],
            CurvePreset::Denoise => &[
                (CurveId::LumaThreshold, [0.0, 0.0, 0.02, 0.05, 0.1, 0.2]),
                (CurveId::ChromaThreshold, [0.0, 0.0, 0.05, 0.1, 0.2, 0.3]),
                (CurveId::Sharpness, [0.2; PRESET_BANDS]),
            ],
            CurvePreset::Bloom => &[
                (CurveId::LumaBoost, [0.65, 0.6, 0.55, 0.5, 0.42, 0.36]),
                (CurveId::Sharpness, [0.1; PRESET_BANDS]),
            ],
        };
        for (id, ys) in bands {
            *set.curve_mut(*id) = band_curve(ys);
        }
        set
    }

    /// Curve for `id`.
    pub fn curve(&self, id: CurveId) -> &Curve {
        match id {
            CurveId::LumaBoost => &self.luma_boost,
            CurveId::ChromaBoost => &self.chroma_boost,
            CurveId::Sharpness => &self.sharpness,
            CurveId::LumaThreshold => &self.luma_threshold,
            CurveId::ChromaThreshold => &self.chroma_threshold,
        }
    }

    /// Mutable curve for `id`.
    pub fn curve_mut(&mut self, id: CurveId) -> &mut Curve {
        match id {
            CurveId::LumaBoost => &mut self.luma_boost,
            CurveId::ChromaBoost => &mut self.chroma_boost,
            CurveId::Sharpness => &mut self.sharpness,
            CurveId::LumaThreshold => &mut self.luma_threshold,
            CurveId::ChromaThreshold => &mut self.chroma_threshold,
        }
    }

    /// Validate every curve.
    pub fn validate(&self) -> AtrousResult<()> {
        for id in CurveId::ALL {
            self.curve(id)
                .validate()
                .map_err(|e| AtrousError::validation(format!("curve {id:?}: {e}")))?;
        }
        Ok(())
    }

    /// Parse and validate a JSON curve set.
    pub fn from_json_str(s: &str) -> AtrousResult<Self> {
        let set: Self = serde_json::from_str(s)?;
        set.validate()?;
        Ok(set)
    }

    /// Pretty JSON representation.
    pub fn to_json_string(&self) -> AtrousResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl CurveSource for CurveSet {
    fn evaluate(&self, id: CurveId, t: f32) -> f32 {
        self.curve(id).evaluate(t)
    }
}

fn band_curve(ys: &[f32; PRESET_BANDS]) -> Curve {
    // Preset tables are in range, so the fallback is unreachable in practice.
    Curve::from_bands(ys).unwrap_or_else(|_| Curve::flat(ys[0], PRESET_BANDS))
}

#[cfg(test)]
#[path = "../../tests/unit/curve/set.rs"]
mod tests;
