//! Edge-aware à-trous wavelet equalizer.
//!
//! An image is split into a coarse base layer and a stack of detail layers at doubling spatial
//! scale, each detail layer is soft-thresholded and boosted according to user curves, and the
//! image is rebuilt from the coarsest layer down.
//!
//! - Describe the tile with [`PieceGeometry`] and [`Roi`]
//! - Build an [`Equalizer`] from [`EngineOpts`] and a [`CurveSource`] (usually a [`CurveSet`])
//! - Call [`Equalizer::process`], or ask [`Equalizer::tiling_requirements`] first when tiling
//!
//! The `gpu` feature adds a wgpu compute path (`GpuKernels`) that produces the same result within
//! floating-point tolerance and reports failure instead of erroring, so hosts can fall back.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Host-side color model adapter.
pub mod color;
pub(crate) mod curve;
pub(crate) mod engine;
pub(crate) mod kernel;
pub(crate) mod plan;

pub use crate::foundation::core::{Image, PIXEL_BYTES, PieceGeometry, Pixel, Roi};
pub use crate::foundation::error::{AtrousError, AtrousResult};
pub use crate::foundation::math::{FILTER, fast_expf, log2f, soft_threshold};

pub use crate::curve::{
    Curve, CurveId, CurvePoint, CurvePreset, CurveSet, CurveSource, FnCurves, MAX_CURVE_POINTS,
    PRESET_BANDS,
};
#[cfg(feature = "gpu")]
pub use crate::engine::DeviceOutcome;
pub use crate::engine::{EngineOpts, Equalizer, RunStats};
pub use crate::kernel::Backend;
#[cfg(feature = "gpu")]
pub use crate::kernel::gpu::GpuKernels;
pub use crate::plan::scales::{PlannerOpts, ScaleParameters, ScalePlan, ScalePlanner};
pub use crate::plan::tiling::{TilingAdvisor, TilingDescriptor};
