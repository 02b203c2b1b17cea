//! Decompose/synthesize kernels and the backends that run them.
//!
//! Every backend implements [`PyramidKernels`]; the pyramid driving loop is written once against
//! that trait so buffer ping-pong is identical on every backend.

pub(crate) mod cpu;
#[cfg(feature = "gpu")]
pub(crate) mod gpu;

use crate::{foundation::error::AtrousResult, plan::scales::ScaleParameters};

/// Available kernel backends.
///
/// - `Cpu` is always available.
/// - `Gpu` requires the `gpu` cargo feature and a usable adapter at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Row-parallel host implementation.
    Cpu,
    /// Compute-shader implementation.
    #[cfg(feature = "gpu")]
    Gpu,
}

/// One decomposition level and one reconstruction level over backend-owned buffers.
pub(crate) trait PyramidKernels {
    /// Full-size four-channel image living wherever the backend computes.
    type Buffer;

    fn backend(&self) -> Backend;

    /// Allocate an uninitialized-or-zeroed full-size buffer.
    fn alloc(&mut self, width: u32, height: u32) -> AtrousResult<Self::Buffer>;

    /// Edge-aware low-pass of `fine_in` at scale `scale` into `coarse_out`, residual into
    /// `detail_out`. Both outputs are fully overwritten.
    fn decompose(
        &mut self,
        coarse_out: &mut Self::Buffer,
        fine_in: &Self::Buffer,
        detail_out: &mut Self::Buffer,
        scale: u32,
        sharpen: f32,
    ) -> AtrousResult<()>;

    /// `out = coarse_in + boost * soft_threshold(detail_in, threshold)`, per channel.
    fn synthesize(
        &mut self,
        out: &mut Self::Buffer,
        coarse_in: &Self::Buffer,
        detail_in: &Self::Buffer,
        params: &ScaleParameters,
    ) -> AtrousResult<()>;
}
