use std::time::{Duration, Instant};

use crate::{
    curve::{CurveSet, CurveSource},
    engine::opts::{EngineOpts, build_thread_pool},
    engine::pyramid::run_pyramid,
    foundation::core::{Image, PieceGeometry, Roi},
    foundation::error::{AtrousError, AtrousResult},
    kernel::{Backend, cpu::CpuKernels},
    plan::scales::{ScalePlan, ScalePlanner},
    plan::tiling::{TilingAdvisor, TilingDescriptor},
};
#[cfg(feature = "gpu")]
use crate::kernel::gpu::GpuKernels;

/// Telemetry for one processed tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunStats {
    /// Number of pyramid scales that ran.
    pub num_scales: usize,
    /// Backend that produced the output.
    pub backend: Backend,
    /// Wall time spent in [`Equalizer`], planning included.
    pub elapsed: Duration,
}

/// Result of an attempt to run on the device.
#[cfg(feature = "gpu")]
#[derive(Debug)]
pub enum DeviceOutcome {
    /// The device produced the output.
    Executed(Image),
    /// The device path did not run; the caller should use the host path.
    NotExecuted(String),
}

/// Edge-aware wavelet equalizer for one set of curves.
///
/// Holds the planner, the curves and a dedicated rayon pool; all processing entry points take
/// `&self` and may be called from several threads.
pub struct Equalizer<C = CurveSet> {
    opts: EngineOpts,
    planner: ScalePlanner,
    curves: C,
    pool: rayon::ThreadPool,
}

impl<C> std::fmt::Debug for Equalizer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Equalizer")
            .field("opts", &self.opts)
            .field("threads", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

impl<C: CurveSource> Equalizer<C> {
    /// Validate `opts` and build the worker pool.
    pub fn new(opts: EngineOpts, curves: C) -> AtrousResult<Self> {
        opts.validate()?;
        let planner = ScalePlanner::new(opts.planner)?;
        let pool = build_thread_pool(opts.threads)?;
        Ok(Self {
            opts,
            planner,
            curves,
            pool,
        })
    }

    /// Active options.
    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    /// Curves sampled by [`Equalizer::plan`].
    pub fn curves(&self) -> &C {
        &self.curves
    }

    /// Replace the curves; the next call plans with the new values.
    pub fn set_curves(&mut self, curves: C) {
        self.curves = curves;
    }

    /// Plan the pyramid for a tile.
    pub fn plan(&self, geometry: &PieceGeometry, roi: &Roi) -> AtrousResult<ScalePlan> {
        self.planner
            .plan_with_diagnostics(geometry, roi, &self.curves, self.opts.diagnostics)
    }

    /// Memory and overlap contract for a tile; does not sample curves.
    pub fn tiling_requirements(
        &self,
        geometry: &PieceGeometry,
        roi: &Roi,
    ) -> AtrousResult<TilingDescriptor> {
        let n = self.planner.sample(geometry, roi)?.len();
        Ok(TilingAdvisor::advise(n))
    }

    /// Equalize one tile on the host.
    ///
    /// `image_in` must be `roi_in.width x roi_in.height`, and `roi_out` must have the same size.
    /// When the tile is too small for any scale the output is a bit-identical copy.
    pub fn process(
        &self,
        image_in: &Image,
        geometry: &PieceGeometry,
        roi_in: &Roi,
        roi_out: &Roi,
    ) -> AtrousResult<Image> {
        self.process_with_stats(image_in, geometry, roi_in, roi_out)
            .map(|(image, _)| image)
    }

    /// [`Equalizer::process`], also reporting [`RunStats`].
    #[tracing::instrument(
        skip(self, image_in, geometry, roi_out),
        fields(width = image_in.width(), height = image_in.height())
    )]
    pub fn process_with_stats(
        &self,
        image_in: &Image,
        geometry: &PieceGeometry,
        roi_in: &Roi,
        roi_out: &Roi,
    ) -> AtrousResult<(Image, RunStats)> {
        let started = Instant::now();
        check_tile(image_in, roi_in, roi_out)?;
        let plan = self.plan(geometry, roi_in)?;
        let image = self.process_with_plan(image_in, &plan)?;
        Ok((
            image,
            RunStats {
                num_scales: plan.num_scales(),
                backend: Backend::Cpu,
                elapsed: started.elapsed(),
            },
        ))
    }

    /// Run the host pyramid with a caller-supplied plan.
    pub fn process_with_plan(&self, image_in: &Image, plan: &ScalePlan) -> AtrousResult<Image> {
        plan.validate()?;
        if plan.num_scales() == 0 {
            return image_in.try_clone();
        }
        self.pool.install(|| {
            run_pyramid(
                &mut CpuKernels,
                image_in,
                image_in.width(),
                image_in.height(),
                plan,
            )
        })
    }

    /// Equalize one tile on the device.
    ///
    /// Caller errors (bad geometry, mismatched buffers) are returned as `Err`; anything that goes
    /// wrong on the device becomes [`DeviceOutcome::NotExecuted`].
    #[cfg(feature = "gpu")]
    #[tracing::instrument(
        skip(self, gpu, image_in, geometry, roi_out),
        fields(width = image_in.width(), height = image_in.height())
    )]
    pub fn process_device(
        &self,
        gpu: &mut GpuKernels,
        image_in: &Image,
        geometry: &PieceGeometry,
        roi_in: &Roi,
        roi_out: &Roi,
    ) -> AtrousResult<DeviceOutcome> {
        check_tile(image_in, roi_in, roi_out)?;
        let plan = self.plan(geometry, roi_in)?;
        self.process_device_with_plan(gpu, image_in, &plan)
    }

    /// Run the device pyramid with a caller-supplied plan.
    #[cfg(feature = "gpu")]
    pub fn process_device_with_plan(
        &self,
        gpu: &mut GpuKernels,
        image_in: &Image,
        plan: &ScalePlan,
    ) -> AtrousResult<DeviceOutcome> {
        plan.validate()?;
        if plan.num_scales() == 0 {
            return image_in.try_clone().map(DeviceOutcome::Executed);
        }
        match run_device(gpu, image_in, plan) {
            Ok(image) => Ok(DeviceOutcome::Executed(image)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    adapter = gpu.adapter_name(),
                    "device path not executed"
                );
                Ok(DeviceOutcome::NotExecuted(e.to_string()))
            }
        }
    }

    /// Try the device first and fall back to the host when it does not execute.
    #[cfg(feature = "gpu")]
    pub fn process_auto(
        &self,
        gpu: Option<&mut GpuKernels>,
        image_in: &Image,
        geometry: &PieceGeometry,
        roi_in: &Roi,
        roi_out: &Roi,
    ) -> AtrousResult<(Image, RunStats)> {
        let Some(gpu) = gpu else {
            return self.process_with_stats(image_in, geometry, roi_in, roi_out);
        };
        let started = Instant::now();
        check_tile(image_in, roi_in, roi_out)?;
        let plan = self.plan(geometry, roi_in)?;
        match self.process_device_with_plan(gpu, image_in, &plan)? {
            DeviceOutcome::Executed(image) => Ok((
                image,
                RunStats {
                    num_scales: plan.num_scales(),
                    backend: Backend::Gpu,
                    elapsed: started.elapsed(),
                },
            )),
            DeviceOutcome::NotExecuted(_) => {
                let image = self.process_with_plan(image_in, &plan)?;
                Ok((
                    image,
                    RunStats {
                        num_scales: plan.num_scales(),
                        backend: Backend::Cpu,
                        elapsed: started.elapsed(),
                    },
                ))
            }
        }
    }
}

#[cfg(feature = "gpu")]
fn run_device(gpu: &mut GpuKernels, image_in: &Image, plan: &ScalePlan) -> AtrousResult<Image> {
    let input = gpu.upload(image_in)?;
    let out = run_pyramid(gpu, &input, image_in.width(), image_in.height(), plan)?;
    gpu.download(&out)
}

/// `image_in` must match `roi_in`, and the module never resizes, so `roi_out` must too.
fn check_tile(image_in: &Image, roi_in: &Roi, roi_out: &Roi) -> AtrousResult<()> {
    roi_in.validate()?;
    roi_out.validate()?;
    if image_in.width() != roi_in.width || image_in.height() != roi_in.height {
        return Err(AtrousError::validation(format!(
            "input image is {}x{} but roi_in is {}x{}",
            image_in.width(),
            image_in.height(),
            roi_in.width,
            roi_in.height
        )));
    }
    if roi_out.width != roi_in.width || roi_out.height != roi_in.height {
        return Err(AtrousError::validation(format!(
            "roi_out {}x{} differs from roi_in {}x{}",
            roi_out.width, roi_out.height, roi_in.width, roi_in.height
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/engine/equalizer.rs"]
mod tests;
