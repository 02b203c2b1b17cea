use wgpu::util::DeviceExt;

use crate::{
    foundation::core::{Image, PIXEL_BYTES, Pixel},
    foundation::error::{AtrousError, AtrousResult},
    kernel::{Backend, PyramidKernels},
    plan::scales::ScaleParameters,
};

const WORKGROUP: u32 = 16;
const SHADER: &str = include_str!("atrous.wgsl");

/// Uniform block shared by both entry points of `atrous.wgsl`.
#[derive(Clone, Copy, Debug, Default)]
struct KernelParams {
    width: u32,
    height: u32,
    mult: u32,
    sharpen: f32,
    threshold: [f32; 4],
    boost: [f32; 4],
}

impl KernelParams {
    /// Uniform-buffer layout of the WGSL `Params` struct.
    fn to_words(self) -> [u32; 16] {
        let [t0, t1, t2, t3] = self.threshold.map(f32::to_bits);
        let [b0, b1, b2, b3] = self.boost.map(f32::to_bits);
        [
            self.width,
            self.height,
            self.mult,
            0,
            self.sharpen.to_bits(),
            0,
            0,
            0,
            t0,
            t1,
            t2,
            t3,
            b0,
            b1,
            b2,
            b3,
        ]
    }
}

#[derive(Clone, Copy)]
enum BindingKind {
    StorageRead,
    StorageReadWrite,
    Uniform,
}

fn layout_entry(binding: u32, kind: BindingKind) -> wgpu::BindGroupLayoutEntry {
    let ty = match kind {
        BindingKind::StorageRead => wgpu::BufferBindingType::Storage { read_only: true },
        BindingKind::StorageReadWrite => wgpu::BufferBindingType::Storage { read_only: false },
        BindingKind::Uniform => wgpu::BufferBindingType::Uniform,
    };
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Full-size image resident in a device storage buffer.
pub(crate) struct GpuImage {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
}

impl GpuImage {
    fn byte_len(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * PIXEL_BYTES as u64
    }
}

/// Compute-shader kernels bound to one wgpu device.
///
/// Creating a `GpuKernels` probes the adapter once; afterwards every pyramid level is a single
/// dispatch submitted in order on the same queue.
pub struct GpuKernels {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    decompose: wgpu::ComputePipeline,
    synthesize: wgpu::ComputePipeline,
    placeholder: wgpu::Buffer,
    adapter: wgpu::AdapterInfo,
}

impl std::fmt::Debug for GpuKernels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuKernels")
            .field("adapter", &self.adapter.name)
            .field("backend", &self.adapter.backend)
            .finish_non_exhaustive()
    }
}

impl GpuKernels {
    /// Acquire an adapter and device and compile both pipelines.
    ///
    /// Fails with a [`AtrousError::Device`] mentioning `no gpu adapter available` on machines
    /// without a usable adapter.
    pub fn new() -> AtrousResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                AtrousError::device("no gpu adapter available")
            }
            other => AtrousError::device(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("atrous_device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| AtrousError::device(format!("wgpu request_device failed: {e:?}")))?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("atrous_shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let entries = [
            BindingKind::Uniform,
            BindingKind::StorageRead,
            BindingKind::StorageRead,
            BindingKind::StorageReadWrite,
            BindingKind::StorageReadWrite,
        ]
        .iter()
        .enumerate()
        .map(|(i, kind)| layout_entry(i as u32, *kind))
        .collect::<Vec<_>>();
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("atrous_bgl"),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("atrous_pl"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };
        let decompose = pipeline("decompose");
        let synthesize = pipeline("synthesize");

        // Fills binding slots an entry point does not use.
        let placeholder = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("atrous_placeholder"),
            size: PIXEL_BYTES as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            "gpu kernels ready"
        );

        Ok(Self {
            device,
            queue,
            layout,
            decompose,
            synthesize,
            placeholder,
            adapter: info,
        })
    }

    /// Human-readable adapter name.
    pub fn adapter_name(&self) -> &str {
        &self.adapter.name
    }

    fn check_fits(&self, width: u32, height: u32) -> AtrousResult<u64> {
        let bytes = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|v| v.checked_mul(PIXEL_BYTES as u64))
            .ok_or_else(|| AtrousError::allocation("device buffer size overflow"))?;
        let limits = self.device.limits();
        let max_binding = u64::from(limits.max_storage_buffer_binding_size);
        if bytes > max_binding || bytes > limits.max_buffer_size {
            return Err(AtrousError::device(format!(
                "{width}x{height} image needs {bytes} bytes, device binding limit is {max_binding}"
            )));
        }
        let groups = width.div_ceil(WORKGROUP).max(height.div_ceil(WORKGROUP));
        if groups > limits.max_compute_workgroups_per_dimension {
            return Err(AtrousError::device(format!(
                "{width}x{height} image exceeds the dispatch size limit"
            )));
        }
        Ok(bytes)
    }

    /// Run `f` inside an out-of-memory error scope.
    fn guarded<T>(&self, what: &str, f: impl FnOnce() -> T) -> AtrousResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let out = f();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(e) => Err(AtrousError::allocation(format!("{what}: {e}"))),
            None => Ok(out),
        }
    }

    pub(crate) fn upload(&mut self, image: &Image) -> AtrousResult<GpuImage> {
        self.check_fits(image.width(), image.height())?;
        let buffer = self.guarded("device input upload", || {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("atrous_input"),
                    contents: bytemuck::cast_slice(image.pixels()),
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                })
        })?;
        Ok(GpuImage {
            buffer,
            width: image.width(),
            height: image.height(),
        })
    }

    pub(crate) fn download(&mut self, image: &GpuImage) -> AtrousResult<Image> {
        let size = image.byte_len();
        let readback = self.guarded("device readback buffer", || {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("atrous_readback"),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("atrous_readback"),
            });
        encoder.copy_buffer_to_buffer(&image.buffer, 0, &readback, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| AtrousError::device(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| AtrousError::device("readback channel closed"))?
            .map_err(|e| AtrousError::device(format!("readback map failed: {e:?}")))?;

        let mapped = buffer_slice.get_mapped_range();
        let pixels: Vec<Pixel> = bytemuck::pod_collect_to_vec(&mapped[..]);
        drop(mapped);
        readback.unmap();

        Image::from_pixels(image.width, image.height, pixels)
    }

    fn dispatch(
        &self,
        pipeline: Pipeline,
        params: KernelParams,
        inputs: [&wgpu::Buffer; 2],
        outputs: [&wgpu::Buffer; 2],
    ) -> AtrousResult<()> {
        let words = params.to_words();
        let uniform = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("atrous_params"),
                contents: bytemuck::cast_slice(&words),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("atrous_bg"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: inputs[0].as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: inputs[1].as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: outputs[0].as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: outputs[1].as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("atrous_dispatch"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("atrous_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(match pipeline {
                Pipeline::Decompose => &self.decompose,
                Pipeline::Synthesize => &self.synthesize,
            });
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                params.width.div_ceil(WORKGROUP),
                params.height.div_ceil(WORKGROUP),
                1,
            );
        }
        self.queue.submit(Some(encoder.finish()));

        // Let the driver make progress without blocking on this level.
        self.device
            .poll(wgpu::PollType::Poll)
            .map_err(|e| AtrousError::device(format!("wgpu poll failed: {e:?}")))?;
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Pipeline {
    Decompose,
    Synthesize,
}

fn require_shape(a: &GpuImage, b: &GpuImage, what: &str) -> AtrousResult<()> {
    if a.width != b.width || a.height != b.height {
        return Err(AtrousError::validation(format!(
            "{what} buffers must share the input dimensions"
        )));
    }
    Ok(())
}

impl PyramidKernels for GpuKernels {
    type Buffer = GpuImage;

    fn backend(&self) -> Backend {
        Backend::Gpu
    }

    fn alloc(&mut self, width: u32, height: u32) -> AtrousResult<GpuImage> {
        let size = self.check_fits(width, height)?;
        let buffer = self.guarded("device pyramid buffer", || {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("atrous_level"),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        })?;
        Ok(GpuImage {
            buffer,
            width,
            height,
        })
    }

    fn decompose(
        &mut self,
        coarse_out: &mut GpuImage,
        fine_in: &GpuImage,
        detail_out: &mut GpuImage,
        scale: u32,
        sharpen: f32,
    ) -> AtrousResult<()> {
        require_shape(coarse_out, fine_in, "decompose")?;
        require_shape(detail_out, fine_in, "decompose")?;
        let mult = 1u32
            .checked_shl(scale)
            .ok_or_else(|| AtrousError::validation(format!("scale index {scale} too large")))?;
        let params = KernelParams {
            width: fine_in.width,
            height: fine_in.height,
            mult,
            sharpen,
            ..KernelParams::default()
        };
        self.dispatch(
            Pipeline::Decompose,
            params,
            [&fine_in.buffer, &self.placeholder],
            [&coarse_out.buffer, &detail_out.buffer],
        )
    }

    fn synthesize(
        &mut self,
        out: &mut GpuImage,
        coarse_in: &GpuImage,
        detail_in: &GpuImage,
        params: &ScaleParameters,
    ) -> AtrousResult<()> {
        require_shape(out, coarse_in, "synthesize")?;
        require_shape(detail_in, coarse_in, "synthesize")?;
        let kp = KernelParams {
            width: coarse_in.width,
            height: coarse_in.height,
            threshold: params.threshold,
            boost: params.boost,
            ..KernelParams::default()
        };
        self.dispatch(
            Pipeline::Synthesize,
            kp,
            [&coarse_in.buffer, &detail_in.buffer],
            [&out.buffer, &self.placeholder],
        )
    }
}
