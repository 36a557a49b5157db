//! Frame evaluation in a `wgpu` compute shader.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use log::{debug, info, trace};

use crate::{
    colour::Rgb,
    command_buffer,
    command_encoder::CommandEncoderExt,
    complex::Complex,
    compute,
    error::Error,
    frame::{Frame, PixelEvaluator},
    palette::Palette,
    screen,
    session::Snapshot,
    typed_buffer::{self, Buffer},
    var::Var,
};

/// An adapter with its device and queue.
pub struct Context {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Context {
    /// A context with no surface, for offscreen evaluation.
    pub fn headless() -> Result<Self, Error> {
        let instance = wgpu::Instance::new(wgpu::Backends::all());
        Self::new(&instance, None)
    }

    pub fn new(instance: &wgpu::Instance, surface: Option<&wgpu::Surface>) -> Result<Self, Error> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: surface,
        }))
        .ok_or(Error::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!(
            "using adapter {:?} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("device"),
                features: wgpu::Features::empty(),
                limits: wgpu::Limits::default(),
            },
            None,
        ))?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }
}

/// Uniform block of `mandelbrot.wgsl`.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct Parameters {
    pub center: Complex,
    pub size: [f32; 2],
    pub width: u32,
    pub height: u32,
    pub max_iterations: u32,
    pub cutoff: f32,
}

impl Parameters {
    pub fn new(snapshot: &Snapshot) -> Self {
        let (size_x, size_y) = snapshot.view.extent(snapshot.viewport);
        Self {
            center: snapshot.view.center(),
            size: [size_x, size_y],
            width: snapshot.viewport.width,
            height: snapshot.viewport.height,
            max_iterations: snapshot.parameters.max_iterations(),
            cutoff: snapshot.parameters.escape_radius_squared(),
        }
    }
}

struct UploadedPalette {
    source: Arc<Palette>,
    buffer: Buffer<u32>,
}

/// Device-side results for one viewport size.
struct Outputs {
    size: screen::Size,
    escapes: Buffer<u32>,
    colours: Buffer<u32>,
    escapes_staging: Buffer<u32>,
    colours_staging: Buffer<u32>,
}

impl Outputs {
    fn new(device: &wgpu::Device, size: screen::Size) -> Self {
        let len = size.pixel_count() as u64;
        let output = |label| {
            typed_buffer::Builder::new(len)
                .with_label(label)
                .with_usage(wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC)
                .create(device)
        };
        let staging = |label| {
            typed_buffer::Builder::new(len)
                .with_label(label)
                .with_usage(wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST)
                .create(device)
        };

        Self {
            size,
            escapes: output("escapes-buffer"),
            colours: output("colours-buffer"),
            escapes_staging: staging("escapes-staging-buffer"),
            colours_staging: staging("colours-staging-buffer"),
        }
    }

    fn destroy(self) {
        self.escapes.destroy();
        self.colours.destroy();
        self.escapes_staging.destroy();
        self.colours_staging.destroy();
    }
}

/// Evaluates frames with `mandelbrot.wgsl`, one invocation per pixel.
pub struct GpuEvaluator {
    context: Arc<Context>,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    parameters: Var<Parameters>,
    palette: Option<UploadedPalette>,
    outputs: Option<Outputs>,
    bind_group: Option<wgpu::BindGroup>,
}

impl GpuEvaluator {
    pub fn new(context: Arc<Context>) -> Self {
        let device = &context.device;

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mandelbrot-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("mandelbrot.wgsl").into()),
        });

        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mandelbrot-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage(1, true),
                storage(2, false),
                storage(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mandelbrot-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("mandelbrot-pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader_module,
            entry_point: "mandelbrot",
        });

        let parameters = Var::new(device, "parameters-buffer", Parameters::zeroed());

        Self {
            context,
            pipeline,
            bind_group_layout,
            parameters,
            palette: None,
            outputs: None,
            bind_group: None,
        }
    }

    /// Bring device buffers in line with `snapshot`, re-creating only what changed.
    fn prepare(&mut self, snapshot: &Snapshot) {
        let device = &self.context.device;
        let mut stale = self.bind_group.is_none();

        let palette_changed = self
            .palette
            .as_ref()
            .map_or(true, |uploaded| !Arc::ptr_eq(&uploaded.source, &snapshot.palette));
        if palette_changed {
            debug!("uploading palette with {} entries", snapshot.palette.len());
            let packed = snapshot.palette.packed();
            let buffer = typed_buffer::Builder::from(packed.as_slice())
                .with_label("palette-buffer")
                .with_usage(wgpu::BufferUsages::STORAGE)
                .create(device);
            if let Some(old) = self.palette.replace(UploadedPalette {
                source: Arc::clone(&snapshot.palette),
                buffer,
            }) {
                old.buffer.destroy();
            }
            stale = true;
        }

        if self.outputs.as_ref().map(|outputs| outputs.size) != Some(snapshot.viewport) {
            debug!("allocating outputs for {:?}", snapshot.viewport);
            if let Some(old) = self
                .outputs
                .replace(Outputs::new(device, snapshot.viewport))
            {
                old.destroy();
            }
            stale = true;
        }

        if stale {
            if let (Some(palette), Some(outputs)) = (&self.palette, &self.outputs) {
                self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("mandelbrot-bind-group"),
                    layout: &self.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: self.parameters.binding_resource(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: palette.buffer.binding_resource(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: outputs.escapes.binding_resource(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: outputs.colours.binding_resource(),
                        },
                    ],
                }));
            }
        }

        self.parameters
            .write(&self.context.queue, Parameters::new(snapshot));
    }
}

impl PixelEvaluator for GpuEvaluator {
    fn render(&mut self, snapshot: &Snapshot) -> Result<Frame, Error> {
        let viewport = snapshot.viewport;
        if viewport.is_empty() {
            debug!("skipping frame for empty viewport {:?}", viewport);
            return Ok(Frame::empty(viewport));
        }

        trace!("begin gpu frame {:?}", viewport);

        self.prepare(snapshot);
        let (outputs, bind_group) = match (&self.outputs, &self.bind_group) {
            (Some(outputs), Some(bind_group)) => (outputs, bind_group),
            // `prepare` always leaves both in place for a non-empty viewport.
            _ => unreachable!("gpu evaluator was not prepared"),
        };

        let device = &self.context.device;
        let pipeline = &self.pipeline;
        let command_buffer = command_buffer::create(device, "mandelbrot-encoder", |encoder| {
            encoder.with_compute_pass("mandelbrot", |compute_pass| {
                compute_pass.set_pipeline(pipeline);
                compute_pass.set_bind_group(0, bind_group, &[]);
                let (x, y, z) = compute::mandelbrot_dispatch_size(viewport);
                compute_pass.dispatch_workgroups(x, y, z);
            });
            typed_buffer::copy_buffer_to_buffer(encoder, &outputs.escapes, &outputs.escapes_staging);
            typed_buffer::copy_buffer_to_buffer(encoder, &outputs.colours, &outputs.colours_staging);
        });
        self.context.queue.submit([command_buffer]);

        let escapes = outputs.escapes_staging.read(device)?;
        let colours = outputs
            .colours_staging
            .read(device)?
            .into_iter()
            .map(Rgb::unpack)
            .collect();

        trace!("end gpu frame");

        Ok(Frame {
            size: viewport,
            escapes,
            colours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        colour::Gradients,
        frame::CpuEvaluator,
        kernel::KernelParameters,
        view::ViewState,
    };

    fn context() -> Option<Arc<Context>> {
        match Context::headless() {
            Ok(context) => Some(Arc::new(context)),
            Err(error) => {
                eprintln!("skipping gpu test: {}", error);
                None
            }
        }
    }

    fn snapshot(viewport: screen::Size, view: ViewState, parameters: KernelParameters) -> Snapshot {
        Snapshot {
            viewport,
            view,
            parameters,
            palette: Arc::new(Palette::build(&Gradients::builtin(), "rainbow", 256).unwrap()),
        }
    }

    #[test]
    fn parameters_match_uniform_layout() {
        assert_eq!(std::mem::size_of::<Parameters>(), 32);

        let snapshot = snapshot(
            screen::Size::new(640, 480),
            ViewState::default(),
            KernelParameters::default(),
        );
        let parameters = Parameters::new(&snapshot);
        assert_eq!(parameters.center, Complex::new(-0.4, 0.0));
        assert!((parameters.size[0] - 2.56).abs() < 1e-6);
        assert!((parameters.size[1] - 1.92).abs() < 1e-6);
        assert_eq!((parameters.width, parameters.height), (640, 480));
        assert_eq!(parameters.max_iterations, 20);
        assert_eq!(parameters.cutoff, 10.0);
    }

    #[test]
    fn two_by_two_unit_view() {
        let Some(context) = context() else { return };
        let snapshot = snapshot(
            screen::Size::new(2, 2),
            ViewState::new(Complex::ZERO, 1.0).unwrap(),
            KernelParameters::new(2, 4.0).unwrap(),
        );
        let frame = GpuEvaluator::new(context).render(&snapshot).unwrap();
        assert_eq!(frame.escapes, vec![2, 2, 2, 2]);
        assert_eq!(frame.colours, vec![snapshot.palette.get(255).unwrap(); 4]);
    }

    #[test]
    fn empty_viewport_is_skipped() {
        let Some(context) = context() else { return };
        let frame = GpuEvaluator::new(context)
            .render(&snapshot(
                screen::Size::new(0, 8),
                ViewState::default(),
                KernelParameters::default(),
            ))
            .unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn matches_cpu_evaluator() {
        let Some(context) = context() else { return };
        let mut gpu = GpuEvaluator::new(context);
        let mut cpu = CpuEvaluator::new(0).unwrap();

        for snapshot in [
            snapshot(
                screen::Size::new(160, 120),
                ViewState::default(),
                KernelParameters::default(),
            ),
            // Re-uses the pipeline with a new size and a deeper budget.
            snapshot(
                screen::Size::new(61, 37),
                ViewState::new(Complex::new(-0.75, 0.1), 0.5 / 61.0).unwrap(),
                KernelParameters::new(200, 4.0).unwrap(),
            ),
        ] {
            let expected = cpu.render(&snapshot).unwrap();
            let actual = gpu.render(&snapshot).unwrap();
            assert_eq!(actual.size, expected.size);

            // Devices may fuse multiply-adds, which can move a pixel right on
            // the escape boundary by an iteration.
            let mismatched = expected
                .escapes
                .iter()
                .zip(&actual.escapes)
                .filter(|(a, b)| a != b)
                .count();
            assert!(
                mismatched * 100 <= expected.escapes.len(),
                "{} of {} pixels differ",
                mismatched,
                expected.escapes.len()
            );

            for (index, (escape, colour)) in actual.escapes.iter().zip(&actual.colours).enumerate() {
                if *escape == expected.escapes[index] {
                    assert_eq!(*colour, expected.colours[index], "pixel {}", index);
                }
            }
        }
    }
}
