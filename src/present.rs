//! Drawing an evaluated [`Frame`] to a surface.

use log::debug;

use crate::{
    command_encoder::CommandEncoderExt,
    frame::Frame,
    gpu::Context,
    screen,
    typed_buffer::{self, Buffer},
    var::Var,
};

/// Full-screen pass that reads packed frame colours from a storage buffer.
pub struct Presenter {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    screen: Var<screen::Size>,
    colours: Option<Buffer<u32>>,
    bind_group: Option<wgpu::BindGroup>,
}

impl Presenter {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("present-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("present.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("present-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("present-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("present-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vertex_main",
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fragment_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let screen = Var::new(device, "screen-size-buffer", screen::Size::default());

        Self {
            pipeline,
            bind_group_layout,
            screen,
            colours: None,
            bind_group: None,
        }
    }

    /// Copy `frame` to the device. An empty frame clears what was shown.
    pub fn upload(&mut self, context: &Context, frame: &Frame) {
        self.screen.write(&context.queue, frame.size);

        if frame.is_empty() {
            self.bind_group = None;
            return;
        }

        let packed: Vec<u32> = frame.colours.iter().map(|colour| colour.pack()).collect();
        let len = packed.len() as u64;

        if self.colours.as_ref().map(Buffer::len) != Some(len) {
            debug!("allocating present buffer for {:?}", frame.size);
            let colours = typed_buffer::Builder::new(len)
                .with_label("present-colours-buffer")
                .with_usage(wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST)
                .create(&context.device);
            if let Some(old) = self.colours.replace(colours) {
                old.destroy();
            }
            self.bind_group = None;
        }

        if let Some(colours) = &self.colours {
            colours.write(&context.queue, &packed);

            if self.bind_group.is_none() {
                self.bind_group = Some(context.device.create_bind_group(
                    &wgpu::BindGroupDescriptor {
                        label: Some("present-bind-group"),
                        layout: &self.bind_group_layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: self.screen.binding_resource(),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: colours.binding_resource(),
                            },
                        ],
                    },
                ));
            }
        }
    }

    pub fn draw(&self, command_encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        command_encoder.with_render_pass(
            &wgpu::RenderPassDescriptor {
                label: Some("present-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            },
            |render_pass| {
                if let Some(bind_group) = &self.bind_group {
                    render_pass.set_pipeline(&self.pipeline);
                    render_pass.set_bind_group(0, bind_group, &[]);
                    render_pass.draw(0..4, 0..1);
                }
            },
        );
    }
}
