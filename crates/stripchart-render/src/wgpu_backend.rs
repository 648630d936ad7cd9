//! wgpu implementation of [`RenderBackend`].
//!
//! Draw calls are recorded as snapshots of the bound state and replayed in a
//! single render pass at [`end_frame`](RenderBackend::end_frame). Each program's
//! uniform block is staged per draw into one buffer addressed with dynamic
//! offsets, and pipelines are built lazily per program, attribute layout and
//! topology.
//!
//! Buffer uploads go through the queue, so a buffer written twice within one
//! frame is drawn with its last contents.

use std::collections::HashMap;
use std::num::NonZeroU64;

use image::RgbaImage;

use crate::backend::{
    BufferId, ProgramId, ProgramSource, RenderBackend, TextureId, Topology, UniformLocation,
    UniformValue, VertexLayout,
};
use crate::error::ShaderError;
use crate::gpu_context::GpuContext;
use crate::program::{ProgramInterface, FRAGMENT_ENTRY, VERTEX_ENTRY};

const INITIAL_UNIFORM_CAPACITY: u64 = 64 * 1024;

struct ProgramSlot {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    has_texture: bool,
    /// Current uniform block contents.
    uniforms: Vec<u8>,
    texture_unit: u32,
}

struct BufferSlot {
    label: String,
    buffer: Option<wgpu::Buffer>,
    /// Bytes of valid data.
    len: u64,
}

struct TextureSlot {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug, Clone, Copy)]
struct BoundAttribute {
    location: u32,
    layout: VertexLayout,
    buffer: BufferId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    attributes: Vec<(u32, VertexLayout)>,
    topology: Topology,
}

struct RecordedDraw {
    key: PipelineKey,
    attributes: Vec<BoundAttribute>,
    uniforms: Vec<u8>,
    texture: Option<TextureId>,
    first: u32,
    count: u32,
    viewport: (u32, u32),
}

/// Renders to a window surface through wgpu.
pub struct WgpuBackend {
    context: GpuContext,
    pixel_ratio: f32,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniform_capacity: u64,
    programs: Vec<ProgramSlot>,
    buffers: Vec<BufferSlot>,
    textures: HashMap<TextureId, TextureSlot>,
    next_texture: u32,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    bound_buffer: Option<BufferId>,
    bound_textures: HashMap<u32, TextureId>,
    current_program: Option<ProgramId>,
    enabled: Vec<BoundAttribute>,
    clear_color: wgpu::Color,
    viewport: (u32, u32),
    draws: Vec<RecordedDraw>,
}

impl WgpuBackend {
    pub fn new(context: GpuContext, pixel_ratio: f32) -> Self {
        let device = &context.device;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Label Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_buffer = create_uniform_buffer(device, INITIAL_UNIFORM_CAPACITY);
        let viewport = context.dimensions();

        Self {
            context,
            pixel_ratio,
            uniform_layout,
            texture_layout,
            sampler,
            uniform_buffer,
            uniform_capacity: INITIAL_UNIFORM_CAPACITY,
            programs: Vec::new(),
            buffers: Vec::new(),
            textures: HashMap::new(),
            next_texture: 0,
            pipelines: HashMap::new(),
            bound_buffer: None,
            bound_textures: HashMap::new(),
            current_program: None,
            enabled: Vec::new(),
            clear_color: wgpu::Color::WHITE,
            viewport,
            draws: Vec::new(),
        }
    }

    /// Track the window's scale factor.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.pixel_ratio = pixel_ratio;
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Reconfigure a lost or outdated surface.
    pub fn reconfigure(&self) {
        self.context.configure_surface();
    }

    fn ensure_pipeline(&mut self, key: &PipelineKey) {
        if self.pipelines.contains_key(key) {
            return;
        }
        let program = &self.programs[key.program.0 as usize];

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .attributes
            .iter()
            .map(|(location, layout)| {
                [wgpu::VertexAttribute {
                    format: float_format(layout.components),
                    offset: 0,
                    shader_location: *location,
                }]
            })
            .collect();
        // one vertex buffer slot per attribute; the slot's slice starts at the
        // attribute offset
        let buffers: Vec<wgpu::VertexBufferLayout> = key
            .attributes
            .iter()
            .zip(&attributes)
            .map(|((_, layout), attrs)| wgpu::VertexBufferLayout {
                array_stride: layout.effective_stride() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let mut bind_group_layouts = vec![&self.uniform_layout];
        if program.has_texture {
            bind_group_layouts.push(&self.texture_layout);
        }
        let device = &self.context.device;
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", program.label)),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&program.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.context.surface_format(),
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: primitive_topology(key.topology),
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        log::debug!("Built pipeline for {} ({:?})", program.label, key.topology);
        self.pipelines.insert(key.clone(), pipeline);
    }

    /// Stage every draw's uniform block, returning the dynamic offset of each.
    fn upload_uniforms(&mut self, draws: &[RecordedDraw]) -> Vec<u32> {
        let align = u64::from(self.context.device.limits().min_uniform_buffer_offset_alignment);
        let mut staging: Vec<u8> = Vec::new();
        let mut offsets = Vec::with_capacity(draws.len());
        for draw in draws {
            let offset = align_to(staging.len() as u64, align);
            staging.resize(offset as usize, 0);
            offsets.push(offset as u32);
            staging.extend_from_slice(&draw.uniforms);
        }
        if staging.is_empty() {
            return offsets;
        }

        let needed = staging.len() as u64;
        if needed > self.uniform_capacity {
            self.uniform_capacity = needed.next_power_of_two();
            self.uniform_buffer = create_uniform_buffer(&self.context.device, self.uniform_capacity);
        }
        self.context.queue.write_buffer(&self.uniform_buffer, 0, &staging);
        offsets
    }

    /// Whether every resource a draw refers to exists and covers the range.
    fn is_drawable(&self, draw: &RecordedDraw) -> bool {
        if let Some(texture) = draw.texture {
            if !self.textures.contains_key(&texture) {
                return false;
            }
        }
        let last = u64::from(draw.first + draw.count - 1);
        draw.attributes.iter().all(|attr| {
            let Some(slot) = self.buffers.get(attr.buffer.0 as usize) else {
                return false;
            };
            let layout = attr.layout;
            let end = u64::from(layout.offset)
                + last * u64::from(layout.effective_stride())
                + u64::from(layout.components) * 4;
            slot.buffer.is_some() && end <= slot.len
        })
    }
}

impl RenderBackend for WgpuBackend {
    type Error = wgpu::SurfaceError;

    fn create_program(
        &mut self,
        source: &ProgramSource<'_>,
        interface: &ProgramInterface,
    ) -> Result<ProgramId, ShaderError> {
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Vertex Shader", source.label)),
            source: wgpu::ShaderSource::Wgsl(source.vertex.into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Fragment Shader", source.label)),
            source: wgpu::ShaderSource::Wgsl(source.fragment.into()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Backend {
                label: source.label.to_string(),
                message: error.to_string(),
            });
        }

        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(ProgramSlot {
            label: source.label.to_string(),
            vertex,
            fragment,
            has_texture: interface.has_texture(),
            uniforms: vec![0; interface.uniform_size().max(16) as usize],
            texture_unit: 0,
        });
        Ok(id)
    }

    fn create_buffer(&mut self, label: &str) -> BufferId {
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(BufferSlot {
            label: label.to_string(),
            buffer: None,
            len: 0,
        });
        id
    }

    fn upload_buffer(&mut self, buffer: BufferId, data: &[f32]) {
        let Some(slot) = self.buffers.get_mut(buffer.0 as usize) else {
            log::warn!("Upload to unknown buffer {buffer:?}");
            return;
        };
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let needed = bytes.len() as u64;
        slot.len = needed;
        if needed == 0 {
            return;
        }

        let too_small = slot.buffer.as_ref().map_or(true, |b| b.size() < needed);
        if too_small {
            slot.buffer = Some(self.context.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&slot.label),
                size: needed,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        if let Some(gpu_buffer) = &slot.buffer {
            self.context.queue.write_buffer(gpu_buffer, 0, bytes);
        }
    }

    fn bind_buffer(&mut self, buffer: BufferId) {
        self.bound_buffer = Some(buffer);
    }

    fn create_texture(&mut self, label: &str, image: &RgbaImage) -> TextureId {
        let device = &self.context.device;
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        if width > 0 && height > 0 {
            self.context.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                image.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                size,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(
            id,
            TextureSlot {
                _texture: texture,
                bind_group,
            },
        );
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.bound_textures.retain(|_, bound| *bound != texture);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.bound_textures.insert(unit, texture);
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
    }

    fn enable_attribute(&mut self, location: u32, layout: VertexLayout) {
        let Some(buffer) = self.bound_buffer else {
            log::warn!("Attribute {location} enabled with no buffer bound");
            return;
        };
        self.enabled.retain(|a| a.location != location);
        self.enabled.push(BoundAttribute {
            location,
            layout,
            buffer,
        });
    }

    fn disable_attribute(&mut self, location: u32) {
        self.enabled.retain(|a| a.location != location);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self.current_program else {
            log::warn!("Uniform set with no program in use");
            return;
        };
        let slot = &mut self.programs[program.0 as usize];
        match location {
            UniformLocation::Block { offset, .. } => {
                let bytes = value.as_bytes();
                let start = offset as usize;
                if let Some(dst) = slot.uniforms.get_mut(start..start + bytes.len()) {
                    dst.copy_from_slice(bytes);
                }
            }
            UniformLocation::Texture { .. } => {
                if let UniformValue::Int(unit) = value {
                    slot.texture_unit = unit.max(0) as u32;
                }
            }
        }
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        let Some(program) = self.current_program else {
            log::warn!("Draw issued with no program in use");
            return;
        };
        if count == 0 {
            return;
        }
        let slot = &self.programs[program.0 as usize];

        let texture = if slot.has_texture {
            match self.bound_textures.get(&slot.texture_unit) {
                Some(texture) => Some(*texture),
                None => {
                    log::warn!("{}: no texture bound to unit {}", slot.label, slot.texture_unit);
                    return;
                }
            }
        } else {
            None
        };

        let mut attributes = self.enabled.clone();
        attributes.sort_by_key(|a| a.location);
        let key = PipelineKey {
            program,
            attributes: attributes.iter().map(|a| (a.location, a.layout)).collect(),
            topology,
        };
        self.draws.push(RecordedDraw {
            key,
            attributes,
            uniforms: slot.uniforms.clone(),
            texture,
            first,
            count,
            viewport: self.viewport,
        });
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_color = wgpu::Color {
            r: f64::from(color[0]),
            g: f64::from(color[1]),
            b: f64::from(color[2]),
            a: f64::from(color[3]),
        };
        self.draws.clear();
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn end_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let draws: Vec<RecordedDraw> = std::mem::take(&mut self.draws)
            .into_iter()
            .filter(|draw| {
                let ok = self.is_drawable(draw);
                if !ok {
                    log::warn!("Skipping draw of {:?} with missing resources", draw.key.program);
                }
                ok
            })
            .collect();

        let output = self.context.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        for draw in &draws {
            self.ensure_pipeline(&draw.key);
        }
        let offsets = self.upload_uniforms(&draws);

        let mut uniform_groups: HashMap<ProgramId, wgpu::BindGroup> = HashMap::new();
        for draw in &draws {
            let program = draw.key.program;
            if uniform_groups.contains_key(&program) {
                continue;
            }
            let size = self.programs[program.0 as usize].uniforms.len() as u64;
            let group = self.context.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("uniform_bind_group"),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.uniform_buffer,
                        offset: 0,
                        size: NonZeroU64::new(size),
                    }),
                }],
            });
            uniform_groups.insert(program, group);
        }

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Strip Chart Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Strip Chart Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let (surface_w, surface_h) = self.context.dimensions();
            for (draw, offset) in draws.iter().zip(&offsets) {
                let (Some(pipeline), Some(uniforms)) = (
                    self.pipelines.get(&draw.key),
                    uniform_groups.get(&draw.key.program),
                ) else {
                    continue;
                };

                let (vw, vh) = draw.viewport;
                render_pass.set_viewport(
                    0.0,
                    0.0,
                    vw.clamp(1, surface_w) as f32,
                    vh.clamp(1, surface_h) as f32,
                    0.0,
                    1.0,
                );
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, uniforms, &[*offset]);
                if let Some(slot) = draw.texture.and_then(|t| self.textures.get(&t)) {
                    render_pass.set_bind_group(1, &slot.bind_group, &[]);
                }
                for (index, attr) in draw.attributes.iter().enumerate() {
                    if let Some(buffer) = &self.buffers[attr.buffer.0 as usize].buffer {
                        render_pass
                            .set_vertex_buffer(index as u32, buffer.slice(u64::from(attr.layout.offset)..));
                    }
                }
                render_pass.draw(draw.first..draw.first + draw.count, 0..1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn create_uniform_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Uniform Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        Topology::LineList => wgpu::PrimitiveTopology::LineList,
        Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}
