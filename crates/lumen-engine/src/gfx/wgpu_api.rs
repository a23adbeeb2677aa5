use std::collections::HashMap;
use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::coords::{Extent, Vec2};
use crate::device::{Gpu, ScreenFrame};
use crate::error::GfxError;
use crate::paint::Color;

use super::{
    BlendMode, FilterMode, FramebufferId, GpuVertex, GraphicsApi, PresentStatus, Projection,
    TextureId,
};

/// Texel format of every engine texture (render targets included).
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    extent: Extent,
}

struct DrawRecord {
    texture: TextureId,
    blend: BlendMode,
    range: Range<u32>,
}

/// A pass is recorded on the CPU and encoded into one wgpu render pass on `end_pass`.
struct PassRecord {
    target: Option<FramebufferId>,
    projection: Projection,
    clear: Option<Color>,
    vertices: Vec<GpuVertex>,
    draws: Vec<DrawRecord>,
}

/// wgpu implementation of [`GraphicsApi`].
///
/// One pipeline per (target format, blend mode), one bind group per texture.
/// Untextured draws sample a 1x1 white texture. Screen passes share the surface
/// frame acquired by the first of them until [`present`](GraphicsApi::present).
pub struct WgpuApi {
    gpu: Gpu,

    textures: HashMap<TextureId, GpuTexture>,
    framebuffers: HashMap<FramebufferId, TextureId>,
    next_id: u64,

    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<(wgpu::TextureFormat, BlendMode), wgpu::RenderPipeline>,
    nearest_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,
    white: TextureId,

    frame: Option<ScreenFrame>,
    pass: Option<PassRecord>,
    blend: BlendMode,
    bound: Option<TextureId>,
    fatal: bool,
}

impl WgpuApi {
    pub fn new(gpu: Gpu) -> Result<Self, GfxError> {
        let device = gpu.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lumen batch shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/batch.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen texture bgl"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen batch pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let make_sampler = |label: &str, filter: wgpu::FilterMode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter,
                min_filter: filter,
                ..Default::default()
            })
        };
        let nearest_sampler = make_sampler("lumen nearest sampler", wgpu::FilterMode::Nearest);
        let linear_sampler = make_sampler("lumen linear sampler", wgpu::FilterMode::Linear);

        let mut api = Self {
            gpu,
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            next_id: 1,
            shader,
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            nearest_sampler,
            linear_sampler,
            white: TextureId::NONE,
            frame: None,
            pass: None,
            blend: BlendMode::Alpha,
            bound: None,
            fatal: false,
        };

        api.white = api.create_texture(
            Extent::new(1, 1),
            Some(&Color::WHITE.to_array()),
            FilterMode::Nearest,
        )?;

        Ok(api)
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn ensure_pipeline(&mut self, format: wgpu::TextureFormat, blend: BlendMode) {
        if self.pipelines.contains_key(&(format, blend)) {
            return;
        }

        let pipeline = self.gpu.device().create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lumen batch pipeline"),
            layout: Some(&self.pipeline_layout),

            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(blend_state(blend)),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("WgpuApi: created pipeline for {format:?} / {blend:?}");
        self.pipelines.insert((format, blend), pipeline);
    }

    /// Makes sure the surface frame for screen passes is acquired.
    fn ensure_frame(&mut self) -> bool {
        if self.frame.is_some() {
            return true;
        }
        match self.gpu.acquire_frame() {
            Ok(frame) => {
                self.frame = Some(frame);
                true
            }
            Err(status) => {
                self.fatal |= status == PresentStatus::Fatal;
                false
            }
        }
    }

    fn encode_pass(&mut self, pass: PassRecord) {
        let format = match pass.target {
            None => {
                if !self.ensure_frame() {
                    return;
                }
                self.gpu.surface_format()
            }
            Some(_) => TEXTURE_FORMAT,
        };

        for draw in &pass.draws {
            self.ensure_pipeline(format, draw.blend);
        }

        let vbo = (!pass.vertices.is_empty()).then(|| {
            self.gpu.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lumen batch vbo"),
                contents: bytemuck::cast_slice(&pass.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        let view = match pass.target {
            None => match self.frame.as_ref() {
                Some(frame) => &frame.view,
                None => return,
            },
            Some(fb) => {
                let Some(tex) = self.framebuffers.get(&fb).and_then(|t| self.textures.get(t)) else {
                    log::warn!("WgpuApi: pass on unknown framebuffer {}; dropped", fb.0);
                    return;
                };
                &tex.view
            }
        };

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lumen pass encoder"),
            });

        {
            let load = match pass.clear {
                Some(color) => wgpu::LoadOp::Clear(color.to_wgpu()),
                None => wgpu::LoadOp::Load,
            };

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lumen batch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some(vbo) = vbo.as_ref() {
                rpass.set_vertex_buffer(0, vbo.slice(..));

                for draw in &pass.draws {
                    let Some(pipeline) = self.pipelines.get(&(format, draw.blend)) else { continue };
                    let Some(tex) = self
                        .textures
                        .get(&draw.texture)
                        .or_else(|| self.textures.get(&self.white))
                    else {
                        continue;
                    };

                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, &tex.bind_group, &[]);
                    rpass.draw(draw.range.clone(), 0..1);
                }
            }
        }

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
    }
}

impl GraphicsApi for WgpuApi {
    fn create_texture(
        &mut self,
        extent: Extent,
        pixels: Option<&[u8]>,
        filter: FilterMode,
    ) -> Result<TextureId, GfxError> {
        let max = self.gpu.max_texture_dimension();
        if extent.is_empty() || extent.width > max || extent.height > max {
            return Err(GfxError::InvalidExtent { width: extent.width, height: extent.height });
        }
        if let Some(p) = pixels {
            if p.len() != extent.area() * 4 {
                return Err(GfxError::SizeMismatch { expected: extent.area() * 4, actual: p.len() });
            }
        }

        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("lumen texture"),
            size: extent3d(extent),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        if let Some(p) = pixels {
            write_pixels(self.gpu.queue(), &texture, extent, p);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = match filter {
            FilterMode::Nearest => &self.nearest_sampler,
            FilterMode::Linear => &self.linear_sampler,
        };
        let bind_group = self.gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen texture bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let id = TextureId(self.alloc_id());
        self.textures.insert(id, GpuTexture { texture, view, bind_group, extent });
        Ok(id)
    }

    fn upload_texture(&mut self, id: TextureId, pixels: &[u8]) -> Result<(), GfxError> {
        let tex = self.textures.get(&id).ok_or(GfxError::UnknownTexture(id))?;
        let expected = tex.extent.area() * 4;
        if pixels.len() != expected {
            return Err(GfxError::SizeMismatch { expected, actual: pixels.len() });
        }
        write_pixels(self.gpu.queue(), &tex.texture, tex.extent, pixels);
        Ok(())
    }

    fn read_texture(&mut self, id: TextureId) -> Result<Vec<u8>, GfxError> {
        let tex = self.textures.get(&id).ok_or(GfxError::UnknownTexture(id))?;
        let extent = tex.extent;

        let unpadded = 4 * extent.width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let device = self.gpu.device();
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen readback"),
            size: padded as u64 * extent.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lumen readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(extent.height),
                },
            },
            extent3d(extent),
        );
        self.gpu.queue().submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GfxError::Backend(format!("device poll failed: {e}")))?;
        rx.recv()
            .map_err(|_| GfxError::Backend("readback callback dropped".into()))?
            .map_err(|e| GfxError::Backend(format!("readback map failed: {e}")))?;

        let mut out = Vec::with_capacity(unpadded as usize * extent.height as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                out.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        staging.unmap();

        Ok(out)
    }

    fn delete_texture(&mut self, id: TextureId) {
        if id == self.white {
            return;
        }
        if let Some(tex) = self.textures.remove(&id) {
            tex.texture.destroy();
        }
        self.framebuffers.retain(|_, tex| *tex != id);
        if self.bound == Some(id) {
            self.bound = None;
        }
    }

    fn create_framebuffer(&mut self, texture: TextureId) -> Result<FramebufferId, GfxError> {
        if !self.textures.contains_key(&texture) {
            return Err(GfxError::UnknownTexture(texture));
        }
        let id = FramebufferId(self.alloc_id());
        self.framebuffers.insert(id, texture);
        Ok(id)
    }

    fn delete_framebuffer(&mut self, id: FramebufferId) {
        self.framebuffers.remove(&id);
    }

    fn begin_pass(&mut self, target: Option<FramebufferId>, projection: Projection, clear: Option<Color>) {
        if self.pass.is_some() {
            log::warn!("WgpuApi: begin_pass while a pass is open; closing it");
            self.end_pass();
        }
        self.pass = Some(PassRecord {
            target,
            projection,
            clear,
            vertices: Vec::new(),
            draws: Vec::new(),
        });
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.bound = texture;
    }

    fn draw_triangles(&mut self, vertices: &[GpuVertex]) {
        let texture = self.bound.unwrap_or(self.white);
        let blend = self.blend;
        let Some(pass) = self.pass.as_mut() else {
            log::debug!("WgpuApi: draw outside of a pass ignored");
            return;
        };

        let start = pass.vertices.len() as u32;
        let usable = vertices.len() - vertices.len() % 3;
        pass.vertices.extend(vertices[..usable].iter().map(|v| GpuVertex {
            pos: pass.projection.to_ndc(Vec2::new(v.pos[0], v.pos[1])),
            ..*v
        }));
        let end = pass.vertices.len() as u32;

        if end > start {
            pass.draws.push(DrawRecord { texture, blend, range: start..end });
        }
    }

    fn end_pass(&mut self) {
        if let Some(pass) = self.pass.take() {
            self.encode_pass(pass);
        }
    }

    fn screen_extent(&self) -> Extent {
        self.gpu.extent()
    }

    fn resize_screen(&mut self, extent: Extent) {
        // A held surface texture must be released before reconfiguring.
        self.frame = None;
        self.gpu.resize(extent);
    }

    fn present(&mut self) -> PresentStatus {
        if self.fatal {
            return PresentStatus::Fatal;
        }
        if self.pass.is_some() {
            self.end_pass();
        }
        if self.frame.is_none() {
            // Nothing reached the screen this frame; clear it instead of showing stale contents.
            let extent = self.screen_extent();
            self.encode_pass(PassRecord {
                target: None,
                projection: Projection::pixels(extent),
                clear: Some(Color::BLACK),
                vertices: Vec::new(),
                draws: Vec::new(),
            });
        }
        if self.fatal {
            return PresentStatus::Fatal;
        }
        match self.frame.take() {
            Some(frame) => {
                frame.present();
                PresentStatus::Presented
            }
            None => PresentStatus::Skipped,
        }
    }
}

fn extent3d(extent: Extent) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: 1,
    }
}

fn write_pixels(queue: &wgpu::Queue, texture: &wgpu::Texture, extent: Extent, pixels: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * extent.width),
            rows_per_image: Some(extent.height),
        },
        extent3d(extent),
    );
}

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2, // uv
        2 => Float32x4  // color
    ];

    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRS,
    }
}

fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        BlendMode::Additive => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
        BlendMode::Replace => wgpu::BlendState::REPLACE,
    }
}
