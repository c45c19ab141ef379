use glam::Mat4;
use slotmap::SecondaryMap;

use crate::paint::Color;
use crate::render::RenderCtx;
use crate::scene::{BlurConfig, FrameState, Registry, RenderObject, TextureId};
use crate::scene::registry::MeshVertex;

use super::common::{align_to, binding_size, object_sampler, GlobalsUniform, ObjectUniform};
use super::gbuffer::{formats, GBuffer};

/// Proof that the geometry pass has been recorded into a [`GBuffer`] this frame.
///
/// Only [`GeometryPass::record`] can produce one, and the compositors take
/// it by value, so a compositor can never be recorded ahead of the pass that
/// fills its inputs.
#[must_use = "a GBufferFrame is consumed by a compositor"]
pub struct GBufferFrame<'g> {
    gbuffer: &'g GBuffer,
    view_proj: Mat4,
    prev_view_proj: Mat4,
}

impl<'g> GBufferFrame<'g> {
    #[inline]
    pub fn gbuffer(&self) -> &'g GBuffer {
        self.gbuffer
    }

    /// Camera view-projection the targets were rendered with.
    #[inline]
    pub fn view_proj(&self) -> Mat4 {
        self.view_proj
    }

    #[inline]
    pub fn prev_view_proj(&self) -> Mat4 {
        self.prev_view_proj
    }
}

/// Multi-target geometry pass: color, NDC motion and depth in one render pass.
pub struct GeometryPass {
    pipeline: wgpu::RenderPipeline,

    globals_ubo: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,

    object_bgl: wgpu::BindGroupLayout,
    object_ubo: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_stride: u64,
    object_capacity: usize,

    texture_bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    texture_groups: SecondaryMap<TextureId, wgpu::BindGroup>,

    warned_stale: bool,
    destroyed: bool,
}

impl GeometryPass {
    const INITIAL_OBJECTS: usize = 16;

    pub fn new(ctx: &RenderCtx<'_>) -> Self {
        let device = ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("streak mrt shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mrt.wgsl").into()),
        });

        let globals_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("streak mrt globals bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: binding_size::<GlobalsUniform>(),
                },
                count: None,
            }],
        });

        let object_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("streak mrt object bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: binding_size::<ObjectUniform>(),
                },
                count: None,
            }],
        });

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("streak mrt texture bgl"),
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
            label: Some("streak mrt pipeline layout"),
            bind_group_layouts: &[&globals_bgl, &object_bgl, &texture_bgl],
            immediate_size: 0,
        });

        let replace = |format| {
            Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("streak mrt pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[MeshVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[replace(formats::COLOR), replace(formats::MOTION)],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: formats::DEPTH,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        let globals_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("streak mrt globals ubo"),
            size: std::mem::size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("streak mrt globals bind group"),
            layout: &globals_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_ubo.as_entire_binding(),
            }],
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let object_stride = align_to(std::mem::size_of::<ObjectUniform>() as u64, alignment);
        let (object_ubo, object_bind_group) =
            create_object_slots(device, &object_bgl, object_stride, Self::INITIAL_OBJECTS);

        Self {
            pipeline,
            globals_ubo,
            globals_bind_group,
            object_bgl,
            object_ubo,
            object_bind_group,
            object_stride,
            object_capacity: Self::INITIAL_OBJECTS,
            texture_bgl,
            sampler: object_sampler(device),
            texture_groups: SecondaryMap::new(),
            warned_stale: false,
            destroyed: false,
        }
    }

    /// Clears and fills `gbuffer` with every object, in one render pass.
    ///
    /// Objects whose mesh or texture no longer resolves in `registry` are
    /// skipped; the first such object logs a warning.
    #[allow(clippy::too_many_arguments)]
    pub fn record<'g>(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &'g GBuffer,
        state: &FrameState,
        objects: &[RenderObject],
        registry: &Registry,
        config: &BlurConfig,
    ) -> GBufferFrame<'g> {
        let token = GBufferFrame {
            gbuffer,
            view_proj: state.view_proj(),
            prev_view_proj: state.prev_view_proj(),
        };
        if self.destroyed {
            return token;
        }

        let globals = GlobalsUniform::new(state.view_proj(), config.epsilon);
        ctx.queue.write_buffer(&self.globals_ubo, 0, bytemuck::bytes_of(&globals));

        self.ensure_object_capacity(ctx, objects.len());
        self.write_objects(ctx, objects);
        self.ensure_texture_groups(ctx, objects, registry);

        let mut skipped = 0usize;
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("streak geometry pass"),
                color_attachments: &[
                    Some(wgpu::RenderPassColorAttachment {
                        view: gbuffer.color_view(),
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(config.background.to_wgpu()),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    }),
                    Some(wgpu::RenderPassColorAttachment {
                        view: gbuffer.motion_view(),
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(Color::ZERO_VELOCITY.to_wgpu()),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    }),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: gbuffer.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.globals_bind_group, &[]);

            for (i, obj) in objects.iter().enumerate() {
                let (Some(mesh), Some(texture_group)) =
                    (registry.mesh(obj.mesh), self.texture_groups.get(obj.texture))
                else {
                    skipped += 1;
                    continue;
                };

                let offset = (i as u64 * self.object_stride) as u32;
                rpass.set_bind_group(1, &self.object_bind_group, &[offset]);
                rpass.set_bind_group(2, texture_group, &[]);
                rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rpass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        if skipped > 0 && !self.warned_stale {
            log::warn!("geometry pass: skipped {skipped} object(s) with stale mesh or texture handles");
            self.warned_stale = true;
        }

        token
    }

    /// Releases the uniform buffers and cached texture bind groups. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.globals_ubo.destroy();
        self.object_ubo.destroy();
        self.texture_groups.clear();
    }

    fn ensure_object_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.object_capacity {
            return;
        }
        let new_cap = required.next_power_of_two();
        let (ubo, bind_group) = create_object_slots(ctx.device, &self.object_bgl, self.object_stride, new_cap);
        self.object_ubo.destroy();
        self.object_ubo = ubo;
        self.object_bind_group = bind_group;
        self.object_capacity = new_cap;
        log::debug!("geometry pass: object slots grown to {new_cap}");
    }

    fn write_objects(&self, ctx: &RenderCtx<'_>, objects: &[RenderObject]) {
        if objects.is_empty() {
            return;
        }
        let stride = self.object_stride as usize;
        let mut staging = vec![0u8; stride * objects.len()];
        for (slot, obj) in staging.chunks_exact_mut(stride).zip(objects) {
            let u = ObjectUniform {
                model: obj.model().to_cols_array_2d(),
                prev_model: obj.prev_model().to_cols_array_2d(),
                tint: obj.tint.to_array(),
            };
            let bytes = bytemuck::bytes_of(&u);
            slot[..bytes.len()].copy_from_slice(bytes);
        }
        ctx.queue.write_buffer(&self.object_ubo, 0, &staging);
    }

    fn ensure_texture_groups(&mut self, ctx: &RenderCtx<'_>, objects: &[RenderObject], registry: &Registry) {
        self.texture_groups.retain(|id, _| registry.texture(id).is_some());

        for obj in objects {
            if self.texture_groups.contains_key(obj.texture) {
                continue;
            }
            let Some(texture) = registry.texture(obj.texture) else { continue };

            let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("streak mrt texture bind group"),
                layout: &self.texture_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            self.texture_groups.insert(obj.texture, bind_group);
        }
    }
}

fn create_object_slots(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let ubo = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("streak mrt object ubo"),
        size: stride * capacity.max(1) as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("streak mrt object bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &ubo,
                offset: 0,
                size: binding_size::<ObjectUniform>(),
            }),
        }],
    });
    (ubo, bind_group)
}
