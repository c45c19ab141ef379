//! Full-screen passes that turn a filled [`GBuffer`] into the presented image.

use crate::render::{RenderCtx, RenderTarget};
use crate::scene::BlurConfig;

use super::common::{binding_size, post_sampler, BlurUniform};
use super::gbuffer::GBuffer;
use super::geometry::GBufferFrame;
use super::velocity::invert_view_proj;

/// Which compositor writes the surface this frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CompositorMode {
    #[default]
    Blur,
    Passthrough,
}

// ── shared ────────────────────────────────────────────────────────────────

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),

        // Vertices are generated from the vertex index: one oversized triangle.
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },

        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    })
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn draw_fullscreen(
    target: &mut RenderTarget<'_>,
    label: &str,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target.color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });

    rpass.set_pipeline(pipeline);
    rpass.set_bind_group(0, bind_group, &[]);
    rpass.draw(0..3, 0..1);
}

// ── temporal reprojection ─────────────────────────────────────────────────

/// Blurs the color target along combined object and camera velocity.
///
/// The pipeline is built lazily for the surface format; the bind group is
/// rebuilt whenever a different [`GBuffer`] is presented.
#[derive(Default)]
pub struct MotionBlurCompositor {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,

    uniform: Option<wgpu::Buffer>,
    sampler: Option<wgpu::Sampler>,
    bind_group: Option<wgpu::BindGroup>,
    bound_generation: Option<u64>,

    warned_singular: bool,
}

impl MotionBlurCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        frame: GBufferFrame<'_>,
        config: &BlurConfig,
    ) {
        self.ensure_pipeline(ctx);
        self.ensure_bindings(ctx, frame.gbuffer());
        self.write_uniform(ctx, &frame, config);

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };
        draw_fullscreen(target, "streak motion blur pass", pipeline, bind_group);
    }

    /// Releases the uniform buffer; the next `record` recreates it.
    pub fn destroy(&mut self) {
        if let Some(ubo) = self.uniform.take() {
            ubo.destroy();
        }
        self.bind_group = None;
        self.bound_generation = None;
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let bind_group_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("streak motion blur bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: binding_size::<BlurUniform>(),
                    },
                    count: None,
                },
                texture_entry(1, wgpu::TextureSampleType::Float { filterable: true }),
                texture_entry(2, wgpu::TextureSampleType::Depth),
                texture_entry(3, wgpu::TextureSampleType::Float { filterable: false }),
                sampler_entry(4),
            ],
        });

        let pipeline = fullscreen_pipeline(
            ctx.device,
            "streak motion blur pipeline",
            include_str!("shaders/motion_blur.wgsl"),
            &bind_group_layout,
            ctx.surface_format,
        );

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);

        self.bind_group = None;
        self.bound_generation = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, gbuffer: &GBuffer) {
        if self.bind_group.is_some() && self.bound_generation == Some(gbuffer.generation()) {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let ubo = self.uniform.get_or_insert_with(|| {
            ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("streak motion blur ubo"),
                size: std::mem::size_of::<BlurUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });
        let sampler = self.sampler.get_or_insert_with(|| post_sampler(ctx.device));

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("streak motion blur bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(gbuffer.color_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(gbuffer.depth_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(gbuffer.motion_view()),
                },
                wgpu::BindGroupEntry { binding: 4, resource: wgpu::BindingResource::Sampler(sampler) },
            ],
        });

        self.bind_group = Some(bind_group);
        self.bound_generation = Some(gbuffer.generation());
    }

    fn write_uniform(&mut self, ctx: &RenderCtx<'_>, frame: &GBufferFrame<'_>, config: &BlurConfig) {
        let Some(ubo) = self.uniform.as_ref() else { return };

        let inverse = invert_view_proj(frame.view_proj());
        if inverse.is_none() && !self.warned_singular {
            log::warn!("motion blur: view-projection is not invertible; camera velocity disabled");
            self.warned_singular = true;
        }

        let u = BlurUniform {
            inv_view_proj: inverse.unwrap_or_default().to_cols_array_2d(),
            prev_view_proj: frame.prev_view_proj().to_cols_array_2d(),
            params: [config.velocity_scale, config.max_blur, config.epsilon, 0.0],
            settings: [config.samples, config.combine.shader_id(), inverse.is_some() as u32, 0],
        };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }
}

// ── passthrough ───────────────────────────────────────────────────────────

/// Copies the color target to the surface unchanged.
#[derive(Default)]
pub struct PassthroughCompositor {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,

    sampler: Option<wgpu::Sampler>,
    bind_group: Option<wgpu::BindGroup>,
    bound_generation: Option<u64>,
}

impl PassthroughCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, frame: GBufferFrame<'_>) {
        self.ensure_pipeline(ctx);
        self.ensure_bindings(ctx, frame.gbuffer());

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };
        draw_fullscreen(target, "streak passthrough pass", pipeline, bind_group);
    }

    pub fn destroy(&mut self) {
        self.bind_group = None;
        self.bound_generation = None;
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let bind_group_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("streak passthrough bgl"),
            entries: &[
                texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
                sampler_entry(1),
            ],
        });

        let pipeline = fullscreen_pipeline(
            ctx.device,
            "streak passthrough pipeline",
            include_str!("shaders/blit.wgsl"),
            &bind_group_layout,
            ctx.surface_format,
        );

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);

        self.bind_group = None;
        self.bound_generation = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, gbuffer: &GBuffer) {
        if self.bind_group.is_some() && self.bound_generation == Some(gbuffer.generation()) {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let sampler = self.sampler.get_or_insert_with(|| post_sampler(ctx.device));

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("streak passthrough bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(gbuffer.color_view()),
                },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
            ],
        });

        self.bind_group = Some(bind_group);
        self.bound_generation = Some(gbuffer.generation());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Toggles;

    #[test]
    fn blur_is_the_initial_mode() {
        assert_eq!(CompositorMode::default(), CompositorMode::Blur);
        assert_eq!(Toggles::default().compositor(), CompositorMode::default());
    }
}
