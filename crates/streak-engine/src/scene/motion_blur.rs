use glam::Mat4;

use crate::render::{
    CompositorMode, GBuffer, GeometryPass, MotionBlurCompositor, PassthroughCompositor, RenderCtx,
    RenderTarget,
};

use super::frame_state::{FrameState, FrameStep};
use super::object::{ObjectDesc, RenderObject};
use super::registry::{ImageData, MeshData, MeshId, Registry, RegistryError, TextureId};
use super::settings::{BlurConfig, Toggles};

/// Owns everything the motion-blur renderer needs between scene start and end:
/// render targets, passes, the resource registry and the object table.
///
/// Targets are sized once at [`start`](Self::start); there is no resize.
pub struct MotionBlurScene {
    config: BlurConfig,

    gbuffer: GBuffer,
    geometry: GeometryPass,
    blur: MotionBlurCompositor,
    passthrough: PassthroughCompositor,

    registry: Registry,
    objects: Vec<RenderObject>,
    state: FrameState,

    last_toggles: Option<Toggles>,
    ended: bool,
}

impl MotionBlurScene {
    pub fn start(ctx: &RenderCtx<'_>, config: BlurConfig) -> Self {
        let config = config.sanitized();
        let gbuffer = GBuffer::create(ctx.device, ctx.size);
        match gbuffer.status() {
            Ok(()) => log::debug!("gbuffer allocated at {}x{}", ctx.size.0, ctx.size.1),
            Err(cause) => log::error!("gbuffer incomplete, rendering best-effort: {cause}"),
        }

        log::info!(
            "motion blur scene started: {}x{}, {} samples, {:?} velocity",
            ctx.size.0,
            ctx.size.1,
            config.samples,
            config.combine
        );

        Self {
            config,
            gbuffer,
            geometry: GeometryPass::new(ctx),
            blur: MotionBlurCompositor::new(),
            passthrough: PassthroughCompositor::new(),
            registry: Registry::new(),
            objects: Vec::new(),
            state: FrameState::new(),
            last_toggles: None,
            ended: false,
        }
    }

    pub fn add_mesh(&mut self, ctx: &RenderCtx<'_>, data: &MeshData) -> Result<MeshId, RegistryError> {
        self.registry.insert_mesh(ctx, data)
    }

    pub fn add_texture(&mut self, ctx: &RenderCtx<'_>, image: &ImageData) -> Result<TextureId, RegistryError> {
        self.registry.insert_texture(ctx, image)
    }

    /// Adds an object at rest at the current simulation time. Returns its
    /// index in [`objects`](Self::objects).
    pub fn spawn(&mut self, desc: ObjectDesc) -> usize {
        let mut obj = RenderObject::new(desc);
        self.state.admit(&mut obj);
        self.objects.push(obj);
        self.objects.len() - 1
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn objects(&self) -> &[RenderObject] {
        &self.objects
    }

    pub fn frame_state(&self) -> &FrameState {
        &self.state
    }

    pub fn config(&self) -> &BlurConfig {
        &self.config
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    /// Advances state and records the geometry pass plus one compositor.
    ///
    /// `view_proj` is the camera after this frame's update; `toggles` are
    /// read once here and hold for the whole frame.
    pub fn frame(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        dt_ms: f32,
        view_proj: Mat4,
        toggles: Toggles,
    ) {
        if self.ended {
            return;
        }
        log_toggle_changes(self.last_toggles, toggles);
        self.last_toggles = Some(toggles);

        self.state.advance(frame_step(toggles, dt_ms, view_proj), &mut self.objects);

        let frame = self.geometry.record(
            ctx,
            target.encoder,
            &self.gbuffer,
            &self.state,
            &self.objects,
            &self.registry,
            &self.config,
        );

        match toggles.compositor() {
            CompositorMode::Blur => self.blur.record(ctx, target, frame, &self.config),
            CompositorMode::Passthrough => self.passthrough.record(ctx, target, frame),
        }
    }

    /// Releases every GPU resource the scene owns.
    pub fn end(mut self) {
        self.teardown();
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    fn teardown(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let (meshes, textures) = (self.registry.mesh_count(), self.registry.texture_count());
        self.gbuffer.destroy();
        self.geometry.destroy();
        self.blur.destroy();
        self.passthrough.destroy();
        self.registry.release_all();
        self.objects.clear();

        log::info!(
            "motion blur scene ended after {} frame(s); released {meshes} mesh(es), {textures} texture(s)",
            self.state.frame()
        );
    }
}

impl Drop for MotionBlurScene {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn frame_step(toggles: Toggles, dt_ms: f32, view_proj: Mat4) -> FrameStep {
    FrameStep {
        dt_ms,
        paused: toggles.paused,
        view_proj,
    }
}

fn log_toggle_changes(prev: Option<Toggles>, next: Toggles) {
    let Some(prev) = prev else {
        log::info!("compositor: {:?}", next.compositor());
        return;
    };
    if prev.blur_enabled != next.blur_enabled {
        log::info!("compositor: {:?}", next.compositor());
    }
    if prev.paused != next.paused {
        log::info!("simulation {}", if next.paused { "paused" } else { "resumed" });
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn blur_toggle_does_not_reach_frame_state() {
        let vp = Mat4::perspective_rh(1.0, 1.5, 0.1, 100.0) * Mat4::look_at_rh(Vec3::splat(15.0), Vec3::ZERO, Vec3::Y);
        let on = Toggles { blur_enabled: true, paused: false };
        let off = Toggles { blur_enabled: false, ..on };

        let a = frame_step(on, 16.0, vp);
        let b = frame_step(off, 16.0, vp);
        assert_eq!((a.dt_ms, a.paused, a.view_proj), (b.dt_ms, b.paused, b.view_proj));
        assert_ne!(on.compositor(), off.compositor());
    }

    #[test]
    fn pause_toggle_reaches_frame_step() {
        let paused = Toggles { blur_enabled: true, paused: true };
        assert!(frame_step(paused, 16.0, Mat4::IDENTITY).paused);
        assert!(!frame_step(Toggles::default(), 16.0, Mat4::IDENTITY).paused);
    }
}
