mod assets;
mod camera;

use anyhow::{Context, Result};
use glam::{Quat, Vec3};

use streak_engine::core::{App, AppControl, FrameCtx};
use streak_engine::device::GpuInit;
use streak_engine::input::Key;
use streak_engine::logging::{init_logging, LoggingConfig};
use streak_engine::paint::Color;
use streak_engine::render::RenderCtx;
use streak_engine::scene::{
    Animation, BlurConfig, MotionBlurScene, ObjectDesc, Oscillation, Toggles, Transform,
};
use streak_engine::window::{Runtime, RuntimeConfig};
use winit::window::WindowId;

use crate::camera::{Camera, FlyCameraController, FlyInput};

struct Studio {
    scene: Option<MotionBlurScene>,
    camera: Camera,
    controller: FlyCameraController,
    toggles: Toggles,
}

impl Studio {
    fn new() -> Self {
        Self {
            scene: None,
            camera: Camera::looking_along(Vec3::splat(15.0), Vec3::splat(-1.0), 16.0 / 9.0),
            controller: FlyCameraController::default(),
            toggles: Toggles::default(),
        }
    }

    fn handle_keys(&mut self, ctx: &FrameCtx<'_, '_>) -> AppControl {
        let frame = ctx.input_frame;
        if frame.key_pressed(Key::Escape) {
            return AppControl::Exit;
        }
        if frame.key_pressed(Key::B) {
            self.toggles.blur_enabled = !self.toggles.blur_enabled;
        }
        if frame.key_pressed(Key::P) {
            self.toggles.paused = !self.toggles.paused;
        }
        AppControl::Continue
    }
}

/// Allocates targets and passes, uploads the demo assets and places the shuttle.
fn build_scene(ctx: &RenderCtx<'_>) -> Result<MotionBlurScene> {
    let mut scene = MotionBlurScene::start(ctx, BlurConfig::default());

    let mesh = scene
        .add_mesh(ctx, &assets::demo_mesh())
        .context("failed to upload demo mesh")?;
    let texture = scene
        .add_texture(ctx, &assets::demo_texture())
        .context("failed to upload demo texture")?;

    let base = Transform::from_translation(Vec3::new(-10.0, 0.0, -10.0))
        .with_rotation(Quat::from_rotation_x(-90f32.to_radians()));

    scene.spawn(ObjectDesc {
        mesh,
        texture,
        tint: Color::WHITE,
        animation: Animation::Oscillate(Oscillation {
            base,
            axis: Vec3::Z,
            amplitude: 20.0,
            period_ms: 2000.0,
            offset: -10.0,
        }),
    });

    Ok(scene)
}

impl App for Studio {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.handle_keys(ctx) == AppControl::Exit {
            return AppControl::Exit;
        }

        if self.scene.is_none() {
            match build_scene(&ctx.render_ctx()) {
                Ok(scene) => self.scene = Some(scene),
                Err(err) => {
                    log::error!("{err:#}");
                    return AppControl::Exit;
                }
            }
        }

        let dt_ms = ctx.time.dt_ms();
        self.camera.aspect = ctx.window.aspect_ratio();
        self.controller
            .update(&mut self.camera, FlyInput::from_input(ctx.input, ctx.input_frame), dt_ms);

        let view_proj = self.camera.view_proj();
        let toggles = self.toggles;
        let scene = &mut self.scene;

        ctx.render(Color::BLACK, |rctx, target| {
            if let Some(scene) = scene.as_mut() {
                scene.frame(rctx, target, dt_ms, view_proj, toggles);
            }
        })
    }

    fn on_exit(&mut self, _window_id: WindowId) {
        if let Some(scene) = self.scene.take() {
            scene.end();
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    log::info!("controls: WASD/QE move, left-drag look, Shift fast, B blur, P pause, Esc quit");

    let config = RuntimeConfig {
        title: "streak: motion blur".to_string(),
        ..RuntimeConfig::default()
    };
    Runtime::run(config, GpuInit::default(), Studio::new())
}
