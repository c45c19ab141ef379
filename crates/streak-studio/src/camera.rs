//! Perspective camera and a free-fly controller.

use glam::{Mat4, Vec3};
use streak_engine::input::{InputFrame, InputState, Key, MouseButton};

const PITCH_LIMIT: f32 = 89.0 * std::f32::consts::PI / 180.0;

/// Right-handed perspective camera, wgpu depth range.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    /// Radians around +Y, zero along +X.
    pub yaw: f32,
    /// Radians above the horizon.
    pub pitch: f32,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn looking_along(position: Vec3, direction: Vec3, aspect: f32) -> Self {
        let d = direction.try_normalize().unwrap_or(Vec3::NEG_Z);
        Self {
            position,
            yaw: d.z.atan2(d.x),
            pitch: d.y.clamp(-1.0, 1.0).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT),
            aspect,
            fovy: 60f32.to_radians(),
            znear: 0.1,
            zfar: 1000.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(cp * cy, sp, cp * sy)
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X)
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_to_rh(self.position, self.forward(), Vec3::Y);
        let proj = Mat4::perspective_rh(self.fovy, self.aspect.max(1e-3), self.znear, self.zfar);
        proj * view
    }
}

/// Controller input for one frame, decoupled from the engine's input types.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlyInput {
    /// Pointer travel while the look button is held, logical pixels.
    pub look: (f32, f32),
    /// -1..1 along forward, right and world up.
    pub forward: f32,
    pub right: f32,
    pub up: f32,
    pub fast: bool,
}

impl FlyInput {
    pub fn from_input(state: &InputState, frame: &InputFrame) -> Self {
        let axis = |pos: Key, neg: Key| state.key_down(pos) as i32 as f32 - state.key_down(neg) as i32 as f32;

        Self {
            look: if state.button_down(MouseButton::Left) { frame.pointer_delta } else { (0.0, 0.0) },
            forward: axis(Key::W, Key::S),
            right: axis(Key::D, Key::A),
            up: axis(Key::E, Key::Q),
            fast: state.key_down(Key::Shift),
        }
    }
}

/// WASD/QE to move, left-drag to look, Shift for fast movement.
#[derive(Debug, Clone, Copy)]
pub struct FlyCameraController {
    /// Units per millisecond.
    pub movement_sensitivity: f32,
    /// Units per millisecond with Shift held.
    pub fast_movement_sensitivity: f32,
    /// Radians per logical pixel of drag.
    pub look_sensitivity: f32,
}

impl Default for FlyCameraController {
    fn default() -> Self {
        Self {
            movement_sensitivity: 0.01,
            fast_movement_sensitivity: 0.1,
            look_sensitivity: 0.002,
        }
    }
}

impl FlyCameraController {
    pub fn update(&self, camera: &mut Camera, input: FlyInput, dt_ms: f32) {
        let (dx, dy) = input.look;
        camera.yaw += dx * self.look_sensitivity;
        camera.pitch = (camera.pitch - dy * self.look_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let speed = if input.fast { self.fast_movement_sensitivity } else { self.movement_sensitivity };
        let step = speed * dt_ms.max(0.0);

        let motion = camera.forward() * input.forward + camera.right() * input.right + Vec3::Y * input.up;
        camera.position += motion * step;
    }
}
