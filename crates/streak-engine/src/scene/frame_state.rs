use glam::Mat4;

use super::buffer::DoubleBuffered;
use super::object::RenderObject;

/// Inputs for one frame of state advance.
#[derive(Debug, Copy, Clone)]
pub struct FrameStep {
    /// Wall-clock time since the previous frame, milliseconds.
    pub dt_ms: f32,
    /// When set, simulation time and object transforms are frozen.
    pub paused: bool,
    /// Camera view-projection after this frame's camera update.
    pub view_proj: Mat4,
}

/// Double-buffered camera state plus the simulation clock.
///
/// Object transforms live on each [`RenderObject`]; `advance` drives both so
/// the camera and every object step in lockstep.
#[derive(Debug, Clone)]
pub struct FrameState {
    view_proj: DoubleBuffered<Mat4>,
    elapsed_ms: f64,
    primed: bool,
    frame: u64,
}

impl FrameState {
    pub fn new() -> Self {
        Self {
            view_proj: DoubleBuffered::new(Mat4::IDENTITY),
            elapsed_ms: 0.0,
            primed: false,
            frame: 0,
        }
    }

    /// Advances camera and object state by one frame.
    ///
    /// The first call only primes: previous equals current for the camera and
    /// every object, so the first rendered frame carries no motion.
    pub fn advance(&mut self, step: FrameStep, objects: &mut [RenderObject]) {
        if !self.primed {
            self.primed = true;
            self.view_proj.reset(step.view_proj);
            let t = self.elapsed_ms as f32;
            for obj in objects.iter_mut() {
                obj.rest_at(t);
            }
            log::debug!("frame state primed with {} object(s)", objects.len());
            return;
        }

        self.frame += 1;
        self.view_proj.advance(step.view_proj);

        if step.paused {
            for obj in objects.iter_mut() {
                obj.hold();
            }
            return;
        }

        let dt = if step.dt_ms.is_finite() { step.dt_ms.max(0.0) } else { 0.0 };
        self.elapsed_ms += dt as f64;

        let t = self.elapsed_ms as f32;
        for obj in objects.iter_mut() {
            obj.step(t);
        }
    }

    /// Brings an object created after priming to rest at the current
    /// simulation time, so its first frame carries no motion. Before priming
    /// this does nothing; the priming frame places it.
    pub fn admit(&self, obj: &mut RenderObject) {
        if self.primed {
            obj.rest_at(self.elapsed_ms as f32);
        }
    }

    /// Camera view-projection for this frame.
    #[inline]
    pub fn view_proj(&self) -> Mat4 {
        self.view_proj.current()
    }

    /// Camera view-projection in use during the previous frame.
    #[inline]
    pub fn prev_view_proj(&self) -> Mat4 {
        self.view_proj.previous()
    }

    /// Simulation time, milliseconds. Does not advance while paused.
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    #[inline]
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Number of frames advanced after priming.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Default for FrameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;
    use crate::paint::Color;
    use crate::render::velocity;
    use crate::scene::anim::{Animation, Oscillation, Transform};
    use crate::scene::object::ObjectDesc;
    use crate::scene::registry::{MeshId, TextureId};

    fn camera() -> Mat4 {
        let proj = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0);
        let view = Mat4::look_at_rh(Vec3::splat(15.0), Vec3::ZERO, Vec3::Y);
        proj * view
    }

    fn shuttle() -> RenderObject {
        RenderObject::new(ObjectDesc {
            mesh: MeshId::default(),
            texture: TextureId::default(),
            tint: Color::WHITE,
            animation: Animation::Oscillate(Oscillation {
                base: Transform::from_translation(Vec3::new(-10.0, 0.0, -10.0)),
                axis: Vec3::Z,
                amplitude: 20.0,
                period_ms: 2000.0,
                offset: -10.0,
            }),
        })
    }

    fn step(dt_ms: f32, paused: bool) -> FrameStep {
        FrameStep { dt_ms, paused, view_proj: camera() }
    }

    #[test]
    fn first_frame_has_zero_velocity() {
        let mut state = FrameState::new();
        let mut objects = [shuttle(), shuttle()];
        state.advance(step(16.0, false), &mut objects);

        assert!(state.is_primed());
        assert_eq!(state.elapsed_ms(), 0.0);
        assert_eq!(state.view_proj(), state.prev_view_proj());

        let local = Vec4::new(1.0, 0.5, -0.25, 1.0);
        for obj in &objects {
            assert_eq!(obj.model(), obj.prev_model());
            let v = velocity::object_velocity(state.view_proj(), obj.model(), obj.prev_model(), local, 1e-6);
            assert_eq!(v, glam::Vec2::ZERO);
        }
    }

    #[test]
    fn running_frames_shift_current_into_previous() {
        let mut state = FrameState::new();
        let mut objects = [shuttle()];
        state.advance(step(16.0, false), &mut objects);

        for _ in 0..50 {
            let before = objects[0].model();
            state.advance(step(16.0, false), &mut objects);
            assert_eq!(objects[0].prev_model(), before);
        }
        assert!((state.elapsed_ms() - 800.0).abs() < 1e-9);
        assert_ne!(objects[0].model(), objects[0].prev_model());
    }

    #[test]
    fn paused_frames_freeze_both_matrices() {
        let mut state = FrameState::new();
        let mut objects = [shuttle()];
        state.advance(step(16.0, false), &mut objects);
        for _ in 0..10 {
            state.advance(step(16.0, false), &mut objects);
        }

        // First paused frame settles previous onto current.
        state.advance(step(16.0, true), &mut objects);
        let (cur, prev) = (objects[0].model(), objects[0].prev_model());
        assert_eq!(cur, prev);
        let t = state.elapsed_ms();

        for _ in 0..25 {
            state.advance(step(16.0, true), &mut objects);
            assert_eq!(objects[0].model(), cur);
            assert_eq!(objects[0].prev_model(), prev);
        }
        assert_eq!(state.elapsed_ms(), t);
    }

    #[test]
    fn camera_shifts_even_while_paused() {
        let mut state = FrameState::new();
        let mut objects = [shuttle()];
        state.advance(step(16.0, false), &mut objects);

        let moved = Mat4::from_translation(Vec3::X) * camera();
        state.advance(FrameStep { dt_ms: 16.0, paused: true, view_proj: moved }, &mut objects);
        assert_eq!(state.prev_view_proj(), camera());
        assert_eq!(state.view_proj(), moved);

        state.advance(FrameStep { dt_ms: 16.0, paused: true, view_proj: moved }, &mut objects);
        assert_eq!(state.prev_view_proj(), moved);
    }

    #[test]
    fn resuming_continues_from_frozen_time() {
        let mut state = FrameState::new();
        let mut objects = [shuttle()];
        state.advance(step(16.0, false), &mut objects);
        state.advance(step(100.0, false), &mut objects);
        state.advance(step(100.0, true), &mut objects);
        state.advance(step(100.0, false), &mut objects);

        assert!((state.elapsed_ms() - 200.0).abs() < 1e-9);
        assert_eq!(objects[0].model(), objects[0].animation.sample(200.0));
        assert_eq!(objects[0].prev_model(), objects[0].animation.sample(100.0));
    }

    #[test]
    fn late_object_starts_at_rest() {
        let mut state = FrameState::new();
        let mut objects = vec![shuttle()];
        for _ in 0..31 {
            state.advance(step(16.0, false), &mut objects);
        }

        let mut late = shuttle();
        state.admit(&mut late);
        let t = state.elapsed_ms() as f32;
        assert_eq!(late.model(), late.animation.sample(t));
        assert_eq!(late.prev_model(), late.model());
        objects.push(late);

        // Its first frame only moves by one step, like its sibling.
        state.advance(step(16.0, false), &mut objects);
        let delta = |o: &RenderObject| (o.model().w_axis - o.prev_model().w_axis).length();
        assert!((delta(&objects[1]) - delta(&objects[0])).abs() < 1e-4);
        assert!(delta(&objects[1]) < 1.0);
    }

    #[test]
    fn admit_before_priming_leaves_the_object_alone() {
        let state = FrameState::new();
        let mut obj = shuttle();
        let before = obj.model();
        state.admit(&mut obj);
        assert_eq!(obj.model(), before);
    }

    #[test]
    fn bad_delta_time_does_not_move_the_clock() {
        let mut state = FrameState::new();
        let mut objects = [shuttle()];
        state.advance(step(16.0, false), &mut objects);
        state.advance(step(f32::NAN, false), &mut objects);
        state.advance(step(-5.0, false), &mut objects);
        assert_eq!(state.elapsed_ms(), 0.0);
        assert_eq!(state.frame(), 2);
    }
}
