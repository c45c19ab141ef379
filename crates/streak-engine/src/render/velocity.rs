//! CPU mirror of the velocity and blur math in `mrt.wgsl` / `motion_blur.wgsl`.
//!
//! Conventions (wgpu):
//! - NDC x right, y up, depth in `[0, 1]`
//! - UV origin top-left, y down
//! - velocity is `ndc(current) - ndc(previous)`
//!
//! The shaders are the source of truth for rendering; these functions exist so
//! the math can be tested without a device, and so the compositor can decide on
//! the CPU whether the current view-projection is invertible.

use glam::{Mat4, Vec2, Vec4};

use crate::scene::BlurConfig;

/// Policy for merging per-object velocity (motion target) with
/// camera velocity (depth reprojection).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum VelocityCombine {
    /// Object + camera. The motion target holds object motion under the
    /// current camera only, so the two terms do not double count.
    #[default]
    Sum,
    /// Whichever of the two is longer.
    Dominant,
    CameraOnly,
    ObjectOnly,
}

impl VelocityCombine {
    /// Discriminant read by `motion_blur.wgsl`.
    pub(crate) fn shader_id(self) -> u32 {
        match self {
            VelocityCombine::Sum => 0,
            VelocityCombine::Dominant => 1,
            VelocityCombine::CameraOnly => 2,
            VelocityCombine::ObjectOnly => 3,
        }
    }
}

/// Perspective divide; `None` when `w` is at or below `eps` (behind the eye).
#[inline]
pub fn clip_to_ndc(clip: Vec4, eps: f32) -> Option<Vec2> {
    (clip.w > eps).then(|| clip.truncate().truncate() / clip.w)
}

#[inline]
pub fn uv_to_ndc(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0)
}

#[inline]
pub fn ndc_to_uv(ndc: Vec2) -> Vec2 {
    Vec2::new((ndc.x + 1.0) * 0.5, (1.0 - ndc.y) * 0.5)
}

/// Converts an NDC displacement into a UV displacement.
#[inline]
pub fn ndc_delta_to_uv(delta: Vec2) -> Vec2 {
    delta * Vec2::new(0.5, -0.5)
}

/// Velocity the geometry pass writes for a local-space vertex.
///
/// Both positions use the same `view_proj`; camera motion is handled at
/// composite time.
pub fn object_velocity(view_proj: Mat4, model: Mat4, prev_model: Mat4, local: Vec4, eps: f32) -> Vec2 {
    let curr = clip_to_ndc(view_proj * model * local, eps);
    let prev = clip_to_ndc(view_proj * prev_model * local, eps);
    match (curr, prev) {
        (Some(c), Some(p)) => c - p,
        _ => Vec2::ZERO,
    }
}

/// Inverse of `view_proj`, or `None` when it is singular or not finite.
pub fn invert_view_proj(view_proj: Mat4) -> Option<Mat4> {
    let det = view_proj.determinant();
    if !det.is_finite() || det.abs() <= 1e-12 {
        return None;
    }
    let inv = view_proj.inverse();
    inv.is_finite().then_some(inv)
}

/// Screen-space velocity caused by camera motion, in NDC.
///
/// Reconstructs the world point behind `uv` at `depth` through the current
/// inverse view-projection, projects it with last frame's view-projection and
/// returns the NDC difference. Degenerate inputs give zero.
pub fn camera_velocity(
    uv: Vec2,
    depth: f32,
    inv_view_proj: Option<Mat4>,
    prev_view_proj: Mat4,
    eps: f32,
) -> Vec2 {
    let Some(inv) = inv_view_proj else {
        return Vec2::ZERO;
    };

    let ndc = uv_to_ndc(uv);
    let world_h = inv * Vec4::new(ndc.x, ndc.y, depth, 1.0);
    if world_h.w.abs() <= eps {
        return Vec2::ZERO;
    }
    let world = world_h / world_h.w;

    match clip_to_ndc(prev_view_proj * world, eps) {
        Some(prev) => ndc - prev,
        None => Vec2::ZERO,
    }
}

pub fn combine(policy: VelocityCombine, object: Vec2, camera: Vec2) -> Vec2 {
    match policy {
        VelocityCombine::Sum => object + camera,
        VelocityCombine::Dominant => {
            if object.length_squared() >= camera.length_squared() { object } else { camera }
        }
        VelocityCombine::CameraOnly => camera,
        VelocityCombine::ObjectOnly => object,
    }
}

/// Final blur vector in UV units: combined, scaled and length-clamped.
pub fn blur_vector(object_ndc: Vec2, camera_ndc: Vec2, cfg: &BlurConfig) -> Vec2 {
    let v = ndc_delta_to_uv(combine(cfg.combine, object_ndc, camera_ndc)) * cfg.velocity_scale;
    let len = v.length();
    if len > cfg.max_blur && len > cfg.epsilon {
        v * (cfg.max_blur / len)
    } else {
        v
    }
}

/// UV coordinates of the color taps for one pixel.
///
/// Steps from `uv` back along `blur` to where the surface was last frame. A
/// (near) zero vector or a single sample collapses to one tap at `uv`.
pub fn blur_taps(uv: Vec2, blur: Vec2, samples: u32, eps: f32) -> Vec<Vec2> {
    if samples <= 1 || blur.length() <= eps {
        return vec![uv];
    }
    let last = (samples - 1) as f32;
    (0..samples).map(|i| uv - blur * (i as f32 / last)).collect()
}

/// Averages `sample` over [`blur_taps`].
pub fn resolve<F>(sample: F, uv: Vec2, blur: Vec2, samples: u32, eps: f32) -> Vec4
where
    F: Fn(Vec2) -> Vec4,
{
    let taps = blur_taps(uv, blur, samples, eps);
    let n = taps.len() as f32;
    taps.into_iter().map(sample).sum::<Vec4>() / n
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    const EPS: f32 = 1e-5;

    fn proj() -> Mat4 {
        Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0)
    }

    fn view_proj(eye: Vec3, dir: Vec3) -> Mat4 {
        proj() * Mat4::look_to_rh(eye, dir, Vec3::Y)
    }

    fn project(vp: Mat4, world: Vec3) -> (Vec2, f32) {
        let clip = vp * world.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        (ndc.truncate(), ndc.z)
    }

    #[test]
    fn uv_ndc_round_trip_corners() {
        assert_eq!(uv_to_ndc(Vec2::new(0.0, 0.0)), Vec2::new(-1.0, 1.0));
        assert_eq!(uv_to_ndc(Vec2::new(1.0, 1.0)), Vec2::new(1.0, -1.0));
        assert_eq!(ndc_to_uv(Vec2::new(-1.0, 1.0)), Vec2::ZERO);
        assert_eq!(ndc_delta_to_uv(Vec2::new(0.2, 0.2)), Vec2::new(0.1, -0.1));
    }

    #[test]
    fn identical_matrices_give_zero_object_velocity() {
        let vp = view_proj(Vec3::splat(15.0), Vec3::splat(-1.0));
        let m = Mat4::from_translation(Vec3::new(-10.0, 0.0, -10.0));
        let v = object_velocity(vp, m, m, Vec4::new(0.3, -0.2, 0.1, 1.0), EPS);
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn object_velocity_is_current_minus_previous() {
        let vp = view_proj(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let prev = Mat4::IDENTITY;
        let curr = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let v = object_velocity(vp, curr, prev, Vec4::W, EPS);

        let (a, _) = project(vp, Vec3::new(1.0, 0.0, 0.0));
        let (b, _) = project(vp, Vec3::ZERO);
        assert!(v.abs_diff_eq(a - b, 1e-6));
        assert!(v.x > 0.0);
        assert!(v.y.abs() < 1e-6);
    }

    #[test]
    fn object_behind_the_eye_reports_no_velocity() {
        let vp = view_proj(Vec3::ZERO, Vec3::NEG_Z);
        let ahead = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let behind = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
        let v = object_velocity(vp, ahead, behind, Vec4::W, EPS);
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn static_camera_reconstructs_zero_velocity() {
        let vp = view_proj(Vec3::splat(15.0), Vec3::splat(-1.0));
        let inv = invert_view_proj(vp);
        assert!(inv.is_some());

        for &uv in &[Vec2::new(0.5, 0.5), Vec2::new(0.1, 0.9), Vec2::new(0.99, 0.01)] {
            for &depth in &[0.0f32, 0.5, 0.9, 0.999, 1.0] {
                let v = camera_velocity(uv, depth, inv, vp, EPS);
                assert!(v.length() < 1e-3, "uv {uv:?} depth {depth}: {v:?}");
            }
        }
    }

    #[test]
    fn camera_translation_matches_forward_projection() {
        let prev = view_proj(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let curr = view_proj(Vec3::new(1.0, 0.0, 10.0), Vec3::NEG_Z);

        let world = Vec3::new(0.5, 0.25, -2.0);
        let (ndc_curr, depth) = project(curr, world);
        let (ndc_prev, _) = project(prev, world);

        let v = camera_velocity(ndc_to_uv(ndc_curr), depth, invert_view_proj(curr), prev, EPS);
        assert!(v.abs_diff_eq(ndc_curr - ndc_prev, 1e-3), "{v:?} vs {:?}", ndc_curr - ndc_prev);
        // Camera moved right, so the scene slides left.
        assert!(v.x < 0.0);
    }

    #[test]
    fn singular_view_projection_is_guarded() {
        assert!(invert_view_proj(Mat4::ZERO).is_none());
        assert!(invert_view_proj(Mat4::from_cols_array(&[f32::NAN; 16])).is_none());
        let v = camera_velocity(Vec2::splat(0.5), 0.5, None, Mat4::IDENTITY, EPS);
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn point_behind_previous_camera_is_guarded() {
        // Previous camera looks the other way: the point is behind it.
        let curr = view_proj(Vec3::ZERO, Vec3::NEG_Z);
        let prev = view_proj(Vec3::ZERO, Vec3::Z);
        let (ndc, depth) = project(curr, Vec3::new(0.0, 0.0, -5.0));
        let v = camera_velocity(ndc_to_uv(ndc), depth, invert_view_proj(curr), prev, EPS);
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn combine_policies() {
        let o = Vec2::new(0.1, 0.0);
        let c = Vec2::new(0.0, -0.3);
        assert_eq!(combine(VelocityCombine::Sum, o, c), Vec2::new(0.1, -0.3));
        assert_eq!(combine(VelocityCombine::Dominant, o, c), c);
        assert_eq!(combine(VelocityCombine::CameraOnly, o, c), c);
        assert_eq!(combine(VelocityCombine::ObjectOnly, o, c), o);
    }

    #[test]
    fn blur_vector_is_clamped() {
        let cfg = BlurConfig { max_blur: 0.05, ..BlurConfig::default() };
        let v = blur_vector(Vec2::new(1.0, 0.0), Vec2::ZERO, &cfg);
        assert!((v.length() - 0.05).abs() < 1e-6);
        assert!(v.x > 0.0);

        let small = blur_vector(Vec2::new(0.02, 0.0), Vec2::ZERO, &cfg);
        assert!(small.abs_diff_eq(Vec2::new(0.01, 0.0), 1e-7));
    }

    #[test]
    fn zero_velocity_collapses_to_one_tap() {
        let uv = Vec2::new(0.25, 0.75);
        assert_eq!(blur_taps(uv, Vec2::ZERO, 8, EPS), vec![uv]);
        assert_eq!(blur_taps(uv, Vec2::splat(1e-7), 8, EPS), vec![uv]);
        assert_eq!(blur_taps(uv, Vec2::splat(0.1), 1, EPS), vec![uv]);
    }

    #[test]
    fn taps_walk_back_along_velocity() {
        let uv = Vec2::new(0.5, 0.5);
        let blur = Vec2::new(0.04, 0.0);
        let taps = blur_taps(uv, blur, 5, EPS);
        assert_eq!(taps.len(), 5);
        assert_eq!(taps[0], uv);
        assert!(taps[4].abs_diff_eq(uv - blur, 1e-7));
        assert!(taps[2].abs_diff_eq(uv - blur * 0.5, 1e-7));
    }

    #[test]
    fn static_scene_blur_equals_passthrough() {
        let vp = view_proj(Vec3::splat(15.0), Vec3::splat(-1.0));
        let inv = invert_view_proj(vp);
        let cfg = BlurConfig::default();
        let image = |uv: Vec2| Vec4::new(uv.x, uv.y, uv.x * uv.y, 1.0);

        for &uv in &[Vec2::new(0.3, 0.6), Vec2::new(0.8, 0.2)] {
            let cam = camera_velocity(uv, 0.97, inv, vp, cfg.epsilon);
            let blur = blur_vector(Vec2::ZERO, cam, &cfg);
            let blurred = resolve(image, uv, blur, cfg.samples, cfg.epsilon);
            assert!(blurred.abs_diff_eq(image(uv), 1e-3));
        }
    }

    #[test]
    fn moving_pixel_averages_along_the_streak() {
        // Horizontal ramp: averaging evenly spaced taps lands on the midpoint.
        let image = |uv: Vec2| Vec4::new(uv.x, 0.0, 0.0, 1.0);
        let uv = Vec2::new(0.5, 0.5);
        let out = resolve(image, uv, Vec2::new(0.1, 0.0), 5, EPS);
        assert!((out.x - 0.45).abs() < 1e-6);
        assert_eq!(out.w, 1.0);
    }

    #[test]
    fn combine_ids_are_distinct() {
        let ids = [
            VelocityCombine::Sum,
            VelocityCombine::Dominant,
            VelocityCombine::CameraOnly,
            VelocityCombine::ObjectOnly,
        ]
        .map(VelocityCombine::shader_id);
        assert_eq!(ids, [0, 1, 2, 3]);
    }
}
