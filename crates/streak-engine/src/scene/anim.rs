use glam::{Mat4, Quat, Vec3};

/// Triangle wave with unit period.
///
/// Rises linearly from `0` at integer phases to `1` at half-integer phases, then
/// falls back. Negative phases mirror positive ones.
#[inline]
pub fn triangle_wave(phase: f32) -> f32 {
    let f = phase - phase.floor();
    if f < 0.5 { 2.0 * f } else { 2.0 - 2.0 * f }
}

/// Translation/rotation/scale decomposition of a model matrix.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Self::IDENTITY }
    }

    #[inline]
    pub fn with_rotation(self, rotation: Quat) -> Self {
        Self { rotation, ..self }
    }

    #[inline]
    pub fn with_scale(self, scale: Vec3) -> Self {
        Self { scale, ..self }
    }

    #[inline]
    pub fn to_matrix(self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Back-and-forth translation along one axis driven by [`triangle_wave`].
///
/// `translation(t) = base.translation + axis * (offset + amplitude * triangle_wave(t / period_ms))`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Oscillation {
    pub base: Transform,
    pub axis: Vec3,
    pub amplitude: f32,
    pub period_ms: f32,
    pub offset: f32,
}

impl Oscillation {
    /// Displacement along `axis` at time `t_ms`.
    ///
    /// A non-positive or non-finite period freezes the wave at phase zero.
    #[inline]
    pub fn displacement(&self, t_ms: f32) -> f32 {
        let phase = if self.period_ms.is_finite() && self.period_ms > 0.0 {
            t_ms / self.period_ms
        } else {
            0.0
        };
        self.offset + self.amplitude * triangle_wave(phase)
    }

    pub fn transform_at(&self, t_ms: f32) -> Transform {
        Transform {
            translation: self.base.translation + self.axis * self.displacement(t_ms),
            ..self.base
        }
    }
}

/// Time-driven model transform of a renderable object.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Animation {
    Static(Transform),
    Oscillate(Oscillation),
}

impl Animation {
    /// Model matrix at simulation time `t_ms`.
    pub fn sample(&self, t_ms: f32) -> Mat4 {
        match self {
            Animation::Static(t) => t.to_matrix(),
            Animation::Oscillate(o) => o.transform_at(t_ms).to_matrix(),
        }
    }
}

impl Default for Animation {
    fn default() -> Self {
        Animation::Static(Transform::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_wave_shape() {
        assert_eq!(triangle_wave(0.0), 0.0);
        assert_eq!(triangle_wave(0.25), 0.5);
        assert_eq!(triangle_wave(0.5), 1.0);
        assert_eq!(triangle_wave(0.75), 0.5);
        assert_eq!(triangle_wave(1.0), 0.0);
        assert_eq!(triangle_wave(-0.25), 0.5);
        for i in 0..100 {
            let w = triangle_wave(i as f32 * 0.173);
            assert!((0.0..=1.0).contains(&w));
        }
    }

    #[test]
    fn oscillation_matches_closed_form() {
        let base = Vec3::new(-10.0, 0.0, -10.0);
        let osc = Oscillation {
            base: Transform::from_translation(base),
            axis: Vec3::X,
            amplitude: 20.0,
            period_ms: 2000.0,
            offset: 0.0,
        };
        let anim = Animation::Oscillate(osc);

        for t in [0.0f32, 137.0, 500.0, 999.5, 1000.0, 1500.0, 2000.0, 3333.0, 123_456.0] {
            let m = anim.sample(t);
            let expected_x = base.x + 20.0 * triangle_wave(t / 2000.0);
            assert_eq!(m.w_axis.x, expected_x, "t = {t}");
            assert_eq!(m.w_axis.y, base.y);
            assert_eq!(m.w_axis.z, base.z);
        }
    }

    #[test]
    fn offset_centres_the_sweep() {
        // Sweeps z over [-20, 0] around a base of -10.
        let osc = Oscillation {
            base: Transform::from_translation(Vec3::new(-10.0, 0.0, -10.0)),
            axis: Vec3::Z,
            amplitude: 20.0,
            period_ms: 2000.0,
            offset: -10.0,
        };
        assert_eq!(osc.transform_at(0.0).translation.z, -20.0);
        assert_eq!(osc.transform_at(1000.0).translation.z, 0.0);
        assert_eq!(osc.transform_at(2000.0).translation.z, -20.0);
    }

    #[test]
    fn degenerate_period_is_frozen() {
        let osc = Oscillation {
            base: Transform::IDENTITY,
            axis: Vec3::Y,
            amplitude: 5.0,
            period_ms: 0.0,
            offset: 1.0,
        };
        assert_eq!(osc.displacement(0.0), 1.0);
        assert_eq!(osc.displacement(12345.0), 1.0);
    }

    #[test]
    fn rotation_and_scale_come_from_base() {
        let rot = Quat::from_rotation_x((-90.0f32).to_radians());
        let t = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(rot)
            .with_scale(Vec3::splat(2.0));
        let m = t.to_matrix();
        let (s, r, tr) = m.to_scale_rotation_translation();
        assert!(s.abs_diff_eq(Vec3::splat(2.0), 1e-5));
        assert!(r.abs_diff_eq(rot, 1e-5));
        assert_eq!(tr, Vec3::new(1.0, 2.0, 3.0));
    }
}
