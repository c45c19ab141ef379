use crate::paint::Color;
use crate::render::velocity::VelocityCombine;
use crate::render::CompositorMode;

/// Externally owned switches, read once at the start of each frame.
///
/// The scene never reaches back into whatever UI flips these; the caller
/// passes a copy into every [`MotionBlurScene::frame`](super::MotionBlurScene::frame).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Toggles {
    pub blur_enabled: bool,
    pub paused: bool,
}

impl Toggles {
    #[inline]
    pub fn compositor(self) -> CompositorMode {
        if self.blur_enabled { CompositorMode::Blur } else { CompositorMode::Passthrough }
    }
}

impl Default for Toggles {
    fn default() -> Self {
        Self { blur_enabled: true, paused: false }
    }
}

/// Tuning for the geometry pass clears and the reprojection blur.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlurConfig {
    /// Color taps averaged along the velocity vector.
    pub samples: u32,
    /// Multiplier applied to the combined velocity (UV units).
    pub velocity_scale: f32,
    /// Upper bound on the blur vector length, UV units.
    pub max_blur: f32,
    /// Velocities and `w` values at or below this are treated as zero.
    pub epsilon: f32,
    /// How object and camera velocity are merged.
    pub combine: VelocityCombine,
    /// Color target clear value.
    pub background: Color,
}

impl BlurConfig {
    pub const MAX_SAMPLES: u32 = 32;

    /// Returns a copy with out-of-range values replaced.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let positive = |v: f32, fallback: f32| if v.is_finite() && v >= 0.0 { v } else { fallback };

        Self {
            samples: self.samples.clamp(1, Self::MAX_SAMPLES),
            velocity_scale: positive(self.velocity_scale, d.velocity_scale),
            max_blur: positive(self.max_blur, d.max_blur),
            epsilon: if self.epsilon.is_finite() && self.epsilon > 0.0 { self.epsilon } else { d.epsilon },
            combine: self.combine,
            background: self.background.clamped(),
        }
    }
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            samples: 8,
            velocity_scale: 1.0,
            max_blur: 0.05,
            epsilon: 1e-5,
            combine: VelocityCombine::Sum,
            background: Color::rgba(0.88, 0.65, 0.15, 1.0),
        }
    }
}
