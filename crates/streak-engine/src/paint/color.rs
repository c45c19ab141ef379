/// Linear straight-alpha RGBA color.
///
/// Used for object tints and clear colors. Unlike a UI paint model there is no
/// blending in the geometry pass, so alpha is carried as-is and not premultiplied.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);

    /// Motion target clear value: zero velocity, `w = 1`.
    pub const ZERO_VELOCITY: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Clamps all channels to `[0, 1]`; non-finite channels become `0`.
    #[inline]
    pub fn clamped(self) -> Self {
        fn c(v: f32) -> f32 {
            if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
        }
        Self::rgba(c(self.r), c(self.g), c(self.b), c(self.a))
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for Color {
    fn from(v: [f32; 4]) -> Self {
        Self::rgba(v[0], v[1], v[2], v[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wgpu_conversion_keeps_channels() {
        let c = Color::from([0.88, 0.65, 0.15, 1.0]).to_wgpu();
        assert_eq!((c.r as f32, c.g as f32, c.b as f32, c.a), (0.88, 0.65, 0.15, 1.0));
    }

    #[test]
    fn clamped_rejects_out_of_range_and_nan() {
        let c = Color::rgba(2.0, -1.0, f32::NAN, 0.5).clamped();
        assert_eq!(c, Color::rgba(1.0, 0.0, 0.0, 0.5));
    }
}
