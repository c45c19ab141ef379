//! Uniform layouts and helpers shared by the geometry pass and compositors.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

// ── geometry pass ─────────────────────────────────────────────────────────

/// Group 0 of `mrt.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct GlobalsUniform {
    /// `VP`
    pub view_proj: [[f32; 4]; 4],
    /// x = w epsilon; yzw unused.
    pub params: [f32; 4],
}

impl GlobalsUniform {
    pub fn new(view_proj: Mat4, epsilon: f32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            params: [epsilon, 0.0, 0.0, 0.0],
        }
    }
}

/// Group 1 of `mrt.wgsl`, one slot per object behind a dynamic offset.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct ObjectUniform {
    /// `M`
    pub model: [[f32; 4]; 4],
    /// `PrevM`
    pub prev_model: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

// ── reprojection compositor ───────────────────────────────────────────────

/// Group 0 binding 0 of `motion_blur.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct BlurUniform {
    /// `P_i`
    pub inv_view_proj: [[f32; 4]; 4],
    /// `prevVP`
    pub prev_view_proj: [[f32; 4]; 4],
    /// x = velocity scale, y = max blur (UV), z = epsilon, w unused.
    pub params: [f32; 4],
    /// x = samples, y = combine policy, z = camera valid (0/1), w unused.
    pub settings: [u32; 4],
}

// ── helpers ───────────────────────────────────────────────────────────────

/// `min_binding_size` for a uniform of type `T`.
#[inline]
pub(super) fn binding_size<T>() -> Option<wgpu::BufferSize> {
    wgpu::BufferSize::new(std::mem::size_of::<T>() as u64)
}

/// Rounds `size` up to a multiple of `alignment` (a power of two).
#[inline]
pub(super) fn align_to(size: u64, alignment: u64) -> u64 {
    let a = alignment.max(1);
    size.div_ceil(a) * a
}

/// Repeat + linear filtering for object textures.
pub(super) fn object_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("streak object sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

/// Clamp + nearest filtering for reading the render targets.
pub(super) fn post_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("streak post sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<GlobalsUniform>(), 80);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 144);
        assert_eq!(std::mem::size_of::<BlurUniform>(), 160);
        assert!(binding_size::<BlurUniform>().is_some());
    }

    /// A `var name:` binding or a `name:` struct member in a WGSL source.
    fn declares(src: &str, name: &str) -> bool {
        let member = format!("{name}:");
        let var = format!("var {name}:");
        src.lines()
            .map(str::trim)
            .any(|line| line.starts_with(&member) || line.contains(&var))
    }

    #[test]
    fn shaders_expose_the_named_bindings() {
        let mrt = include_str!("shaders/mrt.wgsl");
        for name in ["VP", "M", "PrevM", "tint", "texture_sampler"] {
            assert!(declares(mrt, name), "mrt.wgsl lacks {name}");
        }

        let blur = include_str!("shaders/motion_blur.wgsl");
        for name in ["P_i", "prevVP", "color_sampler", "depth_sampler", "motion_sampler"] {
            assert!(declares(blur, name), "motion_blur.wgsl lacks {name}");
        }

        assert!(declares(include_str!("shaders/blit.wgsl"), "color_sampler"));
        assert!(!declares(mrt, "view_proj"));
    }

    #[test]
    fn align_rounds_up() {
        assert_eq!(align_to(144, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
        assert_eq!(align_to(0, 256), 0);
        assert_eq!(align_to(7, 0), 7);
    }
}
