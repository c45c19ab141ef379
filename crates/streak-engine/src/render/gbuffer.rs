//! Render-target bundle written by the geometry pass.
//!
//! Attachment contract:
//! - color 0: [`formats::COLOR`]
//! - color 1: [`formats::MOTION`] (NDC velocity in `.xy`)
//! - depth: [`formats::DEPTH`]
//!
//! All three share one size and one sample count.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

pub mod formats {
    pub const COLOR: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    pub const MOTION: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
    pub const DEPTH: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
}

const TARGET_USAGE: wgpu::TextureUsages =
    wgpu::TextureUsages::RENDER_ATTACHMENT.union(wgpu::TextureUsages::TEXTURE_BINDING);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Slot {
    Color,
    Motion,
    Depth,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Color, Slot::Motion, Slot::Depth];

    pub fn contract_format(self) -> wgpu::TextureFormat {
        match self {
            Slot::Color => formats::COLOR,
            Slot::Motion => formats::MOTION,
            Slot::Depth => formats::DEPTH,
        }
    }

    fn wants_depth(self) -> bool {
        matches!(self, Slot::Depth)
    }
}

/// Description of one attachment, as it would be handed to `create_texture`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttachmentInfo {
    pub format: wgpu::TextureFormat,
    pub size: (u32, u32),
    pub sample_count: u32,
    pub usage: wgpu::TextureUsages,
}

impl AttachmentInfo {
    pub fn contract(slot: Slot, size: (u32, u32)) -> Self {
        Self {
            format: slot.contract_format(),
            size,
            sample_count: 1,
            usage: TARGET_USAGE,
        }
    }

    /// Reads back what was actually allocated.
    pub fn of(texture: &wgpu::Texture) -> Self {
        Self {
            format: texture.format(),
            size: (texture.width(), texture.height()),
            sample_count: texture.sample_count(),
            usage: texture.usage(),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BundleLayout {
    pub color: Option<AttachmentInfo>,
    pub motion: Option<AttachmentInfo>,
    pub depth: Option<AttachmentInfo>,
}

impl BundleLayout {
    /// The layout [`GBuffer::create`] allocates for `size`.
    pub fn contract(size: (u32, u32)) -> Self {
        Self {
            color: Some(AttachmentInfo::contract(Slot::Color, size)),
            motion: Some(AttachmentInfo::contract(Slot::Motion, size)),
            depth: Some(AttachmentInfo::contract(Slot::Depth, size)),
        }
    }

    /// Places each attachment in its slot; a repeated slot keeps the last one.
    pub fn from_attachments(attachments: impl IntoIterator<Item = (Slot, AttachmentInfo)>) -> Self {
        let mut layout = Self::default();
        for (slot, info) in attachments {
            *layout.slot_mut(slot) = Some(info);
        }
        layout
    }

    /// Layout of a set of allocated textures.
    pub fn of(textures: &[(Slot, &wgpu::Texture)]) -> Self {
        Self::from_attachments(textures.iter().map(|&(slot, t)| (slot, AttachmentInfo::of(t))))
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<AttachmentInfo> {
        match slot {
            Slot::Color => &mut self.color,
            Slot::Motion => &mut self.motion,
            Slot::Depth => &mut self.depth,
        }
    }

    pub fn get(&self, slot: Slot) -> Option<&AttachmentInfo> {
        match slot {
            Slot::Color => self.color.as_ref(),
            Slot::Motion => self.motion.as_ref(),
            Slot::Depth => self.depth.as_ref(),
        }
    }

    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut AttachmentInfo> {
        self.slot_mut(slot).as_mut()
    }
}

/// Why a bundle cannot be rendered to.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum Incomplete {
    #[error("{slot:?} attachment has the wrong type ({format:?}, {usage:?})")]
    TypeMismatch {
        slot: Slot,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    },
    #[error("{slot:?} attachment is missing")]
    MissingAttachment { slot: Slot },
    #[error("{slot:?} attachment is {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        slot: Slot,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("{slot:?} attachment format {format:?} is not supported")]
    UnsupportedFormat { slot: Slot, format: wgpu::TextureFormat },
    #[error("{slot:?} attachment has {actual} samples, expected {expected}")]
    MultisampleMismatch { slot: Slot, expected: u32, actual: u32 },
    #[error("{slot:?} attachment is unusable (zero extent)")]
    Unknown { slot: Slot },
}

/// Validates a bundle against the attachment contract.
///
/// Causes are checked in a fixed order across all slots, so a bundle with
/// several problems always reports the same one.
pub fn check_completeness(layout: &BundleLayout) -> Result<(), Incomplete> {
    for slot in Slot::ALL {
        if layout.get(slot).is_none() {
            return Err(Incomplete::MissingAttachment { slot });
        }
    }
    let each = move || Slot::ALL.into_iter().filter_map(move |s| layout.get(s).map(|a| (s, *a)));

    for (slot, a) in each() {
        let class_ok = a.format.is_depth_stencil_format() == slot.wants_depth();
        if !class_ok || !a.usage.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
            return Err(Incomplete::TypeMismatch { slot, format: a.format, usage: a.usage });
        }
    }
    for (slot, a) in each() {
        if a.format != slot.contract_format() {
            return Err(Incomplete::UnsupportedFormat { slot, format: a.format });
        }
    }
    for (slot, a) in each() {
        if a.size.0 == 0 || a.size.1 == 0 {
            return Err(Incomplete::Unknown { slot });
        }
    }

    let Some(reference) = layout.color else {
        return Err(Incomplete::MissingAttachment { slot: Slot::Color });
    };
    for (slot, a) in each() {
        if a.size != reference.size {
            return Err(Incomplete::DimensionMismatch { slot, expected: reference.size, actual: a.size });
        }
    }
    for (slot, a) in each() {
        if a.sample_count != reference.sample_count {
            return Err(Incomplete::MultisampleMismatch {
                slot,
                expected: reference.sample_count,
                actual: a.sample_count,
            });
        }
    }
    Ok(())
}

/// Checks an allocated bundle that was requested at `requested`.
///
/// Allocation clamps a zero extent to one texel, so a zero request only shows
/// up here, after every layout check has passed.
fn assess(requested: (u32, u32), allocated: &BundleLayout) -> Result<(), Incomplete> {
    check_completeness(allocated)?;
    if requested.0 == 0 || requested.1 == 0 {
        return Err(Incomplete::Unknown { slot: Slot::Color });
    }
    Ok(())
}

struct Target {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl Target {
    fn create(device: &wgpu::Device, label: &str, info: &AttachmentInfo) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: info.size.0.max(1),
                height: info.size.1.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: info.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: info.format,
            usage: info.usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Color, motion and depth targets sized to the surface at creation.
pub struct GBuffer {
    color: Target,
    motion: Target,
    depth: Target,
    size: (u32, u32),
    generation: u64,
    status: Result<(), Incomplete>,
    destroyed: bool,
}

impl GBuffer {
    /// Allocates the three targets and checks what was allocated.
    ///
    /// An incomplete bundle is still returned; passes render into it on a
    /// best-effort basis. See [`status`](Self::status).
    pub fn create(device: &wgpu::Device, size: (u32, u32)) -> Self {
        let info = |slot| AttachmentInfo::contract(slot, size);
        let color = Target::create(device, "streak gbuffer color", &info(Slot::Color));
        let motion = Target::create(device, "streak gbuffer motion", &info(Slot::Motion));
        let depth = Target::create(device, "streak gbuffer depth", &info(Slot::Depth));

        let layout = BundleLayout::of(&[
            (Slot::Color, &color.texture),
            (Slot::Motion, &motion.texture),
            (Slot::Depth, &depth.texture),
        ]);

        Self {
            color,
            motion,
            depth,
            size,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            status: assess(size, &layout),
            destroyed: false,
        }
    }

    /// Completeness of the allocated targets.
    pub fn status(&self) -> Result<(), Incomplete> {
        self.status
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Distinct per allocation; compositors key their bind groups on it.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color.view
    }

    pub fn motion_view(&self) -> &wgpu::TextureView {
        &self.motion.view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Releases all three textures. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.color.texture.destroy();
        self.motion.texture.destroy();
        self.depth.texture.destroy();
        log::debug!("gbuffer {} released", self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: (u32, u32) = (1280, 720);

    fn edit(slot: Slot, f: impl FnOnce(&mut AttachmentInfo)) -> BundleLayout {
        let mut layout = BundleLayout::contract(SIZE);
        if let Some(a) = layout.get_mut(slot) {
            f(a);
        }
        layout
    }

    #[test]
    fn contract_layout_is_complete() {
        assert_eq!(check_completeness(&BundleLayout::contract(SIZE)), Ok(()));
    }

    #[test]
    fn missing_attachment() {
        let layout = BundleLayout { motion: None, ..BundleLayout::contract(SIZE) };
        assert_eq!(
            check_completeness(&layout),
            Err(Incomplete::MissingAttachment { slot: Slot::Motion })
        );
    }

    #[test]
    fn depth_format_in_color_slot_is_a_type_mismatch() {
        let layout = edit(Slot::Color, |a| a.format = wgpu::TextureFormat::Depth24Plus);
        assert!(matches!(
            check_completeness(&layout),
            Err(Incomplete::TypeMismatch { slot: Slot::Color, .. })
        ));

        let layout = edit(Slot::Depth, |a| a.format = wgpu::TextureFormat::Rgba8Unorm);
        assert!(matches!(
            check_completeness(&layout),
            Err(Incomplete::TypeMismatch { slot: Slot::Depth, .. })
        ));
    }

    #[test]
    fn missing_render_usage_is_a_type_mismatch() {
        let layout = edit(Slot::Motion, |a| a.usage = wgpu::TextureUsages::TEXTURE_BINDING);
        assert!(matches!(
            check_completeness(&layout),
            Err(Incomplete::TypeMismatch { slot: Slot::Motion, .. })
        ));
    }

    #[test]
    fn wrong_color_format_is_unsupported() {
        let layout = edit(Slot::Motion, |a| a.format = wgpu::TextureFormat::Rgba16Float);
        assert_eq!(
            check_completeness(&layout),
            Err(Incomplete::UnsupportedFormat {
                slot: Slot::Motion,
                format: wgpu::TextureFormat::Rgba16Float
            })
        );
    }

    #[test]
    fn zero_extent_is_unknown() {
        assert_eq!(
            check_completeness(&BundleLayout::contract((0, 720))),
            Err(Incomplete::Unknown { slot: Slot::Color })
        );
    }

    #[test]
    fn mismatched_dimensions() {
        let layout = edit(Slot::Depth, |a| a.size = (640, 360));
        assert_eq!(
            check_completeness(&layout),
            Err(Incomplete::DimensionMismatch {
                slot: Slot::Depth,
                expected: SIZE,
                actual: (640, 360)
            })
        );
    }

    #[test]
    fn mismatched_sample_counts() {
        let layout = edit(Slot::Motion, |a| a.sample_count = 4);
        assert_eq!(
            check_completeness(&layout),
            Err(Incomplete::MultisampleMismatch { slot: Slot::Motion, expected: 1, actual: 4 })
        );
    }

    #[test]
    fn attachments_land_in_their_slots() {
        let color = AttachmentInfo::contract(Slot::Color, SIZE);
        let depth = AttachmentInfo::contract(Slot::Depth, SIZE);

        let layout = BundleLayout::from_attachments([(Slot::Color, color), (Slot::Depth, depth)]);
        assert_eq!(layout.get(Slot::Color), Some(&color));
        assert_eq!(layout.get(Slot::Motion), None);
        assert_eq!(
            check_completeness(&layout),
            Err(Incomplete::MissingAttachment { slot: Slot::Motion })
        );

        // The depth texture attached as color is caught by type, not format.
        let swapped = BundleLayout::from_attachments([
            (Slot::Color, depth),
            (Slot::Motion, AttachmentInfo::contract(Slot::Motion, SIZE)),
            (Slot::Depth, depth),
        ]);
        assert!(matches!(
            check_completeness(&swapped),
            Err(Incomplete::TypeMismatch { slot: Slot::Color, .. })
        ));
    }

    #[test]
    fn allocated_layout_decides_completeness() {
        let allocated = BundleLayout::contract(SIZE);
        assert_eq!(assess(SIZE, &allocated), Ok(()));

        // A texture that came back with the wrong sample count is reported even
        // though the request was well formed.
        let mut allocated = BundleLayout::contract(SIZE);
        if let Some(depth) = allocated.get_mut(Slot::Depth) {
            depth.sample_count = 4;
        }
        assert_eq!(
            assess(SIZE, &allocated),
            Err(Incomplete::MultisampleMismatch { slot: Slot::Depth, expected: 1, actual: 4 })
        );
    }

    #[test]
    fn zero_request_is_unknown_after_clamping() {
        // What `Target::create` produces for a (0, 720) request.
        let allocated = BundleLayout::contract((1, 720));
        assert_eq!(assess((0, 720), &allocated), Err(Incomplete::Unknown { slot: Slot::Color }));
    }

    #[test]
    fn earlier_causes_win() {
        // Missing beats a dimension mismatch elsewhere.
        let mut layout = edit(Slot::Depth, |a| a.size = (1, 1));
        layout.color = None;
        assert_eq!(
            check_completeness(&layout),
            Err(Incomplete::MissingAttachment { slot: Slot::Color })
        );

        // Unsupported format beats a sample count mismatch.
        let mut layout = edit(Slot::Depth, |a| a.sample_count = 4);
        if let Some(c) = layout.color.as_mut() {
            c.format = wgpu::TextureFormat::Bgra8Unorm;
        }
        assert!(matches!(
            check_completeness(&layout),
            Err(Incomplete::UnsupportedFormat { slot: Slot::Color, .. })
        ));
    }
}
