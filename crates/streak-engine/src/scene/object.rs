use glam::Mat4;

use crate::paint::Color;

use super::anim::Animation;
use super::buffer::DoubleBuffered;
use super::registry::{MeshId, TextureId};

/// Description of an object to place in the scene at start.
#[derive(Debug, Clone, Copy)]
pub struct ObjectDesc {
    pub mesh: MeshId,
    pub texture: TextureId,
    pub tint: Color,
    pub animation: Animation,
}

/// A drawable object with its current and previous model matrices.
#[derive(Debug, Clone, Copy)]
pub struct RenderObject {
    pub mesh: MeshId,
    pub texture: TextureId,
    pub tint: Color,
    pub animation: Animation,
    model: DoubleBuffered<Mat4>,
}

impl RenderObject {
    /// Creates the object at its `t = 0` pose with previous equal to current.
    pub fn new(desc: ObjectDesc) -> Self {
        Self {
            mesh: desc.mesh,
            texture: desc.texture,
            tint: desc.tint,
            animation: desc.animation,
            model: DoubleBuffered::new(desc.animation.sample(0.0)),
        }
    }

    #[inline]
    pub fn model(&self) -> Mat4 {
        self.model.current()
    }

    #[inline]
    pub fn prev_model(&self) -> Mat4 {
        self.model.previous()
    }

    /// Samples the animation at `t_ms`; the old current becomes previous.
    pub(crate) fn step(&mut self, t_ms: f32) {
        self.model.advance(self.animation.sample(t_ms));
    }

    /// Freezes the object: previous takes the current value.
    pub(crate) fn hold(&mut self) {
        self.model.settle();
    }

    /// Places the object at `t_ms` with no apparent motion.
    pub(crate) fn rest_at(&mut self, t_ms: f32) {
        self.model.reset(self.animation.sample(t_ms));
    }
}
