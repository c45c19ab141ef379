//! GPU rendering subsystem.
//!
//! Frame order:
//! - [`GeometryPass`] fills the [`GBuffer`] (color, motion, depth) in one pass
//!   and hands back a [`GBufferFrame`] token
//! - a compositor consumes the token and writes the surface
//!
//! Each pass owns its own GPU resources (pipelines, buffers, bind groups).

mod common;
mod ctx;

pub mod compositor;
pub mod gbuffer;
pub mod geometry;
pub mod velocity;

pub use compositor::{CompositorMode, MotionBlurCompositor, PassthroughCompositor};
pub use ctx::{RenderCtx, RenderTarget};
pub use gbuffer::{BundleLayout, GBuffer, Incomplete};
pub use geometry::{GBufferFrame, GeometryPass};
pub use velocity::VelocityCombine;
