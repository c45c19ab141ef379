//! Scene state for the motion-blur renderer.
//!
//! - `buffer`: previous/current pairs swapped once per frame
//! - `anim`: time-sampled object transforms
//! - `registry`: GPU meshes and textures behind typed handles
//! - `frame_state`: camera history and the simulation clock
//! - `motion_blur`: the scene lifecycle tying passes, targets and objects together

pub mod anim;
pub mod buffer;
pub mod frame_state;
pub mod motion_blur;
pub mod object;
pub mod registry;
pub mod settings;

pub use anim::{triangle_wave, Animation, Oscillation, Transform};
pub use buffer::DoubleBuffered;
pub use frame_state::{FrameState, FrameStep};
pub use motion_blur::MotionBlurScene;
pub use object::{ObjectDesc, RenderObject};
pub use registry::{ImageData, MeshData, MeshId, MeshVertex, Registry, RegistryError, TextureId};
pub use settings::{BlurConfig, Toggles};
