//! Streak engine crate.
//!
//! Platform + GPU runtime pieces, plus the motion-blur rendering core:
//! frame state tracking, the multi-target geometry pass and the
//! reprojection/passthrough compositors.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod paint;
pub mod render;
pub mod scene;
