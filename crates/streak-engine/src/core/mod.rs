//! Core engine-facing contracts.
//!
//! Stable interface between the runtime (platform loop) and higher layers
//! (studio, tools), with a consistent per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
