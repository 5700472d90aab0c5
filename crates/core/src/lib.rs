#![deny(unsafe_code)]
//! Off-screen pixel buffer for GPU image filtering without a window.
//!
//! An [`OffscreenBuffer`] acquires an OpenGL ES 2 context bound to an EGL
//! pbuffer surface, builds an FBO with an RGBA8 texture as its render target,
//! lets an [`OffscreenRenderer`] draw into it, and reads the result back as an
//! [`image::RgbaImage`]. The context is current on the thread that
//! initialized the buffer, and only that thread may drive it.
//!
//! The platform is reached through the [`backend`] traits: `EglBackend`
//! (feature `egl`) for real hardware, `RecordingBackend` (feature
//! `recording`) as an in-memory double.

pub mod backend;
pub mod buffer;
pub mod config;
pub mod context;
pub mod error;
pub mod owner;
pub mod render;
pub mod renderer;

#[cfg(feature = "png")]
pub mod snapshot;

pub use backend::{FramebufferId, GraphicsBackend, TextureId};
pub use buffer::{BufferState, OffscreenBuffer};
pub use config::{Diagnostics, OffscreenConfig};
pub use context::ContextLimits;
pub use error::OffscreenError;
pub use render::{DISCARD_BLANK_READBACK, DRAWS_PER_READBACK};
pub use renderer::OffscreenRenderer;
