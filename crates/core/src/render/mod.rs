//! GPU-side render target and readback.
//!
//! # Module overview
//!
//! - [`texture`] -- Texture configuration and creation helpers.
//! - [`target`] -- FBO + texture render targets and the slot that owns one.
//! - [`readback`] -- RGBA readback, blank detection, and readback policy.

pub mod readback;
pub mod target;
pub mod texture;

pub use readback::{is_blank, read_rgba, DISCARD_BLANK_READBACK, DRAWS_PER_READBACK};
pub use target::{RenderTarget, RenderTargetSlot};
pub use texture::{create_texture, TextureConfig};
