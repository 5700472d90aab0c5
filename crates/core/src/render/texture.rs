//! Color texture creation for the render target.
//!
//! Provides `TextureConfig` for specifying texture parameters and
//! `create_texture` for allocating the GPU texture behind the FBO.

use log::{debug, error};

use crate::backend::{GlBackend, TextureId};
use crate::error::OffscreenError;

/// Configuration for creating a GPU texture.
///
/// Stores dimensions, formats, and filter mode. Use
/// [`TextureConfig::rgba8_nearest`] for the render-target texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureConfig {
    /// Texture width in pixels.
    pub width: u32,
    /// Texture height in pixels.
    pub height: u32,
    /// GL internal format. ES2 requires it to equal `format`.
    pub internal_format: u32,
    /// GL pixel format of the (absent) upload.
    pub format: u32,
    /// GL component type of the (absent) upload.
    pub pixel_type: u32,
    /// GL filter used for both minification and magnification.
    pub filter: u32,
}

impl TextureConfig {
    /// RGBA, 8 bits per channel, NEAREST filtering.
    ///
    /// Readback wants exact texel values, so no interpolation is configured.
    pub fn rgba8_nearest(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            internal_format: glow::RGBA,
            format: glow::RGBA,
            pixel_type: glow::UNSIGNED_BYTE,
            filter: glow::NEAREST,
        }
    }
}

/// Creates a GPU texture from the given configuration.
///
/// Binds the texture, allocates storage without data, sets wrap mode to
/// `CLAMP_TO_EDGE` on both axes and the configured filter for min and mag,
/// then unbinds.
///
/// # Errors
///
/// Returns `OffscreenError::TextureAllocationFailed` if the backend cannot
/// create the texture or reports a GL error during setup. The texture is
/// released before returning.
pub fn create_texture<G: GlBackend + ?Sized>(
    gl: &G,
    config: &TextureConfig,
) -> Result<TextureId, OffscreenError> {
    let texture = gl.create_texture().map_err(|msg| {
        error!("framebuffer texture creation failed: {msg}");
        OffscreenError::TextureAllocationFailed {
            code: gl.get_error(),
        }
    })?;

    gl.bind_texture(Some(texture));
    gl.tex_storage_2d(
        config.internal_format,
        config.width,
        config.height,
        config.format,
        config.pixel_type,
    );
    gl.tex_parameter_i32(glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
    gl.tex_parameter_i32(glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
    gl.tex_parameter_i32(glow::TEXTURE_MIN_FILTER, config.filter as i32);
    gl.tex_parameter_i32(glow::TEXTURE_MAG_FILTER, config.filter as i32);

    let code = gl.get_error();
    debug!("framebuffer texture initialization error status: 0x{code:04X}");
    gl.bind_texture(None);

    if code != glow::NO_ERROR {
        error!("framebuffer texture allocation failed: GL error 0x{code:04X}");
        gl.delete_texture(texture);
        return Err(OffscreenError::TextureAllocationFailed { code });
    }

    Ok(texture)
}
