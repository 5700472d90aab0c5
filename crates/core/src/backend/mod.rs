//! The platform seam: the exact subset of EGL and GLES2 the buffer touches.
//!
//! [`ContextBackend`] covers display, configuration, context, and pbuffer
//! surface management. [`GlBackend`] covers textures, framebuffers, and
//! readback, using `glow` enum values so the real implementation is a thin
//! pass-through. [`GraphicsBackend`] is the union the buffer is generic over.
//!
//! # Module overview
//!
//! - [`gl`] -- `GlBackend` for a bare `glow::Context`.
//! - `egl` -- libEGL + `glow` backend (feature `egl`).
//! - `recording` -- in-memory, resource-tracking backend (feature `recording`).

pub mod gl;

#[cfg(feature = "egl")]
pub mod egl;

#[cfg(any(test, feature = "recording"))]
pub mod recording;

use std::num::NonZeroU32;

#[cfg(feature = "egl")]
pub use egl::EglBackend;

#[cfg(any(test, feature = "recording"))]
pub use recording::RecordingBackend;

/// Name of a GL texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub NonZeroU32);

impl TextureId {
    /// Returns the raw GL name.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Name of a GL framebuffer object.
///
/// This is the handle a renderer receives through
/// [`OffscreenRenderer::set_frame_buffer`](crate::OffscreenRenderer::set_frame_buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub NonZeroU32);

impl FramebufferId {
    /// Returns the raw GL name.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Attributes a surface configuration must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRequest {
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub alpha: i32,
    pub depth: i32,
    pub stencil: i32,
    /// Client API major version the context will be created with.
    pub client_version: i32,
}

impl ConfigRequest {
    /// RGBA 8-8-8-8, no depth or stencil, OpenGL ES 2, pbuffer-capable.
    pub fn rgba8_pbuffer() -> Self {
        Self {
            red: 8,
            green: 8,
            blue: 8,
            alpha: 8,
            depth: 0,
            stencil: 0,
            client_version: 2,
        }
    }
}

/// Channel and ancillary buffer sizes of one negotiated configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigAttributes {
    pub depth: i32,
    pub stencil: i32,
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub alpha: i32,
}

impl std::fmt::Display for ConfigAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<d,s,r,g,b,a> = <{}, {}, {}, {}, {}, {}>",
            self.depth, self.stencil, self.red, self.green, self.blue, self.alpha
        )
    }
}

/// Display, configuration, context, and surface management (EGL-shaped).
///
/// Handles are opaque and `Copy`; the caller owns the lifecycle and must
/// release each handle exactly once.
pub trait ContextBackend {
    type Display: Copy + Send;
    type Config: Copy + Send;
    type Context: Copy + Send;
    type Surface: Copy + Send;

    /// Returns the default display connection, if the platform has one.
    fn default_display(&self) -> Option<Self::Display>;

    /// Initializes the display and returns the negotiated (major, minor) version.
    ///
    /// Each call takes one display reference, even when it fails, and must be
    /// paired with one [`terminate`](Self::terminate).
    fn initialize(&self, display: Self::Display) -> Result<(i32, i32), String>;

    /// Returns every configuration matching `request`, in backend preference order.
    fn choose_configs(
        &self,
        display: Self::Display,
        request: &ConfigRequest,
    ) -> Result<Vec<Self::Config>, String>;

    /// Queries the sizes of a configuration. Unknown attributes read as 0.
    fn config_attributes(&self, display: Self::Display, config: Self::Config) -> ConfigAttributes;

    /// Creates an unshared context for `client_version`.
    fn create_context(
        &self,
        display: Self::Display,
        config: Self::Config,
        client_version: i32,
    ) -> Result<Self::Context, String>;

    /// Creates an off-screen pbuffer surface of exactly `width` x `height`.
    fn create_pbuffer_surface(
        &self,
        display: Self::Display,
        config: Self::Config,
        width: u32,
        height: u32,
    ) -> Result<Self::Surface, String>;

    /// Makes `context` current on the calling thread, drawing and reading `surface`.
    fn make_current(
        &self,
        display: Self::Display,
        surface: Self::Surface,
        context: Self::Context,
    ) -> Result<(), String>;

    /// Returns whether `context` is the context current on the calling thread.
    fn is_current(&self, context: Self::Context) -> bool;

    /// Detaches any context from the calling thread.
    fn release_current(&self, display: Self::Display);

    fn destroy_surface(&self, display: Self::Display, surface: Self::Surface);

    fn destroy_context(&self, display: Self::Display, context: Self::Context);

    /// Drops one display reference, terminating the connection with the last.
    fn terminate(&self, display: Self::Display);
}

/// Texture, framebuffer, and readback calls (GLES2-shaped).
///
/// Every call acts on the context current on the calling thread. Texture
/// calls target `TEXTURE_2D` and framebuffer calls target `FRAMEBUFFER`.
pub trait GlBackend {
    fn create_texture(&self) -> Result<TextureId, String>;

    fn delete_texture(&self, texture: TextureId);

    fn bind_texture(&self, texture: Option<TextureId>);

    fn tex_parameter_i32(&self, parameter: u32, value: i32);

    /// Allocates level-0 storage for the bound texture without uploading data.
    fn tex_storage_2d(&self, internal_format: u32, width: u32, height: u32, format: u32, ty: u32);

    fn create_framebuffer(&self) -> Result<FramebufferId, String>;

    fn delete_framebuffer(&self, framebuffer: FramebufferId);

    /// Binds `framebuffer`, or the default framebuffer for `None`.
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>);

    /// Attaches `texture` level 0 to `attachment` of the bound framebuffer.
    fn framebuffer_texture_2d(&self, attachment: u32, texture: Option<TextureId>);

    fn check_framebuffer_status(&self) -> u32;

    /// Returns and clears the oldest recorded error flag.
    fn get_error(&self) -> u32;

    fn get_parameter_i32(&self, parameter: u32) -> i32;

    fn get_parameter_i32_slice(&self, parameter: u32, out: &mut [i32]);

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);

    /// Reads `RGBA`/`UNSIGNED_BYTE` pixels from the bound framebuffer into
    /// `pixels`, bottom row first.
    fn read_pixels(&self, x: i32, y: i32, width: u32, height: u32, pixels: &mut [u8]);
}

/// A backend providing both halves of the platform seam.
pub trait GraphicsBackend: ContextBackend + GlBackend {}

impl<T: ContextBackend + GlBackend> GraphicsBackend for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_pbuffer_requests_eight_bits_per_channel_and_no_ancillary_buffers() {
        let request = ConfigRequest::rgba8_pbuffer();
        assert_eq!(
            (request.red, request.green, request.blue, request.alpha),
            (8, 8, 8, 8)
        );
        assert_eq!(request.depth, 0);
        assert_eq!(request.stencil, 0);
        assert_eq!(request.client_version, 2);
    }

    #[test]
    fn config_attributes_display_lists_dsrgba_in_order() {
        let attributes = ConfigAttributes {
            depth: 24,
            stencil: 8,
            red: 8,
            green: 7,
            blue: 6,
            alpha: 5,
        };
        assert_eq!(
            attributes.to_string(),
            "<d,s,r,g,b,a> = <24, 8, 8, 7, 6, 5>"
        );
    }

    #[test]
    fn ids_expose_raw_names() {
        let texture = TextureId(NonZeroU32::new(3).unwrap());
        let framebuffer = FramebufferId(NonZeroU32::new(9).unwrap());
        assert_eq!(texture.get(), 3);
        assert_eq!(framebuffer.get(), 9);
    }
}
