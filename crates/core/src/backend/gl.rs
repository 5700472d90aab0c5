//! [`GlBackend`] for a native `glow::Context`.
//!
//! Each method is a direct call into the loaded GL function table. The
//! context must be current on the calling thread; the buffer's owner-thread
//! check is what guarantees that.

use glow::HasContext;

use super::{FramebufferId, GlBackend, TextureId};

#[allow(unsafe_code)]
impl GlBackend for glow::Context {
    fn create_texture(&self) -> Result<TextureId, String> {
        // SAFETY: glow wraps raw GL calls as unsafe; generating a name has no
        // preconditions beyond a current context.
        unsafe { HasContext::create_texture(self) }.map(|t| TextureId(t.0))
    }

    fn delete_texture(&self, texture: TextureId) {
        // SAFETY: `texture` was returned by `create_texture` on this context.
        unsafe { HasContext::delete_texture(self, glow::NativeTexture(texture.0)) }
    }

    fn bind_texture(&self, texture: Option<TextureId>) {
        // SAFETY: binding a live texture name or 0.
        unsafe {
            HasContext::bind_texture(
                self,
                glow::TEXTURE_2D,
                texture.map(|t| glow::NativeTexture(t.0)),
            )
        }
    }

    fn tex_parameter_i32(&self, parameter: u32, value: i32) {
        // SAFETY: parameters are GL enum values supplied by TextureConfig.
        unsafe { HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, parameter, value) }
    }

    fn tex_storage_2d(&self, internal_format: u32, width: u32, height: u32, format: u32, ty: u32) {
        // SAFETY: no pixel data is supplied, so the driver only allocates.
        unsafe {
            HasContext::tex_image_2d(
                self,
                glow::TEXTURE_2D,
                0,
                internal_format as i32,
                width as i32,
                height as i32,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(None),
            )
        }
    }

    fn create_framebuffer(&self) -> Result<FramebufferId, String> {
        // SAFETY: generating a name has no preconditions beyond a current context.
        unsafe { HasContext::create_framebuffer(self) }.map(|f| FramebufferId(f.0))
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        // SAFETY: `framebuffer` was returned by `create_framebuffer` on this context.
        unsafe { HasContext::delete_framebuffer(self, glow::NativeFramebuffer(framebuffer.0)) }
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        // SAFETY: binding a live framebuffer name or the default framebuffer.
        unsafe {
            HasContext::bind_framebuffer(
                self,
                glow::FRAMEBUFFER,
                framebuffer.map(|f| glow::NativeFramebuffer(f.0)),
            )
        }
    }

    fn framebuffer_texture_2d(&self, attachment: u32, texture: Option<TextureId>) {
        // SAFETY: attaches a live texture (or detaches) on the bound framebuffer.
        unsafe {
            HasContext::framebuffer_texture_2d(
                self,
                glow::FRAMEBUFFER,
                attachment,
                glow::TEXTURE_2D,
                texture.map(|t| glow::NativeTexture(t.0)),
                0,
            )
        }
    }

    fn check_framebuffer_status(&self) -> u32 {
        // SAFETY: pure query on the bound framebuffer.
        unsafe { HasContext::check_framebuffer_status(self, glow::FRAMEBUFFER) }
    }

    fn get_error(&self) -> u32 {
        // SAFETY: pure query.
        unsafe { HasContext::get_error(self) }
    }

    fn get_parameter_i32(&self, parameter: u32) -> i32 {
        // SAFETY: pure query of a scalar integer state value.
        unsafe { HasContext::get_parameter_i32(self, parameter) }
    }

    fn get_parameter_i32_slice(&self, parameter: u32, out: &mut [i32]) {
        // SAFETY: callers size `out` for the queried parameter.
        unsafe { HasContext::get_parameter_i32_slice(self, parameter, out) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        // SAFETY: viewport has no memory-safety preconditions.
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }

    fn read_pixels(&self, x: i32, y: i32, width: u32, height: u32, pixels: &mut [u8]) {
        // SAFETY: the caller sizes `pixels` to width * height * 4 bytes, the
        // exact footprint of an RGBA/UNSIGNED_BYTE read with default pack alignment.
        unsafe {
            HasContext::read_pixels(
                self,
                x,
                y,
                width as i32,
                height as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(pixels)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glow_context_satisfies_gl_backend() {
        // Compile-time check; calling through the trait needs a live context.
        fn _assert_impl<T: GlBackend>() {}
        _assert_impl::<glow::Context>();
    }
}
