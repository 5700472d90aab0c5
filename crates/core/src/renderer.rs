//! The renderer capability consumed by the buffer.

use crate::backend::FramebufferId;

/// A filter or scene that draws into the buffer's render target.
///
/// The buffer calls these hooks on the owner thread with the context
/// current. Hooks run while the buffer holds its internal lock, so a renderer
/// must not call back into the buffer that drives it.
pub trait OffscreenRenderer: Send {
    /// Create GPU resources (programs, buffers).
    fn on_surface_created(&mut self);

    /// The target is `width` x `height` pixels.
    fn on_surface_changed(&mut self, width: u32, height: u32);

    /// Draw one frame into the framebuffer given to [`set_frame_buffer`](Self::set_frame_buffer).
    fn on_draw_frame(&mut self);

    /// The framebuffer the renderer must draw into.
    fn set_frame_buffer(&mut self, framebuffer: FramebufferId);
}

impl<R: OffscreenRenderer + ?Sized> OffscreenRenderer for Box<R> {
    fn on_surface_created(&mut self) {
        (**self).on_surface_created();
    }

    fn on_surface_changed(&mut self, width: u32, height: u32) {
        (**self).on_surface_changed(width, height);
    }

    fn on_draw_frame(&mut self) {
        (**self).on_draw_frame();
    }

    fn set_frame_buffer(&mut self, framebuffer: FramebufferId) {
        (**self).set_frame_buffer(framebuffer);
    }
}
