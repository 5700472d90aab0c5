//! Render target (FBO + texture) for off-screen rendering.
//!
//! A `RenderTarget` pairs a framebuffer object with an RGBA8 color
//! attachment. `RenderTargetSlot` owns at most one target and rebuilds or
//! releases it idempotently.

use log::{debug, error};

use super::texture::{create_texture, TextureConfig};
use crate::backend::{FramebufferId, GlBackend, TextureId};
use crate::error::OffscreenError;

/// An off-screen render target consisting of a framebuffer object and
/// its attached RGBA8 color texture.
///
/// The texture is attached to `COLOR_ATTACHMENT0` and the framebuffer has
/// passed its completeness check before a `RenderTarget` exists.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderTarget {
    fbo: FramebufferId,
    texture: TextureId,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Creates a new render target with an RGBA8 texture at the given dimensions.
    ///
    /// Creates a texture, then a framebuffer, attaches the texture as
    /// `COLOR_ATTACHMENT0`, and verifies framebuffer completeness.
    ///
    /// # Errors
    ///
    /// Returns `TextureAllocationFailed` if the texture cannot be allocated,
    /// or `IncompleteFramebuffer` with the backend status. Nothing stays
    /// allocated on failure.
    pub fn new<G: GlBackend + ?Sized>(
        gl: &G,
        width: u32,
        height: u32,
    ) -> Result<Self, OffscreenError> {
        debug!("init framebuffer object (width = {width}, height = {height})");
        let texture = create_texture(gl, &TextureConfig::rgba8_nearest(width, height))?;

        let fbo = match gl.create_framebuffer() {
            Ok(fbo) => fbo,
            Err(msg) => {
                error!("framebuffer creation failed: {msg}");
                gl.delete_texture(texture);
                return Err(OffscreenError::IncompleteFramebuffer {
                    status: glow::FRAMEBUFFER_UNSUPPORTED,
                });
            }
        };
        debug!("texture = {}, framebuffer = {}", texture.get(), fbo.get());

        gl.bind_framebuffer(Some(fbo));
        gl.framebuffer_texture_2d(glow::COLOR_ATTACHMENT0, Some(texture));
        debug!(
            "framebuffer object initialization error status: 0x{:04X}",
            gl.get_error()
        );

        let status = gl.check_framebuffer_status();
        if status != glow::FRAMEBUFFER_COMPLETE {
            error!("framebuffer object initialization failed, status: 0x{status:04X}");
            let target = Self {
                fbo,
                texture,
                width,
                height,
            };
            target.destroy(gl);
            return Err(OffscreenError::IncompleteFramebuffer { status });
        }

        Ok(Self {
            fbo,
            texture,
            width,
            height,
        })
    }

    /// Binds this render target's framebuffer as the active draw target
    /// and sets the viewport to match the texture dimensions.
    pub fn bind<G: GlBackend + ?Sized>(&self, gl: &G) {
        gl.bind_framebuffer(Some(self.fbo));
        gl.viewport(0, 0, self.width as i32, self.height as i32);
    }

    /// Returns the framebuffer handle renderers draw into.
    pub fn framebuffer(&self) -> FramebufferId {
        self.fbo
    }

    /// Returns the color texture handle.
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Returns the width of this render target in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of this render target in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Deletes the texture, rebinds the default framebuffer, then deletes
    /// the framebuffer.
    ///
    /// Consumes the target, so each handle is released exactly once.
    pub fn destroy<G: GlBackend + ?Sized>(self, gl: &G) {
        debug!("delete framebuffer texture");
        gl.delete_texture(self.texture);
        gl.bind_framebuffer(None);
        debug!("delete framebuffer object");
        gl.delete_framebuffer(self.fbo);
    }
}

/// Holds at most one [`RenderTarget`].
#[derive(Debug, Default)]
pub struct RenderTargetSlot {
    target: Option<RenderTarget>,
}

impl RenderTargetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases any existing target, then creates a new one.
    ///
    /// # Errors
    ///
    /// Propagates [`RenderTarget::new`] errors; the slot is left empty.
    pub fn rebuild<G: GlBackend + ?Sized>(
        &mut self,
        gl: &G,
        width: u32,
        height: u32,
    ) -> Result<&RenderTarget, OffscreenError> {
        self.release(gl);
        let target = RenderTarget::new(gl, width, height)?;
        Ok(self.target.insert(target))
    }

    /// Releases the target if one is allocated. Safe to call on an empty slot.
    pub fn release<G: GlBackend + ?Sized>(&mut self, gl: &G) {
        if let Some(target) = self.target.take() {
            target.destroy(gl);
        }
    }

    pub fn get(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.target.as_ref().map(RenderTarget::framebuffer)
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, Failure, RecordingBackend};
    use crate::backend::ContextBackend;

    fn current_backend() -> RecordingBackend {
        let backend = RecordingBackend::new();
        let display = backend.default_display().unwrap();
        backend.initialize(display).unwrap();
        let context = backend.create_context(display, 1, 2).unwrap();
        let surface = backend.create_pbuffer_surface(display, 1, 8, 8).unwrap();
        backend.make_current(display, surface, context).unwrap();
        backend
    }

    #[test]
    fn new_creates_valid_render_target() {
        let backend = current_backend();
        let target = RenderTarget::new(&backend, 32, 16).unwrap();
        assert_eq!(target.width(), 32);
        assert_eq!(target.height(), 16);
        assert_eq!(backend.texture_size(target.texture()), Some((32, 16)));
        assert_eq!(backend.live().textures, 1);
        assert_eq!(backend.live().framebuffers, 1);
    }

    #[test]
    fn new_attaches_texture_to_color_attachment_zero_before_status_check() {
        let backend = current_backend();
        let target = RenderTarget::new(&backend, 4, 4).unwrap();
        let calls = backend.calls();
        let attach = calls
            .iter()
            .position(|c| {
                *c == Call::FramebufferTexture {
                    attachment: glow::COLOR_ATTACHMENT0,
                    texture: Some(target.texture().get()),
                }
            })
            .expect("texture attached");
        let check = calls
            .iter()
            .position(|c| *c == Call::CheckFramebufferStatus)
            .expect("status checked");
        assert!(attach < check);
    }

    #[test]
    fn incomplete_framebuffer_releases_texture_and_framebuffer() {
        let backend = current_backend();
        backend.fail(Failure::FramebufferStatus(
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
        ));

        let err = RenderTarget::new(&backend, 4, 4).unwrap_err();

        assert_eq!(
            err,
            OffscreenError::IncompleteFramebuffer {
                status: glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
            }
        );
        assert_eq!(backend.live().textures, 0);
        assert_eq!(backend.live().framebuffers, 0);
    }

    #[test]
    fn texture_failure_never_allocates_framebuffer() {
        let backend = current_backend();
        backend.fail(Failure::TextureError(glow::OUT_OF_MEMORY));

        let err = RenderTarget::new(&backend, 4, 4).unwrap_err();

        assert!(matches!(err, OffscreenError::TextureAllocationFailed { .. }));
        assert_eq!(
            backend.count_calls(|c| matches!(c, Call::CreateFramebuffer(_))),
            0
        );
        assert_eq!(backend.live().textures, 0);
    }

    #[test]
    fn bind_sets_framebuffer_and_viewport() {
        let backend = current_backend();
        let target = RenderTarget::new(&backend, 12, 6).unwrap();
        backend.clear_calls();

        target.bind(&backend);

        assert_eq!(
            backend.calls(),
            vec![
                Call::BindFramebuffer(Some(target.framebuffer().get())),
                Call::Viewport {
                    width: 12,
                    height: 6
                },
            ]
        );
    }

    #[test]
    fn destroy_deletes_texture_first_then_framebuffer() {
        let backend = current_backend();
        let target = RenderTarget::new(&backend, 4, 4).unwrap();
        let (texture, fbo) = (target.texture().get(), target.framebuffer().get());
        backend.clear_calls();

        target.destroy(&backend);

        assert_eq!(
            backend.calls(),
            vec![
                Call::DeleteTexture(texture),
                Call::BindFramebuffer(None),
                Call::DeleteFramebuffer(fbo),
            ]
        );
        assert!(backend.live().textures == 0 && backend.live().framebuffers == 0);
    }

    #[test]
    fn slot_rebuild_replaces_existing_target() {
        let backend = current_backend();
        let mut slot = RenderTargetSlot::new();
        let first = slot.rebuild(&backend, 4, 4).unwrap().framebuffer();
        let second = slot.rebuild(&backend, 8, 8).unwrap().framebuffer();

        assert_ne!(first, second);
        assert_eq!(backend.live().textures, 1);
        assert_eq!(backend.live().framebuffers, 1);
        assert_eq!(slot.framebuffer(), Some(second));
    }

    #[test]
    fn slot_release_is_idempotent() {
        let backend = current_backend();
        let mut slot = RenderTargetSlot::new();
        slot.rebuild(&backend, 4, 4).unwrap();

        slot.release(&backend);
        let after_first = backend.calls().len();
        slot.release(&backend);

        assert!(slot.is_empty());
        assert_eq!(backend.calls().len(), after_first);
        assert_eq!(backend.live().textures, 0);
    }

    #[test]
    fn slot_stays_empty_after_failed_rebuild() {
        let backend = current_backend();
        let mut slot = RenderTargetSlot::new();
        slot.rebuild(&backend, 4, 4).unwrap();
        backend.fail(Failure::FramebufferStatus(glow::FRAMEBUFFER_UNSUPPORTED));

        assert!(slot.rebuild(&backend, 4, 4).is_err());
        assert!(slot.is_empty());
        assert!(slot.get().is_none());
    }
}
