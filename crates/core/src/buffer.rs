//! The off-screen buffer: lifecycle, renderer binding, draw and readback.
//!
//! ```text
//! Uninitialized --initialize--> Initialized --destroy--> Destroyed
//!       \------------------------destroy-----------------^
//! ```
//!
//! `initialize` is serialized by an internal mutex, so racing callers run the
//! acquisition sequence once. Everything after that is restricted to the
//! thread that initialized the buffer; calls from other threads are logged,
//! skipped, and reported as `OffscreenError::WrongThread`. Several buffers may
//! share an owner thread: each guarded call makes its own context current
//! before touching GL.

use std::sync::{Mutex, MutexGuard, PoisonError};

use image::RgbaImage;
use log::{debug, error, warn};

use crate::backend::{ConfigAttributes, FramebufferId, GraphicsBackend};
use crate::config::{Diagnostics, OffscreenConfig};
use crate::context::{acquire, ContextLimits, GraphicsContext};
use crate::error::OffscreenError;
use crate::render::{
    is_blank, read_rgba, RenderTargetSlot, DISCARD_BLANK_READBACK, DRAWS_PER_READBACK,
};
use crate::renderer::OffscreenRenderer;

/// Lifecycle state of an [`OffscreenBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Uninitialized,
    Initialized,
    /// Terminal. The buffer cannot be initialized again.
    Destroyed,
}

struct Resources<B: GraphicsBackend> {
    context: GraphicsContext<B>,
    target: RenderTargetSlot,
}

struct Inner<B: GraphicsBackend> {
    backend: B,
    state: BufferState,
    resources: Option<Resources<B>>,
    renderer: Option<Box<dyn OffscreenRenderer>>,
}

impl<B: GraphicsBackend> Inner<B> {
    /// Makes the context current, drops the renderer while it is, then
    /// releases the render target and the context.
    fn teardown(&mut self) {
        if let Some(mut resources) = self.resources.take() {
            match resources.context.make_current(&self.backend) {
                Ok(()) => {
                    self.renderer = None;
                    resources.target.release(&self.backend);
                }
                // GL objects go away with the context.
                Err(err) => warn!("teardown: render target not released: {err}"),
            }
            resources.context.release(&self.backend);
        }
        self.renderer = None;
        self.state = BufferState::Destroyed;
    }
}

/// Returns the resources if the calling thread owns them, with their context
/// current.
fn owned_resources<'a, B: GraphicsBackend>(
    backend: &B,
    resources: Option<&'a Resources<B>>,
    state: BufferState,
    operation: &'static str,
) -> Result<&'a Resources<B>, OffscreenError> {
    let Some(resources) = resources else {
        let err = match state {
            BufferState::Destroyed => OffscreenError::Destroyed,
            _ => OffscreenError::NotInitialized,
        };
        error!("{operation}: {err}");
        return Err(err);
    };
    if !resources.context.owner().is_current() {
        warn!("{operation}: this thread does not own the graphics context");
        return Err(OffscreenError::WrongThread { operation });
    }
    resources.context.make_current(backend)?;
    Ok(resources)
}

/// A pbuffer-backed render target that renders without a window and reads
/// the result back as an image.
///
/// Each buffer exclusively owns its display connection, context, surface,
/// and render target.
pub struct OffscreenBuffer<B: GraphicsBackend> {
    width: u32,
    height: u32,
    diagnostics: Diagnostics,
    inner: Mutex<Inner<B>>,
}

impl<B: GraphicsBackend> OffscreenBuffer<B> {
    /// Creates an uninitialized `width` x `height` buffer.
    ///
    /// # Errors
    ///
    /// Returns `OffscreenError::InvalidDimensions` if either dimension is zero.
    pub fn new(backend: B, width: u32, height: u32) -> Result<Self, OffscreenError> {
        Self::with_config(backend, OffscreenConfig::new(width, height))
    }

    /// Creates an uninitialized buffer from a full config.
    ///
    /// # Errors
    ///
    /// Returns `OffscreenError::InvalidDimensions` if either dimension is zero.
    pub fn with_config(backend: B, config: OffscreenConfig) -> Result<Self, OffscreenError> {
        config.validate()?;
        debug!(
            "create pixel buffer for offscreen rendering: width = {}, height = {}",
            config.width, config.height
        );
        Ok(Self {
            width: config.width,
            height: config.height,
            diagnostics: config.diagnostics,
            inner: Mutex::new(Inner {
                backend,
                state: BufferState::Uninitialized,
                resources: None,
                renderer: None,
            }),
        })
    }

    // Poisoning is ignored; every state transition is a single assignment.
    fn lock(&self) -> MutexGuard<'_, Inner<B>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn state(&self) -> BufferState {
        self.lock().state
    }

    /// Returns whether the calling thread owns the graphics context.
    pub fn is_owner_thread(&self) -> bool {
        self.lock()
            .resources
            .as_ref()
            .is_some_and(|r| r.context.owner().is_current())
    }

    /// The framebuffer renderers draw into, once initialized.
    pub fn frame_buffer(&self) -> Option<FramebufferId> {
        self.lock()
            .resources
            .as_ref()
            .and_then(|r| r.target.framebuffer())
    }

    /// Implementation limits of the context, once initialized.
    pub fn limits(&self) -> Option<ContextLimits> {
        self.lock().resources.as_ref().map(|r| r.context.limits())
    }

    /// The (major, minor) version negotiated with the display, once initialized.
    pub fn display_version(&self) -> Option<(i32, i32)> {
        self.lock().resources.as_ref().map(|r| r.context.version())
    }

    /// Attributes of the selected surface configuration, once initialized.
    pub fn configuration(&self) -> Option<ConfigAttributes> {
        self.lock()
            .resources
            .as_ref()
            .map(|r| r.context.configuration().attributes())
    }

    /// Acquires the context and render target; `true` on success.
    ///
    /// Failures are logged; see [`try_initialize`](Self::try_initialize) for
    /// the error itself.
    pub fn initialize(&self) -> bool {
        self.try_initialize().is_ok()
    }

    /// Acquires the context, surface, and render target, making the calling
    /// thread the owner. A no-op when already initialized.
    ///
    /// # Errors
    ///
    /// Returns the failing acquisition step's error, or
    /// `OffscreenError::Destroyed`. On error the buffer stays
    /// `Uninitialized` with nothing allocated, and may be retried.
    pub fn try_initialize(&self) -> Result<(), OffscreenError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match inner.state {
            BufferState::Initialized => return Ok(()),
            BufferState::Destroyed => {
                error!("initialize: {}", OffscreenError::Destroyed);
                return Err(OffscreenError::Destroyed);
            }
            BufferState::Uninitialized => {}
        }

        let context = acquire(&inner.backend, self.width, self.height, &self.diagnostics)?;

        let mut target = RenderTargetSlot::new();
        if let Err(err) = target.rebuild(&inner.backend, self.width, self.height) {
            error!("initialize: render target creation failed: {err}");
            context.release(&inner.backend);
            return Err(err);
        }

        inner.resources = Some(Resources { context, target });
        inner.state = BufferState::Initialized;
        Ok(())
    }

    /// Binds `renderer` to the render target.
    ///
    /// Hands it the framebuffer, then calls `on_surface_created` and
    /// `on_surface_changed(width, height)` once each. Replaces any previous
    /// renderer.
    ///
    /// # Errors
    ///
    /// `WrongThread` off the owner thread, `NotInitialized` or `Destroyed`
    /// outside the initialized state. The renderer is dropped without any
    /// hook being called.
    pub fn set_renderer<R: OffscreenRenderer + 'static>(
        &self,
        renderer: R,
    ) -> Result<(), OffscreenError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let framebuffer = owned_resources(
            &inner.backend,
            inner.resources.as_ref(),
            inner.state,
            "set_renderer",
        )?
            .target
            .framebuffer()
            .ok_or(OffscreenError::NotInitialized)?;

        let renderer = inner.renderer.insert(Box::new(renderer));
        renderer.set_frame_buffer(framebuffer);
        renderer.on_surface_created();
        renderer.on_surface_changed(self.width, self.height);
        Ok(())
    }

    /// Runs `f` with the backend, on the owner thread, with this buffer's
    /// context current.
    ///
    /// Renderers use this to obtain what they draw with, such as the GL
    /// function table from `EglBackend::gl_handle`.
    ///
    /// # Errors
    ///
    /// `WrongThread` off the owner thread, `NotInitialized` or `Destroyed`
    /// outside the initialized state, or `MakeCurrentFailed`. `f` is not run.
    pub fn with_backend<T>(&self, f: impl FnOnce(&B) -> T) -> Result<T, OffscreenError> {
        let guard = self.lock();
        owned_resources(
            &guard.backend,
            guard.resources.as_ref(),
            guard.state,
            "with_backend",
        )?;
        Ok(f(&guard.backend))
    }

    /// Draws and reads back the render target.
    ///
    /// `None` when no renderer is set, off the owner thread, on a readback
    /// error, or when the draw produced a blank image. Failures are logged.
    pub fn get_bitmap(&self) -> Option<RgbaImage> {
        self.try_get_bitmap().ok().flatten()
    }

    /// Draws [`DRAWS_PER_READBACK`] frames, then reads the target back into a
    /// fresh `width` x `height` RGBA8 image.
    ///
    /// Returns `Ok(None)` when the image is identical to a blank buffer and
    /// [`DISCARD_BLANK_READBACK`] is set.
    ///
    /// # Errors
    ///
    /// `RendererNotSet` before [`set_renderer`](Self::set_renderer) (checked
    /// before any backend call), `WrongThread` off the owner thread, or
    /// `ReadbackFailed`. State is unchanged on error.
    pub fn try_get_bitmap(&self) -> Result<Option<RgbaImage>, OffscreenError> {
        let mut guard = self.lock();
        let Inner {
            backend,
            state,
            resources,
            renderer,
        } = &mut *guard;
        let Some(renderer) = renderer.as_mut() else {
            error!("get_bitmap: renderer was not set");
            return Err(OffscreenError::RendererNotSet);
        };
        let resources = owned_resources(&*backend, resources.as_ref(), *state, "get_bitmap")?;
        let target = resources.target.get().ok_or(OffscreenError::NotInitialized)?;

        for _ in 0..DRAWS_PER_READBACK {
            renderer.on_draw_frame();
        }

        let image = read_rgba(&*backend, target)?;
        if DISCARD_BLANK_READBACK && is_blank(&image) {
            warn!("get_bitmap: draw produced a blank image");
            return Ok(None);
        }
        Ok(Some(image))
    }

    /// Releases the render target, surface, context, and display connection,
    /// in that order, and clears the owner.
    ///
    /// Calling it again is a no-op. Destroying an uninitialized buffer only
    /// moves it to `Destroyed`.
    ///
    /// # Errors
    ///
    /// `WrongThread` off the owner thread; nothing is released.
    pub fn destroy(&self) -> Result<(), OffscreenError> {
        let mut inner = self.lock();
        match inner.state {
            BufferState::Destroyed => return Ok(()),
            BufferState::Uninitialized => {
                inner.state = BufferState::Destroyed;
                return Ok(());
            }
            BufferState::Initialized => {}
        }
        owned_resources(&inner.backend, inner.resources.as_ref(), inner.state, "destroy")?;
        inner.teardown();
        debug!("offscreen buffer destroyed");
        Ok(())
    }
}

impl<B: GraphicsBackend> Drop for OffscreenBuffer<B> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(resources) = inner.resources.as_ref() else {
            return;
        };
        if resources.context.owner().is_current() {
            inner.teardown();
        } else {
            warn!("offscreen buffer dropped off its owner thread; GPU resources leaked");
        }
    }
}
