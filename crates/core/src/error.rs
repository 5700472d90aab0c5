//! Error types for the off-screen pixel buffer.

use thiserror::Error;

/// Errors produced while acquiring, driving, or releasing an off-screen buffer.
///
/// Every variant is recoverable at the call boundary. The buffer logs each
/// failure before returning it, so callers that only check the `bool`/`Option`
/// convenience methods still leave a diagnostic trail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OffscreenError {
    /// Width or height was zero when constructing a buffer.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// A serialized `OffscreenConfig` could not be parsed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// No default display connection exists.
    #[error("graphics device unavailable: no default display")]
    DeviceUnavailable,

    /// The display connection rejected version negotiation.
    #[error("display initialization failed: {0}")]
    InitializationFailed(String),

    /// Configuration negotiation returned zero candidates.
    #[error("no surface configuration matches RGBA8888 / ES2 / pbuffer")]
    NoMatchingConfiguration,

    /// The rendering context could not be created.
    #[error("context creation failed: {0}")]
    ContextCreationFailed(String),

    /// The pixel-buffer surface could not be created.
    #[error("pbuffer surface creation failed: {0}")]
    SurfaceCreationFailed(String),

    /// The context and surface could not be made current on this thread.
    #[error("make current failed: {0}")]
    MakeCurrentFailed(String),

    /// The backend reported an error while allocating the color texture.
    #[error("texture allocation failed: GL error 0x{code:04X}")]
    TextureAllocationFailed {
        /// Value of `glGetError` after texture setup.
        code: u32,
    },

    /// The framebuffer failed its completeness check.
    #[error("framebuffer incomplete: status 0x{status:04X}")]
    IncompleteFramebuffer {
        /// Value of `glCheckFramebufferStatus`.
        status: u32,
    },

    /// The backend reported an error while reading pixels back.
    #[error("pixel readback failed: GL error 0x{code:04X}")]
    ReadbackFailed {
        /// Value of `glGetError` after `glReadPixels`.
        code: u32,
    },

    /// A context-touching operation ran on a thread that does not own the context.
    #[error("{operation}: this thread does not own the graphics context")]
    WrongThread {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// `get_bitmap` was called before a renderer was set.
    #[error("renderer was not set")]
    RendererNotSet,

    /// The buffer has not been initialized yet.
    #[error("buffer is not initialized")]
    NotInitialized,

    /// The buffer was destroyed and cannot be used again.
    #[error("buffer was destroyed")]
    Destroyed,

    /// Writing a snapshot to disk failed.
    #[error("i/o error: {0}")]
    Io(String),
}
