//! Graphics context acquisition: display, configuration, context, pbuffer.
//!
//! [`acquire`] runs the whole sequence and either returns a
//! [`GraphicsContext`] that is current on the calling thread, or an error
//! with everything created so far already released.

use log::{debug, error, info};

use crate::backend::{ConfigAttributes, ConfigRequest, ContextBackend, GlBackend, GraphicsBackend};
use crate::config::Diagnostics;
use crate::error::OffscreenError;
use crate::owner::ThreadOwner;

/// The configuration selected during negotiation.
#[derive(Debug, Clone, Copy)]
pub struct Configuration<C> {
    handle: C,
    attributes: ConfigAttributes,
}

impl<C: Copy> Configuration<C> {
    pub fn handle(&self) -> C {
        self.handle
    }

    pub fn attributes(&self) -> ConfigAttributes {
        self.attributes
    }
}

/// Negotiates a configuration for `request` and selects the first candidate.
///
/// First-match is the policy: the backend already orders candidates by its
/// own preference and no further scoring is applied.
///
/// # Errors
///
/// Returns `OffscreenError::NoMatchingConfiguration` if negotiation fails or
/// yields no candidates.
pub fn select_configuration<B: ContextBackend + ?Sized>(
    backend: &B,
    display: B::Display,
    request: &ConfigRequest,
    diagnostics: &Diagnostics,
) -> Result<Configuration<B::Config>, OffscreenError> {
    let candidates = backend.choose_configs(display, request).map_err(|msg| {
        error!("configuration negotiation failed: {msg}");
        OffscreenError::NoMatchingConfiguration
    })?;

    if diagnostics.list_configs {
        let listing = candidates
            .iter()
            .map(|&c| format!("    {}", backend.config_attributes(display, c)))
            .collect::<Vec<_>>()
            .join("\n");
        debug!("config list ({} candidates) {{\n{listing}\n}}", candidates.len());
    }

    let Some(&handle) = candidates.first() else {
        error!("no configuration matches {request:?}");
        return Err(OffscreenError::NoMatchingConfiguration);
    };

    Ok(Configuration {
        handle,
        attributes: backend.config_attributes(display, handle),
    })
}

/// Implementation limits of the current context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_texture_size: i32,
    pub max_renderbuffer_size: i32,
    pub max_texture_image_units: i32,
    pub max_viewport_dims: [i32; 2],
}

impl ContextLimits {
    /// Queries the limits of the context current on this thread.
    pub fn query<G: GlBackend + ?Sized>(gl: &G) -> Self {
        let mut max_viewport_dims = [0; 2];
        gl.get_parameter_i32_slice(glow::MAX_VIEWPORT_DIMS, &mut max_viewport_dims);
        Self {
            max_texture_size: gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE),
            max_renderbuffer_size: gl.get_parameter_i32(glow::MAX_RENDERBUFFER_SIZE),
            max_texture_image_units: gl.get_parameter_i32(glow::MAX_TEXTURE_IMAGE_UNITS),
            max_viewport_dims,
        }
    }
}

impl std::fmt::Display for ContextLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "maxTextureSize = {}, maxRenderBufferSize = {}, maxTextureImageUnits = {}, \
             maxViewportDimensions = ({}, {})",
            self.max_texture_size,
            self.max_renderbuffer_size,
            self.max_texture_image_units,
            self.max_viewport_dims[0],
            self.max_viewport_dims[1]
        )
    }
}

/// A context and pbuffer surface, current on the owner thread.
///
/// Released exactly once through [`GraphicsContext::release`], which
/// consumes it.
pub struct GraphicsContext<B: ContextBackend> {
    display: B::Display,
    context: B::Context,
    surface: B::Surface,
    configuration: Configuration<B::Config>,
    version: (i32, i32),
    limits: ContextLimits,
    owner: ThreadOwner,
}

impl<B: ContextBackend> GraphicsContext<B> {
    pub fn configuration(&self) -> &Configuration<B::Config> {
        &self.configuration
    }

    /// The (major, minor) version negotiated with the display.
    pub fn version(&self) -> (i32, i32) {
        self.version
    }

    pub fn limits(&self) -> ContextLimits {
        self.limits
    }

    pub fn owner(&self) -> ThreadOwner {
        self.owner
    }

    /// Makes this context current again if another context took its place on
    /// the calling thread.
    ///
    /// # Errors
    ///
    /// Returns `OffscreenError::MakeCurrentFailed` if the backend refuses.
    pub fn make_current(&self, backend: &B) -> Result<(), OffscreenError> {
        if backend.is_current(self.context) {
            return Ok(());
        }
        debug!("re-binding graphics context");
        backend
            .make_current(self.display, self.surface, self.context)
            .map_err(|msg| {
                error!("make current failed: {msg}");
                OffscreenError::MakeCurrentFailed(msg)
            })
    }

    /// Detaches the context, then destroys surface, context, and display
    /// connection in that order.
    pub fn release(self, backend: &B) {
        debug!("releasing graphics context");
        backend.release_current(self.display);
        backend.destroy_surface(self.display, self.surface);
        backend.destroy_context(self.display, self.context);
        backend.terminate(self.display);
    }
}

/// Tears down a half-built context when acquisition bails out early.
struct PartialContext<'a, B: ContextBackend> {
    backend: &'a B,
    display: B::Display,
    context: Option<B::Context>,
    surface: Option<B::Surface>,
    current: bool,
    armed: bool,
}

impl<'a, B: ContextBackend> PartialContext<'a, B> {
    fn new(backend: &'a B, display: B::Display) -> Self {
        Self {
            backend,
            display,
            context: None,
            surface: None,
            current: false,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<B: ContextBackend> Drop for PartialContext<'_, B> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!("tearing down partially acquired context");
        if self.current {
            self.backend.release_current(self.display);
        }
        if let Some(surface) = self.surface.take() {
            self.backend.destroy_surface(self.display, surface);
        }
        if let Some(context) = self.context.take() {
            self.backend.destroy_context(self.display, context);
        }
        self.backend.terminate(self.display);
    }
}

/// Acquires a `width` x `height` pbuffer context and makes it current on the
/// calling thread, which becomes its owner.
///
/// # Errors
///
/// `DeviceUnavailable`, `InitializationFailed`, `NoMatchingConfiguration`,
/// `ContextCreationFailed`, `SurfaceCreationFailed`, or `MakeCurrentFailed`,
/// after releasing whatever was created before the failing step.
pub fn acquire<B: GraphicsBackend>(
    backend: &B,
    width: u32,
    height: u32,
    diagnostics: &Diagnostics,
) -> Result<GraphicsContext<B>, OffscreenError> {
    debug!("initialize graphics context ({width}x{height})");

    let display = backend.default_display().ok_or_else(|| {
        error!("no default display");
        OffscreenError::DeviceUnavailable
    })?;

    // Armed before initialize: a failed initialize may leave the display up.
    let mut partial = PartialContext::new(backend, display);

    let version = backend.initialize(display).map_err(|msg| {
        error!("display initialization failed: {msg}");
        OffscreenError::InitializationFailed(msg)
    })?;
    debug!("display version {}.{}", version.0, version.1);

    let request = ConfigRequest::rgba8_pbuffer();
    let configuration = select_configuration(backend, display, &request, diagnostics)?;
    debug!("selected config {}", configuration.attributes());

    let context = backend
        .create_context(display, configuration.handle(), request.client_version)
        .map_err(|msg| {
            error!("context creation failed: {msg}");
            OffscreenError::ContextCreationFailed(msg)
        })?;
    partial.context = Some(context);

    let surface = backend
        .create_pbuffer_surface(display, configuration.handle(), width, height)
        .map_err(|msg| {
            error!("pbuffer surface creation failed: {msg}");
            OffscreenError::SurfaceCreationFailed(msg)
        })?;
    partial.surface = Some(surface);

    backend
        .make_current(display, surface, context)
        .map_err(|msg| {
            error!("make current failed: {msg}");
            OffscreenError::MakeCurrentFailed(msg)
        })?;
    partial.current = true;

    let owner = ThreadOwner::claim();

    let limits = ContextLimits::query(backend);
    if diagnostics.log_context_limits {
        debug!("context values: {limits}");
    }

    partial.disarm();
    info!("graphics context initialized ({width}x{height})");

    Ok(GraphicsContext {
        display,
        context,
        surface,
        configuration,
        version,
        limits,
        owner,
    })
}
