//! libEGL + `glow` backend.
//!
//! libEGL is loaded at runtime, so the crate builds on machines without it.
//! GL entry points are resolved through `eglGetProcAddress` the first time a
//! context is made current.
//!
//! `eglInitialize` and `eglTerminate` are not reference counted, and every
//! buffer in the process shares the default display. References are counted
//! here so one buffer's teardown does not terminate another buffer's display.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use khronos_egl as egl;
use log::{debug, warn};

use super::{
    ConfigAttributes, ConfigRequest, ContextBackend, FramebufferId, GlBackend, TextureId,
};
use crate::error::OffscreenError;

/// An EGL display connection.
#[derive(Clone, Copy)]
pub struct EglDisplay(egl::Display);

/// A negotiated EGL frame buffer configuration.
#[derive(Clone, Copy)]
pub struct EglConfig(egl::Config);

/// An EGL rendering context.
#[derive(Clone, Copy)]
pub struct EglContext(egl::Context);

/// An EGL pbuffer surface.
#[derive(Clone, Copy)]
pub struct EglSurface(egl::Surface);

// SAFETY: EGL handles are process-wide opaque names, valid on any thread.
// Thread affinity of the *current* context is enforced by the buffer's owner
// check, not by the handle type.
#[allow(unsafe_code)]
unsafe impl Send for EglDisplay {}
#[allow(unsafe_code)]
unsafe impl Send for EglConfig {}
#[allow(unsafe_code)]
unsafe impl Send for EglContext {}
#[allow(unsafe_code)]
unsafe impl Send for EglSurface {}

/// Live `initialize` references per display, keyed by handle address.
static DISPLAY_REFERENCES: OnceLock<Mutex<HashMap<usize, usize>>> = OnceLock::new();

fn display_references<T>(f: impl FnOnce(&mut HashMap<usize, usize>) -> T) -> T {
    let references = DISPLAY_REFERENCES.get_or_init(|| Mutex::new(HashMap::new()));
    f(&mut references.lock().unwrap_or_else(PoisonError::into_inner))
}

fn display_key(display: EglDisplay) -> usize {
    display.0.as_ptr() as usize
}

/// Off-screen backend on libEGL with an OpenGL ES 2 context.
///
/// Renderers draw through the shared function table from
/// [`gl_handle`](Self::gl_handle), obtained with
/// [`OffscreenBuffer::with_backend`](crate::OffscreenBuffer::with_backend).
pub struct EglBackend {
    egl: egl::DynamicInstance<egl::EGL1_4>,
    gl: OnceLock<Arc<glow::Context>>,
}

// SAFETY: the backend is only ever driven from the thread that owns the
// current context; the buffer rejects calls from any other thread. No debug
// callback is installed on the glow context.
#[allow(unsafe_code)]
unsafe impl Send for EglBackend {}

impl EglBackend {
    /// Loads libEGL (1.4 or later).
    ///
    /// # Errors
    ///
    /// Returns `OffscreenError::DeviceUnavailable` if the library cannot be
    /// loaded or lacks the required entry points.
    #[allow(unsafe_code)]
    pub fn load() -> Result<Self, OffscreenError> {
        // SAFETY: loading libEGL runs its initializers; it is a system library
        // with no additional requirements.
        let egl = unsafe { egl::DynamicInstance::<egl::EGL1_4>::load_required() }.map_err(|e| {
            warn!("failed to load libEGL: {e}");
            OffscreenError::DeviceUnavailable
        })?;
        Ok(Self {
            egl,
            gl: OnceLock::new(),
        })
    }

    /// Returns the GL function table, once a context has been made current.
    pub fn gl(&self) -> Option<&glow::Context> {
        self.gl.get().map(Arc::as_ref)
    }

    /// A shared handle to the GL function table for a renderer to keep.
    ///
    /// Calls through it reach whichever context is current on the calling
    /// thread; the buffer makes its own current before running any hook.
    pub fn gl_handle(&self) -> Option<Arc<glow::Context>> {
        self.gl.get().cloned()
    }

    #[allow(unsafe_code)]
    fn load_gl(&self) {
        self.gl.get_or_init(|| {
            debug!("loading GL entry points through eglGetProcAddress");
            // SAFETY: a context is current on this thread, so the returned
            // pointers are valid for it.
            let gl = unsafe {
                glow::Context::from_loader_function(|name| {
                    self.egl
                        .get_proc_address(name)
                        .map_or(std::ptr::null(), |f| f as *const c_void)
                })
            };
            Arc::new(gl)
        });
    }
}

fn config_attrib_list(request: &ConfigRequest) -> [egl::Int; 17] {
    [
        egl::DEPTH_SIZE,
        request.depth,
        egl::STENCIL_SIZE,
        request.stencil,
        egl::RED_SIZE,
        request.red,
        egl::GREEN_SIZE,
        request.green,
        egl::BLUE_SIZE,
        request.blue,
        egl::ALPHA_SIZE,
        request.alpha,
        egl::RENDERABLE_TYPE,
        egl::OPENGL_ES2_BIT,
        egl::SURFACE_TYPE,
        egl::PBUFFER_BIT,
        egl::NONE,
    ]
}

impl ContextBackend for EglBackend {
    type Display = EglDisplay;
    type Config = EglConfig;
    type Context = EglContext;
    type Surface = EglSurface;

    #[allow(unsafe_code)]
    fn default_display(&self) -> Option<EglDisplay> {
        // SAFETY: EGL_DEFAULT_DISPLAY is always a valid native display id.
        unsafe { self.egl.get_display(egl::DEFAULT_DISPLAY) }.map(EglDisplay)
    }

    fn initialize(&self, display: EglDisplay) -> Result<(i32, i32), String> {
        // Counted before the call: the caller terminates after any outcome.
        display_references(|refs| *refs.entry(display_key(display)).or_default() += 1);
        let version = self.egl.initialize(display.0).map_err(|e| e.to_string())?;
        self.egl
            .bind_api(egl::OPENGL_ES_API)
            .map_err(|e| e.to_string())?;
        Ok(version)
    }

    fn choose_configs(
        &self,
        display: EglDisplay,
        request: &ConfigRequest,
    ) -> Result<Vec<EglConfig>, String> {
        let attribs = config_attrib_list(request);
        let count = self
            .egl
            .matching_config_count(display.0, &attribs)
            .map_err(|e| e.to_string())?;
        let mut configs = Vec::with_capacity(count);
        if count > 0 {
            self.egl
                .choose_config(display.0, &attribs, &mut configs)
                .map_err(|e| e.to_string())?;
        }
        Ok(configs.into_iter().map(EglConfig).collect())
    }

    fn config_attributes(&self, display: EglDisplay, config: EglConfig) -> ConfigAttributes {
        let attrib = |name| {
            self.egl
                .get_config_attrib(display.0, config.0, name)
                .unwrap_or(0)
        };
        ConfigAttributes {
            depth: attrib(egl::DEPTH_SIZE),
            stencil: attrib(egl::STENCIL_SIZE),
            red: attrib(egl::RED_SIZE),
            green: attrib(egl::GREEN_SIZE),
            blue: attrib(egl::BLUE_SIZE),
            alpha: attrib(egl::ALPHA_SIZE),
        }
    }

    fn create_context(
        &self,
        display: EglDisplay,
        config: EglConfig,
        client_version: i32,
    ) -> Result<EglContext, String> {
        let attribs = [egl::CONTEXT_CLIENT_VERSION, client_version, egl::NONE];
        self.egl
            .create_context(display.0, config.0, None, &attribs)
            .map(EglContext)
            .map_err(|e| e.to_string())
    }

    fn create_pbuffer_surface(
        &self,
        display: EglDisplay,
        config: EglConfig,
        width: u32,
        height: u32,
    ) -> Result<EglSurface, String> {
        let width = egl::Int::try_from(width).map_err(|e| e.to_string())?;
        let height = egl::Int::try_from(height).map_err(|e| e.to_string())?;
        let attribs = [egl::WIDTH, width, egl::HEIGHT, height, egl::NONE];
        self.egl
            .create_pbuffer_surface(display.0, config.0, &attribs)
            .map(EglSurface)
            .map_err(|e| e.to_string())
    }

    fn make_current(
        &self,
        display: EglDisplay,
        surface: EglSurface,
        context: EglContext,
    ) -> Result<(), String> {
        self.egl
            .make_current(display.0, Some(surface.0), Some(surface.0), Some(context.0))
            .map_err(|e| e.to_string())?;
        self.load_gl();
        Ok(())
    }

    fn is_current(&self, context: EglContext) -> bool {
        self.egl.get_current_context() == Some(context.0)
    }

    fn release_current(&self, display: EglDisplay) {
        if let Err(e) = self.egl.make_current(display.0, None, None, None) {
            warn!("eglMakeCurrent(EGL_NO_CONTEXT) failed: {e}");
        }
    }

    fn destroy_surface(&self, display: EglDisplay, surface: EglSurface) {
        if let Err(e) = self.egl.destroy_surface(display.0, surface.0) {
            warn!("eglDestroySurface failed: {e}");
        }
    }

    fn destroy_context(&self, display: EglDisplay, context: EglContext) {
        if let Err(e) = self.egl.destroy_context(display.0, context.0) {
            warn!("eglDestroyContext failed: {e}");
        }
    }

    fn terminate(&self, display: EglDisplay) {
        let last = display_references(|refs| {
            let key = display_key(display);
            match refs.get_mut(&key) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                _ => {
                    refs.remove(&key);
                    true
                }
            }
        });
        if !last {
            debug!("display still referenced by another buffer; not terminating");
            return;
        }
        if let Err(e) = self.egl.terminate(display.0) {
            warn!("eglTerminate failed: {e}");
        }
    }
}

const NO_CONTEXT: &str = "no GL context has been made current";

impl GlBackend for EglBackend {
    fn create_texture(&self) -> Result<TextureId, String> {
        self.gl().ok_or(NO_CONTEXT)?.create_texture()
    }

    fn delete_texture(&self, texture: TextureId) {
        if let Some(gl) = self.gl() {
            GlBackend::delete_texture(gl, texture);
        }
    }

    fn bind_texture(&self, texture: Option<TextureId>) {
        if let Some(gl) = self.gl() {
            GlBackend::bind_texture(gl, texture);
        }
    }

    fn tex_parameter_i32(&self, parameter: u32, value: i32) {
        if let Some(gl) = self.gl() {
            GlBackend::tex_parameter_i32(gl, parameter, value);
        }
    }

    fn tex_storage_2d(&self, internal_format: u32, width: u32, height: u32, format: u32, ty: u32) {
        if let Some(gl) = self.gl() {
            gl.tex_storage_2d(internal_format, width, height, format, ty);
        }
    }

    fn create_framebuffer(&self) -> Result<FramebufferId, String> {
        GlBackend::create_framebuffer(self.gl().ok_or(NO_CONTEXT)?)
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        if let Some(gl) = self.gl() {
            GlBackend::delete_framebuffer(gl, framebuffer);
        }
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        if let Some(gl) = self.gl() {
            GlBackend::bind_framebuffer(gl, framebuffer);
        }
    }

    fn framebuffer_texture_2d(&self, attachment: u32, texture: Option<TextureId>) {
        if let Some(gl) = self.gl() {
            GlBackend::framebuffer_texture_2d(gl, attachment, texture);
        }
    }

    fn check_framebuffer_status(&self) -> u32 {
        self.gl()
            .map_or(glow::FRAMEBUFFER_UNSUPPORTED, GlBackend::check_framebuffer_status)
    }

    fn get_error(&self) -> u32 {
        self.gl()
            .map_or(glow::INVALID_OPERATION, GlBackend::get_error)
    }

    fn get_parameter_i32(&self, parameter: u32) -> i32 {
        self.gl()
            .map_or(0, |gl| GlBackend::get_parameter_i32(gl, parameter))
    }

    fn get_parameter_i32_slice(&self, parameter: u32, out: &mut [i32]) {
        if let Some(gl) = self.gl() {
            GlBackend::get_parameter_i32_slice(gl, parameter, out);
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        if let Some(gl) = self.gl() {
            GlBackend::viewport(gl, x, y, width, height);
        }
    }

    fn read_pixels(&self, x: i32, y: i32, width: u32, height: u32, pixels: &mut [u8]) {
        if let Some(gl) = self.gl() {
            GlBackend::read_pixels(gl, x, y, width, height, pixels);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OffscreenBuffer, OffscreenRenderer};

    #[test]
    fn config_attrib_list_is_none_terminated_key_value_pairs() {
        let list = config_attrib_list(&ConfigRequest::rgba8_pbuffer());
        assert_eq!(list[list.len() - 1], egl::NONE);
        let pairs: Vec<_> = list[..list.len() - 1].chunks(2).collect();
        assert!(pairs.contains(&&[egl::RED_SIZE, 8][..]));
        assert!(pairs.contains(&&[egl::DEPTH_SIZE, 0][..]));
        assert!(pairs.contains(&&[egl::SURFACE_TYPE, egl::PBUFFER_BIT][..]));
        assert!(pairs.contains(&&[egl::RENDERABLE_TYPE, egl::OPENGL_ES2_BIT][..]));
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn load_finds_libegl() {
        assert!(EglBackend::load().is_ok());
    }

    /// Clears its framebuffer to `color` on every draw, or draws nothing.
    struct ClearRenderer {
        gl: Arc<glow::Context>,
        color: Option<[f32; 4]>,
        framebuffer: Option<FramebufferId>,
    }

    impl OffscreenRenderer for ClearRenderer {
        fn on_surface_created(&mut self) {}

        fn on_surface_changed(&mut self, width: u32, height: u32) {
            GlBackend::viewport(&*self.gl, 0, 0, width as i32, height as i32);
        }

        #[allow(unsafe_code)]
        fn on_draw_frame(&mut self) {
            GlBackend::bind_framebuffer(&*self.gl, self.framebuffer);
            let Some([r, g, b, a]) = self.color else {
                return;
            };
            // SAFETY: the buffer keeps its context current while hooks run.
            unsafe {
                glow::HasContext::clear_color(&*self.gl, r, g, b, a);
                glow::HasContext::clear(&*self.gl, glow::COLOR_BUFFER_BIT);
            }
        }

        fn set_frame_buffer(&mut self, framebuffer: FramebufferId) {
            self.framebuffer = Some(framebuffer);
        }
    }

    fn egl_buffer(color: Option<[f32; 4]>) -> OffscreenBuffer<EglBackend> {
        let buffer = OffscreenBuffer::new(EglBackend::load().unwrap(), 64, 64).unwrap();
        buffer.try_initialize().unwrap();
        let gl = buffer
            .with_backend(EglBackend::gl_handle)
            .unwrap()
            .expect("GL loaded once the context is current");
        buffer
            .set_renderer(ClearRenderer {
                gl,
                color,
                framebuffer: None,
            })
            .unwrap();
        buffer
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn solid_red_renderer_reads_back_opaque_red() {
        let buffer = egl_buffer(Some([1.0, 0.0, 0.0, 1.0]));

        let bitmap = buffer.try_get_bitmap().unwrap().expect("non-blank bitmap");

        assert_eq!(bitmap.dimensions(), (64, 64));
        assert!(bitmap.pixels().all(|p| *p == image::Rgba([255, 0, 0, 255])));
        buffer.destroy().unwrap();
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn renderer_that_draws_nothing_reads_back_none() {
        let buffer = egl_buffer(None);

        assert_eq!(buffer.try_get_bitmap(), Ok(None));
        buffer.destroy().unwrap();
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn second_buffer_on_same_thread_leaves_first_intact() {
        let first = egl_buffer(Some([0.0, 0.0, 1.0, 1.0]));

        let second = egl_buffer(Some([0.0, 1.0, 0.0, 1.0]));
        assert!(second.get_bitmap().is_some());
        second.destroy().unwrap();

        let bitmap = first.get_bitmap().expect("first buffer still renders");
        assert_eq!(*bitmap.get_pixel(0, 0), image::Rgba([0, 0, 255, 255]));
        first.destroy().unwrap();
    }
}
