//! In-memory backend that records every call and tracks live resources.
//!
//! `RecordingBackend` emulates just enough EGL and GLES2 for the buffer:
//! names are handed out from a counter, textures own real RGBA storage that
//! test renderers can fill, framebuffer completeness follows the attachment,
//! and readback copies the attached texture. GL objects and framebuffer
//! bindings belong to the context that was current when they were made, so
//! drawing with the wrong context (or none) reaches nothing. Failures can be injected at each
//! acquisition step. Clones share state, so a renderer can hold a clone and
//! "draw" into the same target the buffer reads back.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    ConfigAttributes, ConfigRequest, ContextBackend, FramebufferId, GlBackend, TextureId,
};

/// A failure to inject. Injected failures persist until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// `default_display` returns `None`.
    NoDisplay,
    /// `initialize` fails after the display was brought up, as when the
    /// client API cannot be bound.
    Initialize,
    /// `choose_configs` returns an empty list.
    NoConfigs,
    CreateContext,
    CreateSurface,
    MakeCurrent,
    /// `tex_storage_2d` raises this GL error.
    TextureError(u32),
    /// `check_framebuffer_status` returns this status.
    FramebufferStatus(u32),
    /// `read_pixels` raises this GL error and leaves the output untouched.
    ReadbackError(u32),
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DefaultDisplay,
    Initialize(u32),
    ChooseConfigs,
    ConfigAttributes(u32),
    CreateContext { config: u32, client_version: i32 },
    CreatePbufferSurface { width: u32, height: u32 },
    MakeCurrent { surface: u32, context: u32 },
    ReleaseCurrent,
    DestroySurface(u32),
    DestroyContext(u32),
    Terminate(u32),
    CreateTexture(u32),
    DeleteTexture(u32),
    BindTexture(Option<u32>),
    TexParameter { parameter: u32, value: i32 },
    TexStorage { internal_format: u32, width: u32, height: u32 },
    CreateFramebuffer(u32),
    DeleteFramebuffer(u32),
    BindFramebuffer(Option<u32>),
    FramebufferTexture { attachment: u32, texture: Option<u32> },
    CheckFramebufferStatus,
    GetError,
    GetParameter(u32),
    Viewport { width: i32, height: i32 },
    ReadPixels { width: u32, height: u32 },
    /// A test renderer wrote pixels through [`RecordingBackend::fill`] or
    /// [`RecordingBackend::fill_row`].
    Draw,
}

/// Counts of resources that have been created and not yet released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveResources {
    pub displays: usize,
    pub contexts: usize,
    pub surfaces: usize,
    pub textures: usize,
    pub framebuffers: usize,
}

impl LiveResources {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Default)]
struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    parameters: BTreeMap<u32, i32>,
}

#[derive(Debug)]
struct State {
    calls: Vec<Call>,
    failures: Vec<Failure>,
    config_count: u32,
    next_name: u32,
    /// Display references taken by `initialize`.
    displays: BTreeMap<u32, usize>,
    contexts: BTreeSet<u32>,
    surfaces: BTreeSet<u32>,
    current: Option<(u32, u32)>,
    textures: BTreeMap<u32, Texture>,
    framebuffers: BTreeMap<u32, Option<u32>>,
    /// Context each texture and framebuffer was created in.
    object_contexts: BTreeMap<u32, u32>,
    bound_texture: Option<u32>,
    /// Framebuffer bound in each context.
    bound_framebuffers: BTreeMap<u32, u32>,
    error: u32,
    calls_without_context: usize,
}

impl State {
    fn new() -> Self {
        Self {
            calls: Vec::new(),
            failures: Vec::new(),
            config_count: 3,
            next_name: 0,
            displays: BTreeMap::new(),
            contexts: BTreeSet::new(),
            surfaces: BTreeSet::new(),
            current: None,
            textures: BTreeMap::new(),
            framebuffers: BTreeMap::new(),
            object_contexts: BTreeMap::new(),
            bound_texture: None,
            bound_framebuffers: BTreeMap::new(),
            error: glow::NO_ERROR,
            calls_without_context: 0,
        }
    }

    fn name(&mut self) -> NonZeroU32 {
        self.next_name += 1;
        NonZeroU32::new(self.next_name).unwrap_or(NonZeroU32::MIN)
    }

    fn failing(&self, failure: Failure) -> bool {
        self.failures.contains(&failure)
    }

    fn injected(&self, pick: impl Fn(&Failure) -> Option<u32>) -> Option<u32> {
        self.failures.iter().find_map(pick)
    }

    fn gl_call(&mut self, call: Call) {
        if self.current.is_none() {
            self.calls_without_context += 1;
        }
        self.calls.push(call);
    }

    fn raise(&mut self, code: u32) {
        // GL keeps the first unread error.
        if self.error == glow::NO_ERROR {
            self.error = code;
        }
    }

    fn current_context(&self) -> Option<u32> {
        self.current.map(|(_, context)| context)
    }

    fn adopt(&mut self, name: u32) {
        if let Some(context) = self.current_context() {
            self.object_contexts.insert(name, context);
        }
    }

    /// The framebuffer bound in the current context, if it belongs to it.
    fn bound_framebuffer(&self) -> Option<u32> {
        let context = self.current_context()?;
        let framebuffer = *self.bound_framebuffers.get(&context)?;
        (self.object_contexts.get(&framebuffer) == Some(&context)).then_some(framebuffer)
    }

    fn attached_texture_mut(&mut self) -> Option<&mut Texture> {
        let context = self.current_context()?;
        let framebuffer = self.bound_framebuffer()?;
        let texture = (*self.framebuffers.get(&framebuffer)?)?;
        if self.object_contexts.get(&texture) != Some(&context) {
            return None;
        }
        self.textures.get_mut(&texture)
    }
}

/// Resource-tracking in-memory backend. Clones share state.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    state: Arc<Mutex<State>>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Injects `failure` until [`clear_failures`](Self::clear_failures).
    pub fn fail(&self, failure: Failure) {
        self.state().failures.push(failure);
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Sets how many configurations negotiation reports (default 3).
    pub fn set_config_count(&self, count: u32) {
        self.state().config_count = count;
    }

    /// Returns every call recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| matches(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn live(&self) -> LiveResources {
        let state = self.state();
        LiveResources {
            displays: state.displays.len(),
            contexts: state.contexts.len(),
            surfaces: state.surfaces.len(),
            textures: state.textures.len(),
            framebuffers: state.framebuffers.len(),
        }
    }

    /// Number of GL calls issued while no context was current.
    pub fn calls_without_context(&self) -> usize {
        self.state().calls_without_context
    }

    /// Returns whether any context is current.
    pub fn has_current_context(&self) -> bool {
        self.state().current.is_some()
    }

    /// Texture parameters set on `texture`, if it is live.
    pub fn texture_parameters(&self, texture: TextureId) -> Option<BTreeMap<u32, i32>> {
        self.state()
            .textures
            .get(&texture.get())
            .map(|t| t.parameters.clone())
    }

    /// Size of the storage allocated for `texture`, if it is live.
    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.state()
            .textures
            .get(&texture.get())
            .map(|t| (t.width, t.height))
    }

    /// Fills the texture attached to the bound framebuffer with `rgba`.
    pub fn fill(&self, rgba: [u8; 4]) {
        let mut state = self.state();
        state.gl_call(Call::Draw);
        if let Some(texture) = state.attached_texture_mut() {
            for pixel in texture.pixels.chunks_exact_mut(4) {
                pixel.copy_from_slice(&rgba);
            }
        }
    }

    /// Fills one row of the attached texture. Row 0 is the bottom row, as in GL.
    pub fn fill_row(&self, gl_row: u32, rgba: [u8; 4]) {
        let mut state = self.state();
        state.gl_call(Call::Draw);
        if let Some(texture) = state.attached_texture_mut() {
            if gl_row < texture.height {
                let stride = texture.width as usize * 4;
                let start = gl_row as usize * stride;
                for pixel in texture.pixels[start..start + stride].chunks_exact_mut(4) {
                    pixel.copy_from_slice(&rgba);
                }
            }
        }
    }
}

impl ContextBackend for RecordingBackend {
    type Display = u32;
    type Config = u32;
    type Context = u32;
    type Surface = u32;

    fn default_display(&self) -> Option<u32> {
        let mut state = self.state();
        state.calls.push(Call::DefaultDisplay);
        (!state.failing(Failure::NoDisplay)).then_some(1)
    }

    fn initialize(&self, display: u32) -> Result<(i32, i32), String> {
        let mut state = self.state();
        state.calls.push(Call::Initialize(display));
        *state.displays.entry(display).or_default() += 1;
        if state.failing(Failure::Initialize) {
            return Err("EGL_NOT_INITIALIZED".into());
        }
        Ok((1, 4))
    }

    fn choose_configs(&self, display: u32, request: &ConfigRequest) -> Result<Vec<u32>, String> {
        let mut state = self.state();
        state.calls.push(Call::ChooseConfigs);
        if !state.displays.contains_key(&display) {
            return Err("EGL_NOT_INITIALIZED".into());
        }
        if state.failing(Failure::NoConfigs) || request.client_version != 2 {
            return Ok(Vec::new());
        }
        Ok((1..=state.config_count).collect())
    }

    fn config_attributes(&self, _display: u32, config: u32) -> ConfigAttributes {
        self.state().calls.push(Call::ConfigAttributes(config));
        // Later candidates carry ancillary buffers, as drivers tend to order them.
        let extra = (config.saturating_sub(1) * 8).min(24) as i32;
        ConfigAttributes {
            depth: extra,
            stencil: if extra > 0 { 8 } else { 0 },
            red: 8,
            green: 8,
            blue: 8,
            alpha: 8,
        }
    }

    fn create_context(
        &self,
        _display: u32,
        config: u32,
        client_version: i32,
    ) -> Result<u32, String> {
        let mut state = self.state();
        state.calls.push(Call::CreateContext {
            config,
            client_version,
        });
        if state.failing(Failure::CreateContext) {
            return Err("EGL_BAD_CONFIG".into());
        }
        let name = state.name().get();
        state.contexts.insert(name);
        Ok(name)
    }

    fn create_pbuffer_surface(
        &self,
        _display: u32,
        _config: u32,
        width: u32,
        height: u32,
    ) -> Result<u32, String> {
        let mut state = self.state();
        state
            .calls
            .push(Call::CreatePbufferSurface { width, height });
        if state.failing(Failure::CreateSurface) {
            return Err("EGL_BAD_ALLOC".into());
        }
        let name = state.name().get();
        state.surfaces.insert(name);
        Ok(name)
    }

    fn make_current(&self, _display: u32, surface: u32, context: u32) -> Result<(), String> {
        let mut state = self.state();
        state.calls.push(Call::MakeCurrent { surface, context });
        if state.failing(Failure::MakeCurrent)
            || !state.surfaces.contains(&surface)
            || !state.contexts.contains(&context)
        {
            return Err("EGL_BAD_MATCH".into());
        }
        state.current = Some((surface, context));
        Ok(())
    }

    fn is_current(&self, context: u32) -> bool {
        self.state().current_context() == Some(context)
    }

    fn release_current(&self, _display: u32) {
        let mut state = self.state();
        state.calls.push(Call::ReleaseCurrent);
        state.current = None;
    }

    fn destroy_surface(&self, _display: u32, surface: u32) {
        let mut state = self.state();
        state.calls.push(Call::DestroySurface(surface));
        state.surfaces.remove(&surface);
    }

    fn destroy_context(&self, _display: u32, context: u32) {
        let mut state = self.state();
        state.calls.push(Call::DestroyContext(context));
        state.contexts.remove(&context);
        state.bound_framebuffers.remove(&context);
    }

    fn terminate(&self, display: u32) {
        let mut state = self.state();
        state.calls.push(Call::Terminate(display));
        if let Some(references) = state.displays.get_mut(&display) {
            *references -= 1;
            if *references == 0 {
                state.displays.remove(&display);
            }
        }
    }
}

impl GlBackend for RecordingBackend {
    fn create_texture(&self) -> Result<TextureId, String> {
        let mut state = self.state();
        let name = state.name();
        state.gl_call(Call::CreateTexture(name.get()));
        state.textures.insert(name.get(), Texture::default());
        state.adopt(name.get());
        Ok(TextureId(name))
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state();
        state.gl_call(Call::DeleteTexture(texture.get()));
        state.textures.remove(&texture.get());
        state.object_contexts.remove(&texture.get());
        if state.bound_texture == Some(texture.get()) {
            state.bound_texture = None;
        }
        // Deleting an attached texture detaches it from every framebuffer.
        for attachment in state.framebuffers.values_mut() {
            if *attachment == Some(texture.get()) {
                *attachment = None;
            }
        }
    }

    fn bind_texture(&self, texture: Option<TextureId>) {
        let mut state = self.state();
        state.gl_call(Call::BindTexture(texture.map(TextureId::get)));
        state.bound_texture = texture.map(TextureId::get);
    }

    fn tex_parameter_i32(&self, parameter: u32, value: i32) {
        let mut state = self.state();
        state.gl_call(Call::TexParameter { parameter, value });
        let Some(bound) = state.bound_texture else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if let Some(texture) = state.textures.get_mut(&bound) {
            texture.parameters.insert(parameter, value);
        }
    }

    fn tex_storage_2d(&self, internal_format: u32, width: u32, height: u32, _format: u32, _ty: u32) {
        let mut state = self.state();
        state.gl_call(Call::TexStorage {
            internal_format,
            width,
            height,
        });
        if let Some(code) = state.injected(|f| match f {
            Failure::TextureError(code) => Some(*code),
            _ => None,
        }) {
            state.raise(code);
            return;
        }
        let Some(bound) = state.bound_texture else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if let Some(texture) = state.textures.get_mut(&bound) {
            texture.width = width;
            texture.height = height;
            texture.pixels = vec![0; width as usize * height as usize * 4];
        }
    }

    fn create_framebuffer(&self) -> Result<FramebufferId, String> {
        let mut state = self.state();
        let name = state.name();
        state.gl_call(Call::CreateFramebuffer(name.get()));
        state.framebuffers.insert(name.get(), None);
        state.adopt(name.get());
        Ok(FramebufferId(name))
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        let mut state = self.state();
        state.gl_call(Call::DeleteFramebuffer(framebuffer.get()));
        state.framebuffers.remove(&framebuffer.get());
        state.object_contexts.remove(&framebuffer.get());
        state
            .bound_framebuffers
            .retain(|_, bound| *bound != framebuffer.get());
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        let mut state = self.state();
        state.gl_call(Call::BindFramebuffer(framebuffer.map(FramebufferId::get)));
        let Some(context) = state.current_context() else {
            return;
        };
        match framebuffer {
            Some(framebuffer) => {
                state.bound_framebuffers.insert(context, framebuffer.get());
            }
            None => {
                state.bound_framebuffers.remove(&context);
            }
        }
    }

    fn framebuffer_texture_2d(&self, attachment: u32, texture: Option<TextureId>) {
        let mut state = self.state();
        state.gl_call(Call::FramebufferTexture {
            attachment,
            texture: texture.map(TextureId::get),
        });
        let Some(bound) = state.bound_framebuffer() else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if attachment == glow::COLOR_ATTACHMENT0 {
            state
                .framebuffers
                .insert(bound, texture.map(TextureId::get));
        }
    }

    fn check_framebuffer_status(&self) -> u32 {
        let mut state = self.state();
        state.gl_call(Call::CheckFramebufferStatus);
        if let Some(status) = state.injected(|f| match f {
            Failure::FramebufferStatus(status) => Some(*status),
            _ => None,
        }) {
            return status;
        }
        let Some(bound) = state.bound_framebuffer() else {
            return glow::FRAMEBUFFER_COMPLETE;
        };
        match state.framebuffers.get(&bound).copied().flatten() {
            Some(texture) => match state.textures.get(&texture) {
                Some(t) if t.width > 0 && t.height > 0 => glow::FRAMEBUFFER_COMPLETE,
                _ => glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
            },
            None => glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
        }
    }

    fn get_error(&self) -> u32 {
        let mut state = self.state();
        state.gl_call(Call::GetError);
        std::mem::replace(&mut state.error, glow::NO_ERROR)
    }

    fn get_parameter_i32(&self, parameter: u32) -> i32 {
        let mut state = self.state();
        state.gl_call(Call::GetParameter(parameter));
        match parameter {
            glow::MAX_TEXTURE_SIZE | glow::MAX_RENDERBUFFER_SIZE => 4096,
            glow::MAX_TEXTURE_IMAGE_UNITS => 8,
            _ => 0,
        }
    }

    fn get_parameter_i32_slice(&self, parameter: u32, out: &mut [i32]) {
        let mut state = self.state();
        state.gl_call(Call::GetParameter(parameter));
        if parameter == glow::MAX_VIEWPORT_DIMS {
            for value in out.iter_mut().take(2) {
                *value = 4096;
            }
        }
    }

    fn viewport(&self, _x: i32, _y: i32, width: i32, height: i32) {
        self.state().gl_call(Call::Viewport { width, height });
    }

    fn read_pixels(&self, x: i32, y: i32, width: u32, height: u32, pixels: &mut [u8]) {
        let mut state = self.state();
        state.gl_call(Call::ReadPixels { width, height });
        if let Some(code) = state.injected(|f| match f {
            Failure::ReadbackError(code) => Some(*code),
            _ => None,
        }) {
            state.raise(code);
            return;
        }
        let Some(texture) = state.attached_texture_mut() else {
            // The pbuffer itself is never drawn to; it reads back blank.
            pixels.fill(0);
            return;
        };
        let (x, y) = (x.max(0) as usize, y.max(0) as usize);
        let stride = texture.width as usize * 4;
        let row_len = (width as usize * 4).min(stride.saturating_sub(x * 4));
        for row in 0..height as usize {
            let src_row = y + row;
            if src_row >= texture.height as usize {
                break;
            }
            let src = src_row * stride + x * 4;
            let dst = row * width as usize * 4;
            pixels[dst..dst + row_len].copy_from_slice(&texture.pixels[src..src + row_len]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_backend() -> RecordingBackend {
        let backend = RecordingBackend::new();
        let display = backend.default_display().unwrap();
        backend.initialize(display).unwrap();
        let config = backend
            .choose_configs(display, &ConfigRequest::rgba8_pbuffer())
            .unwrap()[0];
        let context = backend.create_context(display, config, 2).unwrap();
        let surface = backend.create_pbuffer_surface(display, config, 4, 4).unwrap();
        backend.make_current(display, surface, context).unwrap();
        backend
    }

    #[test]
    fn live_resources_track_create_and_release() {
        let backend = RecordingBackend::new();
        let display = backend.default_display().unwrap();
        backend.initialize(display).unwrap();
        let context = backend.create_context(display, 1, 2).unwrap();
        let surface = backend.create_pbuffer_surface(display, 1, 4, 4).unwrap();
        backend.make_current(display, surface, context).unwrap();
        assert_eq!(
            backend.live(),
            LiveResources {
                displays: 1,
                contexts: 1,
                surfaces: 1,
                textures: 0,
                framebuffers: 0,
            }
        );
        backend.release_current(display);
        backend.destroy_surface(display, surface);
        backend.destroy_context(display, context);
        backend.terminate(display);
        assert!(backend.live().is_empty(), "{:?}", backend.live());
    }

    #[test]
    fn gl_calls_without_current_context_are_counted() {
        let backend = RecordingBackend::new();
        let _ = backend.create_texture();
        assert_eq!(backend.calls_without_context(), 1);
    }

    #[test]
    fn injected_failures_persist_until_cleared() {
        let backend = RecordingBackend::new();
        backend.fail(Failure::NoDisplay);
        assert!(backend.default_display().is_none());
        assert!(backend.default_display().is_none());
        backend.clear_failures();
        assert_eq!(backend.default_display(), Some(1));
    }

    #[test]
    fn framebuffer_without_attachment_is_incomplete() {
        let backend = current_backend();
        let framebuffer = backend.create_framebuffer().unwrap();
        backend.bind_framebuffer(Some(framebuffer));
        assert_eq!(
            backend.check_framebuffer_status(),
            glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
        );
    }

    #[test]
    fn fill_writes_attached_texture_and_read_pixels_copies_it() {
        let backend = current_backend();
        let texture = backend.create_texture().unwrap();
        backend.bind_texture(Some(texture));
        backend.tex_storage_2d(glow::RGBA, 2, 2, glow::RGBA, glow::UNSIGNED_BYTE);
        let framebuffer = backend.create_framebuffer().unwrap();
        backend.bind_framebuffer(Some(framebuffer));
        backend.framebuffer_texture_2d(glow::COLOR_ATTACHMENT0, Some(texture));
        assert_eq!(backend.check_framebuffer_status(), glow::FRAMEBUFFER_COMPLETE);

        backend.fill([1, 2, 3, 4]);
        let mut pixels = vec![0u8; 16];
        backend.read_pixels(0, 0, 2, 2, &mut pixels);
        assert_eq!(pixels, [1u8, 2, 3, 4].repeat(4));
    }

    #[test]
    fn get_error_returns_first_error_then_clears() {
        let backend = current_backend();
        backend.fail(Failure::TextureError(glow::OUT_OF_MEMORY));
        let texture = backend.create_texture().unwrap();
        backend.bind_texture(Some(texture));
        backend.tex_storage_2d(glow::RGBA, 2, 2, glow::RGBA, glow::UNSIGNED_BYTE);
        backend.tex_parameter_i32(glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
        assert_eq!(backend.get_error(), glow::OUT_OF_MEMORY);
        assert_eq!(backend.get_error(), glow::NO_ERROR);
    }

    #[test]
    fn display_stays_up_until_last_reference_terminates() {
        let backend = RecordingBackend::new();
        let display = backend.default_display().unwrap();
        backend.initialize(display).unwrap();
        backend.initialize(display).unwrap();

        backend.terminate(display);
        assert_eq!(backend.live().displays, 1);
        assert!(backend
            .choose_configs(display, &ConfigRequest::rgba8_pbuffer())
            .is_ok());

        backend.terminate(display);
        assert!(backend.live().is_empty());
    }

    #[test]
    fn failed_initialize_still_takes_a_display_reference() {
        let backend = RecordingBackend::new();
        backend.fail(Failure::Initialize);
        let display = backend.default_display().unwrap();

        assert!(backend.initialize(display).is_err());
        assert_eq!(backend.live().displays, 1);

        backend.terminate(display);
        assert!(backend.live().is_empty());
    }

    #[test]
    fn framebuffer_of_another_context_is_not_drawn_or_read() {
        let backend = current_backend();
        let texture = backend.create_texture().unwrap();
        backend.bind_texture(Some(texture));
        backend.tex_storage_2d(glow::RGBA, 1, 1, glow::RGBA, glow::UNSIGNED_BYTE);
        let framebuffer = backend.create_framebuffer().unwrap();
        backend.bind_framebuffer(Some(framebuffer));
        backend.framebuffer_texture_2d(glow::COLOR_ATTACHMENT0, Some(texture));

        let display = 1;
        let other_context = backend.create_context(display, 1, 2).unwrap();
        let other_surface = backend.create_pbuffer_surface(display, 1, 1, 1).unwrap();
        backend.make_current(display, other_surface, other_context).unwrap();
        assert!(backend.is_current(other_context));

        backend.bind_framebuffer(Some(framebuffer));
        backend.fill([9, 9, 9, 9]);
        let mut pixels = vec![7u8; 4];
        backend.read_pixels(0, 0, 1, 1, &mut pixels);

        assert_eq!(pixels, [0, 0, 0, 0]);
    }

    #[test]
    fn drawing_without_a_context_reaches_nothing() {
        let backend = current_backend();
        let texture = backend.create_texture().unwrap();
        backend.bind_texture(Some(texture));
        backend.tex_storage_2d(glow::RGBA, 1, 1, glow::RGBA, glow::UNSIGNED_BYTE);
        let framebuffer = backend.create_framebuffer().unwrap();
        backend.bind_framebuffer(Some(framebuffer));
        backend.framebuffer_texture_2d(glow::COLOR_ATTACHMENT0, Some(texture));
        backend.release_current(1);

        backend.fill([9, 9, 9, 9]);
        assert_eq!(backend.calls_without_context(), 1);
        assert!(!backend.has_current_context());
    }
}
