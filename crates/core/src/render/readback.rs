//! Pixel readback from the render target into an [`RgbaImage`].

use image::RgbaImage;
use log::{debug, error};

use super::target::RenderTarget;
use crate::backend::GlBackend;
use crate::error::OffscreenError;

/// How many times the renderer draws before each readback.
///
/// Legacy compatibility: some filter chains only produce their final output
/// on the second frame. The first draw may be stale or partially applied;
/// the second is authoritative.
pub const DRAWS_PER_READBACK: usize = 2;

/// Whether a readback identical to a blank buffer is reported as no image.
///
/// Legacy compatibility: a silently failed GPU path reads back all zeros,
/// which is indistinguishable from "nothing was drawn".
pub const DISCARD_BLANK_READBACK: bool = true;

/// Upper bound on stale error flags drained before a readback.
const MAX_STALE_ERRORS: usize = 8;

/// Reads the full render target as RGBA8, top row first.
///
/// Binds the target, discards error flags left by the renderer, and reads
/// into a freshly allocated image. GL returns rows bottom-up, so the image is
/// flipped to conventional top-down order.
///
/// # Errors
///
/// Returns `OffscreenError::ReadbackFailed` if the backend raises an error
/// during the read.
pub fn read_rgba<G: GlBackend + ?Sized>(
    gl: &G,
    target: &RenderTarget,
) -> Result<RgbaImage, OffscreenError> {
    target.bind(gl);

    for _ in 0..MAX_STALE_ERRORS {
        let stale = gl.get_error();
        if stale == glow::NO_ERROR {
            break;
        }
        debug!("discarding GL error 0x{stale:04X} raised while drawing");
    }

    let mut image = RgbaImage::new(target.width(), target.height());
    gl.read_pixels(0, 0, target.width(), target.height(), &mut image);

    let code = gl.get_error();
    if code != glow::NO_ERROR {
        error!("glReadPixels failed: GL error 0x{code:04X}");
        return Err(OffscreenError::ReadbackFailed { code });
    }

    image::imageops::flip_vertical_in_place(&mut image);
    Ok(image)
}

/// Returns whether `image` is pixel-identical to a blank buffer of the same size.
pub fn is_blank(image: &RgbaImage) -> bool {
    image.as_raw().iter().all(|&byte| byte == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Failure, RecordingBackend};
    use crate::backend::ContextBackend;
    use image::Rgba;

    fn target_on(backend: &RecordingBackend, width: u32, height: u32) -> RenderTarget {
        let display = backend.default_display().unwrap();
        backend.initialize(display).unwrap();
        let context = backend.create_context(display, 1, 2).unwrap();
        let surface = backend
            .create_pbuffer_surface(display, 1, width, height)
            .unwrap();
        backend.make_current(display, surface, context).unwrap();
        RenderTarget::new(backend, width, height).unwrap()
    }

    #[test]
    fn read_rgba_returns_target_sized_image() {
        let backend = RecordingBackend::new();
        let target = target_on(&backend, 5, 3);
        let image = read_rgba(&backend, &target).unwrap();
        assert_eq!(image.dimensions(), (5, 3));
    }

    #[test]
    fn read_rgba_flips_bottom_row_to_last_image_row() {
        let backend = RecordingBackend::new();
        let target = target_on(&backend, 2, 3);
        target.bind(&backend);
        backend.fill_row(0, [0, 0, 255, 255]);

        let image = read_rgba(&backend, &target).unwrap();

        assert_eq!(*image.get_pixel(0, 2), Rgba([0, 0, 255, 255]));
        assert_eq!(*image.get_pixel(1, 2), Rgba([0, 0, 255, 255]));
        assert_eq!(*image.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn read_rgba_ignores_errors_raised_before_the_read() {
        let backend = RecordingBackend::new();
        let target = target_on(&backend, 2, 2);
        // A parameter call with nothing bound raises INVALID_OPERATION.
        backend.tex_parameter_i32(glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);

        assert!(read_rgba(&backend, &target).is_ok());
    }

    #[test]
    fn read_rgba_reports_read_error() {
        let backend = RecordingBackend::new();
        let target = target_on(&backend, 2, 2);
        backend.fail(Failure::ReadbackError(glow::INVALID_OPERATION));

        let err = read_rgba(&backend, &target).unwrap_err();

        assert_eq!(
            err,
            OffscreenError::ReadbackFailed {
                code: glow::INVALID_OPERATION
            }
        );
    }

    #[test]
    fn is_blank_detects_all_zero_image() {
        assert!(is_blank(&RgbaImage::new(4, 4)));
    }

    #[test]
    fn is_blank_rejects_any_nonzero_byte() {
        let mut image = RgbaImage::new(4, 4);
        image.put_pixel(3, 3, Rgba([0, 0, 0, 1]));
        assert!(!is_blank(&image));
    }

    #[test]
    fn opaque_black_is_not_blank() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        assert!(!is_blank(&image));
    }

    #[test]
    fn policy_constants_preserve_legacy_behavior() {
        assert_eq!(DRAWS_PER_READBACK, 2);
        assert!(DISCARD_BLANK_READBACK);
    }
}
