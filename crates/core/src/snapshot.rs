//! PNG output of a read-back bitmap.
//!
//! This module is feature-gated behind `png` (default on) so that consumers
//! that only need the pixels in memory do not pull in the PNG encoder.

use std::path::Path;

use image::RgbaImage;

use crate::error::OffscreenError;

/// Writes `bitmap` to `path` as a PNG image.
///
/// Returns `OffscreenError::Io` on encode or write failure.
pub fn write_png(bitmap: &RgbaImage, path: &Path) -> Result<(), OffscreenError> {
    bitmap
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| OffscreenError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn write_png_round_trip() {
        let bitmap = RgbaImage::from_pixel(16, 8, Rgba([255, 0, 0, 255]));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readback.png");

        write_png(&bitmap, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (16, 8));
        assert_eq!(*img.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn write_png_into_missing_directory_is_io_error() {
        let bitmap = RgbaImage::new(1, 1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");

        let err = write_png(&bitmap, &path).unwrap_err();

        assert!(matches!(err, OffscreenError::Io(_)), "got {err:?}");
    }
}
