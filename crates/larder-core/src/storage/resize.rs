//! Pre-upload image resize for item attachments.

use std::io::Cursor;

use image::{imageops::FilterType, GenericImageView, ImageFormat};

use crate::{Error, Result};

/// Target width for uploaded item images.
pub const UPLOAD_TARGET_WIDTH: u32 = 800;

/// Resized (or passed-through) upload payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// MIME type matching the (unchanged) source format.
    pub content_type: &'static str,
}

/// Downscale an image to [`UPLOAD_TARGET_WIDTH`] before upload.
///
/// Aspect ratio is preserved and the source encoding is kept. Images at or
/// below the target width pass through with their original bytes; narrower
/// sources are never upscaled.
pub fn resize_for_upload(source_bytes: &[u8]) -> Result<ResizedImage> {
    if source_bytes.is_empty() {
        return Err(Error::InvalidInput(
            "Image source bytes cannot be empty".to_string(),
        ));
    }

    let format = image::guess_format(source_bytes).map_err(|error| {
        Error::InvalidInput(format!("Unrecognized image format for upload: {error}"))
    })?;

    let source = image::load_from_memory_with_format(source_bytes, format).map_err(|error| {
        Error::InvalidInput(format!("Failed to decode image for upload: {error}"))
    })?;

    let (source_width, source_height) = source.dimensions();
    if source_width <= UPLOAD_TARGET_WIDTH {
        return Ok(ResizedImage {
            bytes: source_bytes.to_vec(),
            width: source_width,
            height: source_height,
            content_type: format.to_mime_type(),
        });
    }

    let target_height = scaled_height(source_width, source_height);
    let resized = source.resize_exact(UPLOAD_TARGET_WIDTH, target_height, FilterType::Lanczos3);
    let bytes = encode(&resized, format)?;

    Ok(ResizedImage {
        bytes,
        width: UPLOAD_TARGET_WIDTH,
        height: target_height,
        content_type: format.to_mime_type(),
    })
}

/// Height that keeps the source aspect ratio at the target width.
fn scaled_height(source_width: u32, source_height: u32) -> u32 {
    let scaled =
        (u64::from(source_height) * u64::from(UPLOAD_TARGET_WIDTH)) / u64::from(source_width);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

fn encode(image: &image::DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, format)
        .map_err(|error| Error::InvalidInput(format!("Failed to encode resized image: {error}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn source_png(width: u32, height: u32) -> Vec<u8> {
        let image = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_fn(width, height, |_x, _y| {
            Rgba([40, 180, 90, 255])
        });

        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn resize_bounds_width_and_preserves_ratio() {
        let source = source_png(1600, 1200);
        let result = resize_for_upload(&source).unwrap();

        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);
        assert_eq!(result.content_type, "image/png");
        assert!(!result.bytes.is_empty());
    }

    #[test]
    fn resize_passes_small_images_through_unchanged() {
        let source = source_png(400, 300);
        let result = resize_for_upload(&source).unwrap();

        assert_eq!(result.width, 400);
        assert_eq!(result.height, 300);
        assert_eq!(result.bytes, source);
    }

    #[test]
    fn resize_rejects_invalid_source() {
        let err = resize_for_upload(b"not-an-image").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = resize_for_upload(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
