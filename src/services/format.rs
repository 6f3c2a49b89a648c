//! Output format handling service
//!
//! This module keeps format-specific encoding rules apart from the pipeline
//! stages: which formats keep alpha, how alpha is dropped for JPEG, and the
//! quality each lossy encoder runs at.

use crate::{
    config::OutputFormat,
    error::{PipelineError, Result},
};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat};
use std::{borrow::Cow, io::Cursor};

/// Default quality for lossy encoders
pub const DEFAULT_QUALITY: u8 = 95;

/// Encoded bytes together with their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub format: OutputFormat,
}

/// Service for encoding images into the supported output formats
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode `image` as `format` at the default quality
    ///
    /// # Errors
    /// - Underlying codec failures
    ///
    /// # Examples
    /// ```rust
    /// use imgly_bgtransform::{services::OutputFormatHandler, OutputFormat};
    /// use image::DynamicImage;
    ///
    /// let image = DynamicImage::new_rgba8(4, 4);
    /// let encoded = OutputFormatHandler::encode(&image, OutputFormat::Jpeg)?;
    /// assert_eq!(encoded.content_type, "image/jpeg");
    /// # Ok::<(), imgly_bgtransform::PipelineError>(())
    /// ```
    pub fn encode(image: &DynamicImage, format: OutputFormat) -> Result<EncodedImage> {
        Self::encode_with_quality(image, format, DEFAULT_QUALITY)
    }

    /// Encode `image` as `format`, using `quality` for lossy formats
    ///
    /// JPEG discards alpha without blending it onto any color. PNG and WebP
    /// keep alpha when present.
    ///
    /// # Errors
    /// - Underlying codec failures
    pub fn encode_with_quality(
        image: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<EncodedImage> {
        let quality = quality.min(100);
        if image.color().has_alpha() && !Self::supports_transparency(format) {
            log::debug!("Dropping alpha channel for {format} output");
        }
        let bytes = match format {
            OutputFormat::Png => Self::encode_png(image)?,
            OutputFormat::Jpeg => Self::encode_jpeg(image, quality)?,
            OutputFormat::WebP => Self::encode_webp(image, quality)?,
        };

        Ok(EncodedImage {
            bytes,
            content_type: format.content_type(),
            format,
        })
    }

    /// Check if a format supports transparency (alpha channel)
    ///
    /// # Examples
    /// ```rust
    /// use imgly_bgtransform::{services::OutputFormatHandler, OutputFormat};
    ///
    /// assert!(OutputFormatHandler::supports_transparency(OutputFormat::Png));
    /// assert!(!OutputFormatHandler::supports_transparency(OutputFormat::Jpeg));
    /// ```
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png | OutputFormat::WebP => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// Get the appropriate file extension for a given output format
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
        }
    }

    /// Drop the alpha channel, if any, without compositing
    #[must_use]
    pub fn strip_alpha(image: &DynamicImage) -> Cow<'_, DynamicImage> {
        if image.color().has_alpha() {
            Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8()))
        } else {
            Cow::Borrowed(image)
        }
    }

    fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        // 16-bit and float buffers are narrowed to 8 bits per channel
        let image = Self::to_8bit(image);
        image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        Ok(buffer)
    }

    fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb_image = Self::strip_alpha(image).into_owned().into_rgb8();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder.encode_image(&rgb_image)?;
        Ok(buffer)
    }

    fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let quality = f32::from(quality);
        let encoded = if image.color().has_alpha() {
            let rgba_image = image.to_rgba8();
            let encoder =
                webp::Encoder::from_rgba(&rgba_image, rgba_image.width(), rgba_image.height());
            let memory = encoder.encode_simple(false, quality);
            memory.map(|m| m.to_vec())
        } else {
            let rgb_image = image.to_rgb8();
            let encoder = webp::Encoder::from_rgb(&rgb_image, rgb_image.width(), rgb_image.height());
            let memory = encoder.encode_simple(false, quality);
            memory.map(|m| m.to_vec())
        };

        encoded.map_err(|e| PipelineError::stage("encode", format!("WebP encoding failed: {e:?}")))
    }

    fn to_8bit(image: &DynamicImage) -> DynamicImage {
        match image {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_) => image.clone(),
            other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn translucent(width: u32, height: u32) -> DynamicImage {
        let mut image = RgbaImage::new(width, height);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 30) as u8, (y * 30) as u8, 200, if x % 2 == 0 { 0 } else { 255 }]);
        }
        DynamicImage::ImageRgba8(image)
    }

    #[test]
    fn test_png_roundtrip_is_lossless() {
        let image = translucent(6, 5);
        let encoded = OutputFormatHandler::encode(&image, OutputFormat::Png).unwrap();
        assert_eq!(encoded.content_type, "image/png");

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(decoded.to_rgba8(), image.to_rgba8());
    }

    #[test]
    fn test_jpeg_output_has_no_alpha() {
        let image = translucent(8, 8);
        let encoded = OutputFormatHandler::encode(&image, OutputFormat::Jpeg).unwrap();
        assert_eq!(encoded.content_type, "image/jpeg");

        let decoded = image::load_from_memory_with_format(&encoded.bytes, ImageFormat::Jpeg)
            .unwrap();
        assert!(!decoded.color().has_alpha());
        assert_eq!(decoded.dimensions(), (8, 8));
    }

    #[test]
    fn test_webp_output_signature() {
        let image = translucent(4, 4);
        let encoded = OutputFormatHandler::encode(&image, OutputFormat::WebP).unwrap();
        assert_eq!(encoded.content_type, "image/webp");
        assert_eq!(encoded.bytes.get(0..4), Some(&b"RIFF"[..]));
        assert_eq!(encoded.bytes.get(8..12), Some(&b"WEBP"[..]));
    }

    #[test]
    fn test_webp_without_alpha() {
        let image = DynamicImage::new_rgb8(4, 4);
        let encoded = OutputFormatHandler::encode(&image, OutputFormat::WebP).unwrap();
        assert!(!encoded.bytes.is_empty());
    }

    #[test]
    fn test_strip_alpha_does_not_blend() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 0])));
        let stripped = OutputFormatHandler::strip_alpha(&image);
        assert!(!stripped.color().has_alpha());
        assert_eq!(stripped.to_rgb8().get_pixel(0, 0).0, [10, 20, 30]);

        let opaque = DynamicImage::new_rgb8(2, 2);
        assert!(matches!(OutputFormatHandler::strip_alpha(&opaque), Cow::Borrowed(_)));
    }

    #[test]
    fn test_jpeg_keeps_hidden_color_under_transparency() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 0])));
        let encoded = OutputFormatHandler::encode(&image, OutputFormat::Jpeg).unwrap();
        let pixel = image::load_from_memory(&encoded.bytes).unwrap().to_rgb8().get_pixel(4, 4).0;
        assert!(pixel[2] > 200 && pixel[0] < 50, "unexpected pixel {pixel:?}");
    }

    #[test]
    fn test_png_narrows_wide_buffers() {
        let image = DynamicImage::new_rgba32f(2, 2);
        let encoded = OutputFormatHandler::encode(&image, OutputFormat::Png).unwrap();
        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn test_get_extension() {
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::WebP), "webp");
    }

    #[test]
    fn test_supports_transparency() {
        assert!(OutputFormatHandler::supports_transparency(OutputFormat::Png));
        assert!(OutputFormatHandler::supports_transparency(OutputFormat::WebP));
        assert!(!OutputFormatHandler::supports_transparency(OutputFormat::Jpeg));
    }
}
