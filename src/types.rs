//! Core types shared across the pipeline stages

use crate::{
    config::OutputFormat,
    error::{PipelineError, Result},
    utils::Letterbox,
};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

/// Foreground mask with one 0-255 alpha value per source pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Map a `1x1xSxS` model output back onto `dimensions` source pixels
    ///
    /// Values are clamped to 0-1 before scaling; pixels that fall outside
    /// the letterboxed area are treated as background.
    ///
    /// # Errors
    /// - Output tensor that is not a single-channel `1x1xHxW` mask
    pub fn from_tensor(
        tensor: &Array4<f32>,
        dimensions: (u32, u32),
        letterbox: &Letterbox,
    ) -> Result<Self> {
        let shape = tensor.shape();
        if shape.first() != Some(&1) || shape.get(1) != Some(&1) {
            return Err(PipelineError::model(format!(
                "Invalid output tensor shape {shape:?}, expected [1, 1, H, W]"
            )));
        }

        let (width, height) = dimensions;
        let mut data = Vec::with_capacity(width as usize * height as usize);

        for y in 0..height {
            for x in 0..width {
                let value = letterbox
                    .to_model(x, y)
                    .and_then(|(mx, my)| tensor.get([0, 0, my, mx]).copied())
                    .unwrap_or(0.0);
                data.push((value.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }

        Ok(Self::new(data, dimensions))
    }

    /// Use the mask as the alpha channel of `image`
    ///
    /// Pixels with zero alpha become fully transparent black.
    ///
    /// # Errors
    /// - Image and mask dimensions differ
    pub fn apply_to(&self, image: &DynamicImage) -> Result<RgbaImage> {
        if image.dimensions() != self.dimensions {
            return Err(PipelineError::stage(
                "background_removal",
                format!(
                    "Image {:?} and mask {:?} dimensions do not match",
                    image.dimensions(),
                    self.dimensions
                ),
            ));
        }

        let mut rgba_image = image.to_rgba8();
        for (pixel, alpha) in rgba_image.pixels_mut().zip(self.data.iter().copied()) {
            *pixel = if alpha > 0 {
                Rgba([pixel[0], pixel[1], pixel[2], alpha])
            } else {
                Rgba([0, 0, 0, 0])
            };
        }

        Ok(rgba_image)
    }
}

/// Per-stage wall clock timings in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub decode_ms: u64,
    pub background_removal_ms: u64,
    pub resize_ms: u64,
    pub composite_ms: u64,
    pub encode_ms: u64,
    pub total_ms: u64,
}

/// Final output of one pipeline invocation
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Complete encoded image
    pub bytes: Vec<u8>,
    /// MIME type matching `format`
    pub content_type: &'static str,
    pub format: OutputFormat,
    /// Output (width, height)
    pub dimensions: (u32, u32),
    pub timings: StageTimings,
}

impl PipelineResult {
    /// Write the encoded bytes to `path`
    ///
    /// # Errors
    /// - File I/O errors
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_from_tensor_identity_letterbox() {
        let mut tensor = Array4::<f32>::zeros((1, 1, 4, 4));
        tensor[[0, 0, 1, 2]] = 1.0;
        tensor[[0, 0, 3, 3]] = 2.5;
        tensor[[0, 0, 0, 0]] = -1.0;

        let letterbox = Letterbox::compute(4, 4, 4).unwrap();
        let mask = SegmentationMask::from_tensor(&tensor, (4, 4), &letterbox).unwrap();

        assert_eq!(mask.data.len(), 16);
        assert_eq!(mask.data[6], 255);
        assert_eq!(mask.data[15], 255);
        assert_eq!(mask.data[0], 0);
    }

    #[test]
    fn test_mask_rejects_multichannel_tensor() {
        let tensor = Array4::<f32>::zeros((1, 3, 4, 4));
        let letterbox = Letterbox::compute(4, 4, 4).unwrap();
        assert!(SegmentationMask::from_tensor(&tensor, (4, 4), &letterbox).is_err());
    }

    #[test]
    fn test_apply_mask() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 1, Rgba([9, 8, 7, 255])));
        let mask = SegmentationMask::new(vec![0, 200], (2, 1));

        let result = mask.apply_to(&image).unwrap();
        assert_eq!(*result.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*result.get_pixel(1, 0), Rgba([9, 8, 7, 200]));
    }

    #[test]
    fn test_apply_mask_dimension_mismatch() {
        let image = DynamicImage::new_rgb8(3, 3);
        let mask = SegmentationMask::new(vec![255; 4], (2, 2));
        assert!(mask.apply_to(&image).is_err());
    }
}
