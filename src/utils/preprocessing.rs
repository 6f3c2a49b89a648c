//! Segmentation model preprocessing
//!
//! Letterboxes an image into the model's square input and normalizes it to
//! an NCHW tensor. [`Letterbox`] records the placement so the output mask
//! can be mapped back onto the source pixels.

use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
};
use image::{imageops::FilterType, DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Normalization and sizing parameters for a segmentation model
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Square input edge in pixels
    pub target_size: u32,
    pub normalization_mean: [f32; 3],
    pub normalization_std: [f32; 3],
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_size: 1024,
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        }
    }
}

impl From<&PipelineConfig> for PreprocessingConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            target_size: config.model_input_size,
            normalization_mean: config.normalization_mean,
            normalization_std: config.normalization_std,
        }
    }
}

/// Placement of the scaled source inside the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Scale factor applied to the source
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub target_size: u32,
}

impl Letterbox {
    /// Compute the placement of a `width x height` source in a `target_size` square
    ///
    /// # Errors
    /// - Zero source dimension
    pub fn compute(width: u32, height: u32, target_size: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PipelineError::stage(
                "preprocessing",
                format!("Image has zero dimension ({width}x{height})"),
            ));
        }

        let target = target_size as f32;
        let scale = (target / width as f32).min(target / height as f32);

        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, target_size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, target_size);

        Ok(Self {
            scale,
            offset_x: (target_size - scaled_width) / 2,
            offset_y: (target_size - scaled_height) / 2,
            scaled_width,
            scaled_height,
            target_size,
        })
    }

    /// Model-space coordinate for a source pixel, if it lies in the mask
    #[must_use]
    pub fn to_model(&self, x: u32, y: u32) -> Option<(usize, usize)> {
        let mx = ((x as f32 * self.scale) as u32).min(self.scaled_width - 1) + self.offset_x;
        let my = ((y as f32 * self.scale) as u32).min(self.scaled_height - 1) + self.offset_y;

        (mx < self.target_size && my < self.target_size).then_some((mx as usize, my as usize))
    }
}

/// Image preprocessing for segmentation inference
pub struct SegmentationPreprocessor;

impl SegmentationPreprocessor {
    /// White padding around the letterboxed image
    pub const PADDING: [u8; 3] = [255, 255, 255];

    /// Preprocess an image for model inference
    ///
    /// This function handles:
    /// - RGB conversion
    /// - Aspect ratio preserving resize
    /// - Center padding to target size
    /// - Normalization to tensor format (NCHW)
    ///
    /// # Errors
    /// - Zero source dimension
    pub fn preprocess(
        image: &DynamicImage,
        config: &PreprocessingConfig,
    ) -> Result<(Array4<f32>, Letterbox)> {
        let rgb_image = image.to_rgb8();
        let (width, height) = rgb_image.dimensions();
        let letterbox = Letterbox::compute(width, height, config.target_size)?;

        let resized = image::imageops::resize(
            &rgb_image,
            letterbox.scaled_width,
            letterbox.scaled_height,
            FilterType::Triangle,
        );

        let mut canvas: RgbImage = ImageBuffer::from_pixel(
            config.target_size,
            config.target_size,
            image::Rgb(Self::PADDING),
        );
        image::imageops::replace(
            &mut canvas,
            &resized,
            i64::from(letterbox.offset_x),
            i64::from(letterbox.offset_y),
        );

        Ok((Self::canvas_to_tensor(&canvas, config), letterbox))
    }

    /// Convert canvas to normalized tensor
    fn canvas_to_tensor(canvas: &RgbImage, config: &PreprocessingConfig) -> Array4<f32> {
        let size = config.target_size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for (x, y, pixel) in canvas.enumerate_pixels() {
            for channel in 0..3 {
                let value = (f32::from(pixel[channel]) / 255.0
                    - config.normalization_mean[channel])
                    / config.normalization_std[channel];
                if let Some(slot) = tensor.get_mut([0, channel, y as usize, x as usize]) {
                    *slot = value;
                }
            }
        }

        tensor
    }
}
