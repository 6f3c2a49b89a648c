//! Shared fixtures for integration tests
//!
//! Images are generated in memory so the tests need no binary assets.

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use imgly_bgtransform::{ImagePipeline, OpaqueAlphaRemover, PipelineConfig};
use std::io::Cursor;
use std::sync::Arc;

/// Left half opaque red, right half fully transparent
pub fn half_transparent(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 0])
        }
    }))
}

/// Opaque horizontal gradient
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    }))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("fixture encoding");
    bytes
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    encode(image, ImageFormat::Png)
}

/// Route library `log` output to the test harness (honors `RUST_LOG`)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Pipeline with the opaque-alpha remover and default configuration
pub fn basic_pipeline() -> ImagePipeline {
    init_logging();
    ImagePipeline::new(Arc::new(OpaqueAlphaRemover), PipelineConfig::default())
}
