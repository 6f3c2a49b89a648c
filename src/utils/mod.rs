//! Shared utilities
//!
//! - [`color`]: background color specification parsing
//! - [`preprocessing`]: segmentation model input preparation

pub mod color;
pub mod preprocessing;

pub use color::{BackgroundColor, ColorParser, RgbColor};
pub use preprocessing::{Letterbox, PreprocessingConfig, SegmentationPreprocessor};
