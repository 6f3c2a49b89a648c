#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # IMG.LY Background Transform Library
//!
//! An image transformation pipeline: optional background removal, aspect-fit
//! resizing, compositing onto a solid color and re-encoding as PNG, JPEG or
//! WebP.
//!
//! ## Features
//!
//! - **Background Removal**: ONNX segmentation models run with Tract (pure Rust),
//!   degrading to an opaque alpha channel when no model is available
//! - **Aspect-Fit Resize**: bounded-fit or single-side scaling with Lanczos3 resampling
//! - **Color Compositing**: `transparent`, `#RRGGBB`, `rgb(r, g, b)` and `r,g,b` colors
//! - **Format Encoding**: PNG and WebP keep alpha, JPEG drops it
//! - **Request Boundary**: upload or URL input, status and health bodies
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgly_bgtransform::{ImagePipeline, PipelineConfig, TransformOptions};
//!
//! # fn example(upload: &[u8]) -> imgly_bgtransform::Result<()> {
//! let pipeline = ImagePipeline::from_config(PipelineConfig::default());
//! let options = TransformOptions::from_request(Some(200), Some(200), Some("#FFFFFF"), Some("jpeg"));
//!
//! let result = pipeline.process(upload, &options)?;
//! assert_eq!(result.content_type, "image/jpeg");
//! result.save("output.jpg")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Request Boundary
//!
//! ```rust,no_run
//! use imgly_bgtransform::{ImageService, PipelineConfig, ProcessRequest};
//!
//! # async fn example() -> imgly_bgtransform::Result<()> {
//! let service = ImageService::from_config(PipelineConfig::default().apply_env_overrides()?)?;
//! let request = ProcessRequest::from_url("https://example.com/cat.png")
//!     .width(512)
//!     .format("webp");
//!
//! match service.handle(request).await {
//!     Ok(result) => println!("{} bytes of {}", result.bytes.len(), result.content_type),
//!     Err(e) => eprintln!("{} {}", e.status_code(), e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): model-backed background removal
//! - `cli` (default): command-line interface, implies `tracing-init`
//! - `tracing-init`: tracing subscriber setup (`init_library_tracing`, `TracingConfig`)
//! - `webp-support` (default): WebP input decoding
//! - `tracing-json`: JSON log output for the CLI

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod composite;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod remover;
pub mod resize;
pub mod service;
pub mod services;
#[cfg(feature = "tracing-init")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
#[cfg(feature = "tract")]
pub use backends::TractRemover;
pub use composite::AlphaCompositor;
pub use config::{OutputFormat, PipelineConfig, PipelineConfigBuilder};
pub use error::{ErrorKind, ErrorResponse, PipelineError, Result};
pub use pipeline::{ImagePipeline, PipelineStage, TransformOptions};
pub use remover::{select_remover, BackgroundRemover, Capabilities, OpaqueAlphaRemover};
pub use resize::{AspectFitResizer, DimensionsRequest};
pub use service::{HealthReport, ImageService, ImageSource, ProcessRequest, ServiceStatus};
pub use services::{EncodedImage, HttpFetcher, ImageFetcher, OutputFormatHandler};
pub use types::{PipelineResult, SegmentationMask, StageTimings};
pub use utils::{BackgroundColor, ColorParser, RgbColor};

#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;
#[cfg(feature = "tracing-init")]
pub use tracing_config::{init_library_tracing, spans, TracingConfig, TracingFormat};

/// Transform an image provided as bytes
///
/// Selects the background remover for `config` on every call; long-lived
/// callers should build one [`ImagePipeline`] and reuse it.
///
/// # Examples
/// ```rust,no_run
/// use imgly_bgtransform::{process_bytes, PipelineConfig, TransformOptions};
///
/// # fn example(upload: Vec<u8>) -> imgly_bgtransform::Result<()> {
/// let options = TransformOptions::from_request(Some(100), None, None, Some("png"));
/// let result = process_bytes(&upload, &options, &PipelineConfig::default())?;
/// assert!(result.dimensions.0 <= 100);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - Undecodable input
/// - Failure in any pipeline stage
pub fn process_bytes(
    bytes: &[u8],
    options: &TransformOptions,
    config: &PipelineConfig,
) -> Result<PipelineResult> {
    ImagePipeline::from_config(config.clone()).process(bytes, options)
}
