//! Transformation pipeline orchestrator
//!
//! Runs the fixed stage sequence
//! `Decoded -> BackgroundRemoved -> Resized -> Composited -> Encoded`.
//! Stages never retry and never branch back; the first failure ends the
//! invocation and no partial output is produced.

use crate::{
    composite::AlphaCompositor,
    config::{OutputFormat, PipelineConfig},
    error::{PipelineError, Result},
    remover::{BackgroundRemover, Capabilities},
    resize::{AspectFitResizer, DimensionsRequest},
    services::{OutputFormatHandler, DEFAULT_QUALITY},
    types::{PipelineResult, StageTimings},
    utils::{BackgroundColor, ColorParser},
};
use image::{DynamicImage, GenericImageView};
use instant::Instant;
use std::sync::Arc;
use tracing::{span, Level};

/// Stages of one pipeline invocation, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Decoded,
    BackgroundRemoved,
    Resized,
    Composited,
    Encoded,
}

impl PipelineStage {
    /// All stages in the order they run
    pub const ALL: [Self; 5] = [
        Self::Decoded,
        Self::BackgroundRemoved,
        Self::Resized,
        Self::Composited,
        Self::Encoded,
    ];

    /// Name used in spans and stage errors
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Decoded => "decode",
            Self::BackgroundRemoved => "background_removal",
            Self::Resized => "resize",
            Self::Composited => "composite",
            Self::Encoded => "encode",
        }
    }

    /// Stage that follows this one, if any
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Decoded => Some(Self::BackgroundRemoved),
            Self::BackgroundRemoved => Some(Self::Resized),
            Self::Resized => Some(Self::Composited),
            Self::Composited => Some(Self::Encoded),
            Self::Encoded => None,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request transformation parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    pub dimensions: DimensionsRequest,
    pub background_color: BackgroundColor,
    pub format: OutputFormat,
}

impl TransformOptions {
    /// Resolve raw request values
    ///
    /// The color specification goes through [`ColorParser`], so malformed
    /// colors fall back to white instead of failing. The format name goes
    /// through [`OutputFormat::from_name`].
    #[must_use]
    pub fn from_request(
        width: Option<u32>,
        height: Option<u32>,
        background_color: Option<&str>,
        format: Option<&str>,
    ) -> Self {
        Self {
            dimensions: DimensionsRequest::new(width, height),
            background_color: ColorParser::parse(background_color),
            format: format.map(OutputFormat::from_name).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: DimensionsRequest) -> Self {
        self.dimensions = dimensions;
        self
    }

    #[must_use]
    pub fn with_background(mut self, color: BackgroundColor) -> Self {
        self.background_color = color;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// Orchestrates decode, background removal, resize, composite and encode
///
/// Holds no per-request state, so one instance can serve concurrent
/// invocations behind an `Arc`.
pub struct ImagePipeline {
    remover: Arc<dyn BackgroundRemover>,
    config: PipelineConfig,
}

impl std::fmt::Debug for ImagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePipeline")
            .field("remover", &self.remover.name())
            .field("config", &self.config)
            .finish()
    }
}

impl ImagePipeline {
    #[must_use]
    pub fn new(remover: Arc<dyn BackgroundRemover>, config: PipelineConfig) -> Self {
        Self { remover, config }
    }

    /// Build a pipeline with the remover selected for `config`
    #[must_use]
    pub fn from_config(config: PipelineConfig) -> Self {
        let remover = crate::remover::select_remover(&config);
        Self::new(remover, config)
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn remover(&self) -> &dyn BackgroundRemover {
        self.remover.as_ref()
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::of(self.remover.as_ref())
    }

    /// Run every stage on encoded input bytes
    ///
    /// # Errors
    /// - Bytes that are not a decodable image
    /// - Failure in background removal, resize, composite or encode
    pub fn process(&self, bytes: &[u8], options: &TransformOptions) -> Result<PipelineResult> {
        let total_start = Instant::now();
        let mut timings = StageTimings::default();

        let image = {
            let _span = span!(Level::DEBUG, "decode", bytes = bytes.len()).entered();
            let start = Instant::now();
            let image = Self::decode(bytes)?;
            timings.decode_ms = elapsed_ms(start);
            image
        };

        self.run_stages(image, options, timings, total_start)
    }

    /// Run the stages after decoding on an in-memory image
    ///
    /// # Errors
    /// - Failure in background removal, resize, composite or encode
    pub fn process_image(
        &self,
        image: DynamicImage,
        options: &TransformOptions,
    ) -> Result<PipelineResult> {
        self.run_stages(image, options, StageTimings::default(), Instant::now())
    }

    /// Decode input bytes, sniffing the format from its content
    ///
    /// # Errors
    /// - Empty or undecodable input
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(PipelineError::decode("Input is empty"));
        }
        image::load_from_memory(bytes)
            .map_err(|e| PipelineError::decode(format!("Failed to decode image from bytes: {e}")))
    }

    fn run_stages(
        &self,
        image: DynamicImage,
        options: &TransformOptions,
        mut timings: StageTimings,
        total_start: Instant,
    ) -> Result<PipelineResult> {
        let (width, height) = image.dimensions();
        let _pipeline_span = span!(
            Level::INFO,
            "pipeline",
            remover = %self.remover.name(),
            width,
            height,
            format = %options.format
        )
        .entered();

        let image = {
            let stage = PipelineStage::BackgroundRemoved;
            let _span = span!(Level::DEBUG, "background_removal", remover = %self.remover.name())
                .entered();
            let start = Instant::now();
            let image = self
                .remover
                .remove_background(&image)
                .map_err(|e| in_stage(stage, e))?;
            timings.background_removal_ms = elapsed_ms(start);
            image
        };

        let image = {
            let _span = span!(
                Level::DEBUG,
                "resize",
                width = ?options.dimensions.width,
                height = ?options.dimensions.height
            )
            .entered();
            let start = Instant::now();
            let image = AspectFitResizer::resize_with_limit(
                image,
                options.dimensions,
                self.config.max_output_pixels,
            )
            .map_err(|e| in_stage(PipelineStage::Resized, e))?;
            timings.resize_ms = elapsed_ms(start);
            image
        };

        let image = {
            let _span = span!(
                Level::DEBUG,
                "composite",
                transparent = options.background_color.is_transparent()
            )
            .entered();
            let start = Instant::now();
            let image = AlphaCompositor::composite(image, &options.background_color);
            timings.composite_ms = elapsed_ms(start);
            image
        };

        let dimensions = image.dimensions();
        let encoded = {
            let _span = span!(Level::DEBUG, "encode", format = %options.format).entered();
            let start = Instant::now();
            let quality = self
                .config
                .quality_for(options.format)
                .unwrap_or(DEFAULT_QUALITY);
            let encoded = OutputFormatHandler::encode_with_quality(&image, options.format, quality)
                .map_err(|e| in_stage(PipelineStage::Encoded, e))?;
            timings.encode_ms = elapsed_ms(start);
            encoded
        };

        timings.total_ms = elapsed_ms(total_start);
        tracing::info!(
            output_width = dimensions.0,
            output_height = dimensions.1,
            bytes = encoded.bytes.len(),
            total_ms = timings.total_ms,
            "Image transformed"
        );

        Ok(PipelineResult {
            bytes: encoded.bytes,
            content_type: encoded.content_type,
            format: encoded.format,
            dimensions,
            timings,
        })
    }
}

/// Attach the failing stage to codec and I/O errors
///
/// Errors that already carry a classification pass through unchanged.
fn in_stage(stage: PipelineStage, error: PipelineError) -> PipelineError {
    match error {
        PipelineError::Image(e) => PipelineError::stage(stage.as_str(), e.to_string()),
        PipelineError::Io(e) => PipelineError::stage(stage.as_str(), e.to_string()),
        other => other,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remover::OpaqueAlphaRemover;
    use crate::utils::RgbColor;
    use image::{Rgba, RgbaImage};

    struct FailingRemover;

    impl BackgroundRemover for FailingRemover {
        fn name(&self) -> &str {
            "failing"
        }

        fn is_model_backed(&self) -> bool {
            true
        }

        fn remove_background(&self, _image: &DynamicImage) -> Result<DynamicImage> {
            Err(PipelineError::model("inference exploded"))
        }
    }

    fn pipeline() -> ImagePipeline {
        ImagePipeline::new(Arc::new(OpaqueAlphaRemover), PipelineConfig::default())
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([10, 20, 30, 255]),
        ));
        OutputFormatHandler::encode(&image, OutputFormat::Png)
            .unwrap()
            .bytes
    }

    #[test]
    fn test_stage_order() {
        let mut stage = PipelineStage::Decoded;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, PipelineStage::ALL);
    }

    #[test]
    fn test_defaults_keep_dimensions_and_png() {
        let result = pipeline()
            .process(&png_bytes(12, 7), &TransformOptions::default())
            .unwrap();

        assert_eq!(result.dimensions, (12, 7));
        assert_eq!(result.content_type, "image/png");
        assert_eq!(result.format, OutputFormat::Png);
    }

    #[test]
    fn test_options_from_request() {
        let options = TransformOptions::from_request(Some(0), Some(50), Some("255,0,0"), Some("JPG"));

        assert_eq!(options.dimensions, DimensionsRequest::height(50));
        assert_eq!(
            options.background_color,
            BackgroundColor::Solid(RgbColor::new(255, 0, 0))
        );
        assert_eq!(options.format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_resize_and_composite() {
        let options = TransformOptions::from_request(Some(6), Some(6), Some("#00FF00"), Some("png"));
        let result = pipeline().process(&png_bytes(12, 4), &options).unwrap();
        assert_eq!(result.dimensions, (6, 2));

        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_undecodable_input() {
        let result = pipeline().process(b"definitely not an image", &TransformOptions::default());
        assert!(matches!(result, Err(PipelineError::Decode(_))));

        let result = pipeline().process(&[], &TransformOptions::default());
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_remover_failure_propagates() {
        let pipeline = ImagePipeline::new(Arc::new(FailingRemover), PipelineConfig::default());
        let result = pipeline.process(&png_bytes(4, 4), &TransformOptions::default());

        let error = result.unwrap_err();
        assert!(matches!(error, PipelineError::Model(_)));
        assert_eq!(error.status_code(), 500);
    }

    #[test]
    fn test_capabilities() {
        assert!(!pipeline().capabilities().background_removal);
    }

    #[test]
    fn test_codec_error_gets_stage() {
        let error = in_stage(
            PipelineStage::Encoded,
            PipelineError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")),
        );
        assert!(matches!(error, PipelineError::Stage { ref stage, .. } if stage == "encode"));
    }
}
