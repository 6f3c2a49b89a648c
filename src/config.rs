//! Configuration types for the transformation pipeline

use crate::error::{PipelineError, Result};
use crate::resize::DEFAULT_MAX_OUTPUT_PIXELS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`PipelineConfig::model_path`]
pub const ENV_MODEL_PATH: &str = "BGTRANSFORM_MODEL_PATH";
/// Environment variable overriding [`PipelineConfig::environment`]
pub const ENV_ENVIRONMENT: &str = "BGTRANSFORM_ENV";
/// Environment variable overriding [`PipelineConfig::fetch_timeout_secs`]
pub const ENV_FETCH_TIMEOUT: &str = "BGTRANSFORM_FETCH_TIMEOUT_SECS";

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with lossless alpha channel transparency
    #[default]
    Png,
    /// JPEG (no transparency, alpha discarded)
    Jpeg,
    /// Lossy WebP with alpha channel transparency
    WebP,
}

impl OutputFormat {
    /// Resolve a requested format name
    ///
    /// Matching is case-insensitive; `jpg` is an alias of `jpeg` and any
    /// unrecognized name selects PNG.
    ///
    /// # Examples
    /// ```rust
    /// use imgly_bgtransform::OutputFormat;
    ///
    /// assert_eq!(OutputFormat::from_name("JPG"), OutputFormat::Jpeg);
    /// assert_eq!(OutputFormat::from_name("webp"), OutputFormat::WebP);
    /// assert_eq!(OutputFormat::from_name("gif"), OutputFormat::Png);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::WebP,
            _ => Self::Png,
        }
    }

    /// MIME type of the encoded output
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
            Self::WebP => write!(f, "webp"),
        }
    }
}

/// Configuration for the transformation pipeline and its collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// ONNX segmentation model; `None` selects the opaque-alpha remover
    pub model_path: Option<PathBuf>,

    /// Square input edge expected by the segmentation model
    pub model_input_size: u32,

    /// Per-channel mean subtracted after scaling pixels to 0-1
    pub normalization_mean: [f32; 3],

    /// Per-channel standard deviation divided after mean subtraction
    pub normalization_std: [f32; 3],

    /// JPEG quality (0-100)
    pub jpeg_quality: u8,

    /// WebP quality (0-100)
    pub webp_quality: u8,

    /// Upper bound for remote image fetches, in seconds
    pub fetch_timeout_secs: u64,

    /// Largest resize target accepted, as `width * height`
    pub max_output_pixels: u64,

    /// Deployment environment name reported by the status surface
    pub environment: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model_input_size: 1024,
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
            jpeg_quality: 95,
            webp_quality: 95,
            fetch_timeout_secs: 60,
            max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
            environment: "local".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use imgly_bgtransform::PipelineConfig;
    ///
    /// let config = PipelineConfig::builder()
    ///     .jpeg_quality(80)
    ///     .fetch_timeout_secs(10)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.jpeg_quality, 80);
    /// ```
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    /// - File cannot be read
    /// - File is not valid JSON for this structure
    /// - Loaded values fail [`PipelineConfig::validate`]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PipelineError::invalid_config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BGTRANSFORM_*` environment variable overrides
    ///
    /// # Errors
    /// - Timeout override that is not an unsigned integer
    pub fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(path) = std::env::var(ENV_MODEL_PATH) {
            if !path.trim().is_empty() {
                self.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(environment) = std::env::var(ENV_ENVIRONMENT) {
            if !environment.trim().is_empty() {
                self.environment = environment;
            }
        }
        if let Ok(timeout) = std::env::var(ENV_FETCH_TIMEOUT) {
            self.fetch_timeout_secs = timeout.trim().parse().map_err(|_| {
                PipelineError::invalid_config(format!(
                    "{ENV_FETCH_TIMEOUT} must be a whole number of seconds, got '{timeout}'"
                ))
            })?;
        }
        Ok(self)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Quality values above 100
    /// - Zero fetch timeout, model input size or output pixel limit
    /// - Non-positive normalization standard deviation
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality > 100 {
            return Err(PipelineError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "0-100",
                Some(95),
            ));
        }
        if self.webp_quality > 100 {
            return Err(PipelineError::config_value_error(
                "WebP quality",
                self.webp_quality,
                "0-100",
                Some(95),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(PipelineError::config_value_error(
                "fetch timeout",
                self.fetch_timeout_secs,
                "1 or more seconds",
                Some(60),
            ));
        }
        if self.model_input_size == 0 {
            return Err(PipelineError::config_value_error(
                "model input size",
                self.model_input_size,
                "1 or more pixels",
                Some(1024),
            ));
        }
        if self.max_output_pixels == 0 {
            return Err(PipelineError::config_value_error(
                "max output pixels",
                self.max_output_pixels,
                "1 or more pixels",
                Some(DEFAULT_MAX_OUTPUT_PIXELS),
            ));
        }
        if self.normalization_std.iter().any(|s| *s <= 0.0 || !s.is_finite()) {
            return Err(PipelineError::invalid_config(
                "Normalization std components must be positive",
            ));
        }
        Ok(())
    }

    /// Encoding quality for lossy formats
    #[must_use]
    pub fn quality_for(&self, format: OutputFormat) -> Option<u8> {
        match format {
            OutputFormat::Jpeg => Some(self.jpeg_quality),
            OutputFormat::WebP => Some(self.webp_quality),
            OutputFormat::Png => None,
        }
    }
}

/// Builder for [`PipelineConfig`]
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn model_input_size(mut self, size: u32) -> Self {
        self.config.model_input_size = size;
        self
    }

    #[must_use]
    pub fn normalization(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.config.normalization_mean = mean;
        self.config.normalization_std = std;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.min(100);
        self
    }

    #[must_use]
    pub fn webp_quality(mut self, quality: u8) -> Self {
        self.config.webp_quality = quality.min(100);
        self
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn max_output_pixels(mut self, pixels: u64) -> Self {
        self.config.max_output_pixels = pixels;
        self
    }

    #[must_use]
    pub fn environment<S: Into<String>>(mut self, environment: S) -> Self {
        self.config.environment = environment.into();
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Any rule checked by [`PipelineConfig::validate`]
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_names_case_insensitive() {
        assert_eq!(OutputFormat::from_name("PNG"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_name("Jpeg"), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_name("JPG"), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_name("WebP"), OutputFormat::WebP);
        assert_eq!(OutputFormat::from_name(""), OutputFormat::Png);
        assert_eq!(OutputFormat::from_name("tiff"), OutputFormat::Png);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(OutputFormat::Png.content_type(), "image/png");
        assert_eq!(OutputFormat::Jpeg.content_type(), "image/jpeg");
        assert_eq!(OutputFormat::WebP.content_type(), "image/webp");
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.jpeg_quality, 95);
        assert_eq!(config.webp_quality, 95);
        assert_eq!(config.fetch_timeout_secs, 60);
        assert!(config.model_path.is_none());
        assert_eq!(config.max_output_pixels, DEFAULT_MAX_OUTPUT_PIXELS);
    }

    #[test]
    fn test_builder_clamps_quality() {
        let config = PipelineConfig::builder()
            .jpeg_quality(150)
            .webp_quality(200)
            .build()
            .unwrap();
        assert_eq!(config.jpeg_quality, 100);
        assert_eq!(config.webp_quality, 100);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = PipelineConfig::default();
        config.jpeg_quality = 101;
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("JPEG quality"));
        assert!(error.to_string().contains("101"));

        assert!(PipelineConfig::builder().fetch_timeout_secs(0).build().is_err());
        assert!(PipelineConfig::builder().model_input_size(0).build().is_err());
        assert!(PipelineConfig::builder().max_output_pixels(0).build().is_err());
        assert!(PipelineConfig::builder()
            .normalization([0.5; 3], [1.0, 0.0, 1.0])
            .build()
            .is_err());
    }

    #[test]
    fn test_quality_for_format() {
        let config = PipelineConfig::builder()
            .jpeg_quality(80)
            .webp_quality(70)
            .build()
            .unwrap();
        assert_eq!(config.quality_for(OutputFormat::Jpeg), Some(80));
        assert_eq!(config.quality_for(OutputFormat::WebP), Some(70));
        assert_eq!(config.quality_for(OutputFormat::Png), None);
    }

    #[test]
    fn test_from_json_file_with_partial_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"jpeg_quality": 90, "environment": "production"}}"#).unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.environment, "production");
        assert_eq!(config.webp_quality, 95);
    }

    #[test]
    fn test_from_json_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let error = PipelineConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(error, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn test_serde_roundtrip_format() {
        let json = serde_json::to_string(&OutputFormat::WebP).unwrap();
        assert_eq!(json, "\"webp\"");
    }
}
