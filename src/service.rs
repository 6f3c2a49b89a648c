//! Request boundary
//!
//! Turns a transport-neutral [`ProcessRequest`] into a [`PipelineResult`] and
//! exposes the status and health bodies operators poll. Any HTTP framing
//! maps errors through [`crate::PipelineError::status_code`].

use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
    pipeline::{ImagePipeline, TransformOptions},
    services::{HttpFetcher, ImageFetcher},
    types::PipelineResult,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

fn default_background_color() -> String {
    "transparent".to_string()
}

fn default_format() -> String {
    "png".to_string()
}

/// One transformation request
///
/// Exactly one of `upload` and `image_url` must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRequest {
    #[serde(default, skip_serializing)]
    pub upload: Option<Vec<u8>>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default = "default_background_color", alias = "backgroundColor")]
    pub background_color: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for ProcessRequest {
    fn default() -> Self {
        Self {
            upload: None,
            image_url: None,
            background_color: default_background_color(),
            width: None,
            height: None,
            format: default_format(),
        }
    }
}

/// Where the input image comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource<'a> {
    Upload(&'a [u8]),
    Url(&'a str),
}

impl ProcessRequest {
    #[must_use]
    pub fn from_upload(bytes: Vec<u8>) -> Self {
        Self {
            upload: Some(bytes),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_url<S: Into<String>>(url: S) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn background_color<S: Into<String>>(mut self, color: S) -> Self {
        self.background_color = color.into();
        self
    }

    #[must_use]
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    #[must_use]
    pub fn format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = format.into();
        self
    }

    /// Resolve the single input source
    ///
    /// Empty uploads and blank URLs count as absent.
    ///
    /// # Errors
    /// - Neither or both sources present
    pub fn source(&self) -> Result<ImageSource<'_>> {
        let upload = self.upload.as_deref().filter(|bytes| !bytes.is_empty());
        let url = self
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());

        match (upload, url) {
            (Some(bytes), None) => Ok(ImageSource::Upload(bytes)),
            (None, Some(url)) => Ok(ImageSource::Url(url)),
            (None, None) => Err(PipelineError::validation("No image provided")),
            (Some(_), Some(_)) => Err(PipelineError::validation(
                "Provide either an upload or an image URL, not both",
            )),
        }
    }

    /// Transformation parameters carried by this request
    #[must_use]
    pub fn options(&self) -> TransformOptions {
        TransformOptions::from_request(
            self.width,
            self.height,
            Some(&self.background_color),
            Some(&self.format),
        )
    }
}

/// Body of the root status surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub message: String,
    pub status: String,
    pub background_removal: bool,
    pub environment: String,
}

/// Body of the health surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub background_removal_available: bool,
}

/// Request handler wiring the pipeline to its input sources
#[derive(Clone)]
pub struct ImageService {
    pipeline: Arc<ImagePipeline>,
    fetcher: Arc<dyn ImageFetcher>,
    environment: String,
}

impl std::fmt::Debug for ImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageService")
            .field("pipeline", &self.pipeline)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl ImageService {
    #[must_use]
    pub fn new(pipeline: Arc<ImagePipeline>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        let environment = pipeline.config().environment.clone();
        Self {
            pipeline,
            fetcher,
            environment,
        }
    }

    /// Startup wiring: selected remover plus an HTTP fetcher
    ///
    /// # Errors
    /// - Invalid configuration
    /// - HTTP client construction failures
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(Duration::from_secs(config.fetch_timeout_secs))?;
        let pipeline = ImagePipeline::from_config(config);

        let capabilities = pipeline.capabilities();
        log::info!(
            "Image service ready (remover: {}, background removal: {})",
            capabilities.remover,
            capabilities.background_removal
        );

        Ok(Self::new(Arc::new(pipeline), Arc::new(fetcher)))
    }

    #[must_use]
    pub fn pipeline(&self) -> &ImagePipeline {
        &self.pipeline
    }

    /// Handle one request end to end
    ///
    /// The CPU-bound stages run on the blocking thread pool.
    ///
    /// # Errors
    /// - Validation errors before any work is done
    /// - Fetch, decode and stage errors from the pipeline
    pub async fn handle(&self, request: ProcessRequest) -> Result<PipelineResult> {
        let options = request.options();
        let bytes = match request.source()? {
            ImageSource::Upload(bytes) => bytes.to_vec(),
            ImageSource::Url(url) => self.fetcher.fetch(url).await?,
        };

        let pipeline = Arc::clone(&self.pipeline);
        let result = tokio::task::spawn_blocking(move || pipeline.process(&bytes, &options))
            .await
            .map_err(|e| PipelineError::stage("pipeline", format!("Processing task failed: {e}")))?;

        if let Err(e) = &result {
            tracing::warn!(kind = ?e.kind(), status = e.status_code(), error = %e, "Request failed");
        }
        result
    }

    /// Root status body
    #[must_use]
    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            message: "Image Processing API".to_string(),
            status: "running".to_string(),
            background_removal: self.pipeline.capabilities().background_removal,
            environment: self.environment.clone(),
        }
    }

    /// Health body
    #[must_use]
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy".to_string(),
            background_removal_available: self.pipeline.capabilities().background_removal,
        }
    }
}
