//! Remote image retrieval
//!
//! Only used when a request names an image URL instead of uploading bytes.

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;

/// Capability for retrieving image bytes from a URL
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the raw bytes behind `url`
    ///
    /// # Errors
    /// - URL that is not fetchable (validation error)
    /// - Network failure, timeout, non-success status or non-image body
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP(S) fetcher with a bounded request duration
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    ///
    /// # Errors
    /// - HTTP client construction failures
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("imgly-bgtransform/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::fetch(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reject URLs the fetcher cannot retrieve
    ///
    /// # Errors
    /// - Blank URL or scheme other than `http`/`https`
    pub fn validate_url(url: &str) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(PipelineError::validation("Image URL is empty"));
        }

        let lower = url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(PipelineError::validation(format!(
                "Image URL must use http or https: {url}"
            )));
        }
        Ok(())
    }

    /// Whether a `Content-Type` value is acceptable as image content
    ///
    /// Absent headers and generic binary types are let through so the
    /// decoder can decide.
    #[must_use]
    pub fn is_image_content_type(content_type: Option<&str>) -> bool {
        let Some(value) = content_type else {
            return true;
        };
        let mime = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        mime.is_empty() || mime.starts_with("image/") || mime == "application/octet-stream"
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        Self::validate_url(url)?;
        let url = url.trim();

        tracing::debug!(url = %url, timeout_secs = self.timeout.as_secs(), "Fetching remote image");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::fetch(format!(
                    "Timed out after {}s fetching {url}",
                    self.timeout.as_secs()
                ))
            } else {
                PipelineError::fetch(format!("Failed to fetch {url}: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(PipelineError::fetch(format!(
                "HTTP error {} for {}",
                response.status(),
                url
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if !Self::is_image_content_type(content_type.as_deref()) {
            return Err(PipelineError::fetch(format!(
                "URL did not return image content ({}): {url}",
                content_type.unwrap_or_default()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::fetch(format!("Failed to read body from {url}: {e}")))?;

        if bytes.is_empty() {
            return Err(PipelineError::fetch(format!("Empty response body from {url}")));
        }

        tracing::debug!(url = %url, bytes = bytes.len(), "Fetched remote image");
        Ok(bytes.to_vec())
    }
}
