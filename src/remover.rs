//! Background removal capability
//!
//! The pipeline only sees [`BackgroundRemover`]. Which implementation backs
//! it is decided once by [`select_remover`] when the process starts.

use crate::{config::PipelineConfig, error::Result};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Produces an image whose alpha channel separates foreground from background
pub trait BackgroundRemover: Send + Sync {
    /// Short identifier used in logs and the status surface
    fn name(&self) -> &str;

    /// Whether a segmentation model performs real foreground extraction
    fn is_model_backed(&self) -> bool;

    /// Return a copy of `image` carrying a per-pixel alpha channel
    ///
    /// # Errors
    /// - Preprocessing, inference or mask application failures
    fn remove_background(&self, image: &DynamicImage) -> Result<DynamicImage>;
}

/// Stand-in used when no segmentation model is available
///
/// Adds an alpha channel with every pixel fully opaque.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpaqueAlphaRemover;

impl BackgroundRemover for OpaqueAlphaRemover {
    fn name(&self) -> &str {
        "opaque-alpha"
    }

    fn is_model_backed(&self) -> bool {
        false
    }

    fn remove_background(&self, image: &DynamicImage) -> Result<DynamicImage> {
        Ok(DynamicImage::ImageRgba8(image.to_rgba8()))
    }
}

/// Immutable description of what the process can do, resolved at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub background_removal: bool,
    pub remover: String,
}

impl Capabilities {
    #[must_use]
    pub fn of(remover: &dyn BackgroundRemover) -> Self {
        Self {
            background_removal: remover.is_model_backed(),
            remover: remover.name().to_string(),
        }
    }
}

/// Pick the background remover for this process
///
/// A configured model is loaded with the Tract backend when the `tract`
/// feature is enabled. Any failure to do so degrades to
/// [`OpaqueAlphaRemover`] with a warning instead of aborting startup.
#[must_use]
pub fn select_remover(config: &PipelineConfig) -> Arc<dyn BackgroundRemover> {
    let Some(model_path) = config.model_path.as_ref() else {
        log::warn!("No segmentation model configured - using basic image processing only");
        return Arc::new(OpaqueAlphaRemover);
    };

    #[cfg(feature = "tract")]
    {
        match crate::backends::TractRemover::load(model_path, config.into()) {
            Ok(remover) => return Arc::new(remover),
            Err(e) => {
                log::warn!(
                    "Failed to load segmentation model '{}': {} - using basic image processing only",
                    model_path.display(),
                    e
                );
            },
        }
    }

    #[cfg(not(feature = "tract"))]
    log::warn!(
        "Segmentation model '{}' configured but the 'tract' feature is disabled - using basic image processing only",
        model_path.display()
    );

    Arc::new(OpaqueAlphaRemover)
}
