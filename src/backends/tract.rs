//! Tract backend for model-backed background removal
//!
//! Runs an ONNX segmentation model with Tract, a pure Rust inference
//! library. The model takes a `1x3xSxS` normalized RGB tensor and returns a
//! `1x1xSxS` foreground probability mask.

use crate::{
    error::{PipelineError, Result},
    remover::BackgroundRemover,
    types::SegmentationMask,
    utils::{PreprocessingConfig, SegmentationPreprocessor},
};
use image::{DynamicImage, GenericImageView};
use instant::Instant;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Background remover backed by an ONNX segmentation model
#[derive(Debug)]
pub struct TractRemover {
    model: TractModel,
    model_path: PathBuf,
    preprocessing: PreprocessingConfig,
}

impl TractRemover {
    /// Load and optimize the model at `model_path`
    ///
    /// # Errors
    /// - Missing or unreadable model file
    /// - Model that cannot be typed for a `1x3xSxS` input
    pub fn load<P: AsRef<Path>>(model_path: P, preprocessing: PreprocessingConfig) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.is_file() {
            return Err(PipelineError::model(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let load_start = Instant::now();
        log::info!("Loading segmentation model with Tract: {}", model_path.display());

        let size = preprocessing.target_size as usize;
        let model = onnx()
            .model_for_path(model_path)
            .map_err(|e| PipelineError::model(format!("Failed to load ONNX model: {e}")))?
            .with_input_fact(0, f32::fact([1, 3, size, size]).into())
            .map_err(|e| PipelineError::model(format!("Failed to set model input shape: {e}")))?
            .into_optimized()
            .map_err(|e| PipelineError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| PipelineError::model(format!("Failed to create runnable model: {e}")))?;

        log::info!(
            "Segmentation model ready in {}ms ({}x{} input)",
            load_start.elapsed().as_millis(),
            size,
            size
        );

        Ok(Self {
            model,
            model_path: model_path.to_path_buf(),
            preprocessing,
        })
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Run the model on a preprocessed `1x3xSxS` tensor
    fn infer(&self, input: Array4<f32>) -> Result<Array4<f32>> {
        let outputs = self
            .model
            .run(tvec![Tensor::from(input).into()])
            .map_err(|e| PipelineError::model(format!("Tract inference failed: {e}")))?;

        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::model("Model produced no output tensor"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| PipelineError::model(format!("Failed to read output tensor: {e}")))?;

        let shape = view.shape().to_vec();
        let [n, c, h, w] = shape.as_slice() else {
            return Err(PipelineError::model(format!(
                "Expected 4D output tensor, got {}D",
                shape.len()
            )));
        };

        Array4::from_shape_vec((*n, *c, *h, *w), view.iter().copied().collect())
            .map_err(|e| PipelineError::model(format!("Failed to reshape output tensor: {e}")))
    }
}

impl BackgroundRemover for TractRemover {
    fn name(&self) -> &str {
        "tract"
    }

    fn is_model_backed(&self) -> bool {
        true
    }

    fn remove_background(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let dimensions = image.dimensions();
        let span = tracing::debug_span!(
            "inference",
            width = dimensions.0,
            height = dimensions.1,
            input_size = self.preprocessing.target_size
        );
        let _enter = span.enter();

        let (input, letterbox) = SegmentationPreprocessor::preprocess(image, &self.preprocessing)?;

        let inference_start = Instant::now();
        let output = self.infer(input)?;
        tracing::debug!(
            elapsed_ms = inference_start.elapsed().as_millis() as u64,
            output_shape = ?output.shape(),
            "Tract inference completed"
        );

        let mask = SegmentationMask::from_tensor(&output, dimensions, &letterbox)?;
        Ok(DynamicImage::ImageRgba8(mask.apply_to(image)?))
    }
}
