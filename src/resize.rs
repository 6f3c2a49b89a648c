//! Aspect-preserving resize
//!
//! Target dimensions are computed with exact integer arithmetic and floor
//! rounding, so `new = floor(requested * other_side / side)`. Comparing the
//! two scale ratios by cross-multiplication keeps the strict-greater
//! tie-break exact: when both sides bind equally the height wins.

use crate::error::{PipelineError, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

/// Output pixel count allowed when no explicit limit is given
pub const DEFAULT_MAX_OUTPUT_PIXELS: u64 = 100_000_000;

/// Requested output bounds
///
/// Zero is treated the same as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionsRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl DimensionsRequest {
    #[must_use]
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width: width.filter(|w| *w > 0),
            height: height.filter(|h| *h > 0),
        }
    }

    #[must_use]
    pub fn width(width: u32) -> Self {
        Self::new(Some(width), None)
    }

    #[must_use]
    pub fn height(height: u32) -> Self {
        Self::new(None, Some(height))
    }

    #[must_use]
    pub fn bounded(width: u32, height: u32) -> Self {
        Self::new(Some(width), Some(height))
    }

    /// True when neither side was requested
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

/// Resizer that preserves the source aspect ratio
pub struct AspectFitResizer;

impl AspectFitResizer {
    /// Compute the output size for `source` under `request`
    ///
    /// Returns `Ok(None)` when no resize was requested.
    ///
    /// # Errors
    /// - Source image with a zero dimension
    ///
    /// # Examples
    /// ```rust
    /// use imgly_bgtransform::resize::{AspectFitResizer, DimensionsRequest};
    ///
    /// let size = AspectFitResizer::target_dimensions((800, 400), DimensionsRequest::bounded(100, 100))?;
    /// assert_eq!(size, Some((100, 50)));
    /// # Ok::<(), imgly_bgtransform::PipelineError>(())
    /// ```
    pub fn target_dimensions(
        source: (u32, u32),
        request: DimensionsRequest,
    ) -> Result<Option<(u32, u32)>> {
        if request.is_empty() {
            return Ok(None);
        }

        let (src_w, src_h) = source;
        if src_w == 0 || src_h == 0 {
            return Err(PipelineError::validation(format!(
                "Cannot resize an image with zero dimension ({src_w}x{src_h})"
            )));
        }

        let (sw, sh) = (u64::from(src_w), u64::from(src_h));
        let size = match (request.width, request.height) {
            (Some(w), Some(h)) => {
                // src_w / w > src_h / h, cross-multiplied
                if sw * u64::from(h) > sh * u64::from(w) {
                    (w, Self::scale_side(w, sh, sw))
                } else {
                    (Self::scale_side(h, sw, sh), h)
                }
            },
            (Some(w), None) => (w, Self::scale_side(w, sh, sw)),
            (None, Some(h)) => (Self::scale_side(h, sw, sh), h),
            (None, None) => return Ok(None),
        };

        Ok(Some(size))
    }

    /// Resize `image` to fit `request` with a Lanczos filter
    ///
    /// The input is returned untouched when no dimension was requested or the
    /// computed size equals the current size. Output is capped at
    /// [`DEFAULT_MAX_OUTPUT_PIXELS`].
    ///
    /// # Errors
    /// - Source image with a zero dimension
    /// - Target size above the pixel limit
    pub fn resize(image: DynamicImage, request: DimensionsRequest) -> Result<DynamicImage> {
        Self::resize_with_limit(image, request, DEFAULT_MAX_OUTPUT_PIXELS)
    }

    /// Same as [`AspectFitResizer::resize`] with an explicit output pixel cap
    ///
    /// The cap is checked before any buffer is allocated.
    ///
    /// # Errors
    /// - Source image with a zero dimension
    /// - Target `width * height` above `max_pixels`
    pub fn resize_with_limit(
        image: DynamicImage,
        request: DimensionsRequest,
        max_pixels: u64,
    ) -> Result<DynamicImage> {
        let source = image.dimensions();
        let Some((width, height)) = Self::target_dimensions(source, request)? else {
            return Ok(image);
        };

        if (width, height) == source {
            return Ok(image);
        }

        Self::check_pixel_limit((width, height), max_pixels)?;

        tracing::debug!(
            from_width = source.0,
            from_height = source.1,
            to_width = width,
            to_height = height,
            "Resizing with Lanczos3"
        );

        Ok(image.resize_exact(width, height, FilterType::Lanczos3))
    }

    /// Reject target sizes whose pixel count exceeds `max_pixels`
    ///
    /// # Errors
    /// - `width * height` above `max_pixels`
    pub fn check_pixel_limit(target: (u32, u32), max_pixels: u64) -> Result<()> {
        let pixels = u64::from(target.0) * u64::from(target.1);
        if pixels > max_pixels {
            return Err(PipelineError::stage(
                "resize",
                format!(
                    "Target size {}x{} ({pixels} pixels) exceeds the limit of {max_pixels} pixels",
                    target.0, target.1
                ),
            ));
        }
        Ok(())
    }

    /// `floor(requested * numerator / denominator)`, never below one pixel
    fn scale_side(requested: u32, numerator: u64, denominator: u64) -> u32 {
        let scaled = u64::from(requested) * numerator / denominator;
        u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255])))
    }

    #[test]
    fn test_width_binding_scenario() {
        let size =
            AspectFitResizer::target_dimensions((800, 400), DimensionsRequest::bounded(100, 100))
                .unwrap();
        assert_eq!(size, Some((100, 50)));
    }

    #[test]
    fn test_height_binding() {
        let size =
            AspectFitResizer::target_dimensions((400, 800), DimensionsRequest::bounded(100, 100))
                .unwrap();
        assert_eq!(size, Some((50, 100)));
    }

    #[test]
    fn test_width_only_scenario() {
        let size =
            AspectFitResizer::target_dimensions((400, 800), DimensionsRequest::width(200)).unwrap();
        assert_eq!(size, Some((200, 400)));
    }

    #[test]
    fn test_height_only() {
        let size =
            AspectFitResizer::target_dimensions((800, 400), DimensionsRequest::height(100)).unwrap();
        assert_eq!(size, Some((200, 100)));
    }

    #[test]
    fn test_tie_uses_height_branch() {
        // 300/3 == 200/2, so the width ratio is not strictly greater
        let size =
            AspectFitResizer::target_dimensions((300, 200), DimensionsRequest::bounded(3, 2))
                .unwrap();
        assert_eq!(size, Some((3, 2)));
    }

    #[test]
    fn test_floor_rounding() {
        // 100 * 2 / 3 = 66.67 -> 66
        let size =
            AspectFitResizer::target_dimensions((3, 2), DimensionsRequest::width(100)).unwrap();
        assert_eq!(size, Some((100, 66)));
    }

    #[test]
    fn test_no_request_is_noop() {
        let size =
            AspectFitResizer::target_dimensions((640, 480), DimensionsRequest::default()).unwrap();
        assert_eq!(size, None);

        let resized = AspectFitResizer::resize(image(7, 5), DimensionsRequest::default()).unwrap();
        assert_eq!(resized.dimensions(), (7, 5));
    }

    #[test]
    fn test_zero_request_treated_as_absent() {
        assert!(DimensionsRequest::new(Some(0), Some(0)).is_empty());
        assert_eq!(DimensionsRequest::new(Some(0), Some(10)), DimensionsRequest::height(10));
    }

    #[test]
    fn test_zero_source_rejected() {
        let result = AspectFitResizer::target_dimensions((10, 0), DimensionsRequest::width(5));
        assert!(matches!(result, Err(PipelineError::Validation(_))));
    }

    #[test]
    fn test_extreme_ratio_keeps_one_pixel() {
        let size =
            AspectFitResizer::target_dimensions((1000, 1), DimensionsRequest::width(10)).unwrap();
        assert_eq!(size, Some((10, 1)));
    }

    #[test]
    fn test_bounded_fit_property() {
        let sources = [(800, 400), (400, 800), (1, 1), (1920, 1080), (333, 777), (5, 3)];
        let boxes = [(100, 100), (1, 50), (640, 480), (17, 23), (1000, 10)];

        for &source in &sources {
            for &(w, h) in &boxes {
                let (nw, nh) =
                    AspectFitResizer::target_dimensions(source, DimensionsRequest::bounded(w, h))
                        .unwrap()
                        .unwrap();
                assert!(nw <= w && nh <= h, "{source:?} in {w}x{h} gave {nw}x{nh}");
                assert!(nw == w || nh == h, "{source:?} in {w}x{h} gave {nw}x{nh}");
            }
        }
    }

    #[test]
    fn test_oversized_target_rejected_before_allocation() {
        let result = AspectFitResizer::resize(image(1, 1), DimensionsRequest::width(200_000));
        let error = result.unwrap_err();
        assert!(matches!(error, PipelineError::Stage { .. }));
        assert!(error.to_string().contains("200000x200000"));
    }

    #[test]
    fn test_explicit_pixel_limit() {
        let request = DimensionsRequest::bounded(20, 20);
        assert!(AspectFitResizer::resize_with_limit(image(40, 40), request, 399).is_err());

        let resized = AspectFitResizer::resize_with_limit(image(40, 40), request, 400).unwrap();
        assert_eq!(resized.dimensions(), (20, 20));

        // Untouched images are never checked against the limit
        let none = AspectFitResizer::resize_with_limit(image(40, 40), DimensionsRequest::default(), 1)
            .unwrap();
        assert_eq!(none.dimensions(), (40, 40));
    }

    #[test]
    fn test_resize_produces_requested_size() {
        let resized = AspectFitResizer::resize(image(80, 40), DimensionsRequest::bounded(10, 10))
            .unwrap();
        assert_eq!(resized.dimensions(), (10, 5));
        assert!(resized.color().has_alpha());
    }
}
