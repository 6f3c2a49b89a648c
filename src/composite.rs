//! Alpha compositing onto a solid background color

use crate::utils::{BackgroundColor, RgbColor};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

/// Flattens transparency onto an opaque color
pub struct AlphaCompositor;

impl AlphaCompositor {
    /// Composite `image` over `color`
    ///
    /// The transparent sentinel leaves the image untouched. A concrete color
    /// always yields an opaque RGB image; sources without alpha are only
    /// converted, since the canvas would be fully covered.
    #[must_use]
    pub fn composite(image: DynamicImage, color: &BackgroundColor) -> DynamicImage {
        let BackgroundColor::Solid(rgb) = color else {
            return image;
        };

        if !image.color().has_alpha() {
            return match image {
                DynamicImage::ImageRgb8(_) => image,
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            };
        }

        DynamicImage::ImageRgb8(Self::over(&image, *rgb))
    }

    /// Standard "over" blend with per-pixel alpha as the weight
    fn over(image: &DynamicImage, color: RgbColor) -> RgbImage {
        let (width, height) = image.dimensions();
        let background = color.to_rgb8();
        let source = image.to_rgba8();
        let mut canvas = RgbImage::from_pixel(width, height, Rgb(background));

        for (x, y, pixel) in source.enumerate_pixels() {
            let alpha = pixel[3];
            let blended = match alpha {
                0 => continue,
                255 => [pixel[0], pixel[1], pixel[2]],
                _ => [
                    Self::blend(pixel[0], background[0], alpha),
                    Self::blend(pixel[1], background[1], alpha),
                    Self::blend(pixel[2], background[2], alpha),
                ],
            };
            canvas.put_pixel(x, y, Rgb(blended));
        }

        canvas
    }

    /// `(src * a + dst * (255 - a)) / 255`, rounded to nearest
    fn blend(src: u8, dst: u8, alpha: u8) -> u8 {
        let alpha = u32::from(alpha);
        let tmp = u32::from(src) * alpha + u32::from(dst) * (255 - alpha) + 128;
        ((tmp + (tmp >> 8)) >> 8) as u8
    }
}
