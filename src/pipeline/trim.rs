//! Garment border trimming.
//!
//! Product shots often frame the garment in a large uniform or transparent
//! margin; cropping square around that margin centers the crop on padding
//! instead of cloth. The trim finds the bounding box of non-background
//! pixels, where "background" is the top-left pixel's color (or any
//! near-transparent pixel), within a small per-channel tolerance.
//!
//! Trimming is best-effort: when there is nothing to remove, or the image
//! is entirely background, the caller proceeds with the untrimmed image.

use image::{DynamicImage, GenericImageView, Rgba};

/// Per-channel distance below which a pixel counts as background.
const TRIM_TOLERANCE: i32 = 10;

/// Alpha below which a pixel counts as background regardless of color.
const ALPHA_BACKGROUND: u8 = 10;

/// Trim the uniform/transparent border around the image content.
///
/// Returns `None` when there is no border to remove (trim would be a
/// no-op), or when the whole frame is background and trimming would
/// discard everything.
pub fn trim_border(image: &DynamicImage) -> Option<DynamicImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let background = image.get_pixel(0, 0);

    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, pixel) in image.pixels() {
        if is_background(&pixel, &background) {
            continue;
        }
        found = true;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    if !found {
        return None;
    }

    let trim_width = max_x - min_x + 1;
    let trim_height = max_y - min_y + 1;
    if trim_width == width && trim_height == height {
        return None;
    }

    Some(image.crop_imm(min_x, min_y, trim_width, trim_height))
}

fn is_background(pixel: &Rgba<u8>, background: &Rgba<u8>) -> bool {
    if pixel.0[3] < ALPHA_BACKGROUND {
        return true;
    }
    if background.0[3] < ALPHA_BACKGROUND {
        return false;
    }
    pixel.0[..3]
        .iter()
        .zip(&background.0[..3])
        .all(|(a, b)| (i32::from(*a) - i32::from(*b)).abs() <= TRIM_TOLERANCE)
}
