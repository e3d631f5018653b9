//! Centered crop geometry.
//!
//! Given a source image and a target aspect window, compute the centered
//! rectangle that reduces exactly one axis to reach the target ratio.
//! Pixels are only removed here; padding happens later, in the garment
//! contain fit.

use super::PreprocessError;

/// Person photos are cropped to 3:4 before the 768x1024 resize.
pub const PERSON_WINDOW: AspectWindow = AspectWindow {
    width_ratio: 3,
    height_ratio: 4,
};

/// Garment photos are cropped square before the 768x768 resize.
pub const GARMENT_WINDOW: AspectWindow = AspectWindow {
    width_ratio: 1,
    height_ratio: 1,
};

/// A target aspect ratio expressed as a width:height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectWindow {
    pub width_ratio: u32,
    pub height_ratio: u32,
}

impl AspectWindow {
    pub fn ratio(&self) -> f64 {
        f64::from(self.width_ratio) / f64::from(self.height_ratio)
    }
}

/// A crop rectangle in source-image pixel coordinates.
///
/// Invariants: `left + width <= source_width`, `top + height <= source_height`,
/// and the rectangle is centered along whichever axis was reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// Compute the centered crop of a `width x height` source for `window`.
    ///
    /// A source proportionally wider than the window keeps full height and
    /// loses width; a source proportionally taller (or exactly matching,
    /// where the crop is a no-op) keeps full width and loses height.
    pub fn centered(
        width: u32,
        height: u32,
        window: AspectWindow,
    ) -> Result<Self, PreprocessError> {
        if width == 0 || height == 0 {
            return Err(PreprocessError::Geometry(format!(
                "degenerate source dimensions {width}x{height}"
            )));
        }

        let current = f64::from(width) / f64::from(height);
        let target = window.ratio();

        if current > target {
            let crop_width = ((f64::from(height) * target).round() as u32).clamp(1, width);
            Ok(Self {
                left: (width - crop_width) / 2,
                top: 0,
                width: crop_width,
                height,
            })
        } else {
            let crop_height = ((f64::from(width) / target).round() as u32).clamp(1, height);
            Ok(Self {
                left: 0,
                top: (height - crop_height) / 2,
                width,
                height: crop_height,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_source_keeps_full_height() {
        let region = CropRegion::centered(2000, 1000, PERSON_WINDOW).unwrap();
        assert_eq!(region.height, 1000);
        assert_eq!(region.width, 750); // round(1000 * 0.75)
        assert_eq!(region.left, 625);
        assert_eq!(region.top, 0);
    }

    #[test]
    fn tall_source_keeps_full_width() {
        // Scenario: 1000x2000 portrait against 3:4.
        let region = CropRegion::centered(1000, 2000, PERSON_WINDOW).unwrap();
        assert_eq!(region.width, 1000);
        assert_eq!(region.height, 1333); // round(1000 / 0.75)
        assert_eq!(region.top, 333);
        assert_eq!(region.left, 0);
    }

    #[test]
    fn exact_ratio_is_noop_via_tall_branch() {
        let region = CropRegion::centered(768, 1024, PERSON_WINDOW).unwrap();
        assert_eq!(
            region,
            CropRegion {
                left: 0,
                top: 0,
                width: 768,
                height: 1024
            }
        );
    }

    #[test]
    fn square_window_on_square_source_is_noop() {
        let region = CropRegion::centered(500, 500, GARMENT_WINDOW).unwrap();
        assert_eq!(
            region,
            CropRegion {
                left: 0,
                top: 0,
                width: 500,
                height: 500
            }
        );
    }

    #[test]
    fn region_stays_within_source_bounds() {
        for (w, h) in [(1, 1), (3, 7), (101, 53), (4032, 3024), (640, 9999)] {
            for window in [PERSON_WINDOW, GARMENT_WINDOW] {
                let r = CropRegion::centered(w, h, window).unwrap();
                assert!(r.left + r.width <= w, "{w}x{h} {window:?}: {r:?}");
                assert!(r.top + r.height <= h, "{w}x{h} {window:?}: {r:?}");
                assert!(r.width >= 1 && r.height >= 1);
            }
        }
    }

    #[test]
    fn cropped_ratio_within_one_rounding_unit() {
        for (w, h) in [(1234, 567), (567, 1234), (1920, 1080), (333, 444)] {
            let r = CropRegion::centered(w, h, PERSON_WINDOW).unwrap();
            let target = PERSON_WINDOW.ratio();
            // The reduced axis may be off by at most one pixel of rounding.
            let ideal_width = f64::from(r.height) * target;
            let ideal_height = f64::from(r.width) / target;
            assert!(
                (f64::from(r.width) - ideal_width).abs() <= 1.0
                    || (f64::from(r.height) - ideal_height).abs() <= 1.0,
                "{w}x{h}: {r:?}"
            );
        }
    }

    #[test]
    fn zero_dimension_is_geometry_error() {
        let result = CropRegion::centered(0, 100, GARMENT_WINDOW);
        assert!(matches!(result, Err(PreprocessError::Geometry(_))));
        let result = CropRegion::centered(100, 0, GARMENT_WINDOW);
        assert!(matches!(result, Err(PreprocessError::Geometry(_))));
    }
}
