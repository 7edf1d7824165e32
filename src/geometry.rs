//! Box geometry.
//!
//! Detectors report boxes in normalized 0..1 coordinates with the origin at the
//! bottom-left corner and y growing upward. Images are addressed in pixels with
//! the origin at the top-left corner and y growing downward.

use serde::{Deserialize, Serialize};

/// Bounding box in normalized coordinates, origin bottom-left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top edge, measured from the bottom of the image.
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }
}

/// Bounding box in pixels, origin top-left.
///
/// Not clipped: a box may extend past the image edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelBox {
    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Flip a normalized box to top-left origin and scale it to `size`.
pub fn to_pixel_box(normalized: &NormalizedBox, size: ImageSize) -> PixelBox {
    let w = f64::from(size.width);
    let h = f64::from(size.height);
    let flipped_y = 1.0 - (normalized.y + normalized.height);
    PixelBox {
        x: normalized.x * w,
        y: flipped_y * h,
        width: normalized.width * w,
        height: normalized.height * h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn flips_and_scales_reference_box() {
        let b = to_pixel_box(
            &NormalizedBox::new(0.1, 0.2, 0.3, 0.4),
            ImageSize::new(1280, 720),
        );
        assert_close(b.x, 128.0);
        assert_close(b.y, 288.0);
        assert_close(b.width, 384.0);
        assert_close(b.height, 288.0);
    }

    #[test]
    fn box_touching_bottom_edge_ends_at_image_height() {
        let b = to_pixel_box(&NormalizedBox::new(0.0, 0.0, 1.0, 0.25), ImageSize::new(100, 80));
        assert_close(b.y, 60.0);
        assert_close(b.max_y(), 80.0);
    }

    #[test]
    fn out_of_range_boxes_pass_through_unclipped() {
        let b = to_pixel_box(&NormalizedBox::new(-0.1, 0.9, 0.5, 0.3), ImageSize::new(200, 100));
        assert_close(b.x, -20.0);
        assert_close(b.y, -20.0);
        assert_close(b.width, 100.0);
        assert_close(b.height, 30.0);
    }

    proptest! {
        #[test]
        fn pixel_box_matches_flip_formula(
            x in 0.0f64..=1.0,
            y in 0.0f64..=1.0,
            w in 0.0f64..=1.0,
            h in 0.0f64..=1.0,
            width in 1u32..4096,
            height in 1u32..4096,
        ) {
            let b = to_pixel_box(&NormalizedBox::new(x, y, w, h), ImageSize::new(width, height));
            let (fw, fh) = (f64::from(width), f64::from(height));
            prop_assert_eq!(b.x, fw * x);
            prop_assert_eq!(b.y, fh * (1.0 - (y + h)));
            prop_assert_eq!(b.width, fw * w);
            prop_assert_eq!(b.height, fh * h);
        }
    }
}
