//! Coordinate normalization and intersection-over-union.
//!
//! Boxes arrive without a unit tag. A box is read as normalized when every
//! one of `x`, `y`, `width` and `height` is at most 1, otherwise as pixels.
//! A very small pixel box (e.g. a 1x1 box at the origin) is therefore misread
//! as normalized. The inference is made once per box and applied to all four
//! fields together.

use serde::Serialize;

use crate::models::tag::{BoundingBox, ImageDimensions};

/// Box expressed in the 0–100 percentage space of its image.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PercentBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PercentBox {
    pub fn area(&self) -> f64 {
        if self.width <= 0.0 || self.height <= 0.0 {
            0.0
        } else {
            self.width * self.height
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSpace {
    Normalized,
    Pixel,
}

pub fn infer_space(b: &BoundingBox) -> CoordinateSpace {
    if b.x <= 1.0 && b.y <= 1.0 && b.width <= 1.0 && b.height <= 1.0 {
        CoordinateSpace::Normalized
    } else {
        CoordinateSpace::Pixel
    }
}

/// Map a box to percentage space. Pixel coordinates on an axis whose image
/// dimension is missing or zero map to 0.
pub fn to_percent(b: &BoundingBox, dims: ImageDimensions) -> PercentBox {
    match infer_space(b) {
        CoordinateSpace::Normalized => PercentBox {
            left: b.x * 100.0,
            top: b.y * 100.0,
            width: b.width * 100.0,
            height: b.height * 100.0,
        },
        CoordinateSpace::Pixel => {
            if dims.width.unwrap_or(0) == 0 || dims.height.unwrap_or(0) == 0 {
                tracing::warn!(
                    x = b.x,
                    y = b.y,
                    image_width = ?dims.width,
                    image_height = ?dims.height,
                    "Pixel bounding box without image dimensions, mapping to origin"
                );
            }
            PercentBox {
                left: scale(b.x, dims.width),
                top: scale(b.y, dims.height),
                width: scale(b.width, dims.width),
                height: scale(b.height, dims.height),
            }
        }
    }
}

fn scale(value: f64, dimension: Option<u32>) -> f64 {
    match dimension {
        Some(d) if d > 0 => value / f64::from(d) * 100.0,
        _ => 0.0,
    }
}

/// Intersection area over union area. Zero-area boxes yield 0.
pub fn iou(a: &PercentBox, b: &PercentBox) -> f64 {
    let area_a = a.area();
    let area_b = b.area();
    if area_a == 0.0 || area_b == 0.0 {
        return 0.0;
    }

    let overlap_w = (a.left + a.width).min(b.left + b.width) - a.left.max(b.left);
    let overlap_h = (a.top + a.height).min(b.top + b.height) - a.top.max(b.top);
    if overlap_w <= 0.0 || overlap_h <= 0.0 {
        return 0.0;
    }

    let intersection = overlap_w * overlap_h;
    let union = area_a + area_b - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    (intersection / union).clamp(0.0, 1.0)
}
