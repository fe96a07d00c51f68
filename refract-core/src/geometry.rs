//! Aspect-ratio preserving resize math.
//!
//! Every size decision in the engine (still image compression, scale-factor
//! compression) goes through these functions so the truncation and
//! never-zero rules are applied in one place.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Maximum width/height a resized output may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeBounds {
    pub max_width: u32,
    pub max_height: u32,
}

impl ResizeBounds {
    /// Creates bounds, rejecting a zero on either axis.
    pub fn new(max_width: u32, max_height: u32) -> CoreResult<Self> {
        if max_width == 0 || max_height == 0 {
            return Err(CoreError::Config(format!(
                "resize bounds must be positive, got {max_width}x{max_height}"
            )));
        }
        Ok(Self {
            max_width,
            max_height,
        })
    }

    /// Bounds large enough that no real image is ever resized.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_width: u32::MAX,
            max_height: u32::MAX,
        }
    }
}

impl Default for ResizeBounds {
    fn default() -> Self {
        Self {
            max_width: crate::config::DEFAULT_MAX_WIDTH,
            max_height: crate::config::DEFAULT_MAX_HEIGHT,
        }
    }
}

/// Concrete pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Computes target dimensions that fit inside `bounds` without upscaling.
///
/// Dimensions already inside the bounds are returned unchanged. Otherwise both
/// axes are multiplied by `min(max_width / width, max_height / height)` and
/// truncated, with each axis floored at 1 so extreme aspect ratios never
/// collapse to zero.
#[must_use]
pub fn calculate_resize(original_width: u32, original_height: u32, bounds: ResizeBounds) -> Dimensions {
    if original_width <= bounds.max_width && original_height <= bounds.max_height {
        return Dimensions::new(original_width, original_height);
    }

    // ratio = min(max_w / w, max_h / h), compared and applied as exact fractions
    let (w, h) = (u64::from(original_width.max(1)), u64::from(original_height.max(1)));
    let (max_w, max_h) = (u64::from(bounds.max_width), u64::from(bounds.max_height));
    let (numerator, denominator) = if max_w * h <= max_h * w {
        (max_w, w)
    } else {
        (max_h, h)
    };

    Dimensions::new(
        floor_ratio(w, numerator, denominator),
        floor_ratio(h, numerator, denominator),
    )
}

fn floor_ratio(value: u64, numerator: u64, denominator: u64) -> u32 {
    let scaled = value * numerator / denominator;
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// Multiplies both axes by `factor`, truncating and flooring each at 1.
pub fn scale_dimensions(original_width: u32, original_height: u32, factor: f64) -> CoreResult<Dimensions> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(CoreError::Config(format!(
            "scale factor must be a positive number, got {factor}"
        )));
    }
    Ok(Dimensions::new(
        truncate_axis(original_width, factor),
        truncate_axis(original_height, factor),
    ))
}

fn truncate_axis(value: u32, ratio: f64) -> u32 {
    let scaled = (f64::from(value) * ratio).floor();
    if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        (scaled as u32).max(1)
    }
}
