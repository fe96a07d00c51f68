//! Still-image compression configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::CoreError;
use crate::geometry::ResizeBounds;

use super::DEFAULT_IMAGE_QUALITY;

/// Output formats the compressor can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormatKind {
    Png,
    Jpeg,
    Bmp,
    Tiff,
    WebP,
}

impl ImageFormatKind {
    /// Only JPEG honours the quality setting.
    #[must_use]
    pub const fn is_lossless(self) -> bool {
        !matches!(self, ImageFormatKind::Jpeg)
    }

    /// Canonical file extension; `jpeg` is normalised to `jpg`.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            ImageFormatKind::Png => "png",
            ImageFormatKind::Jpeg => "jpg",
            ImageFormatKind::Bmp => "bmp",
            ImageFormatKind::Tiff => "tiff",
            ImageFormatKind::WebP => "webp",
        }
    }

    /// Parses a bare extension such as `JPEG`, `jpg` or `tif`.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormatKind::Png),
            "jpg" | "jpeg" => Some(ImageFormatKind::Jpeg),
            "bmp" => Some(ImageFormatKind::Bmp),
            "tif" | "tiff" => Some(ImageFormatKind::Tiff),
            "webp" => Some(ImageFormatKind::WebP),
            _ => None,
        }
    }

    /// Infers the format from a path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// The matching `image` crate format.
    #[must_use]
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            ImageFormatKind::Png => image::ImageFormat::Png,
            ImageFormatKind::Jpeg => image::ImageFormat::Jpeg,
            ImageFormatKind::Bmp => image::ImageFormat::Bmp,
            ImageFormatKind::Tiff => image::ImageFormat::Tiff,
            ImageFormatKind::WebP => image::ImageFormat::WebP,
        }
    }
}

impl fmt::Display for ImageFormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormatKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| CoreError::UnsupportedFormat(s.to_string()))
    }
}

/// Settings for one image compression call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageCompressionConfig {
    /// Lossy quality in 0.0..=1.0; ignored for lossless formats
    pub quality: f32,
    pub bounds: ResizeBounds,
    /// Output format; inferred from the source extension when `None`
    pub format: Option<ImageFormatKind>,
}

impl Default for ImageCompressionConfig {
    fn default() -> Self {
        Self {
            quality: DEFAULT_IMAGE_QUALITY,
            bounds: ResizeBounds::default(),
            format: None,
        }
    }
}

impl ImageCompressionConfig {
    /// Quality mapped onto the JPEG encoder's 1..=100 scale.
    #[must_use]
    pub fn jpeg_quality(&self) -> u8 {
        let quality = if self.quality.is_finite() {
            self.quality.clamp(0.0, 1.0)
        } else {
            DEFAULT_IMAGE_QUALITY
        };
        ((quality * 100.0).round() as u8).clamp(1, 100)
    }
}
