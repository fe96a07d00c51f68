//! Super-resolution upscaler configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Denoise strength passed to the upscaler.
///
/// `None` suppresses the noise flag entirely; the other levels map to the
/// tool's `-n` values 0 through 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseLevel {
    None,
    #[default]
    Low,
    Medium,
    High,
    Highest,
}

impl NoiseLevel {
    /// The tool's numeric level, -1 for `None`.
    #[must_use]
    pub const fn value(self) -> i8 {
        match self {
            NoiseLevel::None => -1,
            NoiseLevel::Low => 0,
            NoiseLevel::Medium => 1,
            NoiseLevel::High => 2,
            NoiseLevel::Highest => 3,
        }
    }

    /// Value for the `-n` flag, or `None` when the flag must be omitted.
    #[must_use]
    pub fn flag_value(self) -> Option<u8> {
        let value = self.value();
        if value < 0 {
            None
        } else {
            Some(value.clamp(0, 3) as u8)
        }
    }

    /// Maps a raw tool value back to a level; anything below 0 is `None`,
    /// anything above 3 saturates at `Highest`.
    #[must_use]
    pub fn from_value(value: i32) -> Self {
        match value {
            i32::MIN..=-1 => NoiseLevel::None,
            0 => NoiseLevel::Low,
            1 => NoiseLevel::Medium,
            2 => NoiseLevel::High,
            _ => NoiseLevel::Highest,
        }
    }
}

impl fmt::Display for NoiseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoiseLevel::None => "none",
            NoiseLevel::Low => "low",
            NoiseLevel::Medium => "medium",
            NoiseLevel::High => "high",
            NoiseLevel::Highest => "highest",
        };
        f.write_str(name)
    }
}

impl FromStr for NoiseLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(NoiseLevel::None),
            "low" => Ok(NoiseLevel::Low),
            "medium" => Ok(NoiseLevel::Medium),
            "high" => Ok(NoiseLevel::High),
            "highest" => Ok(NoiseLevel::Highest),
            other => other
                .parse::<i32>()
                .map(NoiseLevel::from_value)
                .map_err(|_| CoreError::Config(format!("unknown noise level '{s}'"))),
        }
    }
}

/// Options for one upscaler invocation (single file or directory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpscaleConfig {
    /// Scale factor, clamped to 1..=4 when emitted
    pub scale_factor: u32,
    pub noise_level: NoiseLevel,
    /// Tile size in pixels, 0 lets the tool choose
    pub tile_size: u32,
    /// Output image format extension (png, jpg, webp)
    pub output_format: String,
    pub verbose: bool,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            scale_factor: 2,
            noise_level: NoiseLevel::Low,
            tile_size: 0,
            output_format: "png".to_string(),
            verbose: false,
        }
    }
}

impl UpscaleConfig {
    /// Scale factor as emitted on the command line.
    #[must_use]
    pub fn effective_scale(&self) -> u32 {
        self.scale_factor.clamp(1, 4)
    }
}
