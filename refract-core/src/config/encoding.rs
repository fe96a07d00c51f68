//! Encoding configuration module
//!
//! Defines the configuration structures for video compression and for the
//! reassembly step of the video upscale pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::upscale::{NoiseLevel, UpscaleConfig};
use crate::error::CoreError;
use crate::geometry::ResizeBounds;

/// x264/x265 speed preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
    Placebo,
}

impl EncoderPreset {
    pub const ALL: [EncoderPreset; 10] = [
        EncoderPreset::Ultrafast,
        EncoderPreset::Superfast,
        EncoderPreset::Veryfast,
        EncoderPreset::Faster,
        EncoderPreset::Fast,
        EncoderPreset::Medium,
        EncoderPreset::Slow,
        EncoderPreset::Slower,
        EncoderPreset::Veryslow,
        EncoderPreset::Placebo,
    ];

    /// Name as passed to `-preset`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EncoderPreset::Ultrafast => "ultrafast",
            EncoderPreset::Superfast => "superfast",
            EncoderPreset::Veryfast => "veryfast",
            EncoderPreset::Faster => "faster",
            EncoderPreset::Fast => "fast",
            EncoderPreset::Medium => "medium",
            EncoderPreset::Slow => "slow",
            EncoderPreset::Slower => "slower",
            EncoderPreset::Veryslow => "veryslow",
            EncoderPreset::Placebo => "placebo",
        }
    }
}

impl fmt::Display for EncoderPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncoderPreset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str() == wanted)
            .ok_or_else(|| CoreError::Config(format!("unknown encoder preset '{s}'")))
    }
}

/// Highest CRF accepted by x264.
pub const MAX_CRF: u8 = 51;

/// Video compression configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoCompressionConfig {
    /// Output is scaled down (never up) to fit these bounds
    pub bounds: ResizeBounds,

    /// Constant rate factor (0-51), used when no bitrate is set
    pub crf: u8,

    /// Target bitrate in kbit/s; takes precedence over `crf`
    pub target_bitrate_kbps: Option<u32>,

    pub preset: EncoderPreset,

    /// Encoder name (e.g. "libx264")
    pub video_codec: String,

    /// Pixel format (e.g. "yuv420p")
    pub pixel_format: String,

    /// Copy the audio stream instead of re-encoding to AAC
    pub copy_audio: bool,

    /// Two-pass encoding; only honoured together with a bitrate
    pub two_pass: bool,

    pub verbose: bool,
}

impl Default for VideoCompressionConfig {
    fn default() -> Self {
        Self {
            bounds: ResizeBounds::default(),
            crf: 23,
            target_bitrate_kbps: None,
            preset: EncoderPreset::Medium,
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            copy_audio: true,
            two_pass: false,
            verbose: false,
        }
    }
}

impl VideoCompressionConfig {
    /// The bitrate if one is set and positive.
    #[must_use]
    pub fn bitrate(&self) -> Option<u32> {
        self.target_bitrate_kbps.filter(|kbps| *kbps > 0)
    }

    /// Whether the encode will actually run in two passes.
    #[must_use]
    pub fn uses_two_pass(&self) -> bool {
        self.two_pass && self.bitrate().is_some()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.crf > MAX_CRF {
            return Err(CoreError::Config(format!(
                "crf must be between 0 and {MAX_CRF}, got {}",
                self.crf
            )));
        }
        if self.video_codec.trim().is_empty() || self.pixel_format.trim().is_empty() {
            return Err(CoreError::Config(
                "video codec and pixel format must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the extract/upscale/reassemble pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoUpscaleConfig {
    //
    // Upscaler options
    //
    pub scale_factor: u32,
    pub noise_level: NoiseLevel,
    pub tile_size: u32,

    /// Extension of the intermediate frame images
    pub frame_format: String,

    //
    // Reassembly options
    //
    pub video_codec: String,
    pub pixel_format: String,
    pub crf: u8,
    pub preset: EncoderPreset,

    /// Output frame rate; 0 probes the source and falls back to 30
    pub fps: u32,

    pub copy_audio: bool,

    /// Leave the frame directories behind for inspection
    pub keep_temp: bool,

    pub verbose: bool,
}

impl Default for VideoUpscaleConfig {
    fn default() -> Self {
        Self {
            scale_factor: 2,
            noise_level: NoiseLevel::Low,
            tile_size: 0,
            frame_format: "png".to_string(),
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            crf: 18,
            preset: EncoderPreset::Slow,
            fps: 0,
            copy_audio: true,
            keep_temp: false,
            verbose: false,
        }
    }
}

impl VideoUpscaleConfig {
    /// Upscaler options for the frame directory; frames keep their format.
    #[must_use]
    pub fn upscale_config(&self) -> UpscaleConfig {
        UpscaleConfig {
            scale_factor: self.scale_factor,
            noise_level: self.noise_level,
            tile_size: self.tile_size,
            output_format: self.frame_format.clone(),
            verbose: self.verbose,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.crf > MAX_CRF {
            return Err(CoreError::Config(format!(
                "crf must be between 0 and {MAX_CRF}, got {}",
                self.crf
            )));
        }
        let format = self.frame_format.trim();
        if format.is_empty() || format.contains(['/', '\\', '%']) {
            return Err(CoreError::Config(format!(
                "invalid frame format '{}'",
                self.frame_format
            )));
        }
        Ok(())
    }
}
