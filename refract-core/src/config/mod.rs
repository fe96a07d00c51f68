//! Configuration structures and constants for the refract-core library.
//!
//! This module provides the engine-wide configuration (executable locations,
//! model directory, temp root, command timeout) and re-exports the
//! per-operation configuration types for image compression, upscaling and
//! video encoding.

mod builder;
mod encoding;
mod image;
mod upscale;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub use builder::EngineConfigBuilder;
pub use encoding::{EncoderPreset, VideoCompressionConfig, VideoUpscaleConfig};
pub use image::{ImageCompressionConfig, ImageFormatKind};
pub use upscale::{NoiseLevel, UpscaleConfig};

// Default constants

/// Default ffmpeg executable, resolved through PATH.
pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";

/// Default ffprobe executable, resolved through PATH.
pub const DEFAULT_FFPROBE_PATH: &str = "ffprobe";

/// Default super-resolution executable, resolved through PATH.
pub const DEFAULT_WAIFU2X_PATH: &str = "waifu2x-ncnn-vulkan";

/// Default model directory handed to the upscaler when it exists.
pub const DEFAULT_MODEL_DIR: &str = "models";

/// Default lossy image quality (0.0-1.0).
pub const DEFAULT_IMAGE_QUALITY: f32 = 0.75;

/// Default maximum output width in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 1920;

/// Default maximum output height in pixels.
pub const DEFAULT_MAX_HEIGHT: u32 = 1080;

/// Size at or above which `compress_if_needed` re-encodes instead of copying (5 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Frame rate used when neither the config nor the probe yields one.
pub const DEFAULT_FALLBACK_FPS: u32 = 30;

/// Audio bitrate used when video compression re-encodes audio.
pub const DEFAULT_COMPRESS_AUDIO_BITRATE: &str = "128k";

/// Audio bitrate used when video reassembly re-encodes audio.
pub const DEFAULT_ASSEMBLE_AUDIO_BITRATE: &str = "192k";

/// Engine-wide configuration shared by every component.
///
/// Replaces ambient key/value settings: each component receives the paths it
/// needs from this struct at construction time.
///
/// # Examples
///
/// ```rust
/// use refract_core::config::EngineConfigBuilder;
/// use std::time::Duration;
///
/// let config = EngineConfigBuilder::new()
///     .ffmpeg_path("/usr/local/bin/ffmpeg")
///     .model_dir("/opt/waifu2x/models-cunet")
///     .command_timeout(Duration::from_secs(3600))
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// ffmpeg executable used for extraction, compression and reassembly
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable used for frame-rate detection
    pub ffprobe_path: PathBuf,

    /// waifu2x-compatible super-resolution executable
    pub waifu2x_path: PathBuf,

    /// Model directory passed to the upscaler, only if it exists on disk
    pub model_dir: Option<PathBuf>,

    /// Root for pipeline temp directories (defaults to the OS temp dir)
    pub temp_dir: Option<PathBuf>,

    /// Upper bound on any single external command; `None` waits indefinitely
    #[serde(with = "optional_secs")]
    pub command_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from(DEFAULT_FFMPEG_PATH),
            ffprobe_path: PathBuf::from(DEFAULT_FFPROBE_PATH),
            waifu2x_path: PathBuf::from(DEFAULT_WAIFU2X_PATH),
            model_dir: Some(PathBuf::from(DEFAULT_MODEL_DIR)),
            temp_dir: None,
            command_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        if !path.is_file() {
            return Err(CoreError::InputNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    /// Root directory for pipeline temp directories.
    #[must_use]
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Checks that every executable path is non-empty and the timeout is usable.
    pub fn validate(&self) -> CoreResult<()> {
        for (name, path) in [
            ("ffmpeg_path", &self.ffmpeg_path),
            ("ffprobe_path", &self.ffprobe_path),
            ("waifu2x_path", &self.waifu2x_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(CoreError::Config(format!("{name} must not be empty")));
            }
        }
        if self.command_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CoreError::Config(
                "command_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serializes `Option<Duration>` as an optional number of seconds.
mod optional_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
