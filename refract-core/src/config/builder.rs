// ============================================================================
// refract-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for EngineConfig
//
// This module implements the builder pattern for the EngineConfig structure,
// providing a fluent API for overriding individual executable paths and
// engine settings on top of the defaults.

use std::path::PathBuf;
use std::time::Duration;

use super::EngineConfig;

/// Builder for creating EngineConfig instances.
///
/// # Examples
///
/// ```rust
/// use refract_core::config::EngineConfigBuilder;
///
/// let config = EngineConfigBuilder::new()
///     .ffmpeg_path("/usr/bin/ffmpeg")
///     .ffprobe_path("/usr/bin/ffprobe")
///     .waifu2x_path("/opt/waifu2x/waifu2x-ncnn-vulkan")
///     .temp_dir("/var/tmp/refract")
///     .build();
/// assert_eq!(config.ffmpeg_path.to_str(), Some("/usr/bin/ffmpeg"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Creates a new builder seeded with `EngineConfig::default()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Sets the ffmpeg executable.
    pub fn ffmpeg_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.ffmpeg_path = path.into();
        self
    }

    /// Sets the ffprobe executable.
    pub fn ffprobe_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.ffprobe_path = path.into();
        self
    }

    /// Sets the super-resolution executable.
    pub fn waifu2x_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.waifu2x_path = path.into();
        self
    }

    /// Sets the upscaler model directory.
    pub fn model_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.model_dir = Some(path.into());
        self
    }

    /// Never passes a model directory to the upscaler.
    pub fn no_model_dir(mut self) -> Self {
        self.config.model_dir = None;
        self
    }

    /// Sets the root directory for pipeline temp directories.
    pub fn temp_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.temp_dir = Some(path.into());
        self
    }

    /// Sets the per-command timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = Some(timeout);
        self
    }

    /// Builds the EngineConfig.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = EngineConfigBuilder::new()
            .waifu2x_path("/opt/realesr")
            .no_model_dir()
            .command_timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.waifu2x_path, PathBuf::from("/opt/realesr"));
        assert_eq!(config.model_dir, None);
        assert_eq!(config.command_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.ffprobe_path, PathBuf::from(super::super::DEFAULT_FFPROBE_PATH));
    }
}
