//! Core library for the Refract media transformation pipeline engine.
//!
//! This crate computes resize and quality parameters, builds invocations for
//! ffmpeg, ffprobe and a waifu2x-compatible upscaler, runs them as external
//! processes and glues them into multi-stage operations that clean up after
//! themselves on every outcome.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use refract_core::{EngineConfigBuilder, MediaEngine};
//! use refract_core::config::{ImageCompressionConfig, VideoCompressionConfig};
//! use std::path::Path;
//!
//! let config = EngineConfigBuilder::new()
//!     .waifu2x_path("/opt/waifu2x/waifu2x-ncnn-vulkan")
//!     .build();
//! let engine = MediaEngine::new(config).unwrap();
//!
//! let dims = engine
//!     .compress_image(
//!         Path::new("photo.jpg"),
//!         Path::new("photo_small.jpg"),
//!         &ImageCompressionConfig::default(),
//!     )
//!     .unwrap();
//! println!("wrote {dims}");
//!
//! engine
//!     .compress_video(
//!         Path::new("talk.mp4"),
//!         Path::new("talk_720p.mp4"),
//!         &VideoCompressionConfig::default(),
//!     )
//!     .unwrap();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod external;
pub mod geometry;
pub mod processing;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::MediaEngine;
pub use error::{CoreError, CoreResult, PipelineStage};
pub use external::{CommandRunner, ProcessOutput, RunOptions, SystemRunner, ToolCommand, ToolInfo};
pub use geometry::{Dimensions, ResizeBounds, calculate_resize, scale_dimensions};
pub use processing::{
    CompressIfNeededOutcome, ImageCompressor, ImageInfo, PipelineState, VideoUpscaleReport,
};
pub use utils::{format_bytes, format_duration};
