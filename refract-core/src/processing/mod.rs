//! Media processing components.
//!
//! This module organizes the engine's processing steps into submodules and
//! exposes the component types the `MediaEngine` facade is built from.

/// Still-image compression through the `image` crate
pub mod image_compress;

/// Single-pass and two-pass video compression
pub mod video_compress;

/// Super-resolution upscaling of images and frame directories
pub mod upscale;

/// Extract / upscale / reassemble pipeline for videos
pub mod video_upscale;

pub use image_compress::{CompressIfNeededOutcome, ImageBatchEntry, ImageCompressor, ImageInfo};
pub use upscale::ImageUpscaler;
pub use video_compress::VideoCompressor;
pub use video_upscale::{
    FpsSource, PipelineState, VideoUpscalePipeline, VideoUpscaleReport, resolve_fps,
};
