// ============================================================================
// refract-core/src/engine.rs
// ============================================================================
//
// MEDIA ENGINE: Caller-Facing Facade
//
// `MediaEngine` is the single entry point outer layers use. It is built from
// an explicit `EngineConfig`, owns the command runner and a cancellation flag,
// and hands both to each component per call. Calls share nothing but the
// filesystem, so one engine may serve many callers.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;

use crate::config::{
    EngineConfig, ImageCompressionConfig, ImageFormatKind, UpscaleConfig,
    VideoCompressionConfig, VideoUpscaleConfig,
};
use crate::error::CoreResult;
use crate::external::{
    self, CommandRunner, FrameRateProber, RunOptions, SystemRunner, ToolInfo,
};
use crate::geometry::Dimensions;
use crate::processing::{
    CompressIfNeededOutcome, ImageBatchEntry, ImageCompressor, ImageInfo, ImageUpscaler,
    VideoCompressor, VideoUpscalePipeline, VideoUpscaleReport,
};

/// Facade over every media operation.
///
/// # Examples
///
/// ```rust,no_run
/// use refract_core::{EngineConfigBuilder, MediaEngine};
/// use refract_core::config::VideoUpscaleConfig;
/// use std::path::Path;
///
/// let engine = MediaEngine::new(EngineConfigBuilder::new().build())?;
/// let report = engine.upscale_video(
///     Path::new("clip.mp4"),
///     Path::new("clip_2x.mp4"),
///     &VideoUpscaleConfig::default(),
/// )?;
/// println!("reassembled at {} fps", report.fps);
/// # Ok::<(), refract_core::CoreError>(())
/// ```
#[derive(Debug)]
pub struct MediaEngine<R: CommandRunner = SystemRunner> {
    runner: R,
    config: EngineConfig,
    cancel: Arc<AtomicBool>,
    images: ImageCompressor,
}

impl MediaEngine<SystemRunner> {
    /// Creates an engine that runs real external processes.
    pub fn new(config: EngineConfig) -> CoreResult<Self> {
        Self::with_runner(SystemRunner::new(), config)
    }
}

impl<R: CommandRunner> MediaEngine<R> {
    /// Creates an engine that executes commands through `runner`.
    pub fn with_runner(runner: R, config: EngineConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            runner,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            images: ImageCompressor::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Flag that aborts running external commands when raised, e.g. from a
    /// Ctrl-C handler. It stays raised until `reset_cancel` is called.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        warn!("Cancellation requested");
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn reset_cancel(&self) {
        self.cancel.store(false, Ordering::SeqCst);
    }

    fn run_options(&self) -> RunOptions {
        RunOptions::from_config(&self.config).with_cancel_flag(self.cancel_flag())
    }

    // ---- Images ----

    /// Compresses an image within the configured bounds and quality.
    pub fn compress_image(
        &self,
        input: &Path,
        output: &Path,
        config: &ImageCompressionConfig,
    ) -> CoreResult<Dimensions> {
        self.images.compress_with_config(input, output, config)
    }

    /// Scales an image by `factor` and re-encodes it.
    pub fn compress_image_by_scale(&self, input: &Path, output: &Path, factor: f64) -> CoreResult<Dimensions> {
        self.images.compress_by_scale(input, output, factor)
    }

    /// Copies small images unchanged and compresses large ones; `threshold`
    /// defaults to 5 MiB.
    pub fn compress_image_if_needed(
        &self,
        input: &Path,
        output: &Path,
        threshold: Option<u64>,
    ) -> CoreResult<CompressIfNeededOutcome> {
        match threshold {
            Some(threshold) => self
                .images
                .compress_if_needed_with_threshold(input, output, threshold),
            None => self.images.compress_if_needed(input, output),
        }
    }

    /// Compresses every supported image in a directory in parallel.
    pub fn compress_image_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        config: &ImageCompressionConfig,
    ) -> CoreResult<Vec<ImageBatchEntry>> {
        self.images.compress_directory(input_dir, output_dir, config)
    }

    /// Compresses an in-memory image.
    pub fn compress_image_bytes(
        &self,
        bytes: &[u8],
        format: ImageFormatKind,
        config: &ImageCompressionConfig,
    ) -> CoreResult<Vec<u8>> {
        self.images.compress_bytes(bytes, format, config)
    }

    /// Human-readable image summary; never fails.
    pub fn image_info(&self, input: &Path) -> String {
        self.images.image_info(input)
    }

    /// Structured image summary.
    pub fn probe_image(&self, input: &Path) -> CoreResult<ImageInfo> {
        self.images.probe_image(input)
    }

    // ---- Upscaling ----

    fn upscaler(&self) -> ImageUpscaler<&R> {
        ImageUpscaler::new(&self.runner, &self.config).with_options(self.run_options())
    }

    pub fn upscale_image(&self, input: &Path, output: &Path, config: &UpscaleConfig) -> CoreResult<()> {
        self.upscaler().upscale(input, output, config)
    }

    /// Upscales a directory; returns the approximate processed count.
    pub fn upscale_image_batch(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        config: &UpscaleConfig,
    ) -> CoreResult<usize> {
        self.upscaler().upscale_batch(input_dir, output_dir, config)
    }

    // ---- Video ----

    pub fn compress_video(
        &self,
        input: &Path,
        output: &Path,
        config: &VideoCompressionConfig,
    ) -> CoreResult<()> {
        VideoCompressor::new(&self.runner, &self.config)
            .with_options(self.run_options())
            .compress(input, output, config)
    }

    pub fn upscale_video(
        &self,
        input: &Path,
        output: &Path,
        config: &VideoUpscaleConfig,
    ) -> CoreResult<VideoUpscaleReport> {
        VideoUpscalePipeline::new(&self.runner, &self.config)
            .with_options(self.run_options())
            .run(input, output, config)
    }

    /// Rounded frame rate of a video's first stream, if it can be probed.
    pub fn probe_frame_rate(&self, input: &Path) -> Option<u32> {
        FrameRateProber::new(&self.runner, &self.config)
            .with_options(self.run_options())
            .probe(input)
    }

    // ---- Tools ----

    pub fn is_ffmpeg_available(&self) -> bool {
        external::is_ffmpeg_available(&self.runner, &self.config)
    }

    pub fn is_ffprobe_available(&self) -> bool {
        external::is_ffprobe_available(&self.runner, &self.config)
    }

    pub fn is_waifu2x_available(&self) -> bool {
        external::is_waifu2x_available(&self.runner, &self.config)
    }

    /// Availability and resolved location of every configured tool.
    pub fn tool_report(&self) -> Vec<ToolInfo> {
        external::tool_report(&self.runner, &self.config)
    }
}
