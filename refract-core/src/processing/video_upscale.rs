// ============================================================================
// refract-core/src/processing/video_upscale.rs
// ============================================================================
//
// VIDEO SUPER-RESOLUTION: Extract, Upscale and Reassemble
//
// This module orchestrates the three-tool pipeline that upscales a video:
// ffmpeg extracts every frame into a private directory, the upscaler
// processes that directory into a second one, and ffmpeg reassembles the
// upscaled frames with the source's audio into the output file.
//
// KEY COMPONENTS:
// - VideoUpscalePipeline: runs the stages strictly in order
// - PipelineState: Init -> FramesExtracted -> FramesUpscaled -> Assembled -> Done,
//   with Failed reachable from any non-terminal state
// - VideoUpscaleReport: what the run did (fps and where it came from, frames)
//
// WORKFLOW:
// 1. Validate input, create the output directory and the temp workspace
// 2. Extract frames (failure aborts)
// 3. Upscale the frame directory (failure aborts)
// 4. Resolve fps: configured > probed > 30; never fails the run
// 5. Assemble into a staging file beside the output, then rename it into place
// 6. Cleanup: the workspace guard deletes both directories on every exit path

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_FALLBACK_FPS, EngineConfig, VideoUpscaleConfig};
use crate::error::{CoreError, CoreResult, PipelineStage};
use crate::external::{
    CommandRunner, FrameRateProber, RunOptions, build_assemble_video_command,
    build_extract_frames_command,
};
use crate::processing::upscale::ImageUpscaler;
use crate::temp_files::{TempWorkspace, create_staging_file, persist_staging_file};
use crate::utils::{ensure_input_file, ensure_parent_dir, format_duration};

/// Lifecycle state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Init,
    FramesExtracted,
    FramesUpscaled,
    Assembled,
    Done,
    Failed,
}

impl PipelineState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Init, FramesExtracted)
            | (FramesExtracted, FramesUpscaled)
            | (FramesUpscaled, Assembled)
            | (Assembled, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "init",
            PipelineState::FramesExtracted => "frames extracted",
            PipelineState::FramesUpscaled => "frames upscaled",
            PipelineState::Assembled => "assembled",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Where the output frame rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FpsSource {
    Configured,
    Probed,
    Fallback,
}

impl fmt::Display for FpsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FpsSource::Configured => "configured",
            FpsSource::Probed => "probed",
            FpsSource::Fallback => "fallback",
        })
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoUpscaleReport {
    pub output: PathBuf,
    pub fps: u32,
    pub fps_source: FpsSource,
    /// Approximate count from the upscaler's output; diagnostic only
    pub frames_reported: usize,
    pub state: PipelineState,
    /// Temp directories left behind when `keep_temp` was set
    pub kept_temp_dirs: Option<(PathBuf, PathBuf)>,
}

/// Picks the output frame rate: configured > 0, else probed > 0, else 30.
#[must_use]
pub fn resolve_fps(configured: u32, probed: Option<u32>) -> (u32, FpsSource) {
    if configured > 0 {
        return (configured, FpsSource::Configured);
    }
    match probed {
        Some(fps) if fps > 0 => (fps, FpsSource::Probed),
        _ => (DEFAULT_FALLBACK_FPS, FpsSource::Fallback),
    }
}

/// Tracks the current state and logs every transition.
struct StateTracker {
    state: PipelineState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            state: PipelineState::Init,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        debug!("Pipeline state: {} -> {next}", self.state);
        self.state = next;
    }
}

/// The extract / upscale / reassemble pipeline.
#[derive(Debug, Clone)]
pub struct VideoUpscalePipeline<R: CommandRunner> {
    runner: R,
    config: EngineConfig,
    options: RunOptions,
}

impl<R: CommandRunner> VideoUpscalePipeline<R> {
    pub fn new(runner: R, config: &EngineConfig) -> Self {
        Self {
            runner,
            config: config.clone(),
            options: RunOptions::from_config(config),
        }
    }

    /// Replaces the run options (timeout, cancellation) shared by all stages.
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Upscales `input` into `output`.
    ///
    /// Errors are wrapped in `CoreError::Stage` naming the stage that failed.
    /// Temp directories are removed before this returns, whatever the outcome,
    /// unless `config.keep_temp` is set.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        config: &VideoUpscaleConfig,
    ) -> CoreResult<VideoUpscaleReport> {
        let started = Instant::now();
        let mut tracker = StateTracker::new();

        let result = self.run_stages(input, output, config, &mut tracker);
        match &result {
            Ok(report) => info!(
                "Upscaled {} -> {} at {} fps in {}",
                input.display(),
                output.display(),
                report.fps,
                format_duration(started.elapsed().as_secs_f64())
            ),
            Err(e) => {
                error!("Video upscale of {} failed: {e}", input.display());
                tracker.advance(PipelineState::Failed);
            }
        }
        result
    }

    fn run_stages(
        &self,
        input: &Path,
        output: &Path,
        config: &VideoUpscaleConfig,
        tracker: &mut StateTracker,
    ) -> CoreResult<VideoUpscaleReport> {
        let setup = |e: CoreError| e.in_stage(PipelineStage::Setup);
        config.validate().map_err(setup)?;
        ensure_input_file(input).map_err(setup)?;
        ensure_parent_dir(output).map_err(setup)?;

        // Dropped on every return below, removing both directories
        let workspace = TempWorkspace::create(&self.config.temp_root(), config.keep_temp)
            .map_err(setup)?;

        let stage_options = |tag: &str| {
            self.options
                .clone()
                .with_tag(tag)
                .with_verbose(config.verbose)
        };

        // Extract
        info!("Extracting frames from {}", input.display());
        let extract = build_extract_frames_command(
            &self.config.ffmpeg_path,
            input,
            workspace.frames_dir(),
            &config.frame_format,
        );
        self.runner
            .run(&extract, &stage_options("ffmpeg extract"))
            .and_then(|out| out.into_result(extract.name()))
            .map_err(|e| e.in_stage(PipelineStage::Extract))?;
        tracker.advance(PipelineState::FramesExtracted);

        // Upscale
        info!("Upscaling frames ({}x)", config.upscale_config().effective_scale());
        let upscaler = ImageUpscaler::new(&self.runner, &self.config)
            .with_options(stage_options("waifu2x"));
        let frames_reported = upscaler
            .upscale_batch(
                workspace.frames_dir(),
                workspace.upscaled_dir(),
                &config.upscale_config(),
            )
            .map_err(|e| e.in_stage(PipelineStage::Upscale))?;
        tracker.advance(PipelineState::FramesUpscaled);

        // Frame rate
        let probed = if config.fps > 0 {
            None
        } else {
            FrameRateProber::new(&self.runner, &self.config)
                .with_options(stage_options("ffprobe"))
                .probe(input)
        };
        let (fps, fps_source) = resolve_fps(config.fps, probed);
        if fps_source == FpsSource::Fallback {
            warn!(
                "Could not determine the frame rate of {}; using {fps} fps",
                input.display()
            );
        }

        // Assemble
        info!("Reassembling video at {fps} fps");
        let assemble_stage = |e: CoreError| e.in_stage(PipelineStage::Assemble);
        let staging = create_staging_file(output).map_err(assemble_stage)?;
        let assemble = build_assemble_video_command(
            &self.config.ffmpeg_path,
            workspace.upscaled_dir(),
            input,
            staging.path(),
            fps,
            config,
        );
        self.runner
            .run(&assemble, &stage_options("ffmpeg assemble"))
            .and_then(|out| out.into_result(assemble.name()))
            .map_err(assemble_stage)?;
        persist_staging_file(staging, output).map_err(assemble_stage)?;
        tracker.advance(PipelineState::Assembled);

        let kept_temp_dirs = workspace.keeps_files().then(|| {
            (
                workspace.frames_dir().to_path_buf(),
                workspace.upscaled_dir().to_path_buf(),
            )
        });
        drop(workspace);
        tracker.advance(PipelineState::Done);

        Ok(VideoUpscaleReport {
            output: output.to_path_buf(),
            fps,
            fps_source,
            frames_reported,
            state: tracker.state,
            kept_temp_dirs,
        })
    }
}
