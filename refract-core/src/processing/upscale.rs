//! Super-resolution upscaling of single images and frame directories.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::{EngineConfig, UpscaleConfig};
use crate::error::CoreResult;
use crate::external::{
    CommandRunner, RunOptions, build_upscale_batch_command, build_upscale_command, probe_tool,
};
use crate::utils::{ensure_input_dir, ensure_input_file, ensure_parent_dir};

/// Marker the upscaler prints once per finished image.
const DONE_MARKER: &str = "done";

/// Drives the waifu2x-compatible upscaler.
#[derive(Debug, Clone)]
pub struct ImageUpscaler<R: CommandRunner> {
    runner: R,
    waifu2x_path: PathBuf,
    model_dir: Option<PathBuf>,
    options: RunOptions,
}

impl<R: CommandRunner> ImageUpscaler<R> {
    pub fn new(runner: R, config: &EngineConfig) -> Self {
        Self {
            runner,
            waifu2x_path: config.waifu2x_path.clone(),
            model_dir: config.model_dir.clone(),
            options: RunOptions::from_config(config).with_tag("waifu2x"),
        }
    }

    /// Replaces the run options (timeout, cancellation) used for each call.
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options.with_tag("waifu2x");
        self
    }

    /// Upscales one image into `output`. Success is the tool's exit code.
    pub fn upscale(&self, input: &Path, output: &Path, config: &UpscaleConfig) -> CoreResult<()> {
        ensure_input_file(input)?;
        ensure_parent_dir(output)?;

        let command = build_upscale_command(
            &self.waifu2x_path,
            input,
            output,
            config,
            self.model_dir.as_deref(),
        );
        let options = self.options.clone().with_verbose(config.verbose);
        self.runner
            .run(&command, &options)?
            .into_result(command.name())?;

        info!(
            "Upscaled {} -> {} ({}x)",
            input.display(),
            output.display(),
            config.effective_scale()
        );
        Ok(())
    }

    /// Upscales every image in `input_dir` into `output_dir`.
    ///
    /// Returns the number of output lines containing the tool's `done`
    /// marker. The count is diagnostic only: it depends on the tool's
    /// verbosity and may be zero even when every frame was processed.
    pub fn upscale_batch(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        config: &UpscaleConfig,
    ) -> CoreResult<usize> {
        ensure_input_dir(input_dir)?;
        std::fs::create_dir_all(output_dir)?;

        let command = build_upscale_batch_command(
            &self.waifu2x_path,
            input_dir,
            output_dir,
            config,
            self.model_dir.as_deref(),
        );
        let options = self.options.clone().with_verbose(config.verbose);

        let mut processed = 0usize;
        let mut count_done = |line: &str| {
            if line.contains(DONE_MARKER) {
                processed += 1;
            }
        };
        self.runner
            .run_with_observer(&command, &options, &mut count_done)?
            .into_result(command.name())?;

        debug!(
            "Batch upscale of {} reported {processed} finished images",
            input_dir.display()
        );
        Ok(processed)
    }

    /// The upscaler answers `-h` with exit code 0 or 1 when it is installed.
    pub fn is_available(&self) -> bool {
        probe_tool(&self.runner, &self.waifu2x_path, "-h", &[0, 1])
    }
}
