//! Video compression through ffmpeg.
//!
//! Builds the encoder passes for a `VideoCompressionConfig` and runs them in
//! order against a staging file beside the destination. The staging file is
//! only renamed onto the output after the final pass succeeds; the first
//! failing pass ends the run and later passes never start.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};

use crate::config::{EngineConfig, VideoCompressionConfig};
use crate::error::CoreResult;
use crate::external::{CommandRunner, RunOptions, build_compress_video_passes};
use crate::temp_files::{create_staging_file, create_temp_dir, persist_staging_file};
use crate::utils::{ensure_input_file, ensure_parent_dir, format_duration};

/// File name prefix ffmpeg uses for two-pass statistics inside the log dir.
const PASSLOG_PREFIX: &str = "ffmpeg2pass";

/// Runs single- or two-pass ffmpeg encodes.
#[derive(Debug, Clone)]
pub struct VideoCompressor<R: CommandRunner> {
    runner: R,
    ffmpeg_path: PathBuf,
    temp_root: PathBuf,
    options: RunOptions,
}

impl<R: CommandRunner> VideoCompressor<R> {
    pub fn new(runner: R, config: &EngineConfig) -> Self {
        Self {
            runner,
            ffmpeg_path: config.ffmpeg_path.clone(),
            temp_root: config.temp_root(),
            options: RunOptions::from_config(config),
        }
    }

    /// Replaces the run options (timeout, cancellation) used for each pass.
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Compresses `input` into `output` according to `config`.
    pub fn compress(
        &self,
        input: &Path,
        output: &Path,
        config: &VideoCompressionConfig,
    ) -> CoreResult<()> {
        config.validate()?;
        ensure_input_file(input)?;
        ensure_parent_dir(output)?;

        let staging = create_staging_file(output)?;
        // Both passes share this prefix; a private dir keeps concurrent runs apart
        let passlog_dir = if config.uses_two_pass() {
            Some(create_temp_dir(&self.temp_root, "refract_passlog_")?)
        } else {
            None
        };
        let passlog_prefix = passlog_dir
            .as_ref()
            .map(|dir| dir.path().join(PASSLOG_PREFIX));

        let passes = build_compress_video_passes(
            &self.ffmpeg_path,
            input,
            staging.path(),
            config,
            passlog_prefix.as_deref(),
        );

        let started = Instant::now();
        let total = passes.len();
        for (index, pass) in passes.iter().enumerate() {
            let tag = if total > 1 {
                format!("ffmpeg pass {}/{total}", index + 1)
            } else {
                "ffmpeg".to_string()
            };
            debug!("Starting {tag} for {}", input.display());
            let options = self
                .options
                .clone()
                .with_tag(tag)
                .with_verbose(config.verbose);
            self.runner
                .run(pass, &options)?
                .into_result(pass.name())?;
        }

        persist_staging_file(staging, output)?;
        info!(
            "Compressed {} -> {} in {}",
            input.display(),
            output.display(),
            format_duration(started.elapsed().as_secs_f64())
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfigBuilder;
    use crate::error::CoreError;
    use crate::external::mocks::MockRunner;
    use std::fs;

    fn engine_config(temp: &Path) -> EngineConfig {
        EngineConfigBuilder::new().temp_dir(temp).build()
    }

    #[test]
    fn test_single_pass_publishes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        let output = dir.path().join("out/compressed.mp4");
        fs::write(&input, b"video").unwrap();

        let runner = MockRunner::new();
        runner.add_success_with_output("-crf", &[]);
        let compressor = VideoCompressor::new(&runner, &engine_config(dir.path()));
        compressor
            .compress(&input, &output, &VideoCompressionConfig::default())
            .unwrap();

        assert!(output.is_file());
        assert_eq!(runner.received_calls().len(), 1);
        // Only the input and the output directory remain
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_pass_two_skipped_when_pass_one_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        let output = dir.path().join("out.mp4");
        fs::write(&input, b"video").unwrap();

        let runner = MockRunner::new();
        runner.add_exit_failure("null", 1, &["Error initializing output stream"]);
        runner.add_success_with_output("2", &[]);

        let config = VideoCompressionConfig {
            two_pass: true,
            target_bitrate_kbps: Some(1200),
            ..Default::default()
        };
        let err = VideoCompressor::new(&runner, &engine_config(dir.path()))
            .compress(&input, &output, &config)
            .unwrap_err();

        assert!(matches!(err, CoreError::CommandFailed { exit_code: 1, .. }));
        assert_eq!(runner.received_calls().len(), 1);
        assert!(!output.exists());
        // Staging file and pass log dir were cleaned up
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_two_pass_runs_in_order_with_shared_passlog() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        let output = dir.path().join("out.mp4");
        fs::write(&input, b"video").unwrap();

        let runner = MockRunner::new();
        runner.add_success("null", &[]);
        runner.add_success_with_output("-b:v", &[]);

        let config = VideoCompressionConfig {
            two_pass: true,
            target_bitrate_kbps: Some(1200),
            ..Default::default()
        };
        VideoCompressor::new(&runner, &engine_config(dir.path()))
            .compress(&input, &output, &config)
            .unwrap();

        let calls = runner.received_commands();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].has_option("-pass", "1"));
        assert!(calls[1].has_option("-pass", "2"));
        let log_of = |i: usize| {
            let args = calls[i].args_lossy();
            let pos = args.iter().position(|a| a == "-passlogfile").unwrap();
            args[pos + 1].clone()
        };
        assert_eq!(log_of(0), log_of(1));
        assert!(output.is_file());
    }

    #[test]
    fn test_missing_input_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        let err = VideoCompressor::new(&runner, &engine_config(dir.path()))
            .compress(
                &dir.path().join("missing.mp4"),
                &dir.path().join("out.mp4"),
                &VideoCompressionConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InputNotFound(_)));
        assert!(runner.received_calls().is_empty());
    }
}
