//! Frame-rate detection through ffprobe.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::builders::build_probe_frame_rate_command;
use super::runner::{CommandRunner, RunOptions};
use crate::config::EngineConfig;

/// Parses an ffprobe `r_frame_rate` value into whole frames per second.
///
/// Accepts `num/den` or a plain decimal and rounds to the nearest integer.
/// A zero denominator yields `Some(0)`; anything unparsable yields `None`.
///
/// ```rust
/// use refract_core::external::parse_frame_rate;
///
/// assert_eq!(parse_frame_rate("30000/1001"), Some(30));
/// assert_eq!(parse_frame_rate("25"), Some(25));
/// assert_eq!(parse_frame_rate("24/0"), Some(0));
/// assert_eq!(parse_frame_rate("N/A"), None);
/// ```
#[must_use]
pub fn parse_frame_rate(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return Some(0);
            }
            num / den
        }
        None => value.parse::<f64>().ok()?,
    };

    if !rate.is_finite() || rate < 0.0 {
        return None;
    }
    let rounded = rate.round();
    if rounded > f64::from(u32::MAX) {
        return None;
    }
    Some(rounded as u32)
}

/// Detects the frame rate of a video's first video stream.
#[derive(Debug, Clone)]
pub struct FrameRateProber<R: CommandRunner> {
    runner: R,
    ffprobe_path: PathBuf,
    options: RunOptions,
}

impl<R: CommandRunner> FrameRateProber<R> {
    pub fn new(runner: R, config: &EngineConfig) -> Self {
        Self {
            runner,
            ffprobe_path: config.ffprobe_path.clone(),
            options: RunOptions::from_config(config).with_tag("ffprobe"),
        }
    }

    /// Replaces the run options (timeout, cancellation) used for the probe.
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options.with_tag("ffprobe");
        self
    }

    /// Returns the rounded frame rate, or `None` if the probe fails or its
    /// output can't be parsed. Never returns an error.
    pub fn probe(&self, input: &Path) -> Option<u32> {
        let command = build_probe_frame_rate_command(&self.ffprobe_path, input);
        let output = match self.runner.run(&command, &self.options) {
            Ok(output) => output,
            Err(e) => {
                warn!("Frame-rate probe of {} could not run: {e}", input.display());
                return None;
            }
        };

        if !output.success {
            debug!(
                "Frame-rate probe of {} exited with code {}",
                input.display(),
                output.exit_code
            );
            return None;
        }

        let fps = output.first_line().and_then(parse_frame_rate);
        debug!("Probed frame rate for {}: {fps:?}", input.display());
        fps
    }
}
