// ============================================================================
// refract-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffmpeg, ffprobe and the Upscaler
//
// This module encapsulates everything that touches an external executable:
// argument building, process execution, frame-rate probing and availability
// checks. Execution goes through the `CommandRunner` trait so the components
// above it can be driven by `MockRunner` in tests.
//
// KEY COMPONENTS:
// - ToolCommand: program + argv for one invocation
// - Argument builders for extraction, upscaling, compression, probing and
//   reassembly
// - CommandRunner / SystemRunner: process execution
// - FrameRateProber: ffprobe-backed frame-rate detection
// - Availability probes and a `which`-based tool report

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

// ============================================================================
// SUBMODULES
// ============================================================================

pub mod builders;
pub mod command;
pub mod probe;
pub mod runner;

#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use builders::{
    build_assemble_video_command, build_compress_video_command, build_compress_video_passes,
    build_extract_frames_command, build_probe_frame_rate_command, build_upscale_batch_command,
    build_upscale_command, frame_pattern, null_sink, scale_filter,
};
pub use command::ToolCommand;
pub use probe::{FrameRateProber, parse_frame_rate};
pub use runner::{CommandRunner, MAX_DIAGNOSTIC_LINES, ProcessOutput, RunOptions, SystemRunner};

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Upper bound on an availability probe, so a hung binary can't block startup.
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(15);

/// Runs `program probe_arg` and reports whether it exited with one of
/// `accepted_codes`. A spawn failure or timeout counts as unavailable.
pub fn probe_tool<R: CommandRunner>(
    runner: &R,
    program: &Path,
    probe_arg: &str,
    accepted_codes: &[i32],
) -> bool {
    let command = ToolCommand::new(program).arg(probe_arg);
    let options = RunOptions::new("availability").with_timeout(Some(AVAILABILITY_TIMEOUT));
    match runner.run(&command, &options) {
        Ok(output) => {
            let available = accepted_codes.contains(&output.exit_code);
            debug!(
                "{} {probe_arg} exited with {} (available: {available})",
                program.display(),
                output.exit_code
            );
            available
        }
        Err(e) => {
            debug!("{} is unavailable: {e}", program.display());
            false
        }
    }
}

/// ffmpeg is available when `-version` exits 0.
pub fn is_ffmpeg_available<R: CommandRunner>(runner: &R, config: &EngineConfig) -> bool {
    probe_tool(runner, &config.ffmpeg_path, "-version", &[0])
}

/// ffprobe is available when `-version` exits 0.
pub fn is_ffprobe_available<R: CommandRunner>(runner: &R, config: &EngineConfig) -> bool {
    probe_tool(runner, &config.ffprobe_path, "-version", &[0])
}

/// The upscaler prints usage for `-h` and exits 0 or 1 depending on the build.
pub fn is_waifu2x_available<R: CommandRunner>(runner: &R, config: &EngineConfig) -> bool {
    probe_tool(runner, &config.waifu2x_path, "-h", &[0, 1])
}

// ============================================================================
// TOOL REPORT
// ============================================================================

/// Resolution and availability of one configured tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool role (ffmpeg, ffprobe, waifu2x).
    pub name: String,
    /// Configured executable, as given.
    pub configured: PathBuf,
    /// Whether the availability probe passed.
    pub available: bool,
    /// Executable resolved through `PATH`, if it could be found.
    pub path: Option<PathBuf>,
}

/// Resolves `program` like the OS would: paths with a separator are used as
/// given when they exist, bare names are searched on `PATH`.
#[must_use]
pub fn resolve_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    which::which(program).ok()
}

/// Checks every configured tool and returns one entry per tool.
pub fn tool_report<R: CommandRunner>(runner: &R, config: &EngineConfig) -> Vec<ToolInfo> {
    [
        ("ffmpeg", &config.ffmpeg_path, is_ffmpeg_available(runner, config)),
        ("ffprobe", &config.ffprobe_path, is_ffprobe_available(runner, config)),
        ("waifu2x", &config.waifu2x_path, is_waifu2x_available(runner, config)),
    ]
    .into_iter()
    .map(|(name, configured, available)| ToolInfo {
        name: name.to_string(),
        configured: configured.clone(),
        available,
        path: resolve_executable(configured),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::MockRunner;

    #[test]
    fn test_waifu2x_accepts_exit_one() {
        let runner = MockRunner::new();
        runner.add_exit_failure("waifu2x", 1, &["Usage: waifu2x-ncnn-vulkan -i infile"]);
        assert!(is_waifu2x_available(&runner, &EngineConfig::default()));

        runner.add_exit_failure("waifu2x", 2, &[]);
        assert!(!is_waifu2x_available(&runner, &EngineConfig::default()));
    }

    #[test]
    fn test_ffmpeg_requires_exit_zero() {
        let runner = MockRunner::new();
        runner.add_exit_failure("-version", 1, &[]);
        assert!(!is_ffmpeg_available(&runner, &EngineConfig::default()));

        runner.add_success("-version", &["ffmpeg version 7.0"]);
        assert!(is_ffmpeg_available(&runner, &EngineConfig::default()));

        // No expectation left: behaves like a missing binary
        assert!(!is_ffprobe_available(&runner, &EngineConfig::default()));
    }

    #[test]
    fn test_resolve_executable_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-ffmpeg");
        std::fs::write(&tool, b"").unwrap();
        assert_eq!(resolve_executable(&tool), Some(tool.clone()));
        assert_eq!(resolve_executable(&dir.path().join("missing")), None);
    }

    #[test]
    fn test_tool_report_lists_all_tools() {
        let runner = MockRunner::new();
        runner.add_success("ffmpeg", &[]);
        let report = tool_report(&runner, &EngineConfig::default());
        let names: Vec<_> = report.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["ffmpeg", "ffprobe", "waifu2x"]);
        assert!(report[0].available);
        assert!(!report[2].available);
    }
}
