// ============================================================================
// refract-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Custom Error Types for refract-core
//
// This module defines the error taxonomy shared by every component of the
// pipeline engine. Every public operation returns `CoreResult<T>`; a failure
// inside one component is converted into a `CoreError` at that component's
// boundary and never escapes as a panic.
//
// KEY COMPONENTS:
// - CoreError: the error enum covering missing inputs, decode/encode failures,
//   unsupported formats, external tool failures, timeouts and interruption
// - CoreResult: result alias used throughout the crate
// - Helper constructors for the common command-failure shapes

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The stage of the video upscale pipeline an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Setup,
    Extract,
    Upscale,
    Assemble,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Setup => "setup",
            PipelineStage::Extract => "frame extraction",
            PipelineStage::Upscale => "frame upscaling",
            PipelineStage::Assemble => "video assembly",
        };
        f.write_str(name)
    }
}

/// Custom error types for refract-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to decode '{path}': {message}")]
    Decode { path: String, message: String },

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Command '{tool}' failed with exit code {exit_code}: {}", summarize(.diagnostics))]
    CommandFailed {
        tool: String,
        exit_code: i32,
        diagnostics: Vec<String>,
    },

    #[error("Dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, #[source] std::io::Error),

    #[error("Failed while waiting on command '{0}': {1}")]
    CommandWait(String, #[source] std::io::Error),

    #[error("Command '{0}' timed out after {1:?}")]
    CommandTimeout(String, Duration),

    #[error("Interrupted while waiting on command '{0}'")]
    Interrupted(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("Pipeline {stage} stage failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<CoreError>,
    },
}

/// Result type for refract-core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Stable machine-readable code for this error, for structured results.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Io(_) => "io_error",
            CoreError::Json(_) => "invalid_config_file",
            CoreError::InputNotFound(_) => "input_not_found",
            CoreError::Decode { .. } => "decode_failed",
            CoreError::Encode(_) => "encode_failed",
            CoreError::UnsupportedFormat(_) => "unsupported_format",
            CoreError::CommandFailed { .. } => "tool_failed",
            CoreError::DependencyNotFound(_) | CoreError::CommandStart(..) => "tool_unavailable",
            CoreError::CommandWait(..) => "tool_failed",
            CoreError::CommandTimeout(..) => "timeout",
            CoreError::Interrupted(_) => "interrupted",
            CoreError::Config(_) => "invalid_config",
            CoreError::PathError(_) => "path_error",
            CoreError::Stage { source, .. } => source.code(),
        }
    }

    /// Wraps this error with the pipeline stage it occurred in.
    #[must_use]
    pub fn in_stage(self, stage: PipelineStage) -> Self {
        CoreError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, unwrapping any stage wrappers.
    #[must_use]
    pub fn root(&self) -> &CoreError {
        match self {
            CoreError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Last diagnostic line, used to keep the Display form to a single line.
fn summarize(diagnostics: &[String]) -> String {
    diagnostics
        .iter()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "no output".to_string())
}

/// Creates a `CommandFailed` error from a finished process.
pub fn command_failed_error(
    tool: impl Into<String>,
    exit_code: i32,
    diagnostics: Vec<String>,
) -> CoreError {
    CoreError::CommandFailed {
        tool: tool.into(),
        exit_code,
        diagnostics,
    }
}

/// Maps a spawn failure to `DependencyNotFound` or `CommandStart`.
pub fn command_start_error(tool: impl Into<String>, err: std::io::Error) -> CoreError {
    let tool = tool.into();
    if err.kind() == std::io::ErrorKind::NotFound {
        CoreError::DependencyNotFound(tool)
    } else {
        CoreError::CommandStart(tool, err)
    }
}
