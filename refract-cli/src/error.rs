// ============================================================================
// refract-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Result alias and process exit codes
//
// The CLI reuses the core error type; this module only decides how a
// `CoreError` is reported to the shell.
//
// KEY COMPONENTS:
// - CliResult: Type alias for CLI operations
// - exit_code: Maps an error onto the process exit status

use refract_core::{CoreError, CoreResult};

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Exit status for a successful run.
pub const EXIT_OK: i32 = 0;

/// Exit status for a failed operation.
pub const EXIT_FAILURE: i32 = 1;

/// Exit status when an external command exceeded `--timeout`.
pub const EXIT_TIMEOUT: i32 = 124;

/// Exit status when the run was interrupted.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Process exit status for an error, looking through pipeline stage wrappers.
#[must_use]
pub fn exit_code(err: &CoreError) -> i32 {
    match err.root() {
        CoreError::CommandTimeout(..) => EXIT_TIMEOUT,
        CoreError::Interrupted(_) => EXIT_INTERRUPTED,
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refract_core::PipelineStage;
    use std::time::Duration;

    #[test]
    fn test_exit_codes() {
        let timeout = CoreError::CommandTimeout("ffmpeg".into(), Duration::from_secs(3));
        assert_eq!(exit_code(&timeout), EXIT_TIMEOUT);

        let staged = CoreError::Interrupted("waifu2x".into()).in_stage(PipelineStage::Upscale);
        assert_eq!(exit_code(&staged), EXIT_INTERRUPTED);

        let missing = CoreError::Config("bad".into());
        assert_eq!(exit_code(&missing), EXIT_FAILURE);
    }
}
