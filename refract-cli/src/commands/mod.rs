//! Command implementations for the CLI.
//!
//! Each submodule maps one group of subcommands onto `MediaEngine` calls and
//! returns a `CommandReport` for presentation.

pub mod image;
pub mod tools;
pub mod video;

use refract_core::{CommandRunner, MediaEngine};

use crate::cli::Commands;
use crate::error::CliResult;
use crate::output::CommandReport;

/// Per-invocation settings every command needs besides its own arguments.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    /// Forwarded to the tool configs so their output is logged
    pub verbose: bool,
    /// Whether a spinner may be drawn while tools run
    pub show_progress: bool,
}

/// Runs the parsed subcommand against `engine`.
pub fn dispatch<R: CommandRunner>(
    engine: &MediaEngine<R>,
    command: Commands,
    ctx: CommandContext,
) -> CliResult<CommandReport> {
    match command {
        Commands::CompressImage(args) => image::run_compress_image(engine, args),
        Commands::ImageInfo(args) => image::run_image_info(engine, args),
        Commands::UpscaleImage(args) => image::run_upscale_image(engine, args, ctx),
        Commands::CompressVideo(args) => video::run_compress_video(engine, args, ctx),
        Commands::UpscaleVideo(args) => video::run_upscale_video(engine, args, ctx),
        Commands::Tools => Ok(tools::run_tools(engine)),
    }
}
