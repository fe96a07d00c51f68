// refract-cli/src/config.rs
//
// Turns the global command-line options into the engine configuration.
// A `--config` file supplies the base; flags and REFRACT_* environment
// variables (resolved by clap) override individual fields.

use std::time::Duration;

use log::debug;
use refract_core::{CoreResult, EngineConfig, EngineConfigBuilder};

use crate::cli::GlobalArgs;

/// Builds and validates the engine configuration for this invocation.
pub fn build_engine_config(args: &GlobalArgs) -> CoreResult<EngineConfig> {
    let base = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    let mut builder = EngineConfigBuilder::from_config(base);
    if let Some(path) = &args.ffmpeg {
        builder = builder.ffmpeg_path(path);
    }
    if let Some(path) = &args.ffprobe {
        builder = builder.ffprobe_path(path);
    }
    if let Some(path) = &args.waifu2x {
        builder = builder.waifu2x_path(path);
    }
    if let Some(dir) = &args.model_dir {
        builder = builder.model_dir(dir);
    }
    if let Some(dir) = &args.temp_dir {
        builder = builder.temp_dir(dir);
    }
    if let Some(secs) = args.timeout {
        builder = builder.command_timeout(Duration::from_secs(secs));
    }

    let config = builder.build();
    config.validate()?;
    debug!("Engine configuration: {config:?}");
    Ok(config)
}
