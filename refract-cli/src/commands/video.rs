// ============================================================================
// refract-cli/src/commands/video.rs
// ============================================================================
//
// VIDEO COMMANDS: compress-video and upscale-video
//
// Both commands start from the core defaults and apply only the flags the
// user passed, so the engine remains the single owner of default values.

use std::time::Instant;

use refract_core::config::{EncoderPreset, VideoCompressionConfig, VideoUpscaleConfig};
use refract_core::geometry::ResizeBounds;
use refract_core::{CommandRunner, MediaEngine, format_bytes, format_duration};
use serde_json::json;

use crate::cli::{CompressVideoArgs, EncoderFlags, UpscaleVideoArgs};
use crate::commands::CommandContext;
use crate::error::CliResult;
use crate::output::CommandReport;
use crate::progress::with_spinner;

/// Applies the shared encoder flags; `None` keeps the config's value.
fn apply_encoder_flags(
    flags: &EncoderFlags,
    crf: &mut u8,
    preset: &mut EncoderPreset,
    codec: &mut String,
    pixel_format: &mut String,
    copy_audio: &mut bool,
) {
    if let Some(value) = flags.crf {
        *crf = value;
    }
    if let Some(value) = flags.preset {
        *preset = value;
    }
    if let Some(value) = &flags.codec {
        codec.clone_from(value);
    }
    if let Some(value) = &flags.pixel_format {
        pixel_format.clone_from(value);
    }
    if flags.reencode_audio {
        *copy_audio = false;
    }
}

fn compression_config(args: &CompressVideoArgs, verbose: bool) -> CliResult<VideoCompressionConfig> {
    let mut config = VideoCompressionConfig {
        verbose,
        ..Default::default()
    };
    apply_encoder_flags(
        &args.encoder,
        &mut config.crf,
        &mut config.preset,
        &mut config.video_codec,
        &mut config.pixel_format,
        &mut config.copy_audio,
    );
    if args.max_width.is_some() || args.max_height.is_some() {
        config.bounds = ResizeBounds::new(
            args.max_width.unwrap_or(config.bounds.max_width),
            args.max_height.unwrap_or(config.bounds.max_height),
        )?;
    }
    config.target_bitrate_kbps = args.bitrate;
    config.two_pass = args.two_pass;
    config.validate()?;
    Ok(config)
}

fn upscale_config(args: &UpscaleVideoArgs, verbose: bool) -> CliResult<VideoUpscaleConfig> {
    let mut config = VideoUpscaleConfig {
        scale_factor: args.upscale.scale,
        noise_level: args.upscale.noise,
        tile_size: args.upscale.tile,
        keep_temp: args.keep_temp,
        verbose,
        ..Default::default()
    };
    apply_encoder_flags(
        &args.encoder,
        &mut config.crf,
        &mut config.preset,
        &mut config.video_codec,
        &mut config.pixel_format,
        &mut config.copy_audio,
    );
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(format) = &args.frame_format {
        config.frame_format.clone_from(format);
    }
    config.validate()?;
    Ok(config)
}

pub fn run_compress_video<R: CommandRunner>(
    engine: &MediaEngine<R>,
    args: CompressVideoArgs,
    ctx: CommandContext,
) -> CliResult<CommandReport> {
    let config = compression_config(&args, ctx.verbose)?;
    let started = Instant::now();
    with_spinner("Compressing video", ctx.show_progress && !ctx.verbose, || {
        engine.compress_video(&args.input, &args.output, &config)
    })?;
    let elapsed = started.elapsed().as_secs_f64();

    let size = std::fs::metadata(&args.output).map(|m| m.len()).unwrap_or(0);
    let mode = match (config.bitrate(), config.uses_two_pass()) {
        (Some(kbps), true) => format!("two-pass {kbps} kbit/s"),
        (Some(kbps), false) => format!("{kbps} kbit/s"),
        (None, _) => format!("crf {}", config.crf),
    };
    Ok(CommandReport::ok(format!("Compressed {}", args.input.display()))
        .detail("Output", args.output.display())
        .detail("Rate control", &mode)
        .detail("Preset", config.preset)
        .detail("Output size", format_bytes(size))
        .detail("Time", format_duration(elapsed))
        .with_data(json!({
            "output": args.output.display().to_string(),
            "rate_control": mode,
            "two_pass": config.uses_two_pass(),
            "output_size": size,
            "seconds": elapsed,
        })))
}

pub fn run_upscale_video<R: CommandRunner>(
    engine: &MediaEngine<R>,
    args: UpscaleVideoArgs,
    ctx: CommandContext,
) -> CliResult<CommandReport> {
    let config = upscale_config(&args, ctx.verbose)?;
    let started = Instant::now();
    let report = with_spinner("Upscaling video", ctx.show_progress && !ctx.verbose, || {
        engine.upscale_video(&args.input, &args.output, &config)
    })?;
    let elapsed = started.elapsed().as_secs_f64();

    let mut out = CommandReport::ok(format!("Upscaled {}", args.input.display()))
        .detail("Output", report.output.display())
        .detail("Scale", format!("{}x", config.upscale_config().effective_scale()))
        .detail("Frame rate", format!("{} fps ({})", report.fps, report.fps_source))
        .detail("Time", format_duration(elapsed));
    if let Some((frames, upscaled)) = &report.kept_temp_dirs {
        out = out
            .detail("Frames", frames.display())
            .detail("Upscaled frames", upscaled.display());
    }
    Ok(out.with_data(json!({
        "report": report,
        "seconds": elapsed,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use refract_core::config::NoiseLevel;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn test_compression_flags_map_onto_config() {
        let Commands::CompressVideo(args) = parse(&[
            "refract", "compress-video", "in.mp4", "out.mp4", "--bitrate", "1500", "--two-pass",
            "--preset", "veryslow", "--reencode-audio", "--max-width", "1280",
        ]) else {
            panic!("expected compress-video");
        };
        let config = compression_config(&args, false).unwrap();

        assert_eq!(config.target_bitrate_kbps, Some(1500));
        assert!(config.uses_two_pass());
        assert_eq!(config.preset, EncoderPreset::Veryslow);
        assert!(!config.copy_audio);
        assert_eq!(config.bounds.max_width, 1280);
        assert_eq!(config.bounds.max_height, 1080);
    }

    #[test]
    fn test_compression_defaults_untouched() {
        let Commands::CompressVideo(args) = parse(&["refract", "compress-video", "in.mp4", "out.mp4"]) else {
            panic!("expected compress-video");
        };
        assert_eq!(compression_config(&args, false).unwrap(), VideoCompressionConfig::default());
    }

    #[test]
    fn test_out_of_range_crf_rejected() {
        let Commands::CompressVideo(args) =
            parse(&["refract", "compress-video", "in.mp4", "out.mp4", "--crf", "60"])
        else {
            panic!("expected compress-video");
        };
        assert!(compression_config(&args, false).is_err());
    }

    #[test]
    fn test_upscale_flags_map_onto_config() {
        let Commands::UpscaleVideo(args) = parse(&[
            "refract", "upscale-video", "in.mp4", "out.mp4", "--scale", "4", "--noise", "high",
            "--fps", "24", "--crf", "20", "--keep-temp",
        ]) else {
            panic!("expected upscale-video");
        };
        let config = upscale_config(&args, true).unwrap();

        assert_eq!(config.scale_factor, 4);
        assert_eq!(config.noise_level, NoiseLevel::High);
        assert_eq!(config.fps, 24);
        assert_eq!(config.crf, 20);
        assert!(config.keep_temp);
        assert!(config.verbose);
        assert_eq!(config.preset, EncoderPreset::Slow);
    }
}
