// ============================================================================
// refract-cli/src/commands/image.rs
// ============================================================================
//
// IMAGE COMMANDS: compress-image, image-info and upscale-image
//
// WORKFLOW (compress-image):
// 1. A directory input compresses every supported image into OUTPUT
// 2. --if-needed copies small files unchanged and compresses large ones
// 3. --scale resizes by a factor; otherwise the image is fit into the bounds

use std::path::Path;

use log::warn;
use refract_core::config::{
    DEFAULT_IMAGE_QUALITY, ImageCompressionConfig, UpscaleConfig,
};
use refract_core::utils::calculate_size_reduction;
use refract_core::{
    CommandRunner, CompressIfNeededOutcome, CoreError, Dimensions, MediaEngine, ResizeBounds,
    format_bytes,
};
use serde_json::json;

use crate::cli::{CompressImageArgs, ImageInfoArgs, UpscaleImageArgs};
use crate::commands::CommandContext;
use crate::error::CliResult;
use crate::output::CommandReport;
use crate::progress::with_spinner;

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Bounds from the flags, defaulting each missing axis.
fn bounds_from_args(args: &CompressImageArgs) -> CliResult<ResizeBounds> {
    let defaults = ResizeBounds::default();
    ResizeBounds::new(
        args.max_width.unwrap_or(defaults.max_width),
        args.max_height.unwrap_or(defaults.max_height),
    )
}

/// Report for one compressed file, with before/after sizes.
fn compressed_report(input: &Path, output: &Path, dims: Dimensions) -> CommandReport {
    let before = file_size(input);
    let after = file_size(output);
    CommandReport::ok(format!("Compressed {}", input.display()))
        .detail("Output", output.display())
        .detail("Dimensions", dims)
        .detail("Input size", format_bytes(before))
        .detail("Output size", format_bytes(after))
        .detail("Reduced by", format!("{}%", calculate_size_reduction(before, after)))
        .with_data(json!({
            "output": output.display().to_string(),
            "width": dims.width,
            "height": dims.height,
            "input_size": before,
            "output_size": after,
        }))
}

pub fn run_compress_image<R: CommandRunner>(
    engine: &MediaEngine<R>,
    args: CompressImageArgs,
) -> CliResult<CommandReport> {
    if args.input.is_dir() {
        if args.scale.is_some() || args.if_needed {
            return Err(CoreError::Config(
                "--scale and --if-needed apply to single images only".to_string(),
            ));
        }
        return compress_directory(engine, &args);
    }

    if let Some(factor) = args.scale {
        let dims = engine.compress_image_by_scale(&args.input, &args.output, factor)?;
        return Ok(compressed_report(&args.input, &args.output, dims));
    }

    if args.if_needed {
        if args.quality.is_some() || args.format.is_some() {
            warn!("--quality and --format are ignored with --if-needed");
        }
        return match engine.compress_image_if_needed(&args.input, &args.output, args.threshold)? {
            CompressIfNeededOutcome::Copied { bytes } => Ok(CommandReport::ok(format!(
                "Copied {} unchanged (below threshold)",
                args.input.display()
            ))
            .detail("Output", args.output.display())
            .detail("Size", format_bytes(bytes))
            .with_data(json!({
                "output": args.output.display().to_string(),
                "outcome": CompressIfNeededOutcome::Copied { bytes },
            }))),
            CompressIfNeededOutcome::Compressed(dims) => {
                let mut report = compressed_report(&args.input, &args.output, dims);
                report.data["outcome"] = json!(CompressIfNeededOutcome::Compressed(dims));
                Ok(report)
            }
        };
    }

    let config = ImageCompressionConfig {
        quality: args.quality.unwrap_or(DEFAULT_IMAGE_QUALITY),
        bounds: bounds_from_args(&args)?,
        format: args.format,
    };
    let dims = engine.compress_image(&args.input, &args.output, &config)?;
    Ok(compressed_report(&args.input, &args.output, dims))
}

fn compress_directory<R: CommandRunner>(
    engine: &MediaEngine<R>,
    args: &CompressImageArgs,
) -> CliResult<CommandReport> {
    let config = ImageCompressionConfig {
        quality: args.quality.unwrap_or(DEFAULT_IMAGE_QUALITY),
        bounds: bounds_from_args(args)?,
        format: args.format,
    };
    let entries = engine.compress_image_directory(&args.input, &args.output, &config)?;

    let failed = entries.iter().filter(|e| e.result.is_err()).count();
    let files: Vec<_> = entries
        .iter()
        .map(|entry| match &entry.result {
            Ok(dims) => json!({
                "input": entry.input.display().to_string(),
                "output": entry.output.display().to_string(),
                "success": true,
                "width": dims.width,
                "height": dims.height,
            }),
            Err(e) => json!({
                "input": entry.input.display().to_string(),
                "success": false,
                "code": e.code(),
                "message": e.to_string(),
            }),
        })
        .collect();

    let summary = format!(
        "{} of {} images compressed into {}",
        entries.len() - failed,
        entries.len(),
        args.output.display()
    );
    let mut report = if failed == 0 {
        CommandReport::ok(summary)
    } else {
        CommandReport::partial(summary)
    };
    for entry in &entries {
        if let Err(e) = &entry.result {
            report = report.detail("Failed", format!("{}: {e}", entry.input.display()));
        }
    }
    Ok(report.with_data(json!({ "files": files, "failed": failed })))
}

pub fn run_image_info<R: CommandRunner>(
    engine: &MediaEngine<R>,
    args: ImageInfoArgs,
) -> CliResult<CommandReport> {
    let info = engine.probe_image(&args.input)?;
    Ok(CommandReport::ok(info.to_string()).with_data(json!(info)))
}

pub fn run_upscale_image<R: CommandRunner>(
    engine: &MediaEngine<R>,
    args: UpscaleImageArgs,
    ctx: CommandContext,
) -> CliResult<CommandReport> {
    let config = UpscaleConfig {
        scale_factor: args.upscale.scale,
        noise_level: args.upscale.noise,
        tile_size: args.upscale.tile,
        output_format: args.format.clone(),
        verbose: ctx.verbose,
    };
    let spinner_enabled = ctx.show_progress && !ctx.verbose;

    if args.batch {
        let processed = with_spinner("Upscaling images", spinner_enabled, || {
            engine.upscale_image_batch(&args.input, &args.output, &config)
        })?;
        return Ok(CommandReport::ok(format!(
            "Upscaled {} into {}",
            args.input.display(),
            args.output.display()
        ))
        .detail("Scale", format!("{}x", config.effective_scale()))
        .detail("Noise", config.noise_level)
        .detail("Reported", processed)
        .with_data(json!({
            "output": args.output.display().to_string(),
            "scale": config.effective_scale(),
            "processed": processed,
        })));
    }

    with_spinner("Upscaling image", spinner_enabled, || {
        engine.upscale_image(&args.input, &args.output, &config)
    })?;
    Ok(CommandReport::ok(format!("Upscaled {}", args.input.display()))
        .detail("Output", args.output.display())
        .detail("Scale", format!("{}x", config.effective_scale()))
        .detail("Noise", config.noise_level)
        .with_data(json!({
            "output": args.output.display().to_string(),
            "scale": config.effective_scale(),
        })))
}
