//! Argument builders for the external tools.
//!
//! Every function here is pure apart from `build_upscale_command`'s check
//! that the model directory exists. The resulting `ToolCommand`s are what the
//! runner executes and what the tests assert against.

use std::path::{Path, PathBuf};

use crate::config::{
    DEFAULT_ASSEMBLE_AUDIO_BITRATE, DEFAULT_COMPRESS_AUDIO_BITRATE, UpscaleConfig,
    VideoCompressionConfig, VideoUpscaleConfig,
};
use crate::geometry::ResizeBounds;

use super::command::ToolCommand;

/// Frame sequence file name pattern, e.g. `00000001.png`.
#[must_use]
pub fn frame_pattern(frames_dir: &Path, frame_format: &str) -> PathBuf {
    frames_dir.join(format!("%08d.{frame_format}"))
}

/// The platform's discard sink for pass 1 of a two-pass encode.
#[must_use]
pub const fn null_sink() -> &'static str {
    if cfg!(windows) { "NUL" } else { "/dev/null" }
}

/// ffmpeg scale filter that shrinks to fit `bounds` and never enlarges.
#[must_use]
pub fn scale_filter(bounds: ResizeBounds) -> String {
    format!(
        "scale='min(iw,{})':'min(ih,{})':force_original_aspect_ratio=decrease",
        bounds.max_width.max(1),
        bounds.max_height.max(1)
    )
}

/// `ffmpeg -y -i <input> -vsync 0 <dir>/%08d.<fmt>`
#[must_use]
pub fn build_extract_frames_command(
    ffmpeg: &Path,
    input: &Path,
    frames_dir: &Path,
    frame_format: &str,
) -> ToolCommand {
    ToolCommand::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-vsync", "0"])
        .arg(frame_pattern(frames_dir, frame_format))
}

/// Upscaler invocation for a single image.
#[must_use]
pub fn build_upscale_command(
    waifu2x: &Path,
    input: &Path,
    output: &Path,
    config: &UpscaleConfig,
    model_dir: Option<&Path>,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(waifu2x)
        .arg("-i")
        .arg(input)
        .arg("-o")
        .arg(output)
        .arg("-s")
        .arg(config.effective_scale().to_string());

    if let Some(noise) = config.noise_level.flag_value() {
        cmd = cmd.arg("-n").arg(noise.to_string());
    }
    if config.tile_size > 0 {
        cmd = cmd.arg("-t").arg(config.tile_size.to_string());
    }
    cmd = cmd.arg("-f").arg(&config.output_format);

    // The tool falls back to its bundled model when -m is absent
    if let Some(dir) = model_dir.filter(|dir| dir.is_dir()) {
        cmd = cmd.arg("-m").arg(dir);
    }
    if config.verbose {
        cmd = cmd.arg("-v");
    }
    cmd
}

/// Upscaler invocation over a whole directory; same grammar as a single file.
#[must_use]
pub fn build_upscale_batch_command(
    waifu2x: &Path,
    input_dir: &Path,
    output_dir: &Path,
    config: &UpscaleConfig,
    model_dir: Option<&Path>,
) -> ToolCommand {
    build_upscale_command(waifu2x, input_dir, output_dir, config, model_dir)
}

/// Everything up to, but excluding, pass markers and the output path.
fn compress_video_base(ffmpeg: &Path, input: &Path, config: &VideoCompressionConfig) -> ToolCommand {
    let mut cmd = ToolCommand::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .arg("-vf")
        .arg(scale_filter(config.bounds))
        .arg("-c:v")
        .arg(&config.video_codec);

    cmd = match config.bitrate() {
        Some(kbps) => cmd.arg("-b:v").arg(format!("{kbps}k")),
        None => cmd.arg("-crf").arg(config.crf.to_string()),
    };

    cmd = cmd
        .arg("-preset")
        .arg(config.preset.as_str())
        .arg("-pix_fmt")
        .arg(&config.pixel_format);

    if config.copy_audio {
        cmd.args(["-c:a", "copy"])
    } else {
        cmd.args(["-c:a", "aac", "-b:a", DEFAULT_COMPRESS_AUDIO_BITRATE])
    }
}

/// Single-pass compression command writing to `output`.
#[must_use]
pub fn build_compress_video_command(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    config: &VideoCompressionConfig,
) -> ToolCommand {
    compress_video_base(ffmpeg, input, config).arg(output)
}

/// The ordered list of encoder passes for `config`.
///
/// Returns one command unless two-pass is requested together with a positive
/// bitrate. Pass 1 discards its output into the null muxer; pass 2 writes the
/// real file. When `passlog_prefix` is given both passes share it.
#[must_use]
pub fn build_compress_video_passes(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    config: &VideoCompressionConfig,
    passlog_prefix: Option<&Path>,
) -> Vec<ToolCommand> {
    if !config.uses_two_pass() {
        return vec![build_compress_video_command(ffmpeg, input, output, config)];
    }

    let pass = |number: &str| {
        let cmd = compress_video_base(ffmpeg, input, config).args(["-pass", number]);
        match passlog_prefix {
            Some(prefix) => cmd.arg("-passlogfile").arg(prefix),
            None => cmd,
        }
    };

    vec![
        pass("1").args(["-f", "null", null_sink()]),
        pass("2").arg(output),
    ]
}

/// `ffprobe -v 0 -of csv=p=0 -select_streams v:0 -show_entries stream=r_frame_rate <input>`
#[must_use]
pub fn build_probe_frame_rate_command(ffprobe: &Path, input: &Path) -> ToolCommand {
    ToolCommand::new(ffprobe)
        .args([
            "-v",
            "0",
            "-of",
            "csv=p=0",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=r_frame_rate",
        ])
        .arg(input)
}

/// Reassembles upscaled frames with the source's audio (if it has any).
#[must_use]
pub fn build_assemble_video_command(
    ffmpeg: &Path,
    frames_dir: &Path,
    source: &Path,
    output: &Path,
    fps: u32,
    config: &VideoUpscaleConfig,
) -> ToolCommand {
    let cmd = ToolCommand::new(ffmpeg)
        .arg("-y")
        .arg("-framerate")
        .arg(fps.to_string())
        .arg("-i")
        .arg(frame_pattern(frames_dir, &config.frame_format))
        .arg("-i")
        .arg(source)
        .args(["-map", "0:v", "-map", "1:a?"])
        .arg("-c:v")
        .arg(&config.video_codec)
        .arg("-crf")
        .arg(config.crf.to_string())
        .arg("-preset")
        .arg(config.preset.as_str())
        .arg("-pix_fmt")
        .arg(&config.pixel_format);

    let cmd = if config.copy_audio {
        cmd.args(["-c:a", "copy"])
    } else {
        cmd.args(["-c:a", "aac", "-b:a", DEFAULT_ASSEMBLE_AUDIO_BITRATE])
    };

    cmd.arg("-shortest").arg(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncoderPreset, NoiseLevel};

    fn strings(cmd: &ToolCommand) -> Vec<String> {
        cmd.args_lossy()
    }

    #[test]
    fn test_extract_frames_command() {
        let cmd = build_extract_frames_command(
            Path::new("ffmpeg"),
            Path::new("/in/clip.mp4"),
            Path::new("/tmp/frames"),
            "png",
        );
        assert_eq!(
            strings(&cmd),
            ["-y", "-i", "/in/clip.mp4", "-vsync", "0", "/tmp/frames/%08d.png"]
        );
    }

    #[test]
    fn test_upscale_command_defaults() {
        let cmd = build_upscale_command(
            Path::new("waifu2x"),
            Path::new("a.png"),
            Path::new("b.png"),
            &UpscaleConfig::default(),
            None,
        );
        assert_eq!(
            strings(&cmd),
            ["-i", "a.png", "-o", "b.png", "-s", "2", "-n", "0", "-f", "png"]
        );
    }

    #[test]
    fn test_upscale_command_optional_flags() {
        let model_dir = tempfile::tempdir().unwrap();
        let config = UpscaleConfig {
            scale_factor: 8,
            noise_level: NoiseLevel::None,
            tile_size: 200,
            output_format: "webp".to_string(),
            verbose: true,
        };
        let cmd = build_upscale_command(
            Path::new("waifu2x"),
            Path::new("a.png"),
            Path::new("b.webp"),
            &config,
            Some(model_dir.path()),
        );
        assert!(cmd.has_option("-s", "4"));
        assert!(!cmd.has_flag("-n"));
        assert!(cmd.has_option("-t", "200"));
        assert!(cmd.has_option("-f", "webp"));
        assert!(cmd.has_option("-m", &model_dir.path().to_string_lossy()));
        assert_eq!(cmd.args_lossy().last().map(String::as_str), Some("-v"));
    }

    #[test]
    fn test_upscale_command_skips_missing_model_dir() {
        let cmd = build_upscale_command(
            Path::new("waifu2x"),
            Path::new("a.png"),
            Path::new("b.png"),
            &UpscaleConfig::default(),
            Some(Path::new("/nonexistent/models-cunet")),
        );
        assert!(!cmd.has_flag("-m"));
    }

    #[test]
    fn test_compress_command_crf() {
        let cmd = build_compress_video_command(
            Path::new("ffmpeg"),
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &VideoCompressionConfig::default(),
        );
        assert_eq!(
            strings(&cmd),
            [
                "-y",
                "-i",
                "in.mp4",
                "-vf",
                "scale='min(iw,1920)':'min(ih,1080)':force_original_aspect_ratio=decrease",
                "-c:v",
                "libx264",
                "-crf",
                "23",
                "-preset",
                "medium",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "copy",
                "out.mp4"
            ]
        );
    }

    #[test]
    fn test_compress_command_bitrate_wins_and_audio_reencode() {
        let config = VideoCompressionConfig {
            target_bitrate_kbps: Some(1500),
            copy_audio: false,
            preset: EncoderPreset::Fast,
            ..Default::default()
        };
        let cmd = build_compress_video_command(
            Path::new("ffmpeg"),
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &config,
        );
        assert!(cmd.has_option("-b:v", "1500k"));
        assert!(!cmd.has_flag("-crf"));
        assert!(cmd.has_option("-c:a", "aac"));
        assert!(cmd.has_option("-b:a", "128k"));
        assert!(cmd.has_option("-preset", "fast"));
    }

    #[test]
    fn test_two_pass_requires_bitrate() {
        let config = VideoCompressionConfig {
            two_pass: true,
            ..Default::default()
        };
        let passes = build_compress_video_passes(
            Path::new("ffmpeg"),
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &config,
            None,
        );
        assert_eq!(passes.len(), 1);
        assert!(!passes[0].has_flag("-pass"));
    }

    #[test]
    fn test_two_pass_commands() {
        let config = VideoCompressionConfig {
            two_pass: true,
            target_bitrate_kbps: Some(2000),
            ..Default::default()
        };
        let prefix = Path::new("/tmp/passlog/ffmpeg2pass");
        let passes = build_compress_video_passes(
            Path::new("ffmpeg"),
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &config,
            Some(prefix),
        );
        assert_eq!(passes.len(), 2);

        let first = &passes[0];
        assert!(first.has_option("-pass", "1"));
        assert!(first.has_option("-f", "null"));
        assert_eq!(first.last_arg(), Some(Path::new(null_sink())));
        assert!(first.has_option("-passlogfile", "/tmp/passlog/ffmpeg2pass"));

        let second = &passes[1];
        assert!(second.has_option("-pass", "2"));
        assert!(second.has_option("-passlogfile", "/tmp/passlog/ffmpeg2pass"));
        assert_eq!(second.last_arg(), Some(Path::new("out.mp4")));
    }

    #[test]
    fn test_probe_command() {
        let cmd = build_probe_frame_rate_command(Path::new("ffprobe"), Path::new("in.mkv"));
        assert_eq!(
            strings(&cmd),
            [
                "-v",
                "0",
                "-of",
                "csv=p=0",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=r_frame_rate",
                "in.mkv"
            ]
        );
    }

    #[test]
    fn test_assemble_command() {
        let cmd = build_assemble_video_command(
            Path::new("ffmpeg"),
            Path::new("/tmp/up"),
            Path::new("src.mp4"),
            Path::new("out.mp4"),
            24,
            &VideoUpscaleConfig::default(),
        );
        assert_eq!(
            strings(&cmd),
            [
                "-y",
                "-framerate",
                "24",
                "-i",
                "/tmp/up/%08d.png",
                "-i",
                "src.mp4",
                "-map",
                "0:v",
                "-map",
                "1:a?",
                "-c:v",
                "libx264",
                "-crf",
                "18",
                "-preset",
                "slow",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "copy",
                "-shortest",
                "out.mp4"
            ]
        );

        let reencode = VideoUpscaleConfig {
            copy_audio: false,
            ..Default::default()
        };
        let cmd = build_assemble_video_command(
            Path::new("ffmpeg"),
            Path::new("/tmp/up"),
            Path::new("src.mp4"),
            Path::new("out.mp4"),
            30,
            &reencode,
        );
        assert!(cmd.has_option("-b:a", "192k"));
    }
}
