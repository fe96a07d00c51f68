// refract-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use refract_core::config::{EncoderPreset, ImageFormatKind, NoiseLevel};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Refract: media transformation pipeline",
    long_about = "Compresses and upscales images and videos by driving ffmpeg, ffprobe and \
                  a waifu2x-compatible upscaler through the refract-core engine."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// ffmpeg executable
    #[arg(long, global = true, value_name = "PATH", env = "REFRACT_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe executable
    #[arg(long, global = true, value_name = "PATH", env = "REFRACT_FFPROBE")]
    pub ffprobe: Option<PathBuf>,

    /// waifu2x-compatible upscaler executable
    #[arg(long, global = true, value_name = "PATH", env = "REFRACT_WAIFU2X")]
    pub waifu2x: Option<PathBuf>,

    /// Model directory handed to the upscaler when it exists
    #[arg(long, global = true, value_name = "DIR", env = "REFRACT_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Root for temporary frame directories (defaults to the system temp dir)
    #[arg(long, global = true, value_name = "DIR", env = "REFRACT_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// JSON engine configuration; flags and environment variables override it
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Abort any single external command after this many seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Debug logging and tool output echoed to the log
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print one JSON result object instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resize and re-encode an image, or every image in a directory
    CompressImage(CompressImageArgs),
    /// Print size, dimensions and format of an image
    ImageInfo(ImageInfoArgs),
    /// Upscale an image (or a directory with --batch) with waifu2x
    UpscaleImage(UpscaleImageArgs),
    /// Re-encode a video with ffmpeg, optionally downscaling it
    CompressVideo(CompressVideoArgs),
    /// Upscale a video frame by frame and reassemble it with the source audio
    UpscaleVideo(UpscaleVideoArgs),
    /// Report whether the configured external tools can be run
    Tools,
}

#[derive(Args, Debug)]
pub struct CompressImageArgs {
    /// Input image or directory of images
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output image, or output directory when INPUT is a directory
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Lossy quality between 0.0 and 1.0
    #[arg(short, long, value_name = "Q")]
    pub quality: Option<f32>,

    #[arg(long, value_name = "PX")]
    pub max_width: Option<u32>,

    #[arg(long, value_name = "PX")]
    pub max_height: Option<u32>,

    /// Output format (png, jpg, bmp, tiff, webp); inferred from INPUT if omitted
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<ImageFormatKind>,

    /// Scale both dimensions by this factor instead of fitting bounds
    #[arg(long, value_name = "FACTOR", conflicts_with_all = ["max_width", "max_height", "if_needed"])]
    pub scale: Option<f64>,

    /// Copy the file unchanged when it is smaller than --threshold
    #[arg(long)]
    pub if_needed: bool,

    /// Size threshold in bytes for --if-needed (default 5 MiB)
    #[arg(long, value_name = "BYTES", requires = "if_needed")]
    pub threshold: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ImageInfoArgs {
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

/// Upscaler flags shared by image and video upscaling.
#[derive(Args, Debug, Clone)]
pub struct UpscaleFlags {
    /// Scale factor (1-4)
    #[arg(short, long, value_name = "N", default_value_t = 2)]
    pub scale: u32,

    /// Noise reduction: none, low, medium, high, highest or -1..3
    #[arg(short, long, value_name = "LEVEL", default_value = "low", allow_negative_numbers = true)]
    pub noise: NoiseLevel,

    /// Tile size in pixels, 0 lets the upscaler choose
    #[arg(short, long, value_name = "PX", default_value_t = 0)]
    pub tile: u32,
}

#[derive(Args, Debug)]
pub struct UpscaleImageArgs {
    /// Input image, or input directory with --batch
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output image, or output directory with --batch
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Treat INPUT and OUTPUT as directories
    #[arg(long)]
    pub batch: bool,

    #[command(flatten)]
    pub upscale: UpscaleFlags,

    /// Output image format extension
    #[arg(short, long, value_name = "EXT", default_value = "png")]
    pub format: String,
}

/// ffmpeg encoder flags shared by video compression and reassembly.
#[derive(Args, Debug, Clone)]
pub struct EncoderFlags {
    /// Constant rate factor (0-51)
    #[arg(long, value_name = "CRF")]
    pub crf: Option<u8>,

    /// Encoder preset (ultrafast .. placebo)
    #[arg(long, value_name = "PRESET")]
    pub preset: Option<EncoderPreset>,

    /// Video encoder
    #[arg(long, value_name = "CODEC")]
    pub codec: Option<String>,

    #[arg(long, value_name = "FMT")]
    pub pixel_format: Option<String>,

    /// Re-encode audio to AAC instead of copying it
    #[arg(long)]
    pub reencode_audio: bool,
}

#[derive(Args, Debug)]
pub struct CompressVideoArgs {
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub encoder: EncoderFlags,

    /// Target bitrate in kbit/s; overrides --crf
    #[arg(long, value_name = "KBPS")]
    pub bitrate: Option<u32>,

    /// Two-pass encode (requires --bitrate)
    #[arg(long, requires = "bitrate")]
    pub two_pass: bool,

    #[arg(long, value_name = "PX")]
    pub max_width: Option<u32>,

    #[arg(long, value_name = "PX")]
    pub max_height: Option<u32>,
}

#[derive(Args, Debug)]
pub struct UpscaleVideoArgs {
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub upscale: UpscaleFlags,

    #[command(flatten)]
    pub encoder: EncoderFlags,

    /// Output frame rate; probed from INPUT when omitted
    #[arg(long, value_name = "FPS")]
    pub fps: Option<u32>,

    /// Extension of the intermediate frame images
    #[arg(long, value_name = "EXT")]
    pub frame_format: Option<String>,

    /// Keep the frame directories after the run
    #[arg(long)]
    pub keep_temp: bool,
}
