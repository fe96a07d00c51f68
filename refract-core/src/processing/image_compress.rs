// ============================================================================
// refract-core/src/processing/image_compress.rs
// ============================================================================
//
// IMAGE COMPRESSION: Resize and Re-encode Still Images
//
// Decodes an image, computes bounded dimensions, resamples only when the size
// actually changes and re-encodes through the `image` crate. JPEG output uses
// the configured quality; the lossless formats ignore it.
//
// KEY COMPONENTS:
// - ImageCompressor: file, byte-buffer and directory compression
// - ImageInfo: size/dimension/format summary of an image on disk
// - CompressIfNeededOutcome: copy-or-compress decision result
//
// Every file output is written to a staging file in the destination
// directory and renamed into place, so a failed call never leaves a partial
// image at the output path.

use std::fmt;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageReader};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_IMAGE_QUALITY, DEFAULT_MAX_FILE_SIZE, ImageCompressionConfig, ImageFormatKind,
};
use crate::error::{CoreError, CoreResult};
use crate::geometry::{Dimensions, ResizeBounds, calculate_resize, scale_dimensions};
use crate::temp_files::{create_staging_file, persist_staging_file};
use crate::utils::{ensure_input_dir, ensure_input_file, format_bytes};

/// Size, dimensions and detected format of an image on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub file_size: u64,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File size: {}, Width: {}, Height: {}, Format: {}",
            format_bytes(self.file_size),
            self.width,
            self.height,
            self.format
        )
    }
}

/// What `compress_if_needed` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum CompressIfNeededOutcome {
    /// Input was below the threshold and copied byte-for-byte
    Copied { bytes: u64 },
    /// Input was compressed with the default settings
    Compressed(Dimensions),
}

/// Result for one file of a directory compression.
#[derive(Debug)]
pub struct ImageBatchEntry {
    pub input: PathBuf,
    pub output: PathBuf,
    pub result: CoreResult<Dimensions>,
}

/// Still-image compressor backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCompressor;

impl ImageCompressor {
    pub fn new() -> Self {
        Self
    }

    /// Compresses with the default quality (0.75) and bounds (1920x1080).
    pub fn compress(&self, input: &Path, output: &Path) -> CoreResult<Dimensions> {
        self.compress_with_config(input, output, &ImageCompressionConfig::default())
    }

    /// Compresses at `quality` within the default bounds.
    pub fn compress_with_quality(
        &self,
        input: &Path,
        output: &Path,
        quality: f32,
    ) -> CoreResult<Dimensions> {
        let config = ImageCompressionConfig {
            quality,
            ..Default::default()
        };
        self.compress_with_config(input, output, &config)
    }

    /// Compresses at `quality` within `bounds`.
    pub fn compress_with_bounds(
        &self,
        input: &Path,
        output: &Path,
        quality: f32,
        bounds: ResizeBounds,
    ) -> CoreResult<Dimensions> {
        let config = ImageCompressionConfig {
            quality,
            bounds,
            format: None,
        };
        self.compress_with_config(input, output, &config)
    }

    /// Compresses `input` into `output` and returns the written dimensions.
    pub fn compress_with_config(
        &self,
        input: &Path,
        output: &Path,
        config: &ImageCompressionConfig,
    ) -> CoreResult<Dimensions> {
        let bounds = ResizeBounds::new(config.bounds.max_width, config.bounds.max_height)?;
        let format = resolve_format(input, config.format)?;
        let img = decode_file(input)?;

        let (width, height) = img.dimensions();
        let target = calculate_resize(width, height, bounds);
        self.encode_to_file(img, target, format, config.jpeg_quality(), output)?;

        info!(
            "Compressed {} ({width}x{height}) -> {} ({target}, {format})",
            input.display(),
            output.display()
        );
        Ok(target)
    }

    /// Scales both axes by `factor` (truncating) and re-encodes at the
    /// default quality.
    pub fn compress_by_scale(&self, input: &Path, output: &Path, factor: f64) -> CoreResult<Dimensions> {
        let format = resolve_format(input, None)?;
        let img = decode_file(input)?;
        let (width, height) = img.dimensions();
        let target = scale_dimensions(width, height, factor)?;
        let quality = ImageCompressionConfig {
            quality: DEFAULT_IMAGE_QUALITY,
            ..Default::default()
        }
        .jpeg_quality();

        self.encode_to_file(img, target, format, quality, output)?;
        info!(
            "Scaled {} by {factor} ({width}x{height} -> {target})",
            input.display()
        );
        Ok(target)
    }

    /// Copies inputs under 5 MiB unchanged and compresses the rest with defaults.
    pub fn compress_if_needed(&self, input: &Path, output: &Path) -> CoreResult<CompressIfNeededOutcome> {
        self.compress_if_needed_with_threshold(input, output, DEFAULT_MAX_FILE_SIZE)
    }

    /// Copies inputs smaller than `threshold` bytes unchanged (contents and
    /// permissions); compresses inputs at or above it with the default settings.
    pub fn compress_if_needed_with_threshold(
        &self,
        input: &Path,
        output: &Path,
        threshold: u64,
    ) -> CoreResult<CompressIfNeededOutcome> {
        ensure_input_file(input)?;
        let size = fs::metadata(input)?.len();

        if size < threshold {
            debug!(
                "{} is {}, below the {} threshold; copying",
                input.display(),
                format_bytes(size),
                format_bytes(threshold)
            );
            let mut staging = create_staging_file(output)?;
            let mut source = fs::File::open(input)?;
            io::copy(&mut source, &mut staging)?;
            staging.flush()?;
            fs::set_permissions(staging.path(), source.metadata()?.permissions())?;
            persist_staging_file(staging, output)?;
            return Ok(CompressIfNeededOutcome::Copied { bytes: size });
        }

        self.compress(input, output)
            .map(CompressIfNeededOutcome::Compressed)
    }

    /// Compresses an in-memory image, returning the encoded bytes.
    ///
    /// Data that can't be decoded yields `CoreError::Decode`.
    pub fn compress_bytes(
        &self,
        bytes: &[u8],
        format: ImageFormatKind,
        config: &ImageCompressionConfig,
    ) -> CoreResult<Vec<u8>> {
        let bounds = ResizeBounds::new(config.bounds.max_width, config.bounds.max_height)?;
        let img = image::load_from_memory(bytes).map_err(|e| CoreError::Decode {
            path: "<memory>".to_string(),
            message: e.to_string(),
        })?;
        let (width, height) = img.dimensions();
        let target = calculate_resize(width, height, bounds);
        let format = config.format.unwrap_or(format);
        encode_to_vec(&resample(img, target), format, config.jpeg_quality())
    }

    /// Reads size, dimensions and format without decoding pixel data.
    pub fn probe_image(&self, input: &Path) -> CoreResult<ImageInfo> {
        ensure_input_file(input)?;
        let file_size = fs::metadata(input)?.len();
        let reader = ImageReader::open(input)?
            .with_guessed_format()
            .map_err(|e| decode_error(input, e))?;
        let format = reader
            .format()
            .map(|f| f.extensions_str().first().copied().unwrap_or("unknown").to_string())
            .ok_or_else(|| CoreError::UnsupportedFormat(input.display().to_string()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| decode_error(input, e))?;

        Ok(ImageInfo {
            file_size,
            width,
            height,
            format,
        })
    }

    /// Human-readable summary of an image. Never fails: problems are
    /// described in the returned string.
    pub fn image_info(&self, input: &Path) -> String {
        match self.probe_image(input) {
            Ok(info) => info.to_string(),
            Err(e) => format!("Failed to read image info: {e}"),
        }
    }

    /// Compresses every supported image directly inside `input_dir` into
    /// `output_dir`, in parallel. A failing file doesn't stop the others.
    pub fn compress_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        config: &ImageCompressionConfig,
    ) -> CoreResult<Vec<ImageBatchEntry>> {
        ensure_input_dir(input_dir)?;
        fs::create_dir_all(output_dir)?;

        let mut inputs: Vec<PathBuf> = fs::read_dir(input_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| crate::utils::is_supported_image_file(path))
            .collect();
        inputs.sort();
        debug!(
            "Compressing {} images from {}",
            inputs.len(),
            input_dir.display()
        );

        let entries: Vec<ImageBatchEntry> = inputs
            .into_par_iter()
            .map(|input| {
                let output = directory_output_path(&input, output_dir, config.format);
                let result = self.compress_with_config(&input, &output, config);
                if let Err(e) = &result {
                    warn!("Failed to compress {}: {e}", input.display());
                }
                ImageBatchEntry {
                    input,
                    output,
                    result,
                }
            })
            .collect();

        Ok(entries)
    }

    fn encode_to_file(
        &self,
        img: DynamicImage,
        target: Dimensions,
        format: ImageFormatKind,
        jpeg_quality: u8,
        output: &Path,
    ) -> CoreResult<()> {
        let encoded = encode_to_vec(&resample(img, target), format, jpeg_quality)?;
        let mut staging = create_staging_file(output)?;
        staging.write_all(&encoded)?;
        staging.flush()?;
        persist_staging_file(staging, output)
    }
}

/// Destination for one directory entry; a format override also swaps the
/// extension so the name matches the encoded bytes.
fn directory_output_path(input: &Path, output_dir: &Path, format: Option<ImageFormatKind>) -> PathBuf {
    let Some(name) = input.file_name() else {
        return output_dir.to_path_buf();
    };
    let output = output_dir.join(name);
    match format {
        Some(kind) if ImageFormatKind::from_path(input) != Some(kind) => {
            output.with_extension(kind.extension())
        }
        _ => output,
    }
}

/// Output format: explicit setting, else the input's extension.
fn resolve_format(input: &Path, explicit: Option<ImageFormatKind>) -> CoreResult<ImageFormatKind> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    ensure_input_file(input)?;
    ImageFormatKind::from_path(input).ok_or_else(|| {
        CoreError::UnsupportedFormat(
            input
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_else(|| input.display().to_string()),
        )
    })
}

fn decode_error(input: &Path, err: impl fmt::Display) -> CoreError {
    CoreError::Decode {
        path: input.display().to_string(),
        message: err.to_string(),
    }
}

fn decode_file(input: &Path) -> CoreResult<DynamicImage> {
    ensure_input_file(input)?;
    ImageReader::open(input)?
        .with_guessed_format()
        .map_err(|e| decode_error(input, e))?
        .decode()
        .map_err(|e| decode_error(input, e))
}

/// Bicubic (Catmull-Rom) resample; a no-op when the size is unchanged.
fn resample(img: DynamicImage, target: Dimensions) -> DynamicImage {
    if img.dimensions() == (target.width, target.height) {
        return img;
    }
    img.resize_exact(target.width, target.height, FilterType::CatmullRom)
}

fn encode_to_vec(img: &DynamicImage, format: ImageFormatKind, jpeg_quality: u8) -> CoreResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        ImageFormatKind::Jpeg => {
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality);
            encoder
                .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(|e| CoreError::Encode(e.to_string()))?;
        }
        ImageFormatKind::Png | ImageFormatKind::Tiff => {
            img.write_to(&mut buffer, format.image_format())
                .map_err(|e| CoreError::Encode(e.to_string()))?;
        }
        // These encoders only take 8-bit RGB(A)
        ImageFormatKind::Bmp | ImageFormatKind::WebP => {
            let eight_bit = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            eight_bit
                .write_to(&mut buffer, format.image_format())
                .map_err(|e| CoreError::Encode(e.to_string()))?;
        }
    }
    Ok(buffer.into_inner())
}
