//! Utility functions for formatting and file operations.
//!
//! This module provides general-purpose helpers used throughout the
//! refract-core library: input validation, output directory preparation,
//! and human-readable formatting of sizes and durations.

use std::path::Path;

use crate::config::ImageFormatKind;
use crate::error::{CoreError, CoreResult};
use crate::temp_files::parent_dir;

/// Checks if the given path is an existing file with an image extension the
/// compressor can write back (png, jpg/jpeg, bmp, tif/tiff, webp).
#[must_use]
pub fn is_supported_image_file(path: &Path) -> bool {
    path.is_file() && ImageFormatKind::from_path(path).is_some()
}

/// Fails with `InputNotFound` unless `path` is an existing file.
pub fn ensure_input_file(path: &Path) -> CoreResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CoreError::InputNotFound(path.to_path_buf()))
    }
}

/// Fails with `InputNotFound` unless `path` is an existing directory.
pub fn ensure_input_dir(path: &Path) -> CoreResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(CoreError::InputNotFound(path.to_path_buf()))
    }
}

/// Creates the directory that will contain `output`.
pub fn ensure_parent_dir(output: &Path) -> CoreResult<()> {
    std::fs::create_dir_all(parent_dir(output))?;
    Ok(())
}

/// Formats seconds as HH:MM:SS (e.g., 3725.0 -> "01:02:05"). Returns "??:??:??" for invalid inputs.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return "??:??:??".to_string();
    }

    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Formats bytes with appropriate binary units (B, KiB, MiB, GiB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes_f64 = bytes as f64;
    if bytes_f64 >= GIB {
        format!("{:.2} GiB", bytes_f64 / GIB)
    } else if bytes_f64 >= MIB {
        format!("{:.2} MiB", bytes_f64 / MIB)
    } else if bytes_f64 >= KIB {
        format!("{:.2} KiB", bytes_f64 / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Percentage size reduction from input to output; 0 when nothing was saved.
#[must_use]
pub fn calculate_size_reduction(input_size: u64, output_size: u64) -> u64 {
    if input_size == 0 || output_size >= input_size {
        0
    } else {
        100 - ((output_size * 100) / input_size)
    }
}
