// refract-core/tests/common/mod.rs
//
// Shared helpers: image fixtures and shell scripts standing in for the
// external tools.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

/// Writes a gradient image; the format follows the extension.
pub fn write_image(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, ((x * y) % 239) as u8])
    });
    img.save(path).expect("failed to write fixture image");
}

/// Writes an executable `/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("failed to chmod script");
    path
}

/// ffmpeg stand-in: `-version` prints a banner, extraction writes frame 1
/// from the `%08d` pattern, any other invocation writes its last argument. Every call is appended to
/// `calls.log` beside the script.
pub const FAKE_FFMPEG: &str = r#"
dir=$(dirname "$0")
echo "ffmpeg $*" >> "$dir/calls.log"
for last; do :; done
case "$*" in
  -version)
    echo "ffmpeg version 0.0-fake"
    ;;
  *-vsync*)
    out=$(printf '%s' "$last" | sed 's/%08d/00000001/')
    printf 'frame' > "$out"
    ;;
  *)
    echo "frame=    1 fps=0.0 q=-1.0 size=       1kB time=00:00:00.04" >&2
    printf 'video' > "$last"
    ;;
esac
"#;

/// ffmpeg stand-in that fails every extraction.
pub const FAILING_FFMPEG: &str = r#"
dir=$(dirname "$0")
echo "ffmpeg $*" >> "$dir/calls.log"
echo "Invalid data found when processing input" >&2
exit 1
"#;

/// waifu2x stand-in: copies one frame into the `-o` directory and reports it.
pub const FAKE_WAIFU2X: &str = r#"
dir=$(dirname "$0")
echo "waifu2x $*" >> "$dir/calls.log"
if [ "$1" = "-h" ]; then
  echo "Usage: waifu2x -i infile -o outfile [options]..."
  exit 1
fi
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
if [ -d "$out" ]; then
  printf 'upscaled' > "$out/00000001.png"
else
  printf 'upscaled' > "$out"
fi
echo "00000001.png -> 00000001.png done"
"#;

/// ffprobe stand-in reporting NTSC film rate.
pub const FAKE_FFPROBE: &str = r#"
dir=$(dirname "$0")
echo "ffprobe $*" >> "$dir/calls.log"
echo "24000/1001"
"#;

/// Reads the shared call log written by the fake tools.
pub fn read_calls(tools_dir: &Path) -> Vec<String> {
    fs::read_to_string(tools_dir.join("calls.log"))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
