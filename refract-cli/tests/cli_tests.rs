use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::str::contains;
use serde_json::Value;
use std::error::Error;
use std::path::Path;
use tempfile::tempdir;

// Helper function to get the path to the compiled binary, isolated from the
// caller's REFRACT_* environment
fn refract_cmd() -> Command {
    let mut cmd = Command::cargo_bin("refract").expect("Failed to find refract binary");
    for var in [
        "REFRACT_FFMPEG",
        "REFRACT_FFPROBE",
        "REFRACT_WAIFU2X",
        "REFRACT_MODEL_DIR",
        "REFRACT_TEMP_DIR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_png(path: &Path, width: u32, height: u32) -> Result<(), Box<dyn Error>> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8])
    });
    img.save(path)?;
    Ok(())
}

fn json_stdout(output: &std::process::Output) -> Result<Value, Box<dyn Error>> {
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn test_help_lists_subcommands() -> Result<(), Box<dyn Error>> {
    refract_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("compress-image"))
        .stdout(contains("upscale-video"))
        .stdout(contains("tools"));
    Ok(())
}

#[test]
fn test_image_info_missing_file_json() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let output = refract_cmd()
        .args(["image-info", "--json"])
        .arg(dir.path().join("missing.png"))
        .output()?;

    assert_eq!(output.status.code(), Some(1));
    let value = json_stdout(&output)?;
    assert_eq!(value["success"], false);
    assert_eq!(value["code"], "input_not_found");
    Ok(())
}

#[test]
fn test_image_info_human_output() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("small.png");
    write_png(&input, 64, 48)?;

    refract_cmd()
        .arg("image-info")
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("Width: 64"))
        .stdout(contains("Height: 48"));
    Ok(())
}

#[test]
fn test_compress_image_fits_default_bounds() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("large.png");
    let out = dir.path().join("out/large.jpg");
    write_png(&input, 2000, 1500)?;

    let output = refract_cmd()
        .args(["compress-image", "--json", "--format", "jpg"])
        .arg(&input)
        .arg(&out)
        .output()?;

    assert!(output.status.success());
    let value = json_stdout(&output)?;
    assert_eq!(value["code"], "ok");
    assert_eq!(value["data"]["width"], 1440);
    assert_eq!(value["data"]["height"], 1080);
    assert!(out.is_file());
    Ok(())
}

#[test]
fn test_compress_image_if_needed_copies_small_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("small.png");
    let out = dir.path().join("copy.png");
    write_png(&input, 32, 32)?;

    let output = refract_cmd()
        .args(["compress-image", "--if-needed", "--json"])
        .arg(&input)
        .arg(&out)
        .output()?;

    assert!(output.status.success());
    let value = json_stdout(&output)?;
    assert_eq!(value["data"]["outcome"]["action"], "copied");
    assert_eq!(std::fs::read(&input)?, std::fs::read(&out)?);
    Ok(())
}

#[test]
fn test_compress_directory_reports_partial_failure() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input_dir = dir.path().join("in");
    std::fs::create_dir(&input_dir)?;
    write_png(&input_dir.join("good.png"), 40, 30)?;
    std::fs::write(input_dir.join("broken.png"), b"not a png")?;

    let output = refract_cmd()
        .args(["compress-image", "--json"])
        .arg(&input_dir)
        .arg(dir.path().join("out"))
        .output()?;

    assert_eq!(output.status.code(), Some(1));
    let value = json_stdout(&output)?;
    assert_eq!(value["code"], "partial_failure");
    assert_eq!(value["data"]["failed"], 1);
    assert!(dir.path().join("out/good.png").is_file());
    Ok(())
}

#[test]
fn test_invalid_crf_is_a_config_error() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("in.mp4");
    std::fs::write(&input, b"video")?;

    refract_cmd()
        .args(["compress-video", "--crf", "80", "--json"])
        .arg(&input)
        .arg(dir.path().join("out.mp4"))
        .assert()
        .failure()
        .stdout(contains("invalid_config"));
    Ok(())
}

#[test]
fn test_two_pass_without_bitrate_is_a_usage_error() -> Result<(), Box<dyn Error>> {
    refract_cmd()
        .args(["compress-video", "in.mp4", "out.mp4", "--two-pass"])
        .assert()
        .code(2)
        .stderr(contains("--bitrate"));
    Ok(())
}

#[cfg(unix)]
mod fake_tools {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    const FAKE_FFMPEG: &str = r#"
for last; do :; done
case "$*" in
  -version) echo "ffmpeg version 0.0-fake" ;;
  *-vsync*) printf 'frame' > "$(printf '%s' "$last" | sed 's/%08d/00000001/')" ;;
  *) printf 'video' > "$last" ;;
esac
"#;

    const FAILING_FFMPEG: &str = r#"
echo "Invalid data found when processing input" >&2
exit 1
"#;

    const FAKE_FFPROBE: &str = "echo 24000/1001";

    const FAKE_WAIFU2X: &str = r#"
[ "$1" = "-h" ] && exit 1
out=""
while [ $# -gt 0 ]; do
  [ "$1" = "-o" ] && out="$2"
  shift
done
printf 'upscaled' > "$out/00000001.png"
echo "00000001.png done"
"#;

    fn script(dir: &Path, name: &str, body: &str) -> Result<PathBuf, Box<dyn Error>> {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    #[test]
    fn test_compress_video_with_env_tool_path() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let ffmpeg = script(dir.path(), "ffmpeg", FAKE_FFMPEG)?;
        let input = dir.path().join("in.mp4");
        let out = dir.path().join("out.mp4");
        fs::write(&input, b"video")?;

        refract_cmd()
            .env("REFRACT_FFMPEG", &ffmpeg)
            .arg("compress-video")
            .arg(&input)
            .arg(&out)
            .assert()
            .success()
            .stdout(contains("Compressed"));
        assert_eq!(fs::read(&out)?, b"video");
        Ok(())
    }

    #[test]
    fn test_tools_report_uses_configured_paths() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let ffmpeg = script(dir.path(), "ffmpeg", FAKE_FFMPEG)?;
        let ffprobe = script(dir.path(), "ffprobe", FAKE_FFPROBE)?;
        let waifu2x = script(dir.path(), "waifu2x", FAKE_WAIFU2X)?;

        let output = refract_cmd()
            .args(["tools", "--json"])
            .arg("--ffmpeg")
            .arg(&ffmpeg)
            .arg("--ffprobe")
            .arg(&ffprobe)
            .arg("--waifu2x")
            .arg(&waifu2x)
            .output()?;

        assert!(output.status.success());
        let value = json_stdout(&output)?;
        let tools = value["data"]["tools"].as_array().ok_or("tools missing")?;
        assert_eq!(tools.len(), 3);
        assert!(tools.iter().all(|t| t["available"] == true));
        Ok(())
    }

    #[test]
    fn test_upscale_video_end_to_end() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let temp_root = dir.path().join("tmp");
        fs::create_dir(&temp_root)?;
        let input = dir.path().join("clip.mp4");
        let out = dir.path().join("clip_2x.mp4");
        fs::write(&input, b"video")?;

        let output = refract_cmd()
            .env("REFRACT_FFMPEG", script(dir.path(), "ffmpeg", FAKE_FFMPEG)?)
            .env("REFRACT_FFPROBE", script(dir.path(), "ffprobe", FAKE_FFPROBE)?)
            .env("REFRACT_WAIFU2X", script(dir.path(), "waifu2x", FAKE_WAIFU2X)?)
            .env("REFRACT_TEMP_DIR", &temp_root)
            .args(["upscale-video", "--json"])
            .arg(&input)
            .arg(&out)
            .output()?;

        assert!(output.status.success());
        let value = json_stdout(&output)?;
        assert_eq!(value["data"]["report"]["fps"], 24);
        assert_eq!(value["data"]["report"]["fps_source"], "probed");
        assert!(out.is_file());
        assert_eq!(fs::read_dir(&temp_root)?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_upscale_video_extraction_failure() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let temp_root = dir.path().join("tmp");
        fs::create_dir(&temp_root)?;
        let input = dir.path().join("clip.mp4");
        fs::write(&input, b"not a video")?;

        let output = refract_cmd()
            .env("REFRACT_FFMPEG", script(dir.path(), "ffmpeg", FAILING_FFMPEG)?)
            .env("REFRACT_TEMP_DIR", &temp_root)
            .args(["upscale-video", "--json"])
            .arg(&input)
            .arg(dir.path().join("clip_2x.mp4"))
            .output()?;

        assert_eq!(output.status.code(), Some(1));
        let value = json_stdout(&output)?;
        assert_eq!(value["code"], "tool_failed");
        assert_eq!(value["stage"], "frame extraction");
        assert_eq!(
            value["data"]["diagnostics"][0],
            "Invalid data found when processing input"
        );
        assert_eq!(fs::read_dir(&temp_root)?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_interrupt_kills_tool_and_cleans_up() -> Result<(), Box<dyn Error>> {
        use std::process::{Command as StdCommand, Stdio};
        use std::thread;
        use std::time::{Duration, Instant};

        let dir = tempdir()?;
        let temp_root = dir.path().join("tmp");
        fs::create_dir(&temp_root)?;
        let input = dir.path().join("clip.mp4");
        fs::write(&input, b"video")?;
        let started_marker = dir.path().join("waifu2x.started");
        let slow_waifu2x = format!(
            "[ \"$1\" = \"-h\" ] && exit 1\ntouch '{}'\nsleep 20",
            started_marker.display()
        );

        let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("refract"))
            .env("REFRACT_FFMPEG", script(dir.path(), "ffmpeg", FAKE_FFMPEG)?)
            .env("REFRACT_FFPROBE", script(dir.path(), "ffprobe", FAKE_FFPROBE)?)
            .env("REFRACT_WAIFU2X", script(dir.path(), "waifu2x", &slow_waifu2x)?)
            .env("REFRACT_TEMP_DIR", &temp_root)
            .env_remove("REFRACT_MODEL_DIR")
            .args(["upscale-video", "--json"])
            .arg(&input)
            .arg(dir.path().join("clip_2x.mp4"))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let waiting = Instant::now();
        while !started_marker.exists() {
            if waiting.elapsed() > Duration::from_secs(10) {
                child.kill()?;
                return Err("waifu2x never started".into());
            }
            thread::sleep(Duration::from_millis(50));
        }

        let status = StdCommand::new("kill")
            .args(["-INT", &child.id().to_string()])
            .status()?;
        assert!(status.success());

        let output = child.wait_with_output()?;
        assert!(waiting.elapsed() < Duration::from_secs(15));
        assert_eq!(output.status.code(), Some(130));
        let value = json_stdout(&output)?;
        assert_eq!(value["code"], "interrupted");
        assert_eq!(fs::read_dir(&temp_root)?.count(), 0);
        Ok(())
    }
}
