// refract-core/tests/pipeline_tests.rs
//
// Drives MediaEngine end to end with shell scripts standing in for ffmpeg,
// ffprobe and the upscaler.

#![cfg(unix)]

mod common;

use refract_core::config::{UpscaleConfig, VideoCompressionConfig, VideoUpscaleConfig};
use refract_core::processing::FpsSource;
use refract_core::{CoreError, EngineConfigBuilder, MediaEngine, PipelineStage, PipelineState};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

struct Tools {
    dir: TempDir,
    temp_root: TempDir,
}

impl Tools {
    fn new(ffmpeg: &str) -> Self {
        let dir = tempdir().unwrap();
        common::write_script(dir.path(), "ffmpeg", ffmpeg);
        common::write_script(dir.path(), "ffprobe", common::FAKE_FFPROBE);
        common::write_script(dir.path(), "waifu2x", common::FAKE_WAIFU2X);
        Self {
            dir,
            temp_root: tempdir().unwrap(),
        }
    }

    fn engine(&self) -> MediaEngine {
        let config = EngineConfigBuilder::new()
            .ffmpeg_path(self.dir.path().join("ffmpeg"))
            .ffprobe_path(self.dir.path().join("ffprobe"))
            .waifu2x_path(self.dir.path().join("waifu2x"))
            .no_model_dir()
            .temp_dir(self.temp_root.path())
            .build();
        MediaEngine::new(config).unwrap()
    }

    fn calls(&self) -> Vec<String> {
        common::read_calls(self.dir.path())
    }

    fn temp_entries(&self) -> usize {
        fs::read_dir(self.temp_root.path()).unwrap().count()
    }
}

fn input_video(dir: &Path) -> PathBuf {
    let input = dir.join("clip.mp4");
    fs::write(&input, b"not really a video").unwrap();
    input
}

#[test]
fn test_upscale_video_runs_all_stages_in_order() {
    let tools = Tools::new(common::FAKE_FFMPEG);
    let work = tempdir().unwrap();
    let input = input_video(work.path());
    let output = work.path().join("out/clip_2x.mp4");

    let report = tools
        .engine()
        .upscale_video(&input, &output, &VideoUpscaleConfig::default())
        .unwrap();

    assert_eq!(report.state, PipelineState::Done);
    assert_eq!(report.fps, 24);
    assert_eq!(report.fps_source, FpsSource::Probed);
    assert_eq!(report.frames_reported, 1);
    assert_eq!(fs::read(&output).unwrap(), b"video");

    let calls = tools.calls();
    assert_eq!(calls.len(), 4, "{calls:?}");
    assert!(calls[0].starts_with("ffmpeg") && calls[0].contains("-vsync 0"));
    assert!(calls[1].starts_with("waifu2x") && calls[1].contains("-s 2 -n 0"));
    assert!(calls[2].starts_with("ffprobe"));
    assert!(calls[3].contains("-framerate 24") && calls[3].contains("-map 1:a?"));

    assert_eq!(tools.temp_entries(), 0);
}

#[test]
fn test_extraction_failure_cleans_up_and_skips_later_stages() {
    let tools = Tools::new(common::FAILING_FFMPEG);
    let work = tempdir().unwrap();
    let input = input_video(work.path());
    let output = work.path().join("clip_2x.mp4");

    let err = tools
        .engine()
        .upscale_video(&input, &output, &VideoUpscaleConfig::default())
        .unwrap_err();

    match &err {
        CoreError::Stage { stage, source } => {
            assert_eq!(*stage, PipelineStage::Extract);
            assert!(matches!(**source, CoreError::CommandFailed { exit_code: 1, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Invalid data found"));
    assert_eq!(tools.calls().len(), 1);
    assert_eq!(tools.temp_entries(), 0);
    assert!(!output.exists());
}

#[test]
fn test_missing_upscaler_is_reported_as_dependency_error() {
    let tools = Tools::new(common::FAKE_FFMPEG);
    fs::remove_file(tools.dir.path().join("waifu2x")).unwrap();
    let work = tempdir().unwrap();
    let input = input_video(work.path());

    let err = tools
        .engine()
        .upscale_video(&input, &work.path().join("o.mp4"), &VideoUpscaleConfig::default())
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::Stage { stage: PipelineStage::Upscale, .. }
    ));
    assert_eq!(err.code(), "tool_unavailable");
    assert_eq!(tools.temp_entries(), 0);
}

#[test]
fn test_missing_input_fails_before_any_tool_runs() {
    let tools = Tools::new(common::FAKE_FFMPEG);
    let work = tempdir().unwrap();

    let err = tools
        .engine()
        .upscale_video(
            &work.path().join("absent.mp4"),
            &work.path().join("o.mp4"),
            &VideoUpscaleConfig::default(),
        )
        .unwrap_err();

    assert_eq!(err.code(), "input_not_found");
    assert!(tools.calls().is_empty());
    assert_eq!(tools.temp_entries(), 0);
}

#[test]
fn test_compress_video_two_pass() {
    let tools = Tools::new(common::FAKE_FFMPEG);
    let work = tempdir().unwrap();
    let input = input_video(work.path());
    let output = work.path().join("small.mp4");

    let config = VideoCompressionConfig {
        target_bitrate_kbps: Some(800),
        two_pass: true,
        copy_audio: false,
        ..Default::default()
    };
    tools.engine().compress_video(&input, &output, &config).unwrap();

    let calls = tools.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].contains("-pass 1") && calls[0].contains("-f null /dev/null"));
    assert!(calls[1].contains("-pass 2") && calls[1].contains("-b:a 128k"));
    assert_eq!(fs::read(&output).unwrap(), b"video");
    assert_eq!(tools.temp_entries(), 0);
}

#[test]
fn test_upscale_image_and_availability() {
    let tools = Tools::new(common::FAKE_FFMPEG);
    let work = tempdir().unwrap();
    let input = work.path().join("a.png");
    common::write_image(&input, 8, 8);
    let output = work.path().join("up/a.png");

    let engine = tools.engine();
    engine.upscale_image(&input, &output, &UpscaleConfig::default()).unwrap();
    assert!(output.is_file());

    assert!(engine.is_ffmpeg_available());
    assert!(engine.is_ffprobe_available());
    assert!(engine.is_waifu2x_available());
    assert_eq!(engine.probe_frame_rate(&input), Some(24));

    let report = engine.tool_report();
    assert!(report.iter().all(|tool| tool.available && tool.path.is_some()));
}
