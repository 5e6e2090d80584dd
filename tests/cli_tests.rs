//! Command-line behaviour of the `cropper` binary

use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cropper(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cropper").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("CROPPER_CONFIG")
        .env_remove("CROPPER_CRF")
        .env_remove("CROPPER_PRESET")
        .env_remove("CROPPER_OVERWRITE")
        .env_remove("RUST_LOG");
    cmd
}

fn ffmpeg_available() -> bool {
    StdCommand::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    cropper(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("crop"));
}

#[test]
fn test_crop_requires_a_selection() {
    let dir = TempDir::new().unwrap();
    cropper(&dir)
        .args(["crop", "--input", "clip.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--rect"));
}

#[test]
fn test_drag_requires_canvas() {
    let dir = TempDir::new().unwrap();
    cropper(&dir)
        .args(["crop", "--input", "clip.mp4", "--drag", "1,1:50,50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--canvas"));
}

#[test]
fn test_crf_out_of_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    cropper(&dir)
        .args(["crop", "--input", "clip.mp4", "--rect", "0,0,10,10", "--crf", "99"])
        .assert()
        .failure();
}

#[test]
fn test_inspect_missing_file() {
    let dir = TempDir::new().unwrap();
    cropper(&dir)
        .args(["inspect", "--input", "nothing-here.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing-here.mp4"));
}

#[test]
fn test_bad_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cropper.toml"), "[encoder]\ncrf = 80\n").unwrap();

    cropper(&dir)
        .args(["inspect", "--input", "clip.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CRF"));
}

#[test]
fn test_crop_end_to_end_json() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg not available");
        return;
    }

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("clip.mp4");
    let status = StdCommand::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-f", "lavfi", "-i"])
        .arg("testsrc=duration=1:size=320x240:rate=25")
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-y"])
        .arg(&source)
        .status()
        .unwrap();
    if !status.success() {
        eprintln!("skipping: could not create fixture");
        return;
    }

    cropper(&dir)
        .args(["crop", "--input", "clip.mp4", "--rect", "0,0,160,120", "--width", "80", "--json", "--quiet"])
        .args(["--preset", "ultrafast"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"finished_at\""))
        .stdout(predicate::str::contains("cropped_clip.mp4"))
        .stdout(predicate::str::contains("no_audio_track"));

    assert!(dir.path().join("cropped_clip.mp4").exists());

    // a second run with --overwrite never must refuse
    cropper(&dir)
        .args(["crop", "--input", "clip.mp4", "--rect", "0,0,160,120", "--quiet", "--overwrite", "never"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cropped_clip.mp4"));
}
