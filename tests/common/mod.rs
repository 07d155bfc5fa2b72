#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Isolated config file, work directory and asset directory for one test.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        std::fs::create_dir_all(temp_dir.path().join("assets"))?;
        std::fs::create_dir_all(temp_dir.path().join("work"))?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn assets(&self) -> PathBuf {
        self.path().join("assets")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.path().join("work")
    }

    pub fn config_file(&self) -> PathBuf {
        self.path().join("reelcast.toml")
    }

    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.assets().join(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Run the built binary with this environment's config file.
    pub fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(env!("CARGO_BIN_EXE_reelcast"))
            .args(["--no-color"])
            .args(args)
            .env("REELCAST_CONFIG", self.config_file())
            .current_dir(self.path())
            .output()
            .context("running reelcast")?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

pub fn ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}

fn run_ffmpeg(args: &[&str]) -> Result<()> {
    let output = Command::new("ffmpeg")
        .args(["-y", "-hide_banner", "-loglevel", "error"])
        .args(args)
        .output()
        .context("running ffmpeg")?;
    if !output.status.success() {
        bail!("ffmpeg failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(())
}

/// Sine tone of exactly `seconds` length.
pub fn make_tone(path: &Path, seconds: f64, frequency: u32) -> Result<()> {
    let source = format!("sine=frequency={frequency}:sample_rate=48000:duration={seconds}");
    run_ffmpeg(&["-f", "lavfi", "-i", &source, "-c:a", "aac", &path.to_string_lossy()])
}

/// Landscape still image, so letterboxing has work to do.
pub fn make_image(path: &Path, color: &str) -> Result<()> {
    let source = format!("color=c={color}:s=1280x720:d=1");
    run_ffmpeg(&["-f", "lavfi", "-i", &source, "-frames:v", "1", &path.to_string_lossy()])
}

pub fn probe(path: &Path, streams: Option<&str>, entries: &str) -> Result<String> {
    let mut command = Command::new("ffprobe");
    command.args(["-v", "error"]);
    if let Some(selector) = streams {
        command.args(["-select_streams", selector]);
    }
    let output = command
        .args(["-show_entries", entries, "-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(path)
        .output()
        .context("running ffprobe")?;
    if !output.status.success() {
        bail!("ffprobe failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub fn probe_duration(path: &Path) -> Result<f64> {
    Ok(probe(path, None, "format=duration")?.parse()?)
}

pub fn probe_frame_size(path: &Path) -> Result<(u32, u32)> {
    let raw = probe(path, Some("v:0"), "stream=width,height")?;
    let mut values = raw.lines().map(|line| line.trim().parse::<u32>());
    match (values.next(), values.next()) {
        (Some(Ok(width)), Some(Ok(height))) => Ok((width, height)),
        _ => bail!("unexpected ffprobe output: {raw}"),
    }
}
