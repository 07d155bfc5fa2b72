use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::ProgressBar;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::common::progress::create_encode_bar;
use crate::ui::prelude::{OutputFormat, get_output_format};

/// Frame every segment is letterboxed into.
pub const FRAME_WIDTH: u32 = 1080;
pub const FRAME_HEIGHT: u32 = 1920;
pub const FRAME_RATE: u32 = 30;

/// Output encoding parameters shared by scene segments and the re-encode
/// concat fallback. Stream-copy concatenation relies on every segment
/// carrying exactly these.
#[derive(Debug, Clone, Copy)]
pub struct EncodeProfile {
    pub video_codec: &'static str,
    pub preset: &'static str,
    pub crf: u8,
    pub pixel_format: &'static str,
    pub frame_rate: u32,
    pub audio_codec: &'static str,
    pub audio_bitrate: &'static str,
    pub audio_rate: u32,
    pub audio_channels: u8,
}

pub const PROFILE_H264_AAC_SEGMENT: EncodeProfile = EncodeProfile {
    video_codec: "libx264",
    preset: "medium",
    crf: 20,
    pixel_format: "yuv420p",
    frame_rate: FRAME_RATE,
    audio_codec: "aac",
    audio_bitrate: "192k",
    audio_rate: 48_000,
    audio_channels: 2,
};

impl EncodeProfile {
    pub fn push_to(&self, args: &mut Vec<String>) {
        args.extend([
            "-c:v".to_string(),
            self.video_codec.to_string(),
            "-preset".to_string(),
            self.preset.to_string(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.to_string(),
            "-r".to_string(),
            self.frame_rate.to_string(),
            "-c:a".to_string(),
            self.audio_codec.to_string(),
            "-b:a".to_string(),
            self.audio_bitrate.to_string(),
            "-ar".to_string(),
            self.audio_rate.to_string(),
            "-ac".to_string(),
            self.audio_channels.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]);
    }
}

/// Escape a path for use inside a single-quoted filter argument.
///
/// ffmpeg unescapes the value twice: the filtergraph parser strips the
/// quotes, then the option parser reads `\` escapes. Each quote gets an
/// option-level escape, and the graph-level quoting is closed and reopened
/// around it.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
        .replace('\'', "'\\''")
}

/// One `file '...'` line of a concat demuxer list.
pub fn concat_list_entry(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', "'\\''"))
}

#[derive(Debug, Error)]
pub enum FfmpegFailure {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: &'static str,
        source: std::io::Error,
    },

    #[error("ffmpeg exited with status {code:?}: {diagnostic}")]
    Exit {
        code: Option<i32>,
        diagnostic: String,
    },

    #[error("ffmpeg did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("failed while reading ffmpeg output: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    /// Expected output length, drives the progress bar
    pub total_duration: Option<f64>,
    /// Echo ffmpeg's stderr
    pub verbose: bool,
    pub timeout: Option<Duration>,
    /// Short description shown next to the progress bar
    pub label: String,
}

impl FfmpegRunOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.total_duration = Some(seconds);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// The media engine seam: encoding runs and duration probes.
#[async_trait]
pub trait FfmpegRunner: Send + Sync {
    async fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<(), FfmpegFailure>;

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        probe_duration_seconds(path).await
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpegRunner;

#[async_trait]
impl FfmpegRunner for SystemFfmpegRunner {
    async fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<(), FfmpegFailure> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FfmpegFailure::Spawn {
                program: "ffmpeg",
                source,
            })?;

        let pb = match (options.total_duration, get_output_format()) {
            (Some(duration), OutputFormat::Text) => Some(create_encode_bar(duration, &options.label)),
            _ => None,
        };

        let mut transcript = StderrTranscript::default();
        let outcome = match options.timeout {
            Some(limit) => {
                match tokio::time::timeout(
                    limit,
                    drive(&mut child, options.verbose, pb.as_ref(), &mut transcript),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                        if let Some(pb) = &pb {
                            pb.abandon_with_message("timed out");
                        }
                        return Err(FfmpegFailure::Timeout {
                            seconds: limit.as_secs(),
                        });
                    }
                }
            }
            None => drive(&mut child, options.verbose, pb.as_ref(), &mut transcript).await,
        };

        let status = match outcome {
            Ok(status) => status,
            Err(err) => {
                if let Some(pb) = &pb {
                    pb.abandon();
                }
                return Err(err);
            }
        };

        if !status.success() {
            if let Some(pb) = &pb {
                pb.abandon_with_message("failed");
            }
            return Err(FfmpegFailure::Exit {
                code: status.code(),
                diagnostic: transcript.diagnostic(),
            });
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        Ok(())
    }
}

async fn drive(
    child: &mut Child,
    verbose: bool,
    pb: Option<&ProgressBar>,
    transcript: &mut StderrTranscript,
) -> Result<ExitStatus, FfmpegFailure> {
    if let Some(stderr) = child.stderr.take() {
        read_ffmpeg_stderr(stderr, verbose, pb, transcript).await?;
    }
    Ok(child.wait().await?)
}

/// What we keep of ffmpeg's stderr for error reporting.
#[derive(Debug, Default)]
struct StderrTranscript {
    last_line: String,
    error_lines: Vec<String>,
}

impl StderrTranscript {
    fn record(&mut self, line: &str) {
        self.last_line = line.to_string();
        if line.contains("error") || line.contains("Error") || line.contains("ERROR") {
            self.error_lines.push(line.to_string());
        }
    }

    fn diagnostic(&self) -> String {
        if self.error_lines.is_empty() {
            self.last_line.trim().to_string()
        } else {
            self.error_lines.join("\n").trim().to_string()
        }
    }
}

async fn read_ffmpeg_stderr<R: AsyncRead + Unpin>(
    mut stderr: R,
    verbose: bool,
    pb: Option<&ProgressBar>,
    transcript: &mut StderrTranscript,
) -> Result<(), FfmpegFailure> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }

        accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

        // ffmpeg redraws its status line with '\r'
        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line: String = accumulated.drain(..=pos).collect();
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }
            handle_stderr_line(line, verbose, pb, transcript);
        }
    }

    let rest = accumulated.trim();
    if !rest.is_empty() {
        handle_stderr_line(rest, verbose, pb, transcript);
    }

    Ok(())
}

fn handle_stderr_line(
    line: &str,
    verbose: bool,
    pb: Option<&ProgressBar>,
    transcript: &mut StderrTranscript,
) {
    transcript.record(line);

    if verbose {
        match pb {
            Some(pb) => pb.println(line),
            None => eprintln!("{}", line),
        }
    }

    if let Some(pb) = pb
        && let Some(progress) = parse_ffmpeg_progress(line)
    {
        pb.set_position((progress * 1000.0) as u64);
        if let Some(speed) = parse_ffmpeg_speed(line) {
            pb.set_message(speed);
        }
    }
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let (_, rest) = line.split_once("time=")?;
    let value = rest.split_whitespace().next()?;
    parse_clock_to_seconds(value)
}

fn parse_clock_to_seconds(time_str: &str) -> Option<f64> {
    let mut parts = time_str.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_ffmpeg_speed(line: &str) -> Option<String> {
    let (_, rest) = line.split_once("speed=")?;
    let value = rest.trim_start().split_whitespace().next()?;
    value.ends_with('x').then(|| value.to_string())
}

/// Container duration reported by ffprobe, in seconds.
pub async fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration: f64 = duration_str
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse ffprobe duration '{}'", duration_str.trim()))?;

    if !duration.is_finite() || duration <= 0.0 {
        anyhow::bail!(
            "ffprobe reported unusable duration {duration} for {}",
            path.display()
        );
    }

    Ok(duration)
}
