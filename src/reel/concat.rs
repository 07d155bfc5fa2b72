//! Joining scene segments into the final video.
//!
//! Segments go through ffmpeg's concat demuxer. A stream copy is tried
//! first; when that fails for any reason, a timeout included, the same
//! list is re-encoded with the segment profile.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::reel::compose::SceneVideoSegment;
use crate::reel::error::{ReelError, ReelResult};
use crate::reel::logging::{log_event, log_event_with};
use crate::reel::support::ffmpeg::{
    FfmpegFailure, FfmpegRunOptions, FfmpegRunner, PROFILE_H264_AAC_SEGMENT, concat_list_entry,
};
use crate::ui::prelude::Level;

/// The joined output and the segments it was built from, in order.
#[derive(Debug, Clone, Serialize)]
pub struct FinalVideo {
    pub path: PathBuf,
    pub segments: Vec<SceneVideoSegment>,
}

impl FinalVideo {
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_seconds).sum()
    }
}

pub struct SegmentConcatenator<'a> {
    runner: &'a dyn FfmpegRunner,
    work_dir: PathBuf,
    timeout: Option<std::time::Duration>,
    verbose: bool,
}

impl<'a> SegmentConcatenator<'a> {
    pub fn new(runner: &'a dyn FfmpegRunner, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            work_dir: work_dir.into(),
            timeout: None,
            verbose: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Join `segments` in slice order into `output`.
    pub async fn concat(
        &self,
        segments: Vec<SceneVideoSegment>,
        output: &Path,
    ) -> ReelResult<FinalVideo> {
        let paths: Vec<PathBuf> = segments.iter().map(|s| s.path.clone()).collect();
        let total = segments.iter().map(|s| s.duration_seconds).sum();
        self.join(&paths, output, Some(total)).await?;
        Ok(FinalVideo {
            path: output.to_path_buf(),
            segments,
        })
    }

    /// Join plain files in slice order into `output`.
    pub async fn concat_paths(&self, paths: &[PathBuf], output: &Path) -> ReelResult<()> {
        self.join(paths, output, None).await
    }

    async fn join(&self, paths: &[PathBuf], output: &Path, total: Option<f64>) -> ReelResult<()> {
        if paths.is_empty() {
            return Err(ReelError::NoSegments);
        }

        let mut absolute = Vec::with_capacity(paths.len());
        for path in paths {
            if !path.is_file() {
                return Err(ReelError::MissingSegment { path: path.clone() });
            }
            absolute.push(std::path::absolute(path)?);
        }

        let list = write_concat_list(&self.work_dir, &absolute)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        if output.exists() {
            tokio::fs::remove_file(output).await?;
        }

        log_event(
            Level::Info,
            "reel.concat.start",
            format!("Joining {} segments into {}", paths.len(), output.display()),
        );

        let copy_args = concat_args(list.path(), output, false);
        let copy_result = self
            .runner
            .run(&copy_args, self.options("concat (copy)", total))
            .await;

        let copy_failure = match copy_result {
            Ok(()) => {
                self.finished(output, paths.len(), "copy");
                return Ok(());
            }
            Err(failure) => failure,
        };

        log_event(
            Level::Warn,
            "reel.concat.fallback",
            format!("Stream copy failed ({copy_failure}); re-encoding"),
        );
        let _ = tokio::fs::remove_file(output).await;

        let reencode_args = concat_args(list.path(), output, true);
        match self
            .runner
            .run(&reencode_args, self.options("concat (re-encode)", total))
            .await
        {
            Ok(()) => {
                self.finished(output, paths.len(), "reencode");
                Ok(())
            }
            Err(FfmpegFailure::Timeout { seconds }) => {
                let _ = tokio::fs::remove_file(output).await;
                Err(ReelError::Timeout {
                    stage: "concatenation".to_string(),
                    seconds,
                })
            }
            Err(reencode_failure) => {
                let _ = tokio::fs::remove_file(output).await;
                Err(ReelError::ConcatFailed {
                    copy: copy_failure.to_string(),
                    reencode: reencode_failure.to_string(),
                })
            }
        }
    }

    fn options(&self, label: &str, total: Option<f64>) -> FfmpegRunOptions {
        let options = FfmpegRunOptions::new(label)
            .with_timeout(self.timeout)
            .verbose(self.verbose);
        match total {
            Some(seconds) if seconds > 0.0 => options.with_duration(seconds),
            _ => options,
        }
    }

    fn finished(&self, output: &Path, count: usize, mode: &str) {
        log_event_with(
            Level::Success,
            "reel.concat.done",
            format!("Final video written to {}", output.display()),
            serde_json::json!({
                "path": output,
                "segments": count,
                "mode": mode,
            }),
        );
    }
}

/// Write the demuxer list. The file is deleted when the handle drops.
fn write_concat_list(work_dir: &Path, paths: &[PathBuf]) -> ReelResult<tempfile::NamedTempFile> {
    std::fs::create_dir_all(work_dir)?;
    let mut file = tempfile::Builder::new()
        .prefix("concat-")
        .suffix(".txt")
        .tempfile_in(work_dir)?;
    for path in paths {
        writeln!(file, "{}", concat_list_entry(path))?;
    }
    file.flush()?;
    Ok(file)
}

fn concat_args(list: &Path, output: &Path, reencode: bool) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list.to_string_lossy().into_owned(),
        "-map".to_string(),
        "0:v".to_string(),
        "-map".to_string(),
        "0:a?".to_string(),
    ];
    if reencode {
        PROFILE_H264_AAC_SEGMENT.push_to(&mut args);
    } else {
        args.push("-c".to_string());
        args.push("copy".to_string());
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
    }
    args.push(output.to_string_lossy().into_owned());
    args
}
