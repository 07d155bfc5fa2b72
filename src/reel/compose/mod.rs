//! Scene composition: one still image, one narration track and optional
//! burned-in subtitles become one MP4 segment.

mod filters;


use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempPath;

use crate::reel::config::ReelConfig;
use crate::reel::error::{ReelError, ReelResult};
use crate::reel::logging::{log_event, log_event_with};
use crate::reel::manifest::SceneInput;
use crate::reel::subtitles::{CaptionSource, build_cues, render_srt};
use crate::reel::support::ffmpeg::{FfmpegFailure, FfmpegRunOptions, FfmpegRunner};
use crate::ui::prelude::Level;

pub use self::filters::{build_segment_args, build_video_filter};

/// One rendered scene, in playback position `order`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneVideoSegment {
    pub group_id: String,
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub order: usize,
}

/// Local files for one scene after asset resolution.
#[derive(Debug, Clone)]
pub struct ResolvedScene {
    pub order: usize,
    /// Unique per scene and attempt; prefixes every file the scene creates
    pub token: String,
    pub audio: PathBuf,
    pub image: PathBuf,
    /// Caller-supplied SRT document, never modified
    pub subtitle: Option<PathBuf>,
}

pub struct SceneComposer<'a> {
    runner: &'a dyn FfmpegRunner,
    config: &'a ReelConfig,
    work_dir: PathBuf,
    verbose: bool,
}

impl<'a> SceneComposer<'a> {
    pub fn new(runner: &'a dyn FfmpegRunner, config: &'a ReelConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            config,
            work_dir: work_dir.into(),
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Encode one scene to `output`, replacing any stale file there.
    pub async fn compose(
        &self,
        scene: &SceneInput,
        resolved: &ResolvedScene,
        output: &Path,
    ) -> ReelResult<SceneVideoSegment> {
        let label = scene.label();

        for path in [Some(&resolved.audio), Some(&resolved.image), resolved.subtitle.as_ref()]
            .into_iter()
            .flatten()
        {
            if !path.is_file() {
                return Err(ReelError::missing_asset(label, path));
            }
        }

        let duration = self.measure_duration(scene, &resolved.audio).await?;
        let subtitle_file = self.write_subtitles(scene, resolved, duration).await?;

        let filter = build_video_filter(
            subtitle_file.as_deref(),
            &self.config.subtitle_style(),
        );
        let args = build_segment_args(&resolved.image, &resolved.audio, filter, output);

        if output.exists() {
            tokio::fs::remove_file(output).await?;
        }

        log_event(
            Level::Info,
            "reel.compose.start",
            format!(
                "Encoding scene {} '{}' ({:.2}s)",
                resolved.order + 1,
                label,
                duration
            ),
        );
        log_event(
            Level::Debug,
            "reel.compose.args",
            format!("ffmpeg {}", args.join(" ")),
        );

        let options = FfmpegRunOptions::new(format!("scene {}", resolved.order + 1))
            .with_duration(duration)
            .with_timeout(self.config.ffmpeg_timeout())
            .verbose(self.verbose);
        let result = self.runner.run(&args, options).await;

        // The synthesized SRT goes away whether or not the encode worked
        drop(subtitle_file);

        result.map_err(|failure| encode_error(label, failure))?;

        log_event_with(
            Level::Success,
            "reel.compose.done",
            format!("Scene '{}' written to {}", label, output.display()),
            serde_json::json!({
                "group_id": scene.group_id,
                "order": resolved.order,
                "duration": duration,
                "path": output,
            }),
        );

        Ok(SceneVideoSegment {
            group_id: scene.group_id.clone(),
            path: output.to_path_buf(),
            duration_seconds: duration,
            order: resolved.order,
        })
    }

    /// Measured audio length, or the caller's hint when probing fails.
    async fn measure_duration(&self, scene: &SceneInput, audio: &Path) -> ReelResult<f64> {
        match self.runner.probe_duration(audio).await {
            Ok(seconds) => Ok(seconds),
            Err(err) => {
                let hint = scene.duration_hint;
                if !hint.is_finite() || hint <= 0.0 {
                    return Err(ReelError::scene(
                        scene.label(),
                        format!("could not measure audio duration ({err:#}) and no usable duration hint"),
                    ));
                }
                log_event(
                    Level::Warn,
                    "reel.compose.probe_fallback",
                    format!(
                        "Could not probe {} ({err:#}); using duration hint {hint:.2}s",
                        audio.display()
                    ),
                );
                Ok(hint)
            }
        }
    }

    /// Write the scene's SRT into the work dir. The returned guard deletes it.
    async fn write_subtitles(
        &self,
        scene: &SceneInput,
        resolved: &ResolvedScene,
        duration: f64,
    ) -> ReelResult<Option<TempPath>> {
        let existing = match &resolved.subtitle {
            Some(path) => Some(tokio::fs::read_to_string(path).await?),
            None => None,
        };

        let source = match (&existing, scene.narrative_text.as_deref()) {
            (Some(document), _) => CaptionSource::Srt(document),
            (None, Some(text)) if !text.trim().is_empty() => CaptionSource::Narration(text),
            _ => {
                log_event(
                    Level::Debug,
                    "reel.compose.no_subtitles",
                    format!("Scene '{}' has no narration text or subtitles", scene.label()),
                );
                return Ok(None);
            }
        };

        let cues = build_cues(
            source,
            duration,
            self.config.subtitle_mode,
            self.config.min_cue_chars,
        )?;
        if cues.is_empty() {
            return Ok(None);
        }

        let path = self.work_dir.join(format!("{}.srt", resolved.token));
        tokio::fs::write(&path, render_srt(&cues)).await?;
        log_event(
            Level::Debug,
            "reel.compose.subtitles",
            format!("Wrote {} cues to {}", cues.len(), path.display()),
        );
        Ok(Some(TempPath::from_path(path)))
    }
}

fn encode_error(scene: &str, failure: FfmpegFailure) -> ReelError {
    match failure {
        FfmpegFailure::Timeout { seconds } => ReelError::Timeout {
            stage: format!("scene '{scene}'"),
            seconds,
        },
        other => ReelError::SegmentEncode {
            scene: scene.to_string(),
            message: other.to_string(),
        },
    }
}
