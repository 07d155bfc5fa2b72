use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

use crate::common::paths;
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

use super::cli::{ComposeArgs, ConcatArgs, ReelCommands, RenderArgs, SubtitlesArgs};
use super::concat::SegmentConcatenator;
use super::config::ReelConfig;
use super::manifest::Manifest;
use super::pipeline::{ReelPipeline, ReportLine, emit_report, emit_summary, sanitize_id};
use super::subtitles::{CaptionSource, SubtitleMode, build_cues, parse_srt, render_srt};
use super::support::ffmpeg::SystemFfmpegRunner;
use super::support::timecode::format_srt_timestamp;

pub async fn handle_reel_command(command: ReelCommands) -> Result<()> {
    match command {
        ReelCommands::Render(args) => handle_render(args).await,
        ReelCommands::Compose(args) => handle_compose(args).await,
        ReelCommands::Concat(args) => handle_concat(args).await,
        ReelCommands::Subtitles(args) => handle_subtitles(args),
        ReelCommands::Check => handle_check(),
    }
}

/// Config file values with command line overrides applied on top.
fn load_config(work_dir: Option<&PathBuf>, two_line: bool, keep_segments: bool) -> Result<ReelConfig> {
    let mut config = ReelConfig::load()?;
    if let Some(dir) = work_dir {
        config.work_dir = Some(dir.clone());
    }
    if two_line {
        config.subtitle_mode = SubtitleMode::TwoLine;
    }
    if keep_segments {
        config.keep_segments = true;
    }
    Ok(config)
}

async fn handle_render(args: RenderArgs) -> Result<()> {
    let config = load_config(args.work_dir.as_ref(), args.two_line, args.keep_segments)?;
    let manifest = Manifest::load(&args.manifest)?;
    let output = args
        .out_file
        .clone()
        .or_else(|| manifest.output_path())
        .unwrap_or_else(|| args.manifest.with_extension("mp4"));
    let work_dir = config.resolve_work_dir()?;

    emit(
        Level::Debug,
        "reel.render.work_dir",
        &format!("Working directory: {}", work_dir.display()),
        None,
    );

    let runner = SystemFfmpegRunner;
    let video = ReelPipeline::new(&runner, &config, work_dir)
        .verbose(args.verbose)
        .render(&manifest, &output)
        .await
        .with_context(|| format!("Failed to render {}", args.manifest.display()))?;

    emit_summary(&video);
    Ok(())
}

async fn handle_compose(args: ComposeArgs) -> Result<()> {
    let config = load_config(args.work_dir.as_ref(), args.two_line, false)?;
    let manifest = Manifest::load(&args.manifest)?;
    let (order, scene) = manifest.find_scene(&args.scene).ok_or_else(|| {
        anyhow!(
            "No scene '{}' in {} ({} scenes)",
            args.scene,
            args.manifest.display(),
            manifest.scenes.len()
        )
    })?;
    let output = args.out_file.clone().unwrap_or_else(|| {
        manifest
            .base_dir
            .join(format!("{}.mp4", sanitize_id(scene.label())))
    });
    let work_dir = config.resolve_work_dir()?;

    let runner = SystemFfmpegRunner;
    let segment = ReelPipeline::new(&runner, &config, work_dir)
        .verbose(args.verbose)
        .render_scene(&manifest, order, &output)
        .await
        .with_context(|| format!("Failed to compose scene '{}'", args.scene))?;

    emit(
        Level::Info,
        "reel.compose.summary",
        &format!(
            "Scene {} '{}' is {:.2}s long",
            segment.order + 1,
            segment.group_id,
            segment.duration_seconds
        ),
        serde_json::to_value(&segment).ok(),
    );
    Ok(())
}

async fn handle_concat(args: ConcatArgs) -> Result<()> {
    let config = ReelConfig::load()?;
    let work_dir = config.resolve_work_dir()?;

    let runner = SystemFfmpegRunner;
    SegmentConcatenator::new(&runner, work_dir)
        .with_timeout(config.ffmpeg_timeout())
        .verbose(args.verbose)
        .concat_paths(&args.segments, &args.out_file)
        .await
        .with_context(|| format!("Failed to write {}", args.out_file.display()))?;
    Ok(())
}

fn handle_subtitles(args: SubtitlesArgs) -> Result<()> {
    if args.inspect {
        let path = args
            .srt
            .as_ref()
            .ok_or_else(|| anyhow!("--inspect needs --srt"))?;
        return inspect_srt(path);
    }

    let config = ReelConfig::load()?;
    let duration = args
        .duration
        .ok_or_else(|| anyhow!("--duration is required"))?;
    let mode = if args.two_line {
        SubtitleMode::TwoLine
    } else {
        config.subtitle_mode
    };

    let contents = match (&args.text, &args.text_file, &args.srt) {
        (Some(text), _, _) => text.clone(),
        (None, Some(path), _) | (None, None, Some(path)) => read_text(path)?,
        (None, None, None) => bail!("Provide --text, --text-file or --srt"),
    };
    let source = if args.srt.is_some() && args.text.is_none() && args.text_file.is_none() {
        CaptionSource::Srt(&contents)
    } else {
        CaptionSource::Narration(&contents)
    };

    let cues = build_cues(source, duration, mode, config.min_cue_chars)?;
    let document = render_srt(&cues);

    match &args.out_file {
        Some(path) => {
            fs::write(path, &document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            emit(
                Level::Success,
                "reel.subtitles.written",
                &format!("Wrote {} cues to {}", cues.len(), path.display()),
                None,
            );
        }
        None => match get_output_format() {
            OutputFormat::Json => emit(
                Level::Info,
                "reel.subtitles.cues",
                &format!("{} cues", cues.len()),
                serde_json::to_value(&cues).ok(),
            ),
            OutputFormat::Text => print!("{document}"),
        },
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn inspect_srt(path: &Path) -> Result<()> {
    let cues = parse_srt(&read_text(path)?)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    for cue in &cues {
        emit(
            Level::Info,
            "reel.subtitles.cue",
            &format!(
                "{:>3}  {} --> {}  {}",
                cue.index,
                format_srt_timestamp(cue.start),
                format_srt_timestamp(cue.end),
                cue.text.replace('\n', " / ")
            ),
            serde_json::to_value(cue).ok(),
        );
    }

    let span = cues.last().map_or(0.0, |cue| cue.end);
    emit(
        Level::Success,
        "reel.subtitles.inspected",
        &format!("{} cues spanning {}", cues.len(), format_srt_timestamp(span)),
        None,
    );
    Ok(())
}

fn handle_check() -> Result<()> {
    let mut lines = Vec::new();
    let mut missing = Vec::new();

    for tool in ["ffmpeg", "ffprobe"] {
        match which::which(tool) {
            Ok(path) => lines.push(ReportLine::new(
                Level::Success,
                "reel.check.tool",
                format!("{tool}: {}", path.display()),
            )),
            Err(_) => {
                lines.push(ReportLine::new(
                    Level::Error,
                    "reel.check.tool_missing",
                    format!("{tool}: not found on PATH"),
                ));
                missing.push(tool);
            }
        }
    }

    let config_path = paths::reelcast_config_file()?;
    let state = if config_path.exists() {
        "exists"
    } else {
        "not created yet"
    };
    lines.push(ReportLine::new(
        Level::Info,
        "reel.check.config",
        format!("config: {} ({state})", config_path.display()),
    ));

    emit_report(&lines);

    if !missing.is_empty() {
        bail!("Missing required tools: {}", missing.join(", "));
    }
    Ok(())
}
