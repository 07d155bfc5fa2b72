use std::fmt::Write;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::reel::support::timecode::{format_srt_timestamp, parse_srt_timestamp};

/// One timed subtitle entry. Times are seconds from the start of the scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Render cues as an SRT document.
pub fn render_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        let _ = writeln!(out, "{}", cue.index);
        let _ = writeln!(
            out,
            "{} --> {}",
            format_srt_timestamp(cue.start),
            format_srt_timestamp(cue.end)
        );
        let _ = writeln!(out, "{}", cue.text);
        out.push('\n');
    }
    out
}

fn blocks(input: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in input.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Recover the caption text of an SRT document as one string.
///
/// Every line after the index and time range of a block is caption text.
/// Timing is discarded; callers retime against the measured audio length.
pub fn extract_srt_text(input: &str) -> String {
    blocks(input)
        .into_iter()
        .filter(|block| block.len() > 2)
        .map(|block| {
            block[2..]
                .iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strict parse that keeps timing, for inspecting existing documents.
pub fn parse_srt(input: &str) -> Result<Vec<SubtitleCue>> {
    let mut cues = Vec::new();

    for block in blocks(input) {
        let mut lines = block.into_iter();
        let first = lines.next().map(str::trim).unwrap_or_default();

        // Index line can be omitted; accept a block that opens with the timing
        let times = if first.contains("-->") {
            first
        } else {
            lines
                .next()
                .map(str::trim)
                .context("SRT cue is missing a timestamp line")?
        };

        let (start_raw, end_raw) = times
            .split_once("-->")
            .map(|(a, b)| (a.trim(), b.trim()))
            .context("SRT cue timestamp line must contain '-->'")?;

        let start = parse_srt_timestamp(start_raw)
            .with_context(|| format!("Failed to parse SRT start timestamp '{start_raw}'"))?;
        let end = parse_srt_timestamp(end_raw)
            .with_context(|| format!("Failed to parse SRT end timestamp '{end_raw}'"))?;

        if end < start {
            bail!("SRT cue ends before it starts: {start_raw} --> {end_raw}");
        }

        let text = lines.map(str::trim).collect::<Vec<_>>().join(" ");
        cues.push(SubtitleCue {
            index: 0,
            start,
            end,
            text,
        });
    }

    cues.sort_by(|a, b| a.start.total_cmp(&b.start));
    for (i, cue) in cues.iter_mut().enumerate() {
        cue.index = i + 1;
    }
    Ok(cues)
}
