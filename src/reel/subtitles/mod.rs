//! Subtitle cues for scene narration.
//!
//! Narration is split into sentences, short sentences are merged (or grouped
//! into two-line blocks), and the result is spread uniformly over the
//! measured audio length before being written as SRT.

mod reformat;
mod segment;
mod srt;
mod style;
mod timing;

use serde::{Deserialize, Serialize};

use crate::reel::error::ReelResult;

pub use reformat::{reformat_two_line, two_line_blocks};
pub use segment::{DEFAULT_MIN_CUE_CHARS, merge_short_cues, segment_sentences};
pub use srt::{SubtitleCue, extract_srt_text, parse_srt, render_srt};
pub use style::SubtitleStyle;
pub use timing::allocate_uniform;

/// How narration text is packaged into cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleMode {
    /// One cue per sentence, short sentences merged into neighbours
    #[default]
    Merge,
    /// Blocks of at most two sentences
    TwoLine,
}

/// Where a scene's caption text comes from.
#[derive(Debug, Clone, Copy)]
pub enum CaptionSource<'a> {
    /// Plain narration text
    Narration(&'a str),
    /// Contents of an existing SRT document; only its text is reused
    Srt(&'a str),
}

/// Build cues for one scene spanning exactly `total_seconds`.
pub fn build_cues(
    source: CaptionSource<'_>,
    total_seconds: f64,
    mode: SubtitleMode,
    min_cue_chars: usize,
) -> ReelResult<Vec<SubtitleCue>> {
    match source {
        CaptionSource::Srt(document) => reformat_two_line(&extract_srt_text(document), total_seconds),
        CaptionSource::Narration(text) => match mode {
            SubtitleMode::TwoLine => reformat_two_line(text, total_seconds),
            SubtitleMode::Merge => allocate_uniform(
                merge_short_cues(segment_sentences(text), min_cue_chars),
                total_seconds,
            ),
        },
    }
}
