use crate::reel::error::ReelResult;

use super::segment::segment_sentences;
use super::srt::SubtitleCue;
use super::timing::allocate_uniform;

/// Sentences allowed on screen at once.
const LINES_PER_BLOCK: usize = 2;

/// Group narration into display blocks of at most two sentences.
///
/// Text with no sentences yields no blocks rather than an empty one, so
/// every cue built from the result has visible text.
pub fn two_line_blocks(text: &str) -> Vec<String> {
    segment_sentences(text)
        .chunks(LINES_PER_BLOCK)
        .map(|block| block.join(" "))
        .collect()
}

/// Two-line blocks timed uniformly over `total_seconds`.
pub fn reformat_two_line(text: &str, total_seconds: f64) -> ReelResult<Vec<SubtitleCue>> {
    allocate_uniform(two_line_blocks(text), total_seconds)
}
