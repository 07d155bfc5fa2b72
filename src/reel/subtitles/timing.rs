use crate::reel::error::{ReelError, ReelResult};

use super::srt::SubtitleCue;

/// Spread `texts` uniformly over `total_seconds`.
///
/// Each cue starts where the previous one ended and the last cue ends at
/// exactly `total_seconds`, so no rounding error collects at the boundary.
pub fn allocate_uniform(texts: Vec<String>, total_seconds: f64) -> ReelResult<Vec<SubtitleCue>> {
    if !total_seconds.is_finite() || total_seconds <= 0.0 {
        return Err(ReelError::InvalidDuration(total_seconds));
    }

    let count = texts.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    let slice = total_seconds / count as f64;
    let mut cues = Vec::with_capacity(count);
    let mut start = 0.0;

    for (i, text) in texts.into_iter().enumerate() {
        let end = if i + 1 == count {
            total_seconds
        } else {
            (i + 1) as f64 * slice
        };
        cues.push(SubtitleCue {
            index: i + 1,
            start,
            end,
            text,
        });
        start = end;
    }

    Ok(cues)
}
