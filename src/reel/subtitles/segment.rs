//! Sentence segmentation and short-cue merging for narration text.

use std::sync::LazyLock;

use regex::Regex;

/// Minimum characters a merged cue should hold before a new cue starts.
pub const DEFAULT_MIN_CUE_CHARS: usize = 18;

/// A terminator run (`.`, `!`, `?`, optionally closed by a quote or bracket)
/// followed by whitespace. Applied to whitespace-collapsed text, so the
/// whitespace is always exactly one space.
static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]+["'”’)\]]* "#).expect("sentence boundary pattern is valid")
});

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split narration text into trimmed sentences.
///
/// A terminator directly followed by a digit never splits, so `3.5` or
/// `v1.2` stay intact. Text without any terminator is returned as a single
/// sentence; whitespace-only text yields nothing.
pub fn segment_sentences(text: &str) -> Vec<String> {
    let normalized = collapse_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut last = 0;
    for boundary in SENTENCE_BOUNDARY.find_iter(&normalized) {
        // Drop the trailing space that belongs to the boundary.
        let end = boundary.end() - 1;
        let sentence = normalized[last..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last = boundary.end();
    }

    let tail = normalized[last..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Merge sentences shorter than `min_chars` into their neighbours.
///
/// While the last emitted cue is under the threshold the next sentence is
/// appended to it. A trailing cue that is still too short is folded back
/// into the one before it.
pub fn merge_short_cues(sentences: Vec<String>, min_chars: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(sentences.len());

    for sentence in sentences {
        match merged.last_mut() {
            Some(last) if char_len(last) < min_chars => {
                last.push(' ');
                last.push_str(&sentence);
            }
            _ => merged.push(sentence),
        }
    }

    if merged.len() >= 2
        && merged.last().is_some_and(|last| char_len(last) < min_chars)
        && let Some(tail) = merged.pop()
        && let Some(previous) = merged.last_mut()
    {
        previous.push(' ');
        previous.push_str(&tail);
    }

    merged
}
