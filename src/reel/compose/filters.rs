use std::path::Path;

use crate::reel::subtitles::SubtitleStyle;
use crate::reel::support::ffmpeg::{
    FRAME_HEIGHT, FRAME_RATE, FRAME_WIDTH, PROFILE_H264_AAC_SEGMENT, escape_filter_path,
};

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: String) {
        self.filters.push(filter);
    }

    pub fn join(&self) -> String {
        self.filters.join(",")
    }
}

/// Letterbox into the vertical frame, then burn subtitles if there are any.
pub fn build_video_filter(subtitle: Option<&Path>, style: &SubtitleStyle) -> String {
    let mut chain = FilterChain::new();
    chain.push(format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease",
        w = FRAME_WIDTH,
        h = FRAME_HEIGHT
    ));
    chain.push(format!(
        "pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black",
        w = FRAME_WIDTH,
        h = FRAME_HEIGHT
    ));
    chain.push("setsar=1".to_string());

    if let Some(path) = subtitle {
        chain.push(format!(
            "subtitles='{path}':force_style='{style}'",
            path = escape_filter_path(path),
            style = style.to_force_style()
        ));
    }

    chain.join()
}

/// ffmpeg arguments for one still-image segment.
///
/// The image loops for as long as the audio plays; `-shortest` lets the
/// audio decide where the segment ends.
pub fn build_segment_args(image: &Path, audio: &Path, video_filter: String, output: &Path) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-framerate".to_string(),
        FRAME_RATE.to_string(),
        "-i".to_string(),
        image.to_string_lossy().into_owned(),
        "-i".to_string(),
        audio.to_string_lossy().into_owned(),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "1:a:0".to_string(),
        "-vf".to_string(),
        video_filter,
    ];
    PROFILE_H264_AAC_SEGMENT.push_to(&mut args);
    args.push("-shortest".to_string());
    args.push(output.to_string_lossy().into_owned());
    args
}
