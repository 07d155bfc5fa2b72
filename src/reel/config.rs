use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::paths;
use crate::reel::subtitles::{DEFAULT_MIN_CUE_CHARS, SubtitleMode, SubtitleStyle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    /// Cues shorter than this many characters are merged into a neighbour
    pub min_cue_chars: usize,
    /// How narration text is packaged into cues (merge or two_line)
    pub subtitle_mode: SubtitleMode,
    /// Subtitle font family
    pub font_name: String,
    /// Subtitle font size
    pub font_size: u32,
    /// Distance of the subtitles from the bottom edge
    pub margin_v: u32,
    /// Subtitle outline width
    pub outline: u32,
    /// Subtitle drop shadow depth
    pub shadow: u32,
    /// Kill ffmpeg after this many seconds (unset = no limit)
    pub ffmpeg_timeout_secs: Option<u64>,
    /// Keep per-scene segments and downloaded assets after the final video is written
    pub keep_segments: bool,
    /// Working directory for transient files (unset = cache directory)
    pub work_dir: Option<PathBuf>,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            min_cue_chars: DEFAULT_MIN_CUE_CHARS,
            subtitle_mode: SubtitleMode::default(),
            font_name: Self::DEFAULT_FONT_NAME.to_string(),
            font_size: Self::DEFAULT_FONT_SIZE,
            margin_v: Self::DEFAULT_MARGIN_V,
            outline: 3,
            shadow: 1,
            ffmpeg_timeout_secs: None,
            keep_segments: false,
            work_dir: None,
        }
    }
}

impl ReelConfig {
    pub const DEFAULT_FONT_NAME: &'static str = "Sans";
    pub const DEFAULT_FONT_SIZE: u32 = 64;
    pub const DEFAULT_MARGIN_V: u32 = 160;

    pub fn load() -> Result<Self> {
        Self::load_from_path(paths::reelcast_config_file()?)
    }

    /// Load the config, writing defaults when the file does not exist yet.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading reelcast config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing reelcast config {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("creating reelcast config directory {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("serializing reelcast config")?;
        fs::write(path, toml)
            .with_context(|| format!("writing reelcast config to {}", path.display()))?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if self.min_cue_chars == 0 {
            self.min_cue_chars = DEFAULT_MIN_CUE_CHARS;
        }
        if self.font_size == 0 {
            self.font_size = Self::DEFAULT_FONT_SIZE;
        }
        if self.font_name.trim().is_empty() {
            self.font_name = Self::DEFAULT_FONT_NAME.to_string();
        }
        if self.ffmpeg_timeout_secs == Some(0) {
            self.ffmpeg_timeout_secs = None;
        }
        self
    }

    pub fn subtitle_style(&self) -> SubtitleStyle {
        SubtitleStyle::bottom_caption(
            &self.font_name,
            self.font_size,
            self.margin_v,
            self.outline,
            self.shadow,
        )
    }

    pub fn ffmpeg_timeout(&self) -> Option<Duration> {
        self.ffmpeg_timeout_secs.map(Duration::from_secs)
    }

    /// Configured working directory, or the shared cache location.
    pub fn resolve_work_dir(&self) -> Result<PathBuf> {
        match &self.work_dir {
            Some(dir) => {
                let expanded = PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).as_ref());
                fs::create_dir_all(&expanded).with_context(|| {
                    format!("creating work directory at {}", expanded.display())
                })?;
                Ok(expanded)
            }
            None => paths::reelcast_work_dir(),
        }
    }
}
