use std::path::PathBuf;

use thiserror::Error;

/// Failures the scene pipeline reports to its caller.
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("Scene '{scene}': asset not found at {}", path.display())]
    MissingAsset { scene: String, path: PathBuf },

    #[error("Could not resolve asset '{location}': {message}")]
    AssetResolve { location: String, message: String },

    #[error("Scene '{scene}': ffmpeg failed to encode segment: {message}")]
    SegmentEncode { scene: String, message: String },

    #[error("Scene '{scene}': {message}")]
    Scene { scene: String, message: String },

    #[error("Segment file does not exist: {}", path.display())]
    MissingSegment { path: PathBuf },

    #[error("No segments to concatenate")]
    NoSegments,

    #[error("Concatenation failed (stream copy: {copy}; re-encode: {reencode})")]
    ConcatFailed { copy: String, reencode: String },

    #[error("ffmpeg exceeded the {seconds}s timeout during {stage}")]
    Timeout { stage: String, seconds: u64 },

    #[error("Invalid duration {0}; expected a positive number of seconds")]
    InvalidDuration(f64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReelError {
    pub fn missing_asset(scene: &str, path: impl Into<PathBuf>) -> Self {
        ReelError::MissingAsset {
            scene: scene.to_string(),
            path: path.into(),
        }
    }

    pub fn scene(scene: &str, message: impl Into<String>) -> Self {
        ReelError::Scene {
            scene: scene.to_string(),
            message: message.into(),
        }
    }
}

pub type ReelResult<T> = std::result::Result<T, ReelError>;
