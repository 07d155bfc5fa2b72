//! Narrated still-image scenes to vertical video.
//!
//! A manifest lists scenes in order. Each scene's assets are resolved to
//! local files, its narration is cut into timed subtitle cues, and ffmpeg
//! encodes a letterboxed segment with the cues burned in. The segments are
//! then joined into the final video.

pub mod assets;
pub mod cli;
pub mod commands;
pub mod compose;
pub mod concat;
pub mod config;
pub mod error;
mod logging;
pub mod manifest;
pub mod pipeline;
pub mod subtitles;
pub mod support;

pub use cli::ReelCommands;
pub use commands::handle_reel_command;
