use clap::{ArgGroup, Args, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum ReelCommands {
    /// Render every scene of a manifest and join them into one video
    Render(RenderArgs),
    /// Render a single scene of a manifest
    Compose(ComposeArgs),
    /// Join existing segment files in the given order
    Concat(ConcatArgs),
    /// Build subtitle cues for narration text or an existing SRT file
    Subtitles(SubtitlesArgs),
    /// Report whether ffmpeg and ffprobe are available
    Check,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Scene manifest (JSON or YAML)
    #[arg(value_hint = ValueHint::FilePath)]
    pub manifest: PathBuf,

    /// Final video path; defaults to the manifest's output or <manifest>.mp4
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Directory for transient scene files
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub work_dir: Option<PathBuf>,

    /// Group narration into two-sentence blocks instead of merging short cues
    #[arg(long)]
    pub two_line: bool,

    /// Keep scene segments and resolved assets after rendering
    #[arg(long)]
    pub keep_segments: bool,

    /// Show ffmpeg output while encoding
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ComposeArgs {
    /// Scene manifest (JSON or YAML)
    #[arg(value_hint = ValueHint::FilePath)]
    pub manifest: PathBuf,

    /// Group id or 1-based position of the scene
    #[arg(long)]
    pub scene: String,

    /// Segment path; defaults to <group id>.mp4 next to the manifest
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Directory for transient scene files
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub work_dir: Option<PathBuf>,

    #[arg(long)]
    pub two_line: bool,

    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConcatArgs {
    /// Segment files, in playback order
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    pub segments: Vec<PathBuf>,

    /// Joined output file
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: PathBuf,

    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["text", "text_file", "srt"])
))]
pub struct SubtitlesArgs {
    /// Narration text
    #[arg(long)]
    pub text: Option<String>,

    /// File containing narration text
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub text_file: Option<PathBuf>,

    /// Existing SRT document to retime
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub srt: Option<PathBuf>,

    /// Total duration in seconds the cues must span
    #[arg(long, required_unless_present = "inspect")]
    pub duration: Option<f64>,

    /// Group narration into two-sentence blocks
    #[arg(long)]
    pub two_line: bool,

    /// Parse the --srt file strictly and list its cues instead of retiming
    #[arg(long, requires = "srt")]
    pub inspect: bool,

    /// Write the SRT here instead of stdout
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,
}
