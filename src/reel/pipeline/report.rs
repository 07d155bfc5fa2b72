use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};

use crate::reel::concat::FinalVideo;
use crate::reel::support::timecode::format_srt_timestamp;
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

#[derive(Debug, Clone)]
pub(crate) struct ReportLine {
    pub(crate) level: Level,
    pub(crate) code: &'static str,
    pub(crate) message: String,
}

impl ReportLine {
    pub(crate) fn new(level: Level, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            message: message.into(),
        }
    }
}

pub(crate) fn emit_report(lines: &[ReportLine]) {
    for line in lines {
        emit(line.level, line.code, &line.message, None);
    }
}

fn summary_table(video: &FinalVideo) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Scene", "Start", "Duration", "Segment"]);

    let mut offset = 0.0;
    for segment in &video.segments {
        table.add_row(vec![
            Cell::new(segment.order + 1).set_alignment(CellAlignment::Right),
            Cell::new(&segment.group_id),
            Cell::new(format_srt_timestamp(offset)),
            Cell::new(format!("{:.2}s", segment.duration_seconds)).set_alignment(CellAlignment::Right),
            Cell::new(
                segment
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
        ]);
        offset += segment.duration_seconds;
    }
    table
}

/// Print the per-segment summary of a finished render.
pub(crate) fn emit_summary(video: &FinalVideo) {
    match get_output_format() {
        OutputFormat::Json => emit(
            Level::Info,
            "reel.render.summary",
            &format!("Rendered {} segments", video.segments.len()),
            serde_json::to_value(video).ok(),
        ),
        OutputFormat::Text => {
            println!("{}", summary_table(video));
            emit(
                Level::Success,
                "reel.render.summary",
                &format!(
                    "{} ({:.2}s, {} scenes)",
                    video.path.display(),
                    video.total_duration(),
                    video.segments.len()
                ),
                None,
            );
        }
    }
}
