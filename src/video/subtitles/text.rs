//! Plain-text caption export: one `[MM:SS] words` line per caption line.

use std::fmt::Write;

use crate::video::segment::CaptionLine;

pub const NO_SUBTITLES_PLACEHOLDER: &str = "# No subtitles available";

pub fn format_plain_text(lines: &[CaptionLine]) -> String {
    let mut output = String::new();

    for line in lines.iter().filter(|line| !line.words.is_empty()) {
        let _ = writeln!(output, "[{}] {}", format_mmss(line.start), line.text());
    }

    if output.is_empty() {
        output.push_str(NO_SUBTITLES_PLACEHOLDER);
        output.push('\n');
    }

    output
}

/// Whole minutes and seconds, truncated. Minutes keep counting past the hour.
fn format_mmss(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}
