//! Caption documents rendered from segmented lines.
//!
//! - ASS (Advanced SubStation Alpha) with per-word karaoke highlighting, burned
//!   into the video by ffmpeg
//! - a plain-text transcript written beside it

mod ass;
mod text;

pub use ass::{AssStyle, StyleOptions, SubtitleDocument};
pub use text::format_plain_text;
