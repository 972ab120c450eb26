//! Per-word highlight windows for karaoke-style captions.

use serde::{Deserialize, Serialize};

use super::segment::CaptionLine;

/// Timing knobs for highlight windows, all in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingOptions {
    /// Shortest highlight a word should get
    pub min_word_sec: f64,
    /// Highlight this long before the word is spoken
    pub lead_sec: f64,
    /// Keep the highlight this long after the word ends
    pub tail_sec: f64,
    /// Delay before the first word of a line lights up
    pub warmup_sec: f64,
    /// Dark gap kept between two consecutive highlights
    pub min_inter_gap_sec: f64,
}

impl Default for TimingOptions {
    fn default() -> Self {
        Self {
            min_word_sec: 0.06,
            lead_sec: 0.0,
            tail_sec: 0.12,
            warmup_sec: 0.06,
            min_inter_gap_sec: 0.06,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightWindow {
    pub word_index: usize,
    pub active_start: f64,
    pub active_end: f64,
}

/// Compute one highlight window per word of `line`.
///
/// Windows never overlap, keep `min_inter_gap_sec` between each other and stay
/// inside `[line.start, line.end]`. When the next word (or the line end) leaves
/// no room, a window is shortened below `min_word_sec` instead of pushing into
/// its neighbour.
pub fn resolve_highlights(line: &CaptionLine, options: &TimingOptions) -> Vec<HighlightWindow> {
    let gap = options.min_inter_gap_sec.max(0.0);
    let mut windows: Vec<HighlightWindow> = Vec::with_capacity(line.words.len());

    for (idx, word) in line.words.iter().enumerate() {
        let mut start = word.start - options.lead_sec;
        if let Some(prev) = windows.last() {
            start = start.max(prev.active_end + gap);
        }
        if idx == 0 {
            start = start.max(line.start + options.warmup_sec);
        }

        let cap = match line.words.get(idx + 1) {
            Some(next) => (next.start - gap).min(line.end),
            None => line.end,
        };

        let mut end = (word.end + options.tail_sec).min(cap);
        if end - start < options.min_word_sec {
            end = (start + options.min_word_sec).min(cap);
        }

        let start = start.clamp(line.start, line.end);
        let end = end.clamp(start, line.end);

        windows.push(HighlightWindow {
            word_index: idx,
            active_start: start,
            active_end: end,
        });
    }

    windows
}
