//! Grouping of a flat word stream into caption lines.

use serde::{Deserialize, Serialize};

use super::support::transcript::Word;

/// Thresholds that decide when a caption line is closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Silence between two words that forces a new line (seconds)
    pub gap_threshold_sec: f64,
    /// Longest span a single line may cover (seconds)
    pub max_line_dur_sec: f64,
    /// Longest rendered line, separators included
    pub max_chars: usize,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            gap_threshold_sec: 0.5,
            max_line_dur_sec: 2.8,
            max_chars: 42,
        }
    }
}

/// A contiguous run of words shown together as one subtitle event.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    pub words: Vec<Word>,
    pub start: f64,
    pub end: f64,
    pub char_count: usize,
}

impl CaptionLine {
    fn seed(word: Word) -> Self {
        Self {
            start: word.start,
            end: word.end,
            char_count: word.char_len(),
            words: vec![word],
        }
    }

    fn push(&mut self, word: Word) {
        self.end = self.end.max(word.end);
        self.char_count += 1 + word.char_len();
        self.words.push(word);
    }

    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Split `words` into caption lines.
///
/// Thresholds only gate appending: a single word that is already too long or
/// too wide still gets a line of its own.
pub fn segment_words(words: &[Word], options: &SegmentOptions) -> Vec<CaptionLine> {
    let mut iter = words.iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut current = CaptionLine::seed(first.clone());
    let mut prev = first;

    for word in iter {
        let gap = word.start - prev.end;
        let next_duration = word.end.max(current.end) - current.start;
        let next_chars = current.char_count + 1 + word.char_len();

        let should_break = gap > options.gap_threshold_sec
            || next_duration > options.max_line_dur_sec
            || next_chars > options.max_chars;

        if should_break {
            let finished = std::mem::replace(&mut current, CaptionLine::seed(word.clone()));
            lines.push(finished);
        } else {
            current.push(word.clone());
        }
        prev = word;
    }
    lines.push(current);

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Word> {
        vec![
            Word::new("the", 0.0, 0.2),
            Word::new("quick", 0.22, 0.5),
            Word::new("brown", 1.3, 1.6),
        ]
    }

    fn texts(lines: &[CaptionLine]) -> Vec<Vec<&str>> {
        lines
            .iter()
            .map(|l| l.words.iter().map(|w| w.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn long_gap_starts_new_line() {
        let lines = segment_words(&sample(), &SegmentOptions::default());
        assert_eq!(texts(&lines), vec![vec!["the", "quick"], vec!["brown"]]);
        assert_eq!((lines[0].start, lines[0].end), (0.0, 0.5));
        assert_eq!((lines[1].start, lines[1].end), (1.3, 1.6));
        assert_eq!(lines[0].char_count, 9);
    }

    #[test]
    fn char_budget_forces_break() {
        let options = SegmentOptions {
            max_chars: 7,
            ..SegmentOptions::default()
        };
        let lines = segment_words(&sample(), &options);
        assert_eq!(
            texts(&lines),
            vec![vec!["the"], vec!["quick"], vec!["brown"]]
        );
    }

    #[test]
    fn duration_budget_forces_break() {
        let words = vec![
            Word::new("one", 0.0, 1.0),
            Word::new("two", 1.1, 2.0),
            Word::new("three", 2.1, 3.0),
        ];
        let lines = segment_words(&words, &SegmentOptions::default());
        assert_eq!(texts(&lines), vec![vec!["one", "two"], vec!["three"]]);
    }

    #[test]
    fn oversized_single_word_is_not_split() {
        let words = vec![
            Word::new("supercalifragilistic", 0.0, 4.0),
            Word::new("ok", 4.1, 4.3),
        ];
        let options = SegmentOptions {
            max_chars: 5,
            ..SegmentOptions::default()
        };
        let lines = segment_words(&words, &options);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].words.len(), 1);
        assert!(lines[0].end - lines[0].start > options.max_line_dur_sec);
    }

    #[test]
    fn line_end_tracks_the_latest_word_end() {
        let words = vec![Word::new("long", 0.0, 1.0), Word::new("short", 0.2, 0.4)];
        let lines = segment_words(&words, &SegmentOptions::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].end, 1.0);
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert!(segment_words(&[], &SegmentOptions::default()).is_empty());
    }

    fn synthetic_words(count: usize) -> Vec<Word> {
        // Deterministic spread of word widths, durations and pauses
        let mut words = Vec::with_capacity(count);
        let mut t = 0.0;
        for i in 0..count {
            let len = 1 + (i * 7) % 11;
            let dur = 0.05 + ((i * 13) % 9) as f64 * 0.07;
            let pause = ((i * 5) % 8) as f64 * 0.11;
            words.push(Word::new("x".repeat(len), t, t + dur));
            t += dur + pause;
        }
        words
    }

    #[test]
    fn lines_partition_the_input_and_respect_thresholds() {
        let words = synthetic_words(200);
        let options = SegmentOptions::default();
        let lines = segment_words(&words, &options);

        let rejoined: Vec<Word> = lines.iter().flat_map(|l| l.words.clone()).collect();
        assert_eq!(rejoined, words);

        for line in &lines {
            assert!(!line.words.is_empty());
            for pair in line.words.windows(2) {
                assert!(pair[1].start - pair[0].end <= options.gap_threshold_sec);
            }
            if line.words.len() > 1 {
                assert!(line.end - line.start <= options.max_line_dur_sec);
                assert!(line.char_count <= options.max_chars);
            }
            assert_eq!(line.char_count, line.text().chars().count());
        }
    }
}
