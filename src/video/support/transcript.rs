use serde::{Deserialize, Serialize};

use crate::video::error::PipelineError;

/// A single spoken word with its timing in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Length used for line-width budgeting.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// On-disk word list, as persisted next to each job.
#[derive(Debug, Serialize, Deserialize)]
pub struct WordList {
    pub words: Vec<Word>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Words { words: Vec<RawWord> },
    Whisper { segments: Vec<WhisperSegment> },
}

#[derive(Debug, Deserialize)]
struct RawWord {
    #[serde(default, alias = "word")]
    text: String,
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    words: Vec<RawWord>,
    // Fallback if words are missing (e.g. no alignment)
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
}

/// Parse either a `{"words": [...]}` list or WhisperX JSON output into raw words.
///
/// Words are returned as found; call [`sanitize_words`] before segmenting.
pub fn parse_transcript_json(json_str: &str) -> Result<Vec<Word>, PipelineError> {
    let file: TranscriptFile = serde_json::from_str(json_str)?;

    let raw = match file {
        TranscriptFile::Words { words } => words,
        TranscriptFile::Whisper { segments } => {
            let mut all_words = Vec::new();
            for segment in segments {
                if !segment.words.is_empty() {
                    all_words.extend(segment.words);
                } else if !segment.text.trim().is_empty() {
                    all_words.push(RawWord {
                        text: segment.text,
                        start: Some(segment.start),
                        end: Some(segment.end),
                    });
                }
            }
            all_words
        }
    };

    Ok(raw
        .into_iter()
        .map(|w| Word {
            text: w.text,
            start: finite_or_zero(w.start),
            end: finite_or_zero(w.end),
        })
        .collect())
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Trim text and drop noise: empty words, inverted spans, and zero-length words at t=0.
pub fn sanitize_words(words: &[Word]) -> Vec<Word> {
    words
        .iter()
        .map(|w| Word {
            text: w.text.trim().to_string(),
            start: if w.start.is_finite() { w.start } else { 0.0 },
            end: if w.end.is_finite() { w.end } else { 0.0 },
        })
        .filter(|w| !w.text.is_empty() && (w.end > w.start || (w.end == w.start && w.end > 0.0)))
        .collect()
}

pub fn words_to_json(words: &[Word]) -> Result<String, PipelineError> {
    let list = WordList {
        words: words.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&list)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_word_list() {
        let json = r#"{"words": [
            {"text": "the", "start": 0.0, "end": 0.2},
            {"text": "quick", "start": 0.22, "end": 0.5}
        ]}"#;
        let words = parse_transcript_json(json).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[1], Word::new("quick", 0.22, 0.5));
    }

    #[test]
    fn parses_whisperx_segments_with_fallback() {
        let json = r#"
        {
            "segments": [
                {
                    "start": 0.0, "end": 2.0, "text": "Hello world.",
                    "words": [
                        {"word": "Hello", "start": 0.0, "end": 0.5, "score": 0.9},
                        {"word": "world", "start": 0.6, "end": 1.0, "score": 0.8}
                    ]
                },
                {"start": 2.0, "end": 4.0, "text": " Unaligned phrase "}
            ]
        }
        "#;
        let words = parse_transcript_json(json).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].text, "Hello");
        assert_eq!(words[2].text, " Unaligned phrase ");
        assert_eq!(words[2].start, 2.0);
    }

    #[test]
    fn missing_timings_become_zero() {
        let json = r#"{"words": [{"word": "uh"}]}"#;
        let words = parse_transcript_json(json).unwrap();
        assert_eq!(words, vec![Word::new("uh", 0.0, 0.0)]);
    }

    #[test]
    fn sanitize_drops_noise_and_keeps_markers() {
        let words = vec![
            Word::new("  hi ", 0.0, 0.3),
            Word::new("", 0.3, 0.4),
            Word::new("ghost", 0.0, 0.0),
            Word::new("marker", 1.0, 1.0),
            Word::new("backwards", 2.0, 1.5),
            Word::new("nan", f64::NAN, 0.5),
        ];
        let clean = sanitize_words(&words);
        let texts: Vec<_> = clean.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "marker", "nan"]);
        assert_eq!(clean[2].start, 0.0);
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(matches!(
            parse_transcript_json(r#"{"foo": 1}"#),
            Err(PipelineError::Json(_))
        ));
    }

    #[test]
    fn words_serialize_back_to_word_list() {
        let json = words_to_json(&[Word::new("a", 0.0, 0.1)]).unwrap();
        let parsed = parse_transcript_json(&json).unwrap();
        assert_eq!(parsed, vec![Word::new("a", 0.0, 0.1)]);
    }
}
