use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Transcription failed: {0}")]
    Transcribe(String),

    #[error("ffprobe failed for {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    #[error("ffmpeg failed: {0}")]
    Encode(String),

    #[error("Invalid caption or timing data: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PipelineError::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn from_exit_code(code: Option<i32>, diagnostics: &str) -> Self {
        let diagnostics = diagnostics.trim();
        match code {
            Some(code) => PipelineError::Encode(format!("exit status {code}: {diagnostics}")),
            None => PipelineError::Encode(format!("terminated by signal: {diagnostics}")),
        }
    }
}

/// Steps of a caption job, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobStep {
    Uploaded,
    Transcribed,
    Segmented,
    DocumentBuilt,
    Burned,
    IntroApplied,
    OutroApplied,
    MusicMixed,
    Complete,
}

impl JobStep {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStep::Uploaded => "uploaded",
            JobStep::Transcribed => "transcribed",
            JobStep::Segmented => "segmented",
            JobStep::DocumentBuilt => "document_built",
            JobStep::Burned => "burned",
            JobStep::IntroApplied => "intro_applied",
            JobStep::OutroApplied => "outro_applied",
            JobStep::MusicMixed => "music_mixed",
            JobStep::Complete => "complete",
        }
    }
}

impl fmt::Display for JobStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a job: the first error and the step that was being attempted.
#[derive(Error, Debug)]
#[error("caption job failed while reaching `{step}`: {error}")]
pub struct JobFailure {
    pub step: JobStep,
    #[source]
    pub error: PipelineError,
}
