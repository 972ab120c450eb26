use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use duct::cmd;
use serde::{Deserialize, Serialize};

use crate::ui::prelude::Level;
use crate::video::error::PipelineError;
use crate::video::logging::log_event;
use crate::video::support::transcript::{Word, parse_transcript_json};
use crate::video::support::utils::compute_file_hash;

/// Speech-to-text collaborator: produces raw word timings for a video.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, video: &Path) -> Result<Vec<Word>, PipelineError>;
}

/// Reads a precomputed words JSON instead of running speech recognition.
#[derive(Debug, Clone)]
pub struct WordsFileTranscriber {
    path: PathBuf,
}

impl WordsFileTranscriber {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Transcriber for WordsFileTranscriber {
    async fn transcribe(&self, _video: &Path) -> Result<Vec<Word>, PipelineError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            PipelineError::Transcribe(format!("cannot read {}: {err}", self.path.display()))
        })?;
        parse_transcript_json(&contents)
            .map_err(|err| PipelineError::Transcribe(format!("{}: {err}", self.path.display())))
    }
}

/// Arguments passed to WhisperX.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperxOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub device: String,
    pub compute_type: String,
    pub vad_method: String,
    /// Python version uvx runs WhisperX with
    pub python: String,
}

impl Default for WhisperxOptions {
    fn default() -> Self {
        Self {
            model: None,
            language: None,
            device: "cpu".to_string(),
            compute_type: "int8".to_string(),
            vad_method: "silero".to_string(),
            python: "3.10".to_string(),
        }
    }
}

/// Runs WhisperX through `uvx`, caching results by video content hash.
#[derive(Debug, Clone)]
pub struct WhisperxTranscriber {
    options: WhisperxOptions,
    cache_dir: PathBuf,
}

impl WhisperxTranscriber {
    pub fn new(options: WhisperxOptions, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            options,
            cache_dir: cache_dir.into(),
        }
    }

    fn transcribe_blocking(&self, video: &Path) -> Result<String, PipelineError> {
        let video_hash = compute_file_hash(video).map_err(|err| {
            PipelineError::Transcribe(format!("cannot hash {}: {err}", video.display()))
        })?;
        let output_dir = self.cache_dir.join(&video_hash);
        let transcript_path = output_dir.join(format!("{video_hash}.json"));

        if transcript_path.is_file() {
            log_event(
                Level::Info,
                "caption.transcribe.cached",
                format!("Using cached transcript {}", transcript_path.display()),
            );
            return Ok(fs::read_to_string(&transcript_path)?);
        }

        fs::create_dir_all(&output_dir)?;

        // WhisperX names its output after the input file, so transcribe a hash-named copy
        let extension = video
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp4");
        let hashed_input = output_dir.join(format!("{video_hash}.{extension}"));
        fs::copy(video, &hashed_input)?;

        let run_result = self.run_whisperx(&hashed_input, &output_dir);

        if let Err(err) = fs::remove_file(&hashed_input) {
            log_event(
                Level::Warn,
                "caption.transcribe.cleanup_failed",
                format!("Failed to remove {}: {err}", hashed_input.display()),
            );
        }
        run_result?;

        fs::read_to_string(&transcript_path).map_err(|err| {
            PipelineError::Transcribe(format!(
                "WhisperX did not produce {}: {err}",
                transcript_path.display()
            ))
        })
    }

    fn run_whisperx(&self, input: &Path, output_dir: &Path) -> Result<(), PipelineError> {
        let args = self.whisperx_args(input, output_dir);
        cmd("uvx", &args)
            .stdout_to_stderr()
            .run()
            .map_err(|err| PipelineError::Transcribe(format!("WhisperX failed: {err}")))?;
        Ok(())
    }

    fn whisperx_args(&self, input: &Path, output_dir: &Path) -> Vec<String> {
        let options = &self.options;
        let mut args = vec![
            "--python".to_string(),
            options.python.clone(),
            "whisperx".to_string(),
            input.to_string_lossy().into_owned(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().into_owned(),
            "--vad_method".to_string(),
            options.vad_method.clone(),
            "--compute_type".to_string(),
            options.compute_type.clone(),
            "--device".to_string(),
            options.device.clone(),
        ];
        if let Some(model) = &options.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if let Some(language) = &options.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }
        args
    }
}

#[async_trait]
impl Transcriber for WhisperxTranscriber {
    async fn transcribe(&self, video: &Path) -> Result<Vec<Word>, PipelineError> {
        let this = self.clone();
        let video = video.to_path_buf();
        let json = tokio::task::spawn_blocking(move || this.transcribe_blocking(&video))
            .await
            .map_err(|err| {
                PipelineError::Transcribe(format!("transcription task failed: {err}"))
            })??;

        parse_transcript_json(&json).map_err(|err| PipelineError::Transcribe(err.to_string()))
    }
}
