use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use rand::Rng;

use crate::video::error::PipelineError;

/// Opaque job identifier: `<unix millis>_<16 hex chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix: u64 = rand::thread_rng().r#gen();
        Self(format!("{millis}_{suffix:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every file a job reads or writes besides its inputs.
#[derive(Debug, Clone)]
pub struct JobPaths {
    pub job_dir: PathBuf,
    pub words: PathBuf,
    pub subtitles: PathBuf,
    pub transcript_text: PathBuf,
    pub burned: PathBuf,
    pub with_intro: PathBuf,
    pub with_outro: PathBuf,
    pub output: PathBuf,
}

impl JobPaths {
    /// Intermediates live in `<work_root>/<job id>/`; the final video is named
    /// after `started_at` in `out_dir`.
    pub fn new(
        work_root: &Path,
        out_dir: &Path,
        job_id: &JobId,
        started_at: DateTime<Local>,
    ) -> Self {
        let job_dir = work_root.join(job_id.as_str());
        Self {
            words: job_dir.join("words.json"),
            subtitles: job_dir.join("captions.ass"),
            transcript_text: job_dir.join("captions.txt"),
            burned: job_dir.join("burned.mp4"),
            with_intro: job_dir.join("with_intro.mp4"),
            with_outro: job_dir.join("with_outro.mp4"),
            output: out_dir.join(output_file_name(started_at)),
            job_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.job_dir)?;
        if let Some(parent) = self.output.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

pub fn output_file_name(started_at: DateTime<Local>) -> String {
    format!("{}.mp4", started_at.format("%Y-%m-%d_%H-%M-%S"))
}
