use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Scratch directory with its own config file, so tests never touch the user's config.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn run_subburn(&self, args: &[&str]) -> Result<CommandOutput> {
        let config = self.config_path();
        let output = Command::new(env!("CARGO_BIN_EXE_subburn"))
            .arg("--config")
            .arg(&config)
            .args(args)
            .current_dir(self.path())
            .output()?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

pub const SAMPLE_WORDS: &str = r#"{
    "words": [
        {"text": "the", "start": 0.0, "end": 0.2},
        {"text": "quick", "start": 0.22, "end": 0.5},
        {"text": "brown", "start": 1.3, "end": 1.6}
    ]
}"#;
