//! Centralized path management for subburn

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the subburn config directory
pub fn subburn_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("subburn");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the subburn cache directory (transcript cache lives here)
pub fn subburn_cache_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("~/.cache"))
        .join("subburn");

    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("creating cache directory at {}", cache_dir.display()))?;

    Ok(cache_dir)
}

/// Default scratch directory for per-job intermediate files
pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("subburn")
}
