use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::paths;
use crate::video::fit::{DEFAULT_BOX_HEIGHT, DEFAULT_BOX_WIDTH};
use crate::video::highlight::TimingOptions;
use crate::video::pipeline::transcribe::WhisperxOptions;
use crate::video::render::ffmpeg::compiler::{
    DEFAULT_CROSSFADE_SEC, DEFAULT_MUSIC_GAIN, EncodeProfile,
};
use crate::video::segment::SegmentOptions;
use crate::video::subtitles::StyleOptions;
use crate::video::support::ffmpeg::ToolPaths;

/// Bounding box for the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_BOX_WIDTH,
            max_height: DEFAULT_BOX_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// x264 constant rate factor (0-51)
    pub crf: u8,
    pub preset: String,
    /// Kill ffmpeg/ffprobe if a single invocation runs longer than this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        let profile = EncodeProfile::default();
        Self {
            crf: profile.crf,
            preset: profile.preset,
            timeout_secs: None,
        }
    }
}

impl EncodeOptions {
    pub fn profile(&self) -> EncodeProfile {
        EncodeProfile {
            preset: self.preset.clone(),
            crf: self.crf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionOptions {
    /// Requested intro/outro crossfade length in seconds
    pub crossfade_sec: f64,
}

impl Default for TransitionOptions {
    fn default() -> Self {
        Self {
            crossfade_sec: DEFAULT_CROSSFADE_SEC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicOptions {
    /// Background music gain (0.0-1.0)
    pub volume: f64,
}

impl Default for MusicOptions {
    fn default() -> Self {
        Self {
            volume: DEFAULT_MUSIC_GAIN,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubburnConfig {
    pub segment: SegmentOptions,
    pub timing: TimingOptions,
    pub style: StyleOptions,
    pub fit: FitOptions,
    pub encode: EncodeOptions,
    pub transition: TransitionOptions,
    pub music: MusicOptions,
    pub tools: ToolPaths,
    pub transcriber: WhisperxOptions,
}

impl SubburnConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_path(default_config_path()?)
    }

    /// Read the config, writing the defaults first if the file does not exist yet.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, toml).with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    /// Replace out-of-range numbers with their defaults.
    pub fn sanitized(mut self) -> Self {
        let segment = SegmentOptions::default();
        if !positive(self.segment.gap_threshold_sec) {
            self.segment.gap_threshold_sec = segment.gap_threshold_sec;
        }
        if !positive(self.segment.max_line_dur_sec) {
            self.segment.max_line_dur_sec = segment.max_line_dur_sec;
        }
        if self.segment.max_chars == 0 {
            self.segment.max_chars = segment.max_chars;
        }

        let timing = TimingOptions::default();
        let fields = [
            (&mut self.timing.min_word_sec, timing.min_word_sec),
            (&mut self.timing.lead_sec, timing.lead_sec),
            (&mut self.timing.tail_sec, timing.tail_sec),
            (&mut self.timing.warmup_sec, timing.warmup_sec),
            (&mut self.timing.min_inter_gap_sec, timing.min_inter_gap_sec),
        ];
        for (value, default) in fields {
            if !value.is_finite() || *value < 0.0 {
                *value = default;
            }
        }

        let style = StyleOptions::default();
        if !positive(self.style.font_height_ratio) {
            self.style.font_height_ratio = style.font_height_ratio;
        }
        if !positive(self.style.font_width_ratio) {
            self.style.font_width_ratio = style.font_width_ratio;
        }
        if !self.style.margin_v_ratio.is_finite()
            || !(0.0..1.0).contains(&self.style.margin_v_ratio)
        {
            self.style.margin_v_ratio = style.margin_v_ratio;
        }

        if self.fit.max_width == 0 || self.fit.max_height == 0 {
            self.fit = FitOptions::default();
        }
        if self.encode.crf > 51 {
            self.encode.crf = EncodeProfile::default().crf;
        }
        if self.encode.preset.trim().is_empty() {
            self.encode.preset = EncodeProfile::default().preset;
        }
        if !self.transition.crossfade_sec.is_finite() {
            self.transition.crossfade_sec = DEFAULT_CROSSFADE_SEC;
        }
        if !self.music.volume.is_finite() || self.music.volume < 0.0 {
            self.music.volume = DEFAULT_MUSIC_GAIN;
        }

        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.encode
            .timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.fit.max_width, self.fit.max_height)
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(paths::subburn_config_dir()?.join("config.toml"))
}
