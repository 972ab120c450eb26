use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::video::error::PipelineError;

/// Optional tool overrides from the config file. Unset tools are looked up on `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffprobe: Option<String>,
}

/// Resolved locations of the external media tools, shared read-only by every job.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolLocator {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolLocator {
    pub fn resolve(paths: &ToolPaths) -> Result<Self, PipelineError> {
        Ok(Self {
            ffmpeg: resolve_tool("ffmpeg", paths.ffmpeg.as_deref())?,
            ffprobe: resolve_tool("ffprobe", paths.ffprobe.as_deref())?,
        })
    }
}

fn resolve_tool(name: &str, configured: Option<&str>) -> Result<PathBuf, PipelineError> {
    match configured.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => {
            let expanded = PathBuf::from(shellexpand::tilde(value).into_owned());
            if expanded.components().count() > 1 || expanded.is_absolute() {
                if expanded.is_file() {
                    Ok(expanded)
                } else {
                    Err(PipelineError::validation(format!(
                        "configured {name} at {} does not exist",
                        expanded.display()
                    )))
                }
            } else {
                which::which(&expanded).map_err(|err| {
                    PipelineError::validation(format!(
                        "configured {name} `{value}` not found: {err}"
                    ))
                })
            }
        }
        None => which::which(name).map_err(|err| {
            PipelineError::validation(format!("{name} not found on PATH: {err}"))
        }),
    }
}

/// Frame rate as an exact rational, e.g. `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Parse ffprobe's `r_frame_rate`. `0/0` and malformed values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let (num, den) = match value.trim().split_once('/') {
            Some((num, den)) => (num.trim().parse().ok()?, den.trim().parse().ok()?),
            None => (value.trim().parse().ok()?, 1),
        };
        (num > 0 && den > 0).then_some(Self { num, den })
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Width and height of the first video stream
    pub dimensions: Option<(u32, u32)>,
    pub duration: Option<f64>,
    pub frame_rate: FrameRate,
    pub has_audio: bool,
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl FfprobeProber {
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, PipelineError> {
        let mut command = Command::new(&self.program);
        command
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| {
                    PipelineError::probe(path, format!("timed out after {}s", limit.as_secs()))
                })?,
            None => command.output().await,
        }
        .map_err(|err| {
            PipelineError::probe(path, format!("failed to run {}: {err}", self.program.display()))
        })?;

        if !output.status.success() {
            return Err(PipelineError::probe(
                path,
                format!(
                    "exited with status {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout), path)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: Option<ProbeTags>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

impl ProbeStream {
    /// Display rotation in degrees. The display matrix wins over the legacy
    /// `rotate` tag.
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|tags| tags.rotate.as_deref())
                    .and_then(|value| value.trim().parse().ok())
            })
            .filter(|degrees: &f64| degrees.is_finite())
            .unwrap_or(0.0)
    }

    /// Size of the frame as players show it, after autorotation.
    fn display_dimensions(&self) -> Option<(u32, u32)> {
        let (width, height) = match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return None,
        };
        let quarter_turns = (self.rotation() / 90.0).round() as i64;
        if quarter_turns.rem_euclid(2) == 1 {
            Some((height, width))
        } else {
            Some((width, height))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

pub fn parse_probe_output(json: &str, path: &Path) -> Result<MediaInfo, PipelineError> {
    let parsed: ProbeOutput = serde_json::from_str(json)
        .map_err(|err| PipelineError::probe(path, format!("unreadable ffprobe output: {err}")))?;

    let video = parsed.streams.iter().find(|s| s.codec_type == "video");
    let has_audio = parsed.streams.iter().any(|s| s.codec_type == "audio");

    let dimensions = video.and_then(ProbeStream::display_dimensions);
    let frame_rate = video
        .and_then(|stream| stream.r_frame_rate.as_deref())
        .and_then(FrameRate::parse)
        .unwrap_or_default();

    let duration = parsed
        .format
        .as_ref()
        .and_then(|format| parse_seconds(format.duration.as_deref()))
        .or_else(|| video.and_then(|stream| parse_seconds(stream.duration.as_deref())));

    Ok(MediaInfo {
        dimensions,
        duration,
        frame_rate,
        has_audio,
    })
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}
