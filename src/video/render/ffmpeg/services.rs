use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::ui::prelude::{Level, OutputFormat, get_output_format};
use crate::video::error::PipelineError;
use crate::video::logging::{log_event, log_event_with_data};

#[async_trait]
pub trait FfmpegRunner: Send + Sync {
    async fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<(), PipelineError>;
}

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    pub total_duration: Option<f64>,
    pub verbose: bool,
}

impl FfmpegRunOptions {
    pub fn new(total_duration: Option<f64>, verbose: bool) -> Self {
        Self {
            total_duration,
            verbose,
        }
    }
}

/// Runs the resolved ffmpeg binary, killing it if the optional timeout expires.
#[derive(Debug, Clone)]
pub struct SystemFfmpegRunner {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl SystemFfmpegRunner {
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[derive(Debug, Default)]
struct StderrSummary {
    last_line: String,
    error_lines: Vec<String>,
}

impl StderrSummary {
    /// Most recent error line, or the last line ffmpeg printed.
    fn diagnostics(&self) -> &str {
        self.error_lines
            .last()
            .unwrap_or(&self.last_line)
            .trim()
    }
}

#[async_trait]
impl FfmpegRunner for SystemFfmpegRunner {
    async fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<(), PipelineError> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                PipelineError::Encode(format!(
                    "failed to spawn {}: {err}",
                    self.program.display()
                ))
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PipelineError::Encode("ffmpeg stderr was not captured".to_string()))?;

        let pb = options.total_duration.map(progress_bar);
        let mut summary = StderrSummary::default();

        let work = async {
            read_ffmpeg_stderr(stderr, options.verbose, pb.as_ref(), &mut summary).await?;
            child.wait().await.map_err(PipelineError::from)
        };

        let status = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| {
                PipelineError::Encode(format!(
                    "ffmpeg did not finish within {}s and was killed",
                    limit.as_secs()
                ))
            })??,
            None => work.await?,
        };

        if let Some(pb) = &pb {
            if status.success() {
                pb.finish_with_message("done");
            } else {
                pb.abandon_with_message("failed");
            }
        }

        if !status.success() {
            return Err(PipelineError::from_exit_code(
                status.code(),
                summary.diagnostics(),
            ));
        }

        Ok(())
    }
}

fn progress_bar(duration: f64) -> ProgressBar {
    let pb = ProgressBar::new((duration.max(0.0) * 1000.0) as u64);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("encoding".to_string());
    pb
}

async fn read_ffmpeg_stderr<R: AsyncRead + Unpin>(
    mut stderr: R,
    verbose: bool,
    pb: Option<&ProgressBar>,
    summary: &mut StderrSummary,
) -> Result<(), PipelineError> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }

        accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line = accumulated[..pos].to_string();
            accumulated.drain(..=pos);
            handle_stderr_line(line, verbose, pb, summary);
        }
    }

    if !accumulated.trim().is_empty() {
        handle_stderr_line(accumulated, verbose, pb, summary);
    }

    Ok(())
}

fn handle_stderr_line(
    line: String,
    verbose: bool,
    pb: Option<&ProgressBar>,
    summary: &mut StderrSummary,
) {
    if line.is_empty() {
        return;
    }

    if verbose {
        match pb {
            Some(pb) => pb.println(&line),
            None => eprintln!("{line}"),
        }
    }

    if let Some(pb) = pb {
        if let Some(seconds) = progress_seconds(&line) {
            pb.set_position((seconds * 1000.0) as u64);
            if let Some(speed) = progress_speed(&line) {
                pb.set_message(speed);
            }
        }
    }

    if is_error_line(&line) {
        summary.error_lines.push(line.clone());
    }
    summary.last_line = line;
}

fn is_error_line(line: &str) -> bool {
    ["error", "Error", "ERROR", "No such"]
        .iter()
        .any(|marker| line.contains(marker))
}

/// Value of a `key=value` field in an ffmpeg status line, e.g. `speed= 2.01x`.
fn status_field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (_, rest) = line.split_once(&format!("{key}="))?;
    rest.split_whitespace().next()
}

/// Encoded position in seconds, from `time=HH:MM:SS.ms`.
fn progress_seconds(line: &str) -> Option<f64> {
    let mut parts = status_field(line, "time")?.splitn(3, ':');
    let mut total = 0.0;
    for scale in [3600.0, 60.0, 1.0] {
        let value: f64 = parts.next()?.parse().ok()?;
        total += value * scale;
    }
    Some(total)
}

fn progress_speed(line: &str) -> Option<String> {
    status_field(line, "speed")
        .filter(|speed| speed.ends_with('x'))
        .map(str::to_string)
}

/// Prints each command instead of running it.
#[derive(Debug, Clone)]
pub struct DryRunFfmpegRunner {
    program: PathBuf,
}

impl DryRunFfmpegRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn command_line(&self, args: &[String]) -> String {
        let program = self.program.to_string_lossy();
        let words = std::iter::once(program.as_ref()).chain(args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

#[async_trait]
impl FfmpegRunner for DryRunFfmpegRunner {
    async fn run(&self, args: &[String], _options: FfmpegRunOptions) -> Result<(), PipelineError> {
        let line = self.command_line(args);
        if matches!(get_output_format(), OutputFormat::Json) {
            log_event_with_data(
                Level::Info,
                "caption.ffmpeg.dry_run",
                line,
                json!({ "program": self.program, "args": args }),
            );
        } else {
            log_event(Level::Info, "caption.ffmpeg.dry_run", line);
        }
        Ok(())
    }
}
