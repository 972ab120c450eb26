use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde_json::json;

use crate::common::paths;
use crate::ui::prelude::Level;
use crate::video::cli::{AssArgs, CaptionCommands, ProcessArgs, TextArgs};
use crate::video::config::SubburnConfig;
use crate::video::fit::FitBox;
use crate::video::logging::{log_event, log_event_with_data};
use crate::video::pipeline::job::{JobId, JobPaths};
use crate::video::pipeline::transcribe::{Transcriber, WhisperxTranscriber, WordsFileTranscriber};
use crate::video::pipeline::{CaptionPipeline, JobRequest, PipelineSettings};
use crate::video::render::ffmpeg::services::{
    DryRunFfmpegRunner, FfmpegRunner, SystemFfmpegRunner,
};
use crate::video::segment::{CaptionLine, segment_words};
use crate::video::subtitles::{AssStyle, SubtitleDocument, format_plain_text};
use crate::video::support::ffmpeg::{FfprobeProber, ToolLocator};
use crate::video::support::transcript::{parse_transcript_json, sanitize_words};

pub async fn handle_caption_command(
    command: CaptionCommands,
    config: &SubburnConfig,
    debug: bool,
) -> Result<()> {
    match command {
        CaptionCommands::Process(args) => handle_process(args, config, debug).await,
        CaptionCommands::Text(args) => handle_text(args, config),
        CaptionCommands::Ass(args) => handle_ass(args, config),
    }
}

fn pipeline_settings(config: &SubburnConfig, verbose: bool) -> PipelineSettings {
    PipelineSettings {
        segment: config.segment,
        timing: config.timing,
        style: config.style.clone(),
        bounds: config.bounds(),
        encode: config.encode.profile(),
        crossfade_sec: config.transition.crossfade_sec,
        music_gain: config.music.volume,
        verbose,
    }
}

async fn handle_process(args: ProcessArgs, config: &SubburnConfig, debug: bool) -> Result<()> {
    let tools = ToolLocator::resolve(&config.tools).context("locating ffmpeg and ffprobe")?;
    log_event(
        Level::Debug,
        "caption.tools",
        format!(
            "Using ffmpeg {} and ffprobe {}",
            tools.ffmpeg.display(),
            tools.ffprobe.display()
        ),
    );

    let transcriber: Box<dyn Transcriber> = match &args.words {
        Some(words) => Box::new(WordsFileTranscriber::new(words)),
        None => Box::new(WhisperxTranscriber::new(
            config.transcriber.clone(),
            paths::subburn_cache_dir()?.join("transcripts"),
        )),
    };
    let prober = FfprobeProber::new(&tools.ffprobe, config.timeout());
    let runner: Box<dyn FfmpegRunner> = if args.dry_run {
        Box::new(DryRunFfmpegRunner::new(&tools.ffmpeg))
    } else {
        Box::new(SystemFfmpegRunner::new(&tools.ffmpeg, config.timeout()))
    };

    let out_dir = match args.out_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("reading current directory")?,
    };
    let work_dir = args.work_dir.unwrap_or_else(paths::default_work_dir);

    let job_id = JobId::generate();
    let job_paths = JobPaths::new(&work_dir, &out_dir, &job_id, Local::now());
    let request = JobRequest {
        video: args.video,
        intro: args.intro,
        outro: args.outro,
        music: args.music,
        crossfade_sec: args.crossfade,
        music_gain: args.music_volume,
    };

    let pipeline = CaptionPipeline::new(
        transcriber.as_ref(),
        &prober,
        runner.as_ref(),
        pipeline_settings(config, debug),
    );
    let report = pipeline.run(&job_id, &request, &job_paths).await?;

    let message = if args.dry_run {
        format!("Dry run finished; output would be {}", report.output.display())
    } else {
        format!("Captioned video written to {}", report.output.display())
    };
    log_event_with_data(
        Level::Success,
        "caption.process.done",
        message,
        json!({
            "job_id": report.job_id.as_str(),
            "output": report.output,
            "subtitles": report.subtitles,
            "transcript": report.transcript_text,
            "words": report.words,
            "lines": report.line_count,
            "word_count": report.word_count,
            "width": report.fit.output_w,
            "height": report.fit.output_h,
            "duration": report.duration,
            "steps": report.steps.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            "dry_run": args.dry_run,
        }),
    );

    Ok(())
}

fn load_caption_lines(words_path: &Path, config: &SubburnConfig) -> Result<Vec<CaptionLine>> {
    let contents = fs::read_to_string(words_path)
        .with_context(|| format!("reading words from {}", words_path.display()))?;
    let raw = parse_transcript_json(&contents)
        .with_context(|| format!("parsing words from {}", words_path.display()))?;
    let words = sanitize_words(&raw);
    if words.len() < raw.len() {
        log_event(
            Level::Debug,
            "caption.words.sanitized",
            format!("Dropped {} unusable words", raw.len() - words.len()),
        );
    }
    Ok(segment_words(&words, &config.segment))
}

fn handle_text(args: TextArgs, config: &SubburnConfig) -> Result<()> {
    let lines = load_caption_lines(&args.words, config)?;
    write_output(args.out_file, &format_plain_text(&lines))
}

fn handle_ass(args: AssArgs, config: &SubburnConfig) -> Result<()> {
    let lines = load_caption_lines(&args.words, config)?;
    let fit = FitBox::fit(args.width.zip(args.height), config.bounds());
    let style = AssStyle::for_frame(&config.style, &fit).context("building subtitle style")?;
    let document = SubtitleDocument::build(&lines, &config.timing, style, fit.output());
    write_output(args.out_file, &document.render())
}

fn write_output(out_file: Option<PathBuf>, contents: &str) -> Result<()> {
    match out_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {}", parent.display()))?;
            }
            fs::write(&path, contents)
                .with_context(|| format!("writing {}", path.display()))?;
            log_event(
                Level::Success,
                "caption.export.written",
                format!("Wrote {}", path.display()),
            );
        }
        None => print!("{contents}"),
    }
    Ok(())
}
