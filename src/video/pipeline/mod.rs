//! Caption job orchestration.
//!
//! A job walks `uploaded -> transcribed -> segmented -> document_built -> burned`,
//! then through the optional intro, outro and music steps to `complete`. The
//! first error stops the job and is reported together with the step that was
//! being attempted.

pub mod job;
pub mod transcribe;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::ui::prelude::Level;
use crate::video::error::{JobFailure, JobStep, PipelineError};
use crate::video::fit::{DEFAULT_BOX_HEIGHT, DEFAULT_BOX_WIDTH, FitBox};
use crate::video::highlight::TimingOptions;
use crate::video::logging::{log_event, log_event_with_data};
use crate::video::render::ffmpeg::compiler::{
    BurnRequest, CrossfadeClip, CrossfadeRequest, DEFAULT_CROSSFADE_SEC, DEFAULT_MUSIC_GAIN,
    EncodeProfile, FfmpegCompileOutput, MusicRequest, PrimaryClip, compile_burn,
    compile_crossfade, compile_music_mix,
};
use crate::video::render::ffmpeg::services::{FfmpegRunOptions, FfmpegRunner};
use crate::video::segment::{SegmentOptions, segment_words};
use crate::video::subtitles::{AssStyle, StyleOptions, SubtitleDocument, format_plain_text};
use crate::video::support::ffmpeg::{FrameRate, MediaInfo, Prober};
use crate::video::support::transcript::{sanitize_words, words_to_json};
use crate::video::support::utils::{canonicalize_existing, remove_stale_output};

use self::job::{JobId, JobPaths};
use self::transcribe::Transcriber;

/// Tunables shared by every job.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub segment: SegmentOptions,
    pub timing: TimingOptions,
    pub style: StyleOptions,
    pub bounds: (u32, u32),
    pub encode: EncodeProfile,
    pub crossfade_sec: f64,
    pub music_gain: f64,
    /// Echo encoder output
    pub verbose: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            segment: SegmentOptions::default(),
            timing: TimingOptions::default(),
            style: StyleOptions::default(),
            bounds: (DEFAULT_BOX_WIDTH, DEFAULT_BOX_HEIGHT),
            encode: EncodeProfile::default(),
            crossfade_sec: DEFAULT_CROSSFADE_SEC,
            music_gain: DEFAULT_MUSIC_GAIN,
            verbose: false,
        }
    }
}

/// Inputs of one job. Optional clips skip their step when absent.
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    pub video: PathBuf,
    pub intro: Option<PathBuf>,
    pub outro: Option<PathBuf>,
    pub music: Option<PathBuf>,
    /// Overrides the configured crossfade length
    pub crossfade_sec: Option<f64>,
    /// Overrides the configured music gain
    pub music_gain: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: JobId,
    pub output: PathBuf,
    pub subtitles: PathBuf,
    pub transcript_text: PathBuf,
    pub words: PathBuf,
    pub line_count: usize,
    pub word_count: usize,
    pub fit: FitBox,
    /// Expected length of the output, when known
    pub duration: Option<f64>,
    pub steps: Vec<JobStep>,
}

/// The clip produced by the latest encode step.
///
/// Tracked instead of probed so intermediates never need to exist before the
/// following step is compiled.
#[derive(Debug, Clone)]
struct CurrentClip {
    path: PathBuf,
    duration: Option<f64>,
    frame: (u32, u32),
    frame_rate: FrameRate,
    has_audio: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncodeStep {
    Burn,
    Intro,
    Outro,
    Music,
}

struct ValidatedInputs {
    video: PathBuf,
    intro: Option<PathBuf>,
    outro: Option<PathBuf>,
    music: Option<PathBuf>,
}

pub struct CaptionPipeline<'a> {
    transcriber: &'a dyn Transcriber,
    prober: &'a dyn Prober,
    runner: &'a dyn FfmpegRunner,
    settings: PipelineSettings,
}

impl<'a> CaptionPipeline<'a> {
    pub fn new(
        transcriber: &'a dyn Transcriber,
        prober: &'a dyn Prober,
        runner: &'a dyn FfmpegRunner,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            transcriber,
            prober,
            runner,
            settings,
        }
    }

    pub async fn run(
        &self,
        job_id: &JobId,
        request: &JobRequest,
        paths: &JobPaths,
    ) -> Result<JobReport, JobFailure> {
        let mut tracker = StepTracker::new(job_id);

        let inputs = validate_inputs(request).map_err(at(JobStep::Uploaded))?;
        paths.ensure_directories().map_err(at(JobStep::Uploaded))?;
        tracker.reached(JobStep::Uploaded, format!("Accepted {}", inputs.video.display()));

        let raw_words = self
            .transcriber
            .transcribe(&inputs.video)
            .await
            .map_err(at(JobStep::Transcribed))?;
        let words = sanitize_words(&raw_words);
        if words.is_empty() {
            return Err(at(JobStep::Transcribed)(PipelineError::validation(
                "transcript contains no usable words",
            )));
        }
        fs::write(&paths.words, words_to_json(&words).map_err(at(JobStep::Transcribed))?)
            .map_err(|err| at(JobStep::Transcribed)(err.into()))?;
        tracker.reached(
            JobStep::Transcribed,
            format!("{} words ({} dropped)", words.len(), raw_words.len() - words.len()),
        );

        let lines = segment_words(&words, &self.settings.segment);
        tracker.reached(JobStep::Segmented, format!("{} caption lines", lines.len()));

        let media = self
            .prober
            .probe(&inputs.video)
            .await
            .map_err(at(JobStep::DocumentBuilt))?;
        let fit = FitBox::fit(media.dimensions, self.settings.bounds);
        let style = AssStyle::for_frame(&self.settings.style, &fit)
            .map_err(at(JobStep::DocumentBuilt))?;
        let document = SubtitleDocument::build(&lines, &self.settings.timing, style, fit.output());
        write_file(&paths.subtitles, &document.render()).map_err(at(JobStep::DocumentBuilt))?;
        write_file(&paths.transcript_text, &format_plain_text(&lines))
            .map_err(at(JobStep::DocumentBuilt))?;
        tracker.reached(
            JobStep::DocumentBuilt,
            format!(
                "{} subtitle events at {}x{}",
                document.events.len(),
                fit.output_w,
                fit.output_h
            ),
        );

        let last_step = last_encode_step(&inputs);
        let target = |step: EncodeStep, intermediate: &Path| -> PathBuf {
            if step == last_step {
                paths.output.clone()
            } else {
                intermediate.to_path_buf()
            }
        };

        let burned_path = target(EncodeStep::Burn, &paths.burned);
        let burn = compile_burn(
            &BurnRequest {
                input: &inputs.video,
                subtitles: &paths.subtitles,
                output: &burned_path,
                fit: &fit,
                style: &document.style,
                duration: media.duration,
            },
            &self.settings.encode,
        );
        self.encode(&burned_path, &burn).await.map_err(at(JobStep::Burned))?;
        let mut current = CurrentClip {
            path: burned_path,
            duration: media.duration,
            frame: fit.output(),
            frame_rate: media.frame_rate,
            has_audio: media.has_audio,
        };
        tracker.reached(
            JobStep::Burned,
            format!("Burned captions into {}", current.path.display()),
        );

        let crossfade_sec = request.crossfade_sec.unwrap_or(self.settings.crossfade_sec);

        if let Some(intro) = &inputs.intro {
            let output = target(EncodeStep::Intro, &paths.with_intro);
            current = self
                .crossfade(intro, &current, PrimaryClip::Trailing, crossfade_sec, output)
                .await
                .map_err(at(JobStep::IntroApplied))?;
            tracker.reached(JobStep::IntroApplied, format!("Added intro {}", intro.display()));
        }

        if let Some(outro) = &inputs.outro {
            let output = target(EncodeStep::Outro, &paths.with_outro);
            current = self
                .crossfade(outro, &current, PrimaryClip::Leading, crossfade_sec, output)
                .await
                .map_err(at(JobStep::OutroApplied))?;
            tracker.reached(JobStep::OutroApplied, format!("Added outro {}", outro.display()));
        }

        if let Some(music) = &inputs.music {
            let output = target(EncodeStep::Music, &paths.output);
            let gain = request.music_gain.unwrap_or(self.settings.music_gain);
            let mix = compile_music_mix(&MusicRequest {
                main: &current.path,
                music,
                output: &output,
                gain,
                main_duration: current.duration,
                main_has_audio: current.has_audio,
            });
            self.encode(&output, &mix).await.map_err(at(JobStep::MusicMixed))?;
            current.path = output;
            current.has_audio = true;
            tracker.reached(JobStep::MusicMixed, format!("Mixed in {}", music.display()));
        }

        tracker.reached(JobStep::Complete, format!("Wrote {}", current.path.display()));

        Ok(JobReport {
            job_id: job_id.clone(),
            output: current.path,
            subtitles: paths.subtitles.clone(),
            transcript_text: paths.transcript_text.clone(),
            words: paths.words.clone(),
            line_count: lines.len(),
            word_count: words.len(),
            fit,
            duration: current.duration,
            steps: tracker.completed,
        })
    }

    /// Join `clip` to the current video. The current video stays the primary
    /// clip, so `primary` also says on which side of the transition it sits.
    async fn crossfade(
        &self,
        clip: &Path,
        current: &CurrentClip,
        primary: PrimaryClip,
        requested: f64,
        output: PathBuf,
    ) -> Result<CurrentClip, PipelineError> {
        let info = self.prober.probe(clip).await?;
        let clip_duration = require_duration(&info, clip)?;
        let current_duration = current
            .duration
            .ok_or_else(|| PipelineError::probe(&current.path, "video duration is unknown"))?;

        let side = CrossfadeClip {
            path: clip,
            duration: clip_duration,
            has_audio: info.has_audio,
        };
        let main = CrossfadeClip {
            path: &current.path,
            duration: current_duration,
            has_audio: current.has_audio,
        };
        let (leading, trailing) = match primary {
            PrimaryClip::Trailing => (side, main),
            PrimaryClip::Leading => (main, side),
        };

        let compiled = compile_crossfade(
            &CrossfadeRequest {
                leading,
                trailing,
                primary,
                frame: current.frame,
                frame_rate: current.frame_rate,
                requested_duration: requested,
                output: &output,
            },
            &self.settings.encode,
        )?;
        self.encode(&output, &compiled).await?;

        Ok(CurrentClip {
            path: output,
            duration: compiled.duration,
            frame: current.frame,
            frame_rate: current.frame_rate,
            has_audio: true,
        })
    }

    async fn encode(
        &self,
        target: &Path,
        compiled: &FfmpegCompileOutput,
    ) -> Result<(), PipelineError> {
        remove_stale_output(target)?;
        log_event(
            Level::Debug,
            "caption.ffmpeg.args",
            format!("ffmpeg {}", compiled.args.join(" ")),
        );
        self.runner
            .run(
                &compiled.args,
                FfmpegRunOptions::new(compiled.duration, self.settings.verbose),
            )
            .await
    }
}

fn at(step: JobStep) -> impl Fn(PipelineError) -> JobFailure {
    move |error| {
        log_event(
            Level::Error,
            "caption.job.failed",
            format!("Failed while reaching {step}: {error}"),
        );
        JobFailure { step, error }
    }
}

struct StepTracker<'a> {
    job_id: &'a JobId,
    completed: Vec<JobStep>,
}

impl<'a> StepTracker<'a> {
    fn new(job_id: &'a JobId) -> Self {
        Self {
            job_id,
            completed: Vec::new(),
        }
    }

    fn reached(&mut self, step: JobStep, detail: String) {
        let level = if step == JobStep::Complete {
            Level::Success
        } else {
            Level::Info
        };
        log_event_with_data(
            level,
            &format!("caption.job.{step}"),
            detail,
            json!({ "job_id": self.job_id.as_str(), "step": step.as_str() }),
        );
        self.completed.push(step);
    }
}

fn validate_inputs(request: &JobRequest) -> Result<ValidatedInputs, PipelineError> {
    let optional = |path: &Option<PathBuf>, role: &str| {
        path.as_deref()
            .map(|path| canonicalize_existing(path, role))
            .transpose()
    };

    Ok(ValidatedInputs {
        video: canonicalize_existing(&request.video, "video")?,
        intro: optional(&request.intro, "intro clip")?,
        outro: optional(&request.outro, "outro clip")?,
        music: optional(&request.music, "music track")?,
    })
}

fn last_encode_step(inputs: &ValidatedInputs) -> EncodeStep {
    if inputs.music.is_some() {
        EncodeStep::Music
    } else if inputs.outro.is_some() {
        EncodeStep::Outro
    } else if inputs.intro.is_some() {
        EncodeStep::Intro
    } else {
        EncodeStep::Burn
    }
}

fn require_duration(info: &MediaInfo, path: &Path) -> Result<f64, PipelineError> {
    info.duration
        .ok_or_else(|| PipelineError::probe(path, "no duration reported"))
}

fn write_file(path: &Path, contents: &str) -> Result<(), PipelineError> {
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests;
