use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use tempfile::TempDir;

use super::job::{JobId, JobPaths};
use super::transcribe::Transcriber;
use super::{CaptionPipeline, JobRequest, PipelineSettings};
use crate::video::error::{JobStep, PipelineError};
use crate::video::render::ffmpeg::services::{FfmpegRunOptions, FfmpegRunner};
use crate::video::support::ffmpeg::{FrameRate, MediaInfo, Prober};
use crate::video::support::transcript::Word;

struct FakeTranscriber {
    words: Vec<Word>,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _video: &Path) -> Result<Vec<Word>, PipelineError> {
        Ok(self.words.clone())
    }
}

/// Media info keyed by file name.
struct FakeProber {
    infos: HashMap<String, MediaInfo>,
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, PipelineError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.infos
            .get(&name)
            .cloned()
            .ok_or_else(|| PipelineError::probe(path, "unknown file"))
    }
}

#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<Vec<String>>>,
    fail_on_call: Option<usize>,
}

impl RecordingRunner {
    fn failing_on(call: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on_call: Some(call),
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FfmpegRunner for RecordingRunner {
    async fn run(
        &self,
        args: &[String],
        _options: FfmpegRunOptions,
    ) -> Result<(), PipelineError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(args.to_vec());
        if self.fail_on_call == Some(calls.len()) {
            return Err(PipelineError::from_exit_code(Some(1), "Conversion failed!"));
        }
        Ok(())
    }
}

fn video_info(width: u32, height: u32, duration: f64) -> MediaInfo {
    MediaInfo {
        dimensions: Some((width, height)),
        duration: Some(duration),
        frame_rate: FrameRate::new(30000, 1001),
        has_audio: true,
    }
}

fn sample_words() -> Vec<Word> {
    vec![
        Word::new("the", 0.0, 0.2),
        Word::new("quick", 0.22, 0.5),
        Word::new("brown", 1.3, 1.6),
        Word::new("", 1.7, 1.8),
    ]
}

struct Fixture {
    dir: TempDir,
    paths: JobPaths,
    job_id: JobId,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let media = [
            "input.mp4",
            "silent.mp4",
            "intro.mp4",
            "outro.mp4",
            "bgm.mp3",
            "short.mp4",
        ];
        for name in media {
            fs::write(dir.path().join(name), b"media").unwrap();
        }
        let job_id = JobId::generate();
        let started = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let paths = JobPaths::new(
            &dir.path().join("work"),
            &dir.path().join("out"),
            &job_id,
            started,
        );
        Self { dir, paths, job_id }
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn prober(&self) -> FakeProber {
        let mut infos = HashMap::new();
        infos.insert("input.mp4".to_string(), video_info(3840, 2160, 10.0));
        infos.insert(
            "silent.mp4".to_string(),
            MediaInfo {
                has_audio: false,
                ..video_info(1920, 1080, 6.0)
            },
        );
        infos.insert("intro.mp4".to_string(), video_info(1280, 720, 3.0));
        infos.insert("outro.mp4".to_string(), video_info(1920, 1080, 2.0));
        infos.insert("short.mp4".to_string(), video_info(1920, 1080, 0.05));
        FakeProber { infos }
    }

    fn request(&self) -> JobRequest {
        JobRequest {
            video: self.file("input.mp4"),
            ..JobRequest::default()
        }
    }
}

fn build_pipeline<'a>(
    transcriber: &'a FakeTranscriber,
    prober: &'a FakeProber,
    runner: &'a RecordingRunner,
) -> CaptionPipeline<'a> {
    CaptionPipeline::new(transcriber, prober, runner, PipelineSettings::default())
}

fn filter_complex(args: &[String]) -> &str {
    let idx = args.iter().position(|a| a == "-filter_complex").unwrap();
    &args[idx + 1]
}

fn input_names(args: &[String]) -> Vec<String> {
    args.windows(2)
        .filter(|pair| pair[0] == "-i")
        .map(|pair| {
            Path::new(&pair[1])
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

#[tokio::test]
async fn burn_only_job_writes_documents_and_output() {
    let fixture = Fixture::new();
    let transcriber = FakeTranscriber {
        words: sample_words(),
    };
    let prober = fixture.prober();
    let runner = RecordingRunner::default();
    let pipeline = build_pipeline(&transcriber, &prober, &runner);

    let report = pipeline
        .run(&fixture.job_id, &fixture.request(), &fixture.paths)
        .await
        .unwrap();

    assert_eq!(
        report.steps,
        vec![
            JobStep::Uploaded,
            JobStep::Transcribed,
            JobStep::Segmented,
            JobStep::DocumentBuilt,
            JobStep::Burned,
            JobStep::Complete,
        ]
    );
    assert_eq!(report.word_count, 3);
    assert_eq!(report.line_count, 2);
    assert_eq!(report.fit.output(), (1920, 1080));
    assert_eq!(report.output, fixture.paths.output);
    assert!(report.output.ends_with("2024-05-01_12-30-00.mp4"));

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].last().unwrap(), &fixture.paths.output.to_string_lossy());
    assert!(filter_complex(&calls[0]).contains("min(iw,1920)"));

    let ass = fs::read_to_string(&fixture.paths.subtitles).unwrap();
    assert_eq!(ass.matches("Dialogue: ").count(), 2);
    assert!(ass.contains("PlayResX: 1920"));

    let text = fs::read_to_string(&fixture.paths.transcript_text).unwrap();
    assert_eq!(text, "[00:00] the quick\n[00:01] brown\n");

    let words = fs::read_to_string(&fixture.paths.words).unwrap();
    assert!(words.contains("\"quick\""));
}

#[tokio::test]
async fn optional_steps_chain_through_intermediates() {
    let fixture = Fixture::new();
    let transcriber = FakeTranscriber {
        words: sample_words(),
    };
    let prober = fixture.prober();
    let runner = RecordingRunner::default();
    let pipeline = build_pipeline(&transcriber, &prober, &runner);

    let request = JobRequest {
        intro: Some(fixture.file("intro.mp4")),
        outro: Some(fixture.file("outro.mp4")),
        music: Some(fixture.file("bgm.mp3")),
        music_gain: Some(5.0),
        ..fixture.request()
    };
    let report = pipeline
        .run(&fixture.job_id, &request, &fixture.paths)
        .await
        .unwrap();

    assert_eq!(
        &report.steps[4..],
        [
            JobStep::Burned,
            JobStep::IntroApplied,
            JobStep::OutroApplied,
            JobStep::MusicMixed,
            JobStep::Complete,
        ]
    );

    let calls = runner.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].last().unwrap(), &fixture.paths.burned.to_string_lossy());
    assert_eq!(input_names(&calls[1]), vec!["intro.mp4", "burned.mp4"]);
    assert!(
        filter_complex(&calls[1])
            .starts_with("[0:v]scale=1920:1080:force_original_aspect_ratio=decrease")
    );
    assert!(filter_complex(&calls[1]).contains("fps=30000/1001"));
    assert!(filter_complex(&calls[1]).contains("offset=2.700"));
    assert_eq!(input_names(&calls[2]), vec!["with_intro.mp4", "outro.mp4"]);
    // 10s main + 3s intro - 0.3s fade
    assert!(filter_complex(&calls[2]).contains("offset=12.400"));
    assert_eq!(input_names(&calls[3]), vec!["bgm.mp3", "with_outro.mp4"]);
    assert!(filter_complex(&calls[3]).starts_with("[0:a]volume=1.000,"));
    assert_eq!(calls[3].last().unwrap(), &fixture.paths.output.to_string_lossy());

    let duration = report.duration.unwrap();
    assert!((duration - 14.4).abs() < 1e-9);
}

#[tokio::test]
async fn music_alone_scores_a_silent_video() {
    let fixture = Fixture::new();
    let transcriber = FakeTranscriber {
        words: sample_words(),
    };
    let prober = fixture.prober();
    let runner = RecordingRunner::default();
    let pipeline = build_pipeline(&transcriber, &prober, &runner);

    let request = JobRequest {
        video: fixture.file("silent.mp4"),
        music: Some(fixture.file("bgm.mp3")),
        ..JobRequest::default()
    };
    let report = pipeline
        .run(&fixture.job_id, &request, &fixture.paths)
        .await
        .unwrap();
    assert_eq!(report.steps.last(), Some(&JobStep::Complete));

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(input_names(&calls[1]), vec!["bgm.mp3", "burned.mp4"]);
    let graph = filter_complex(&calls[1]);
    assert!(!graph.contains("[1:a]"), "{graph}");
    assert!(!graph.contains("amix"), "{graph}");
    assert!(graph.ends_with("[mix]"));
    assert!(calls[1].iter().any(|a| a == "-shortest"));
}

#[tokio::test]
async fn crossfaded_silent_video_still_mixes_music() {
    let fixture = Fixture::new();
    let transcriber = FakeTranscriber {
        words: sample_words(),
    };
    let prober = fixture.prober();
    let runner = RecordingRunner::default();
    let pipeline = build_pipeline(&transcriber, &prober, &runner);

    let request = JobRequest {
        video: fixture.file("silent.mp4"),
        outro: Some(fixture.file("outro.mp4")),
        music: Some(fixture.file("bgm.mp3")),
        ..JobRequest::default()
    };
    pipeline
        .run(&fixture.job_id, &request, &fixture.paths)
        .await
        .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 3);
    // the outro crossfade gives the main clip a soundtrack to mix under
    let outro = filter_complex(&calls[1]);
    assert!(outro.contains("anullsrc=r=48000:cl=stereo,atrim=duration=6.000"));
    assert!(filter_complex(&calls[2]).contains("[1:a]aformat="));
    assert!(filter_complex(&calls[2]).contains("amix=inputs=2"));
}

#[tokio::test]
async fn empty_transcript_fails_before_encoding() {
    let fixture = Fixture::new();
    let transcriber = FakeTranscriber {
        words: vec![Word::new("  ", 0.0, 1.0), Word::new("x", 0.0, 0.0)],
    };
    let prober = fixture.prober();
    let runner = RecordingRunner::default();
    let pipeline = build_pipeline(&transcriber, &prober, &runner);

    let failure = pipeline
        .run(&fixture.job_id, &fixture.request(), &fixture.paths)
        .await
        .unwrap_err();

    assert_eq!(failure.step, JobStep::Transcribed);
    assert!(matches!(failure.error, PipelineError::Validation(_)));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn missing_intro_is_rejected_up_front() {
    let fixture = Fixture::new();
    let transcriber = FakeTranscriber {
        words: sample_words(),
    };
    let prober = fixture.prober();
    let runner = RecordingRunner::default();
    let pipeline = build_pipeline(&transcriber, &prober, &runner);

    let request = JobRequest {
        intro: Some(fixture.file("missing.mp4")),
        ..fixture.request()
    };
    let failure = pipeline
        .run(&fixture.job_id, &request, &fixture.paths)
        .await
        .unwrap_err();

    assert_eq!(failure.step, JobStep::Uploaded);
    assert!(matches!(failure.error, PipelineError::Validation(_)));
    assert!(runner.calls().is_empty());
    assert!(!fixture.paths.subtitles.exists());
}

#[tokio::test]
async fn too_short_intro_stops_after_burn() {
    let fixture = Fixture::new();
    let transcriber = FakeTranscriber {
        words: sample_words(),
    };
    let prober = fixture.prober();
    let runner = RecordingRunner::default();
    let pipeline = build_pipeline(&transcriber, &prober, &runner);

    let request = JobRequest {
        intro: Some(fixture.file("short.mp4")),
        ..fixture.request()
    };
    let failure = pipeline
        .run(&fixture.job_id, &request, &fixture.paths)
        .await
        .unwrap_err();

    assert_eq!(failure.step, JobStep::IntroApplied);
    assert!(matches!(failure.error, PipelineError::Validation(_)));
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn encoder_failure_is_reported_with_its_step() {
    let fixture = Fixture::new();
    let transcriber = FakeTranscriber {
        words: sample_words(),
    };
    let prober = fixture.prober();
    let runner = RecordingRunner::failing_on(1);
    let pipeline = build_pipeline(&transcriber, &prober, &runner);

    let failure = pipeline
        .run(&fixture.job_id, &fixture.request(), &fixture.paths)
        .await
        .unwrap_err();

    assert_eq!(failure.step, JobStep::Burned);
    assert!(failure.to_string().contains("Conversion failed!"));
}

#[tokio::test]
async fn stale_outputs_are_removed_before_encoding() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.paths.output.parent().unwrap()).unwrap();
    fs::write(&fixture.paths.output, b"previous run").unwrap();

    let transcriber = FakeTranscriber {
        words: sample_words(),
    };
    let prober = fixture.prober();
    let runner = RecordingRunner::default();
    let pipeline = build_pipeline(&transcriber, &prober, &runner);

    pipeline
        .run(&fixture.job_id, &fixture.request(), &fixture.paths)
        .await
        .unwrap();

    // The recording runner writes nothing, so the old file must be gone
    assert!(!fixture.paths.output.exists());
}
