use std::path::Path;

use super::super::graph::{Filter, FilterChain, FilterGraph, Pad};
use super::util::format_time;
use super::{EncodeProfile, FfmpegCompileOutput, push_args, push_faststart};
use crate::video::error::PipelineError;
use crate::video::support::ffmpeg::FrameRate;

pub const DEFAULT_CROSSFADE_SEC: f64 = 0.3;
const MIN_CROSSFADE_SEC: f64 = 0.1;
/// The transition never eats more than this share of the shorter clip
const MAX_CLIP_SHARE: f64 = 0.8;

/// Resolved transition length and start point on the leading clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadeTiming {
    pub duration: f64,
    pub offset: f64,
}

impl CrossfadeTiming {
    pub fn compute(requested: f64, leading: f64, trailing: f64) -> Result<Self, PipelineError> {
        if !leading.is_finite() || leading <= MIN_CROSSFADE_SEC {
            return Err(PipelineError::validation(format!(
                "leading clip is too short to crossfade ({leading:.3}s)"
            )));
        }

        let requested = if requested.is_finite() {
            requested.max(MIN_CROSSFADE_SEC)
        } else {
            DEFAULT_CROSSFADE_SEC
        };
        let shorter = leading.min(trailing);
        let duration = requested.min(MAX_CLIP_SHARE * shorter);

        if !duration.is_finite() || duration <= 0.0 {
            return Err(PipelineError::Format(format!(
                "crossfade duration resolved to {duration} (leading {leading:.3}s, trailing {trailing:.3}s)"
            )));
        }

        Ok(Self {
            duration,
            offset: (leading - duration).max(0.0),
        })
    }

    /// Length of the joined clip.
    pub fn joined_duration(&self, leading: f64, trailing: f64) -> f64 {
        (leading + trailing - self.duration).max(0.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CrossfadeClip<'a> {
    pub path: &'a Path,
    pub duration: f64,
    pub has_audio: bool,
}

/// Which clip defines the output frame; the other one is letterboxed into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryClip {
    Leading,
    Trailing,
}

#[derive(Debug, Clone, Copy)]
pub struct CrossfadeRequest<'a> {
    pub leading: CrossfadeClip<'a>,
    pub trailing: CrossfadeClip<'a>,
    pub primary: PrimaryClip,
    pub frame: (u32, u32),
    pub frame_rate: FrameRate,
    pub requested_duration: f64,
    pub output: &'a Path,
}

/// Join two clips with a video fade and an audio crossfade.
///
/// Both clips are brought to square pixels, the primary clip's frame rate and
/// yuv420p, since `xfade` refuses inputs that differ in any of them.
pub fn compile_crossfade(
    request: &CrossfadeRequest<'_>,
    profile: &EncodeProfile,
) -> Result<FfmpegCompileOutput, PipelineError> {
    let timing = CrossfadeTiming::compute(
        request.requested_duration,
        request.leading.duration,
        request.trailing.duration,
    )?;
    let duration = format_time(timing.duration);

    let clips = [
        (0, &request.leading, request.primary == PrimaryClip::Leading),
        (1, &request.trailing, request.primary == PrimaryClip::Trailing),
    ];

    let mut graph = FilterGraph::new();
    for (input, clip, is_primary) in clips {
        graph.push(normalize_video(input, is_primary, request));
        graph.push(normalize_audio(input, clip));
    }
    graph.push(
        FilterChain::new()
            .input(Pad::label("v0"))
            .input(Pad::label("v1"))
            .filter(
                Filter::new("xfade")
                    .named("transition", "fade")
                    .named("duration", &duration)
                    .named("offset", format_time(timing.offset)),
            )
            .output(Pad::label("vout")),
    );
    graph.push(
        FilterChain::new()
            .input(Pad::label("a0"))
            .input(Pad::label("a1"))
            .filter(Filter::new("acrossfade").named("d", &duration))
            .output(Pad::label("aout")),
    );

    let mut args = Vec::new();
    push_args(&mut args, ["-y", "-hide_banner", "-i"]);
    args.push(request.leading.path.to_string_lossy().into_owned());
    args.push("-i".to_string());
    args.push(request.trailing.path.to_string_lossy().into_owned());
    args.push("-filter_complex".to_string());
    args.push(graph.render());
    args.push("-map".to_string());
    args.push(Pad::label("vout").map_target());
    args.push("-map".to_string());
    args.push(Pad::label("aout").map_target());
    profile.push_h264(&mut args);
    push_args(&mut args, ["-pix_fmt", "yuv420p", "-c:a", "aac"]);
    push_faststart(&mut args);
    args.push(request.output.to_string_lossy().into_owned());

    Ok(FfmpegCompileOutput {
        args,
        duration: Some(timing.joined_duration(request.leading.duration, request.trailing.duration)),
    })
}

fn normalize_video(input: usize, is_primary: bool, request: &CrossfadeRequest<'_>) -> FilterChain {
    let (width, height) = request.frame;
    let mut chain = FilterChain::new().input(Pad::video(input));

    if !is_primary {
        chain = chain
            .filter(
                Filter::new("scale")
                    .arg(width)
                    .arg(height)
                    .named("force_original_aspect_ratio", "decrease"),
            )
            .filter(
                Filter::new("pad")
                    .arg(width)
                    .arg(height)
                    .arg("(ow-iw)/2")
                    .arg("(oh-ih)/2"),
            );
    }

    chain
        .filter(Filter::new("setsar").arg(1))
        .filter(Filter::new("fps").arg(request.frame_rate))
        .filter(Filter::new("format").arg("yuv420p"))
        .output(Pad::label(format!("v{input}")))
}

/// Clips without an audio stream contribute silence of their own length.
fn normalize_audio(input: usize, clip: &CrossfadeClip<'_>) -> FilterChain {
    let chain = if clip.has_audio {
        FilterChain::new().input(Pad::audio(input))
    } else {
        FilterChain::new()
            .filter(
                Filter::new("anullsrc")
                    .named("r", 48000)
                    .named("cl", "stereo"),
            )
            .filter(Filter::new("atrim").named("duration", format_time(clip.duration)))
    };

    chain
        .filter(
            Filter::new("aformat")
                .named("sample_fmts", "fltp")
                .named("sample_rates", 48000)
                .named("channel_layouts", "stereo"),
        )
        .output(Pad::label(format!("a{input}")))
}
