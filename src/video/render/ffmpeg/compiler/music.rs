use std::path::Path;

use super::super::graph::{Filter, FilterChain, FilterGraph, Pad};
use super::{FfmpegCompileOutput, push_args, push_faststart};

pub const DEFAULT_MUSIC_GAIN: f64 = 0.12;

/// Clamp a background music gain into `[0, 1]`; non-finite values fall back to the default.
pub fn clamp_music_gain(gain: f64) -> f64 {
    if gain.is_finite() {
        gain.clamp(0.0, 1.0)
    } else {
        DEFAULT_MUSIC_GAIN
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MusicRequest<'a> {
    pub main: &'a Path,
    pub music: &'a Path,
    pub output: &'a Path,
    pub gain: f64,
    pub main_duration: Option<f64>,
    /// Without main audio the music bed becomes the whole soundtrack
    pub main_has_audio: bool,
}

/// Loop `music` under the main clip's audio and stop with the main clip.
///
/// Video is stream-copied; only the audio is re-encoded. When the main clip
/// is silent the looped bed is mapped on its own and `-shortest` ends it with
/// the video.
pub fn compile_music_mix(request: &MusicRequest<'_>) -> FfmpegCompileOutput {
    let gain = clamp_music_gain(request.gain);
    let bed = FilterChain::new()
        .input(Pad::audio(0))
        .filter(Filter::new("volume").arg(format!("{gain:.3}")))
        .filter(mix_format());

    let mut graph = FilterGraph::new();
    if request.main_has_audio {
        graph.push(bed.output(Pad::label("bgm")));
        graph.push(
            FilterChain::new()
                .input(Pad::audio(1))
                .filter(mix_format())
                .output(Pad::label("main")),
        );
        graph.push(
            FilterChain::new()
                .input(Pad::label("main"))
                .input(Pad::label("bgm"))
                .filter(
                    Filter::new("amix")
                        .named("inputs", 2)
                        .named("duration", "shortest")
                        .named("dropout_transition", 0),
                )
                .output(Pad::label("mix")),
        );
    } else {
        graph.push(bed.output(Pad::label("mix")));
    }

    let mut args = Vec::new();
    push_args(&mut args, ["-y", "-hide_banner", "-stream_loop", "-1", "-i"]);
    args.push(request.music.to_string_lossy().into_owned());
    args.push("-i".to_string());
    args.push(request.main.to_string_lossy().into_owned());
    args.push("-filter_complex".to_string());
    args.push(graph.render());
    push_args(&mut args, ["-map", "1:v:0", "-map"]);
    args.push(Pad::label("mix").map_target());
    push_args(&mut args, ["-c:v", "copy", "-c:a", "aac"]);
    if !request.main_has_audio {
        args.push("-shortest".to_string());
    }
    push_faststart(&mut args);
    args.push(request.output.to_string_lossy().into_owned());

    FfmpegCompileOutput {
        args,
        duration: request.main_duration,
    }
}

fn mix_format() -> Filter {
    Filter::new("aformat")
        .named("sample_fmts", "fltp")
        .named("sample_rates", 48000)
        .named("channel_layouts", "stereo")
}
