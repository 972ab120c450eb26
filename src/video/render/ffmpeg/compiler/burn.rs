use std::path::Path;

use super::super::graph::{Filter, FilterChain, FilterGraph, Pad};
use super::util::{escape_filter_path, escape_filter_value};
use super::{EncodeProfile, FfmpegCompileOutput, push_args, push_faststart};
use crate::video::fit::FitBox;
use crate::video::subtitles::AssStyle;

/// Inputs for scaling a video into its fit box and burning captions into it.
#[derive(Debug, Clone, Copy)]
pub struct BurnRequest<'a> {
    pub input: &'a Path,
    pub subtitles: &'a Path,
    pub output: &'a Path,
    pub fit: &'a FitBox,
    pub style: &'a AssStyle,
    pub duration: Option<f64>,
}

pub fn compile_burn(request: &BurnRequest<'_>, profile: &EncodeProfile) -> FfmpegCompileOutput {
    let (width, height) = request.fit.output();

    // Expressions keep the scale within the box and even, even if the probe was off
    let scale = Filter::new("scale")
        .quoted_arg(format!("2*trunc(min(iw,{width})/2)"))
        .quoted_arg(format!("2*trunc(min(ih,{height})/2)"));
    let subtitles = Filter::new("subtitles")
        .arg(escape_filter_path(request.subtitles))
        .named("force_style", escape_filter_value(&request.style.force_style()));

    let mut graph = FilterGraph::new();
    graph.push(
        FilterChain::new()
            .input(Pad::video(0))
            .filter(scale)
            .filter(subtitles)
            .output(Pad::label("vout")),
    );

    let mut args = Vec::new();
    push_args(&mut args, ["-y", "-hide_banner", "-i"]);
    args.push(request.input.to_string_lossy().into_owned());
    args.push("-filter_complex".to_string());
    args.push(graph.render());
    args.push("-map".to_string());
    args.push(Pad::label("vout").map_target());
    push_args(&mut args, ["-map", "0:a?"]);
    profile.push_h264(&mut args);
    push_args(&mut args, ["-c:a", "copy"]);
    push_faststart(&mut args);
    args.push(request.output.to_string_lossy().into_owned());

    FfmpegCompileOutput {
        args,
        duration: request.duration,
    }
}
