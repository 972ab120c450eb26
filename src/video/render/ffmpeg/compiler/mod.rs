mod burn;
mod crossfade;
mod music;
mod util;


pub use self::burn::{BurnRequest, compile_burn};
pub use self::crossfade::{
    CrossfadeClip, CrossfadeRequest, CrossfadeTiming, DEFAULT_CROSSFADE_SEC, PrimaryClip,
    compile_crossfade,
};
pub use self::music::{DEFAULT_MUSIC_GAIN, MusicRequest, clamp_music_gain, compile_music_mix};

/// Arguments for one ffmpeg invocation plus the expected output length.
#[derive(Debug, Clone)]
pub struct FfmpegCompileOutput {
    pub args: Vec<String>,
    /// Known output duration in seconds, used for progress reporting
    pub duration: Option<f64>,
}

/// H.264 settings shared by every re-encoding step.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProfile {
    pub preset: String,
    pub crf: u8,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            preset: "veryfast".to_string(),
            crf: 23,
        }
    }
}

impl EncodeProfile {
    fn push_h264(&self, args: &mut Vec<String>) {
        push_args(
            args,
            [
                "-c:v",
                "libx264",
                "-preset",
                &self.preset,
                "-crf",
                &self.crf.to_string(),
            ],
        );
    }
}

fn push_args<'a>(args: &mut Vec<String>, values: impl IntoIterator<Item = &'a str>) {
    args.extend(values.into_iter().map(str::to_string));
}

fn push_faststart(args: &mut Vec<String>) {
    push_args(args, ["-movflags", "+faststart"]);
}
