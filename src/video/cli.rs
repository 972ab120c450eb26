use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum CaptionCommands {
    /// Burn word-highlighted captions into a video, with optional intro, outro and music
    Process(ProcessArgs),
    /// Export a words JSON file as a plain-text transcript
    Text(TextArgs),
    /// Render a words JSON file as an ASS karaoke subtitle document
    Ass(AssArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    /// Source video file
    #[arg(value_hint = ValueHint::FilePath)]
    pub video: PathBuf,

    /// Precomputed words JSON; skips WhisperX
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub words: Option<PathBuf>,

    /// Clip crossfaded in before the captioned video
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub intro: Option<PathBuf>,

    /// Clip crossfaded in after the captioned video
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub outro: Option<PathBuf>,

    /// Background music, looped under the video
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub music: Option<PathBuf>,

    /// Background music gain (0.0-1.0)
    #[arg(long)]
    pub music_volume: Option<f64>,

    /// Crossfade length in seconds for intro and outro
    #[arg(long)]
    pub crossfade: Option<f64>,

    /// Directory for the final video (defaults to the current directory)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,

    /// Directory for per-job intermediate files
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub work_dir: Option<PathBuf>,

    /// Print the ffmpeg commands instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TextArgs {
    /// Words JSON (`{"words": [...]}` or WhisperX output)
    #[arg(value_hint = ValueHint::FilePath)]
    pub words: PathBuf,

    /// Write to this file instead of stdout
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct AssArgs {
    /// Words JSON (`{"words": [...]}` or WhisperX output)
    #[arg(value_hint = ValueHint::FilePath)]
    pub words: PathBuf,

    /// Source video width used for sizing
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Source video height used for sizing
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Write to this file instead of stdout
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,
}
