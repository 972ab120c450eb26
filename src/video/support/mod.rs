pub mod ffmpeg;
pub mod transcript;
pub mod utils;
