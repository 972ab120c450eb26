pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fit;
pub mod highlight;
mod logging;
pub mod pipeline;
pub mod render;
pub mod segment;
pub mod subtitles;
pub mod support;

pub use cli::CaptionCommands;
pub use commands::handle_caption_command;
