mod common;
mod ui;
mod video;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::ui::prelude::*;
use crate::video::config::SubburnConfig;
use crate::video::{CaptionCommands, handle_caption_command};

/// Burn word-synchronized captions into short videos
#[derive(Parser, Debug)]
#[command(name = "subburn", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CaptionCommands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, !cli.json);
    ui::set_debug_mode(cli.debug);

    if let Err(err) = run(cli).await {
        emit(Level::Error, "subburn.error", &format!("{err:#}"), None);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SubburnConfig::load_from_path(path)?,
        None => SubburnConfig::load()?,
    };
    emit(
        Level::Debug,
        "subburn.config",
        &format!("Loaded configuration: {config:?}"),
        None,
    );

    handle_caption_command(cli.command, &config, cli.debug).await
}
