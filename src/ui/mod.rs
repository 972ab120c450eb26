//! User-facing event output.
//!
//! Every message goes through [`emit`], which renders it either as a colored
//! line of text or as one JSON object per line. Errors, warnings and debug
//! chatter go to stderr so that exports printed on stdout stay clean.

use colored::*;
use lazy_static::lazy_static;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn name(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }

    fn paint(self, text: &str) -> ColoredString {
        match self {
            Level::Info => text.normal(),
            Level::Success => text.green().bold(),
            Level::Warn => text.yellow().bold(),
            Level::Error => text.red().bold(),
            Level::Debug => text.dimmed(),
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Level::Warn | Level::Error | Level::Debug)
    }
}

#[derive(Debug, Clone, Copy)]
struct OutputSettings {
    format: OutputFormat,
    color: bool,
    debug: bool,
}

impl OutputSettings {
    const fn initial() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
            debug: false,
        }
    }
}

lazy_static! {
    static ref SETTINGS: RwLock<OutputSettings> = RwLock::new(OutputSettings::initial());
}

fn settings() -> OutputSettings {
    match SETTINGS.read() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn update(apply: impl FnOnce(&mut OutputSettings)) {
    match SETTINGS.write() {
        Ok(mut guard) => apply(&mut guard),
        Err(poisoned) => apply(&mut poisoned.into_inner()),
    }
}

pub fn init(format: OutputFormat, color: bool) {
    update(|s| {
        s.format = format;
        s.color = color;
    });
}

pub fn set_debug_mode(enabled: bool) {
    update(|s| s.debug = enabled);
}

pub fn get_output_format() -> OutputFormat {
    settings().format
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    level: &'static str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

/// Remove terminal escape sequences such as `\x1b[1;32m`.
fn without_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
            continue;
        }
        out.push(ch);
    }
    out
}

fn format_line(
    settings: &OutputSettings,
    level: Level,
    code: &str,
    message: &str,
    data: Option<serde_json::Value>,
) -> String {
    match settings.format {
        OutputFormat::Text if settings.color => level.paint(message).to_string(),
        OutputFormat::Text => message.to_string(),
        OutputFormat::Json => {
            let message = without_escapes(message);
            let event = JsonEvent {
                level: level.name(),
                code,
                message: &message,
                data,
            };
            serde_json::to_string(&event).unwrap_or_else(|_| message.clone())
        }
    }
}

/// Print one event. Debug events are dropped unless debug mode is on.
pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    let settings = settings();
    if level == Level::Debug && !settings.debug {
        return;
    }

    let line = format_line(&settings, level, code, message, data);
    let _ = if level.to_stderr() {
        writeln!(io::stderr().lock(), "{line}")
    } else {
        writeln!(io::stdout().lock(), "{line}")
    };
}

pub mod prelude {
    pub use super::{Level, OutputFormat, emit, get_output_format};
}
