//! ASS (Advanced SubStation Alpha) file format generation.
//!
//! Every caption line becomes one dialogue event. Words carry `\k` karaoke
//! markers so the renderer switches each word from the base color to the
//! highlight color when its highlight window opens.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::video::error::PipelineError;
use crate::video::fit::FitBox;
use crate::video::highlight::{HighlightWindow, TimingOptions, resolve_highlights};
use crate::video::segment::CaptionLine;

/// User-facing caption look, sized against the output frame at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOptions {
    pub font_name: String,
    /// Font used by the burn filter's forced style (must exist in minimal containers)
    pub fallback_font_name: String,
    /// Color of words not yet spoken (`&HAABBGGRR`, `&HBBGGRR` or `#RRGGBB`)
    pub base_color: String,
    /// Color of words once their highlight window opens
    pub highlight_color: String,
    pub outline_color: String,
    pub back_color: String,
    pub bold: bool,
    /// 1 = outline + shadow, 3 = opaque box
    pub border_style: u8,
    pub outline: u32,
    pub shadow: u32,
    pub min_font_size: u32,
    pub font_height_ratio: f64,
    pub font_width_ratio: f64,
    pub margin_v_ratio: f64,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            font_name: "Montserrat".to_string(),
            fallback_font_name: "DejaVu Sans".to_string(),
            base_color: "&H00FFFFFF".to_string(),
            highlight_color: "&H00FFCC66".to_string(),
            outline_color: "&H00000000".to_string(),
            back_color: "&H80000000".to_string(),
            bold: true,
            border_style: 3,
            outline: 2,
            shadow: 0,
            min_font_size: 30,
            font_height_ratio: 0.052,
            font_width_ratio: 0.070,
            margin_v_ratio: 0.22,
        }
    }
}

/// Style record written to the `[V4+ Styles]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct AssStyle {
    pub name: String,
    pub font_name: String,
    pub fallback_font_name: String,
    /// Font size in pixels
    pub font_size: u32,
    /// Sung color: the highlight (ABGR)
    pub primary_color: String,
    /// Unsung color: the base text color (ABGR)
    pub secondary_color: String,
    pub outline_color: String,
    pub back_color: String,
    pub bold: bool,
    pub border_style: u8,
    pub outline: u32,
    pub shadow: u32,
    /// Alignment (numpad layout: 1-3=bottom, 4-6=mid, 7-9=top)
    pub alignment: u8,
    pub margin_l: u32,
    pub margin_r: u32,
    /// Distance from the bottom edge in pixels
    pub margin_v: u32,
}

impl AssStyle {
    /// Size the style for the output frame of `fit`.
    pub fn for_frame(options: &StyleOptions, fit: &FitBox) -> Result<Self, PipelineError> {
        let width = f64::from(fit.output_w);
        let height = f64::from(fit.output_h);

        let by_height = height * options.font_height_ratio;
        let by_width = width * options.font_width_ratio;
        let font_size =
            (by_height.min(by_width).round().max(0.0) as u32).max(options.min_font_size);
        let margin_v = (height * options.margin_v_ratio).round().max(0.0) as u32;

        Ok(Self {
            name: "Default".to_string(),
            font_name: checked_font_name(&options.font_name)?,
            fallback_font_name: checked_font_name(&options.fallback_font_name)?,
            font_size,
            primary_color: parse_ass_color(&options.highlight_color)?,
            secondary_color: parse_ass_color(&options.base_color)?,
            outline_color: parse_ass_color(&options.outline_color)?,
            back_color: parse_ass_color(&options.back_color)?,
            bold: options.bold,
            border_style: options.border_style,
            outline: options.outline,
            shadow: options.shadow,
            alignment: 2,
            margin_l: 40,
            margin_r: 40,
            margin_v,
        })
    }

    fn to_style_line(&self) -> String {
        let bold_val = if self.bold { -1 } else { 0 };
        format!(
            "Style: {name},{font},{size},{primary},{secondary},{outline},{back},{bold},0,0,0,100,100,0,0,{border},{outline_w},{shadow},{align},{ml},{mr},{mv},1",
            name = self.name,
            font = self.font_name,
            size = self.font_size,
            primary = self.primary_color,
            secondary = self.secondary_color,
            outline = self.outline_color,
            back = self.back_color,
            bold = bold_val,
            border = self.border_style,
            outline_w = self.outline,
            shadow = self.shadow,
            align = self.alignment,
            ml = self.margin_l,
            mr = self.margin_r,
            mv = self.margin_v,
        )
    }

    /// `force_style` value for the burn filter, so minimal renderers still get
    /// a legible font, border and the caption colors.
    pub fn force_style(&self) -> String {
        format!(
            "FontName={font},FontSize={size},BorderStyle={border},Outline={outline},Shadow={shadow},PrimaryColour={primary},SecondaryColour={secondary},OutlineColour={outline_color},MarginV={mv}",
            font = self.fallback_font_name,
            size = self.font_size,
            border = self.border_style,
            outline = self.outline,
            shadow = self.shadow,
            primary = self.primary_color,
            secondary = self.secondary_color,
            outline_color = self.outline_color,
            mv = self.margin_v,
        )
    }
}

/// Style records and `force_style` are comma separated, so a font name must
/// not contain a comma or a line break.
fn checked_font_name(name: &str) -> Result<String, PipelineError> {
    let name = name.trim();
    if name.is_empty() || name.contains([',', '\n', '\r']) {
        return Err(PipelineError::Format(format!(
            "font name {name:?} cannot be used in a subtitle style"
        )));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueEvent {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    pub play_res: (u32, u32),
    pub style: AssStyle,
    pub events: Vec<DialogueEvent>,
}

impl SubtitleDocument {
    /// Build one karaoke dialogue event per caption line.
    pub fn build(
        lines: &[CaptionLine],
        timing: &TimingOptions,
        style: AssStyle,
        play_res: (u32, u32),
    ) -> Self {
        let events = lines
            .iter()
            .filter(|line| !line.words.is_empty())
            .map(|line| {
                let windows = resolve_highlights(line, timing);
                DialogueEvent {
                    start: line.start,
                    end: line.end,
                    text: format_karaoke_text(line, &windows),
                }
            })
            .collect();

        Self {
            play_res,
            style,
            events,
        }
    }

    /// Render the complete ASS file content.
    pub fn render(&self) -> String {
        let mut output = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(output, "[Script Info]");
        let _ = writeln!(output, "; Generated by subburn");
        let _ = writeln!(output, "ScriptType: v4.00+");
        let _ = writeln!(output, "PlayResX: {}", self.play_res.0);
        let _ = writeln!(output, "PlayResY: {}", self.play_res.1);
        let _ = writeln!(output, "WrapStyle: 0");
        let _ = writeln!(output, "ScaledBorderAndShadow: yes");
        let _ = writeln!(output);

        let _ = writeln!(output, "[V4+ Styles]");
        let _ = writeln!(
            output,
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
        );
        let _ = writeln!(output, "{}", self.style.to_style_line());
        let _ = writeln!(output);

        let _ = writeln!(output, "[Events]");
        let _ = writeln!(
            output,
            "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
        );
        for event in &self.events {
            let _ = writeln!(
                output,
                "Dialogue: 0,{start},{end},{style},,0,0,0,,{text}",
                start = format_ass_timestamp(event.start),
                end = format_ass_timestamp(event.end),
                style = self.style.name,
                text = event.text,
            );
        }

        output
    }
}

/// Karaoke text for one line.
///
/// For "hello there" this yields `{\k6}{\k38}hello {\k6}{\k50}there`: an empty
/// syllable covers the idle time before each highlight window, then the word's
/// own marker lasts exactly as long as its window. Centiseconds are taken from
/// offsets relative to the line start, so rounding never accumulates.
fn format_karaoke_text(line: &CaptionLine, windows: &[HighlightWindow]) -> String {
    let mut text = String::new();
    let mut cursor_cs = 0u64;

    for window in windows {
        let Some(word) = line.words.get(window.word_index) else {
            continue;
        };

        let start_cs = to_centis(window.active_start - line.start).max(cursor_cs);
        let end_cs = to_centis(window.active_end - line.start).max(start_cs);

        if window.word_index > 0 {
            text.push(' ');
        }
        if start_cs > cursor_cs {
            let _ = write!(text, "{{\\k{}}}", start_cs - cursor_cs);
        }
        let _ = write!(text, "{{\\k{}}}", end_cs - start_cs);
        text.push_str(&escape_ass_text(&word.text));

        cursor_cs = end_cs;
    }

    text
}

fn to_centis(seconds: f64) -> u64 {
    (seconds.max(0.0) * 100.0).round() as u64
}

/// Format seconds as an ASS timestamp (H:MM:SS.cc).
fn format_ass_timestamp(seconds: f64) -> String {
    let total_cs = to_centis(seconds);
    let hours = total_cs / 360_000;
    let minutes = (total_cs % 360_000) / 6_000;
    let secs = (total_cs % 6_000) / 100;
    let centis = total_cs % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis)
}

/// Escape special characters in ASS text.
pub fn escape_ass_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('\n', "\\N")
}

/// Normalize a color into the ASS `&HAABBGGRR` form.
///
/// Accepts `&HAABBGGRR&`, `&HBBGGRR` (opaque) and CSS-style `#RRGGBB`.
pub fn parse_ass_color(value: &str) -> Result<String, PipelineError> {
    let trimmed = value.trim();
    let invalid = || PipelineError::Format(format!("invalid ASS color `{value}`"));

    if let Some(hex) = trimmed.strip_prefix('#') {
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let (r, g, b) = (&hex[0..2], &hex[2..4], &hex[4..6]);
        return Ok(format!("&H00{b}{g}{r}").to_ascii_uppercase());
    }

    let body = trimmed
        .strip_prefix("&H")
        .or_else(|| trimmed.strip_prefix("&h"))
        .ok_or_else(invalid)?;
    let body = body.strip_suffix('&').unwrap_or(body);
    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    match body.len() {
        6 => Ok(format!("&H00{}", body.to_ascii_uppercase())),
        8 => Ok(format!("&H{}", body.to_ascii_uppercase())),
        _ => Err(invalid()),
    }
}
