//! Typed `-filter_complex` builder.
//!
//! Graphs are assembled from chains of filters connected through pads and are
//! only turned into ffmpeg's textual syntax by [`FilterGraph::render`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn as_str(self) -> &'static str {
        match self {
            StreamKind::Video => "v",
            StreamKind::Audio => "a",
        }
    }
}

/// A filter pad: either a stream of an input file or a named link label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pad {
    Stream { input: usize, kind: StreamKind },
    Label(String),
}

impl Pad {
    pub fn video(input: usize) -> Self {
        Pad::Stream {
            input,
            kind: StreamKind::Video,
        }
    }

    pub fn audio(input: usize) -> Self {
        Pad::Stream {
            input,
            kind: StreamKind::Audio,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Pad::Label(name.into())
    }

    /// Form used with `-map`.
    pub fn map_target(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pad::Stream { input, kind } => write!(f, "[{}:{}]", input, kind.as_str()),
            Pad::Label(name) => write!(f, "[{name}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterArg {
    Positional(String),
    Named(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: String,
    args: Vec<FilterArg>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.args.push(FilterArg::Positional(value.to_string()));
        self
    }

    /// Positional argument wrapped in single quotes. The value must already be escaped.
    pub fn quoted_arg(self, value: impl fmt::Display) -> Self {
        self.arg(format!("'{value}'"))
    }

    pub fn named(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.args.push(FilterArg::Named(key.into(), value.to_string()));
        self
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (idx, arg) in self.args.iter().enumerate() {
            f.write_str(if idx == 0 { "=" } else { ":" })?;
            match arg {
                FilterArg::Positional(value) => f.write_str(value)?,
                FilterArg::Named(key, value) => write!(f, "{key}={value}")?,
            }
        }
        Ok(())
    }
}

/// Linear run of filters between input and output pads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    inputs: Vec<Pad>,
    filters: Vec<Filter>,
    outputs: Vec<Pad>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, pad: Pad) -> Self {
        self.inputs.push(pad);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn output(mut self, pad: Pad) -> Self {
        self.outputs.push(pad);
        self
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            write!(f, "{pad}")?;
        }
        for (idx, filter) in self.filters.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for pad in &self.outputs {
            write!(f, "{pad}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chain: FilterChain) {
        self.chains.push(chain);
    }

    /// Textual form for `-filter_complex`.
    pub fn render(&self) -> String {
        self.chains
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}
