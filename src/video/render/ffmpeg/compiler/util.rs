use std::path::Path;

pub fn format_time(value: f64) -> String {
    format!("{value:.3}")
}

/// Escape a filter option value for both levels that unescape it.
///
/// The filter's option parser treats `\`, `'` and `:` specially. The graph
/// parser around it also stops at `[`, `]`, `,` and `;`. The value is escaped
/// for the option parser first, then that result is escaped for the graph.
pub fn escape_filter_value(value: &str) -> String {
    let option_level = backslash_escape(value, &['\\', '\'', ':']);
    backslash_escape(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

/// Escape a file path for a filter option. Backslashes become forward slashes
/// so Windows paths survive.
pub fn escape_filter_path(path: &Path) -> String {
    escape_filter_value(&path.to_string_lossy().replace('\\', "/"))
}

fn backslash_escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
