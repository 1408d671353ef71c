//! Markdown repair for model output.
//!
//! Models regularly squash an entire markdown table - header, separator and
//! every body row - onto one physical line:
//!
//! ```text
//! | cmd | desc | |---|---| | ls | list | | cd | change dir |
//! ```
//!
//! [`repair_collapsed_tables`] detects that shape by the separator pattern
//! appearing mid-line and re-splits the cells into one table row per line.
//! Lines that do not match are returned unchanged, making the transform a
//! zero-risk no-op on well-formed input and idempotent on its own output.

use once_cell::sync::Lazy;
use regex::Regex;

/// A separator row (`|---|:--:|`) appearing somewhere inside the line.
static SEPARATOR_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\|\s*[-:]{2,}\s*[-:|\s]*\|").expect("Invalid separator pattern")
});

/// Re-split collapsed markdown tables, one table row per line.
///
/// Operates line by line; any line rewritten expands into several lines in
/// the output. Non-table text before the first and after the last pipe of a
/// matched span is preserved on its own lines.
pub fn repair_collapsed_tables(markdown: &str) -> String {
    markdown
        .split('\n')
        .map(|line| repair_line(line).unwrap_or_else(|| line.to_string()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrite one collapsed table line, or `None` to keep it as-is.
fn repair_line(line: &str) -> Option<String> {
    // Only lines carrying a separator pattern are candidates
    if !SEPARATOR_HINT.is_match(line) {
        return None;
    }

    // Pipe positions outside inline code spans
    let mut pipes: Vec<usize> = Vec::new();
    let mut in_code = false;
    for (pos, ch) in line.char_indices() {
        if ch == '`' {
            in_code = !in_code;
        }
        if ch == '|' && !in_code {
            pipes.push(pos);
        }
    }
    if pipes.len() < 3 {
        return None;
    }

    // Cell contents between consecutive pipes
    let cells: Vec<&str> = pipes
        .windows(2)
        .map(|pair| line[pair[0] + 1..pair[1]].trim())
        .collect();

    // A contiguous run of separator cells fixes the column count and marks
    // where the header row ends
    let mut sep_start: Option<usize> = None;
    let mut sep_len = 0;
    for (i, cell) in cells.iter().enumerate() {
        if !cell.is_empty() && cell.chars().all(|c| c == '-' || c == ':') {
            if sep_start.is_none() {
                sep_start = Some(i);
            }
            sep_len += 1;
        } else if sep_start.is_some() {
            break;
        }
    }
    let sep_start = sep_start?;
    if sep_start < 1 {
        return None;
    }

    // Rows were collapsed only if the cells divide evenly into more than
    // one chunk of `cols`
    let cols = sep_len;
    if cells.len() <= cols || cells.len() % cols != 0 {
        return None;
    }

    let rows: Vec<String> = cells
        .chunks(cols)
        .map(|row| format!("| {} |", row.join(" | ")))
        .collect();

    // Keep any non-table text around the matched span
    let prefix = line[..pipes[0]].trim();
    let suffix = line[pipes[pipes.len() - 1] + 1..].trim();

    let mut out = String::new();
    if !prefix.is_empty() {
        out.push_str(prefix);
        out.push('\n');
    }
    out.push_str(&rows.join("\n"));
    if !suffix.is_empty() {
        out.push('\n');
        out.push_str(suffix);
    }
    Some(out)
}
