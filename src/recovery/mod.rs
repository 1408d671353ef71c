//! Structured-output recovery: pull one well-formed JSON object out of a
//! free-form model reply.
//!
//! Generator agents are prompted to answer with a single JSON object, but
//! real replies wrap it in prose, fence it in markdown, or emit illegal
//! escape sequences (`\d`, `\(` ... common in regex- or path-heavy text).
//! Recovery runs an ordered list of strategies and returns the first
//! success; every strategy returns a result instead of panicking, so the
//! whole chain is a plain loop:
//!
//! 1. direct parse, when the trimmed reply starts with `{`
//! 2. a ```` ```json ```` fenced block
//! 3. balanced-brace scan from the first `{`, string- and escape-aware
//!
//! Each candidate substring gets a strict parse first, then a parse of the
//! escape-repaired text. "Nothing found" is an explicit `None` - a
//! recoverable condition, never a crash.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Matches a ```json fenced block and captures its body.
static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*\n(.*?)```").expect("Invalid fenced-json pattern"));

/// The ordered strategy list; evaluated until one succeeds.
const STRATEGIES: [fn(&str) -> Option<Value>; 3] = [parse_direct, parse_fenced, parse_balanced];

/// Extract a single JSON object from an arbitrary reply blob.
///
/// Returns the parsed value (re-serialize for normalized text), or `None`
/// when no strategy produced a valid object.
pub fn extract_structured_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    STRATEGIES.iter().find_map(|strategy| strategy(trimmed))
}

/// Strategy 1: the whole (trimmed) reply is the object.
fn parse_direct(text: &str) -> Option<Value> {
    if !text.starts_with('{') {
        return None;
    }
    parse_lenient(text)
}

/// Strategy 2: the object sits inside a ```json fence.
fn parse_fenced(text: &str) -> Option<Value> {
    let captures = FENCED_JSON.captures(text)?;
    parse_lenient(captures.get(1)?.as_str().trim())
}

/// Strategy 3: scan for balanced braces starting at the first `{`.
///
/// Braces inside string literals are ignored by tracking an in-string flag
/// and an escape flag (so `"{\"x\": \"}\"}"` nests correctly). Every time
/// depth returns to zero the candidate substring is tried; the scan
/// continues past failures because a reply may contain several
/// brace-balanced spans before the intended object.
fn parse_balanced(text: &str) -> Option<Value> {
    let start = text.find('{')?;

    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape = false;

    for (offset, ch) in text[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..start + offset + ch.len_utf8()];
                    if let Some(value) = parse_lenient(candidate) {
                        return Some(value);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Strict parse, then a parse of the escape-repaired candidate.
fn parse_lenient(candidate: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(candidate) {
        return Some(value);
    }
    serde_json::from_str(&repair_escapes(candidate)).ok()
}

/// Double every backslash that starts an illegal JSON escape.
///
/// Legal escape targets are `" \ / b f n r t u`; a backslash followed by
/// anything else becomes two backslashes, so the illegal escape turns into
/// a literal backslash plus the character. Legal pairs are consumed as a
/// unit, which makes the transform idempotent. A trailing lone backslash is
/// left untouched.
pub fn repair_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some(&next) if is_legal_escape(next) => {
                out.push('\\');
                out.push(next);
                chars.next();
            }
            Some(_) => {
                // Illegal escape: double the backslash, re-examine the
                // following character on the next iteration
                out.push_str("\\\\");
            }
            None => out.push('\\'),
        }
    }
    out
}

fn is_legal_escape(ch: char) -> bool {
    matches!(ch, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u')
}
