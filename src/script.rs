//! Lenient extraction of structured data embedded in page scripts.
//!
//! Player pages often inline their configuration as a JavaScript object
//! literal rather than JSON. [`repair_js_literal`] rewrites the subset we
//! see in practice into JSON so `serde_json` can take over.
//!
//! Accepted grammar on top of plain JSON:
//! - bare identifier keys `[A-Za-z_$][A-Za-z0-9_$]*` followed by `:`
//!   (`{type:"hls"}` becomes `{"type":"hls"}`)
//! - single-quoted strings (`'a'` becomes `"a"`)
//! - trailing commas before `]` or `}`
//!
//! String contents are copied untouched, so values like `"file:..."` are
//! never mistaken for keys.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Text strictly between the first `start` and the first `end` after it.
pub fn find_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let len = text[from..].find(end)?;
    Some(&text[from..from + len])
}

/// Rewrite a JavaScript object/array literal into JSON.
pub fn repair_js_literal(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => i = copy_string(&chars, i, &mut out),
            ',' => {
                if !matches!(next_significant(&chars, i + 1), Some('}' | ']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_continue(chars[i]) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if next_significant(&chars, i) == Some(':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Repair and parse a JS array literal into raw JSON values.
pub fn parse_js_array(input: &str) -> serde_json::Result<Vec<Value>> {
    serde_json::from_str(&repair_js_literal(input))
}

/// Deserialize each element on its own, skipping the ones that don't fit `T`.
pub fn parse_lenient_list<T: DeserializeOwned>(values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!("Skipping malformed item: {e}");
                None
            }
        })
        .collect()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}

/// Copy a quoted string starting at `start` as a JSON string. Returns the
/// index just past the closing quote (or the end of input if unterminated).
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push('"');
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if i + 1 < chars.len() => {
                let escaped = chars[i + 1];
                if quote == '\'' && escaped == '\'' {
                    out.push('\'');
                } else {
                    out.push('\\');
                    out.push(escaped);
                }
                i += 2;
            }
            c if c == quote => {
                out.push('"');
                return i + 1;
            }
            '"' => {
                // only reachable inside single quotes
                out.push_str("\\\"");
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out.push('"');
    i
}
