//! package.json reading and in-place rewriting
//!
//! Handles:
//! - dependencies
//! - devDependencies
//! - optionalDependencies
//! - peerDependencies
//!
//! Rewrites only touch the specifier strings inside the top-level section
//! objects, so key order, indentation and unrelated content are preserved.

use crate::domain::{Declaration, Section};
use crate::error::ManifestError;
use regex::{Captures, Regex};
use serde_json::Value;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

/// Parse every declaration of the four dependency sections
pub fn parse_declarations(content: &str, path: &Path) -> Result<Vec<Declaration>, ManifestError> {
    let json: Value = serde_json::from_str(content)
        .map_err(|e| ManifestError::json_parse_error(path, e.to_string()))?;

    let mut declarations = Vec::new();
    for section in Section::ALL {
        let Some(entries) = json.get(section.manifest_key()).and_then(|v| v.as_object()) else {
            continue;
        };
        for (name, value) in entries {
            match value.as_str() {
                Some(specifier) => {
                    declarations.push(Declaration::new(name.clone(), specifier, section))
                }
                None => debug!("Skipping {} in {}: specifier is not a string", name, section),
            }
        }
    }
    Ok(declarations)
}

/// Replace the specifier of `name` in one section
///
/// Returns `None` when the section does not declare `name` with exactly `from`.
pub fn rewrite_specifier(
    content: &str,
    section: Section,
    name: &str,
    from: &str,
    to: &str,
) -> Option<String> {
    let span = section_span(content, section.manifest_key())?;
    let body = &content[span.clone()];

    let pattern = format!(
        r"({}\s*:\s*){}",
        regex::escape(&json_string(name)),
        regex::escape(&json_string(from))
    );
    let re = Regex::new(&pattern).ok()?;
    if !re.is_match(body) {
        return None;
    }

    let replacement = json_string(to);
    let body = re.replace(body, |caps: &Captures| format!("{}{}", &caps[1], replacement));

    let mut updated = String::with_capacity(content.len());
    updated.push_str(&content[..span.start]);
    updated.push_str(&body);
    updated.push_str(&content[span.end..]);
    Some(updated)
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

/// Byte range of the object value of a top-level key, braces included
fn section_span(content: &str, key: &str) -> Option<Range<usize>> {
    let bytes = content.as_bytes();
    let quoted = json_string(key);
    let mut depth = 0usize;
    let mut last_key: Option<Range<usize>> = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let end = skip_string(bytes, i);
                if depth == 1 {
                    last_key = Some(i..end + 1);
                }
                i = end;
            }
            b'{' => {
                if depth == 1 {
                    if let Some(key_range) = last_key.take() {
                        let is_key = content.get(key_range.clone()) == Some(quoted.as_str());
                        let separated = content
                            .get(key_range.end..i)
                            .is_some_and(|between| between.trim() == ":");
                        if is_key && separated {
                            let close = matching_close(bytes, i)?;
                            return Some(i..close + 1);
                        }
                    }
                }
                depth += 1;
            }
            b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the quote closing the string opened at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i,
            _ => i += 1,
        }
    }
    bytes.len().saturating_sub(1)
}

/// Index of the brace closing the object opened at `open`
fn matching_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => i = skip_string(bytes, i),
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
