//! JSON extraction from LLM responses
//!
//! Models often wrap the payload in prose or markdown fences. These helpers
//! find the first complete JSON object in the text.

use crate::error::{Error, Result};

/// Longest raw excerpt included in error messages
const RAW_EXCERPT: usize = 200;

/// Return the first balanced `{...}` object in `response`
///
/// Braces inside JSON strings are ignored, so a value like `"{note}"` does
/// not end the object early.
pub fn extract_json_object(response: &str) -> Result<&str> {
    let start = response.find('{').ok_or_else(|| {
        Error::Extraction(format!(
            "No JSON found in AI response | Raw: {}",
            truncate_raw(response)
        ))
    })?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in response[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&response[start..=start + i]);
                }
            }
            _ => {}
        }
    }

    Err(Error::Extraction(format!(
        "Unterminated JSON object in AI response | Raw: {}",
        truncate_raw(response)
    )))
}

/// Shorten raw model output for logs and error messages
pub fn truncate_raw(raw: &str) -> String {
    let raw = raw.trim();
    match raw.char_indices().nth(RAW_EXCERPT) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}
