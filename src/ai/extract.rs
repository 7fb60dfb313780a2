//! Code Block Extraction
//!
//! Pulls a single Java compilation unit out of a free-form model reply.
//!
//! Order of preference:
//! 1. A ```java fenced block
//! 2. Any other fenced block
//! 3. An unfenced reply that contains a type declaration
//!
//! A reply that matches none of these yields an empty string. Callers treat
//! empty as a failed generation, never as a valid empty test.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static JAVA_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*java[ \t]*\r?\n(.*?)(?:```|\z)")
        .expect("JAVA_FENCE_RE regex should compile")
});

static ANY_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[^\n]*\n(.*?)```").expect("ANY_FENCE_RE regex should compile")
});

static TYPE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)\b(?:class|interface|enum|record)\s+[A-Za-z_$][A-Za-z0-9_$]*")
        .expect("TYPE_DECL_RE regex should compile")
});

/// Extract the first identifiable code block from `raw`
pub fn extract_code_from_response(raw: &str) -> String {
    let raw = raw.trim_start_matches('\u{feff}');

    if let Some(code) = JAVA_FENCE_RE
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|code| !code.is_empty())
    {
        return code.to_string();
    }

    if let Some(code) = ANY_FENCE_RE
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|code| declares_type(code))
    {
        debug!("Extracted code from untagged fence");
        return code.to_string();
    }

    let trimmed = raw.trim();
    if !trimmed.contains("```") && declares_type(trimmed) {
        debug!("Extracted unfenced code");
        return trimmed.to_string();
    }

    String::new()
}

/// Whether `code` declares at least one Java type
pub fn declares_type(code: &str) -> bool {
    TYPE_DECL_RE.is_match(code)
}
