// src/report.rs

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::models::{FormattedReport, JudgeResult};

/// Base64-encodes text the way the judge expects it.
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decodes one stream field of a judge result. Absent fields decode to an
/// empty string. The judge wraps long base64 payloads across lines, so
/// whitespace is dropped before decoding; a field that is not valid base64
/// is passed through as-is.
pub fn decode(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Turns a judge result into exactly one prioritized section:
/// compile output, then stderr, then stdout, then "(no output)".
/// The chosen stream is copied verbatim, trailing whitespace included.
pub fn format_report(result: &JudgeResult) -> FormattedReport {
    let description = &result.status.description;
    let sections = [
        ("compile", decode(result.compile_output.as_deref())),
        ("stderr", decode(result.stderr.as_deref())),
        ("stdout", decode(result.stdout.as_deref())),
    ];

    let text = match sections.iter().find(|(_, body)| !body.is_empty()) {
        Some((label, body)) => format!("Status: {}\n\n[{}]\n{}", description, label, body),
        None => format!("Status: {}\n\n(no output)", description),
    };

    FormattedReport { text }
}
