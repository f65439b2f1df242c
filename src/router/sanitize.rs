// src/router/sanitize.rs

use std::sync::LazyLock;

use regex::Regex;

use crate::judge::language_id;

/// A message opening with a fence, with an optional language tag on the
/// opening line. The closing fence may be missing.
static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:(?P<tag>[\w+#.-]*)[ \t]*\r?\n)?(?P<body>.*?)\s*(?:```\s*)?$").unwrap()
});

/// A language tag written on the same line as the code: ```java int x;```
static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)^([\w+#.-]+)[ \t]+(.*)$").unwrap());

/// Invisible formatting characters chat clients like to insert.
const INVISIBLE: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'];

/// Cleans pasted source code before it is sent to the judge: strips
/// zero-width characters, turns non-breaking spaces into spaces, and unwraps
/// a surrounding fenced code block.
pub fn sanitize_code(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !INVISIBLE.contains(c))
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect();

    let Some(caps) = FENCED.captures(&cleaned) else {
        return cleaned.trim().to_string();
    };
    let body = &caps["body"];
    if caps.name("tag").is_some() {
        return body.to_string();
    }

    // Only a known language counts as a tag here; `int x;` must stay code.
    match INLINE_TAG.captures(body) {
        Some(inline) if language_id(&inline[1]).is_some() => inline[2].to_string(),
        _ => body.to_string(),
    }
}
