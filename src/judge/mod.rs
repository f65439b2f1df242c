// src/judge/mod.rs

use crate::errors::Result;
use crate::models::JudgeResult;

pub mod judge0;

pub use judge0::Judge0Client;

/// Languages the bot accepts, mapped to the judge's environment ids.
const LANGUAGES: &[(&str, u32)] = &[("java", 62)];

/// Looks up the judge environment id for a language name (case-insensitive).
pub fn language_id(language: &str) -> Option<u32> {
    let wanted = language.trim();
    LANGUAGES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
        .map(|(_, id)| *id)
}

/// Names of all supported languages, for help text and option choices.
pub fn supported_languages() -> impl Iterator<Item = &'static str> {
    LANGUAGES.iter().map(|(name, _)| *name)
}

/// A remote service that compiles and runs code.
///
/// Implementations hide the queued backend behind one call that resolves
/// once the judge reports a terminal status.
pub trait CodeJudge: Send + Sync {
    /// Submits `code` with optional `stdin` and waits for the finished result.
    ///
    /// # Errors
    /// `UnsupportedLanguage` and `EmptyProgram` are returned before any network
    /// call. `PollTimeout` when the judge never finishes within the poll budget.
    fn submit(
        &self,
        language: &str,
        code: &str,
        stdin: Option<&str>,
    ) -> impl std::future::Future<Output = Result<JudgeResult>> + Send;
}
