// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user request to run code. Lives only for one request/response cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub language: String,
    pub source_code: String,
    pub stdin: Option<String>,
}

/// A submission accepted by the judge, identified by its token.
#[derive(Debug, Clone)]
pub struct Submission {
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeStatus {
    pub id: u32,
    pub description: String,
}

impl JudgeStatus {
    pub const IN_QUEUE: u32 = 1;
    pub const PROCESSING: u32 = 2;

    /// Anything but queued/processing ends the poll loop.
    pub fn is_terminal(&self) -> bool {
        self.id != Self::IN_QUEUE && self.id != Self::PROCESSING
    }
}

/// Result as reported by the judge; stream fields are still base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeResult {
    pub status: JudgeStatus,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedReport {
    pub text: String,
}
