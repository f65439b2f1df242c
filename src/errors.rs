// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Program is empty")]
    EmptyProgram,

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Judge request failed with status {status}: {body}")]
    JudgeApi { status: u16, body: String },

    #[error("Unexpected response structure: {0}")]
    UnexpectedResponse(String),

    #[error("Judge did not finish after {attempts} polls")]
    PollTimeout { attempts: u32 },

    #[error("Reply channel expired")]
    DeliveryExpired,

    #[error("Reply channel rejected the reply")]
    DeliveryFailed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl BotError {
    /// True for the errors a user can cause or the judge can produce;
    /// anything else is a bug and gets the generic "Command error." reply.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            BotError::UnsupportedLanguage(_)
                | BotError::EmptyProgram
                | BotError::Transport(_)
                | BotError::JudgeApi { .. }
                | BotError::PollTimeout { .. }
                | BotError::DeliveryExpired
        )
    }

    /// Short inline text shown to the user for an expected error.
    pub fn user_message(&self) -> String {
        match self {
            BotError::UnsupportedLanguage(lang) => {
                format!("Language `{}` is not supported.", lang)
            }
            BotError::EmptyProgram => "There is no code to run.".to_string(),
            BotError::Transport(e) => format!("Judge request failed: {}", e),
            BotError::JudgeApi { status, body } => {
                format!("Judge request failed ({}): {}", status, body)
            }
            BotError::PollTimeout { .. } => {
                "Execution timed out waiting for the judge.".to_string()
            }
            _ => "Command error.".to_string(),
        }
    }
}

/// Failures reported by a reply channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("interaction expired or unknown")]
    Expired,

    #[error("interaction already acknowledged")]
    AlreadyAcknowledged,

    #[error("platform rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("platform request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;
