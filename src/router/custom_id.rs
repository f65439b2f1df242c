// src/router/custom_id.rs

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Platform limit on component and form ids.
pub const MAX_LEN: usize = 100;

/// Correlation id carried by a form so its submission can resume the flow
/// that opened it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomId {
    /// Paste-your-code form opened by `/run` without inline code.
    RunForm { language: String, private: bool },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseCustomIdError {
    #[error("custom id is longer than 100 characters")]
    TooLong,
    #[error("unknown custom id kind: {0}")]
    UnknownKind(String),
    #[error("malformed custom id: {0}")]
    Malformed(String),
}

impl fmt::Display for CustomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomId::RunForm { language, private } => {
                write!(f, "run|{}|{}", language, if *private { 1 } else { 0 })
            }
        }
    }
}

impl FromStr for CustomId {
    type Err = ParseCustomIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_LEN {
            return Err(ParseCustomIdError::TooLong);
        }
        let parts: Vec<&str> = s.split('|').collect();
        match parts.as_slice() {
            ["run", language, flag] if !language.is_empty() => {
                let private = match *flag {
                    "0" => false,
                    "1" => true,
                    _ => return Err(ParseCustomIdError::Malformed(s.to_string())),
                };
                Ok(CustomId::RunForm { language: language.to_string(), private })
            }
            ["run", ..] => Err(ParseCustomIdError::Malformed(s.to_string())),
            [kind, ..] => Err(ParseCustomIdError::UnknownKind(kind.to_string())),
            [] => Err(ParseCustomIdError::Malformed(s.to_string())),
        }
    }
}
