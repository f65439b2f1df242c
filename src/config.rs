// src/config.rs
use std::time::Duration;

use crate::errors::{BotError, Result};

/// Configuration for the remote judge and the poll loop.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub api_base: String,
    pub auth_token: Option<String>,
    /// CPU time limit in seconds.
    pub cpu_time_limit: f64,
    /// Wall-clock limit in seconds.
    pub wall_time_limit: f64,
    /// Memory limit in KB.
    pub memory_limit: u64,
    pub poll_interval: Duration,
    pub poll_max_tries: u32,
    pub max_concurrent: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_base: "https://ce.judge0.com".to_string(),
            auth_token: None,
            cpu_time_limit: 5.0,
            wall_time_limit: 8.0,
            memory_limit: 256_000,
            poll_interval: Duration::from_millis(700),
            poll_max_tries: 60,
            max_concurrent: 4,
        }
    }
}

/// Configuration for the reply side.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Longest wrapped message that is still sent inline.
    pub inline_limit: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self { inline_limit: 1900 }
    }
}

/// Configuration for the chat platform REST API.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub api_base: String,
    pub application_id: String,
    pub bot_token: Option<String>,
    pub public_key: Option<String>,
}

/// High-level application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub judge: JudgeConfig,
    pub delivery: DeliveryConfig,
    pub platform: PlatformConfig,
    pub port: u16,
    pub dedup_window: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = JudgeConfig::default();

        let judge = JudgeConfig {
            api_base: get("JUDGE0_URL").unwrap_or(defaults.api_base),
            auth_token: get("JUDGE0_AUTH_TOKEN"),
            cpu_time_limit: parse_or(get("CPU_TIME_LIMIT"), "CPU_TIME_LIMIT", defaults.cpu_time_limit)?,
            wall_time_limit: parse_or(get("WALL_TIME_LIMIT"), "WALL_TIME_LIMIT", defaults.wall_time_limit)?,
            memory_limit: parse_or(get("MEMORY_LIMIT"), "MEMORY_LIMIT", defaults.memory_limit)?,
            poll_interval: Duration::from_millis(parse_or(get("POLL_INTERVAL_MS"), "POLL_INTERVAL_MS", 700u64)?),
            poll_max_tries: parse_or(get("POLL_MAX_TRIES"), "POLL_MAX_TRIES", defaults.poll_max_tries)?,
            max_concurrent: parse_or(
                get("MAX_CONCURRENT_SUBMISSIONS"),
                "MAX_CONCURRENT_SUBMISSIONS",
                defaults.max_concurrent,
            )?,
        };

        if judge.poll_max_tries == 0 || judge.max_concurrent == 0 {
            return Err(BotError::Config(
                "POLL_MAX_TRIES and MAX_CONCURRENT_SUBMISSIONS must be at least 1".to_string(),
            ));
        }

        let delivery = DeliveryConfig {
            inline_limit: parse_or(get("INLINE_LIMIT"), "INLINE_LIMIT", DeliveryConfig::default().inline_limit)?,
        };

        let application_id = get("DISCORD_APPLICATION_ID").ok_or_else(|| {
            BotError::Config("DISCORD_APPLICATION_ID must be set".to_string())
        })?;
        let platform = PlatformConfig {
            api_base: get("DISCORD_API_BASE").unwrap_or_else(|| "https://discord.com/api/v10".to_string()),
            application_id,
            bot_token: get("DISCORD_TOKEN"),
            public_key: get("DISCORD_PUBLIC_KEY"),
        };

        Ok(AppConfig {
            judge,
            delivery,
            platform,
            port: parse_or(get("PORT"), "PORT", 3000)?,
            dedup_window: Duration::from_secs(parse_or(get("DEDUP_WINDOW_SECS"), "DEDUP_WINDOW_SECS", 60)?),
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| BotError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}
