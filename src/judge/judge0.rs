// src/judge/judge0.rs

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::config::JudgeConfig;
use crate::errors::{BotError, Result};
use crate::judge::{language_id, CodeJudge};
use crate::models::{JudgeResult, Submission};
use crate::report::encode;

/// Client for a Judge0-compatible execution service.
///
/// Each call owns its token for the whole poll session; the only state shared
/// between concurrent calls is the permit pool capping in-flight submissions.
#[derive(Clone)]
pub struct Judge0Client {
    client: Client,
    config: JudgeConfig,
    permits: Arc<Semaphore>,
}

#[derive(Serialize)]
struct CreateSubmission<'a> {
    language_id: u32,
    source_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<String>,
    cpu_time_limit: f64,
    wall_time_limit: f64,
    memory_limit: u64,
}

#[derive(Deserialize)]
struct CreatedSubmission {
    token: String,
}

impl Judge0Client {
    /// Creates a new `Judge0Client`.
    pub fn new(client: Client, config: JudgeConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self { client, config, permits }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    fn base(&self) -> &str {
        self.config.api_base.trim_end_matches('/')
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => builder.header("X-Auth-Token", token),
            None => builder,
        }
    }

    /// Posts the program and returns the token the judge issued for it.
    pub async fn create(&self, language_id: u32, code: &str, stdin: Option<&str>) -> Result<Submission> {
        let url = format!("{}/submissions?base64_encoded=true&wait=false", self.base());
        let source_code = encode(code);
        let body = CreateSubmission {
            language_id,
            source_code: &source_code,
            stdin: stdin.filter(|s| !s.trim().is_empty()).map(encode),
            cpu_time_limit: self.config.cpu_time_limit,
            wall_time_limit: self.config.wall_time_limit,
            memory_limit: self.config.memory_limit,
        };

        let resp = self.authorized(self.client.post(&url)).json(&body).send().await?;
        let created: CreatedSubmission = checked(resp).await?.json().await?;
        if created.token.is_empty() {
            return Err(BotError::UnexpectedResponse("judge returned an empty token".to_string()));
        }

        debug!("Judge accepted submission {}", created.token);
        Ok(Submission { token: created.token, created_at: chrono::Utc::now() })
    }

    /// Fetches the current state of a submission.
    pub async fn fetch(&self, token: &str) -> Result<JudgeResult> {
        let url = format!("{}/submissions/{}?base64_encoded=true", self.base(), token);
        let resp = self.authorized(self.client.get(&url)).send().await?;
        Ok(checked(resp).await?.json().await?)
    }

    /// Polls until the submission reaches a terminal status or the attempt
    /// budget runs out. Polls are strictly sequential, one interval apart.
    pub async fn await_result(&self, submission: &Submission) -> Result<JudgeResult> {
        let attempts = self.config.poll_max_tries;
        for attempt in 1..=attempts {
            tokio::time::sleep(self.config.poll_interval).await;
            let result = self.fetch(&submission.token).await?;
            if result.status.is_terminal() {
                debug!(
                    "Submission {} finished after {} polls: {}",
                    submission.token, attempt, result.status.description
                );
                return Ok(result);
            }
        }

        warn!(
            "Submission {} still running after {} polls (created {})",
            submission.token,
            attempts,
            submission.created_at.to_rfc3339()
        );
        Err(BotError::PollTimeout { attempts })
    }
}

impl CodeJudge for Judge0Client {
    async fn submit(&self, language: &str, code: &str, stdin: Option<&str>) -> Result<JudgeResult> {
        let language_id =
            language_id(language).ok_or_else(|| BotError::UnsupportedLanguage(language.to_string()))?;
        if code.trim().is_empty() {
            return Err(BotError::EmptyProgram);
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BotError::Config("judge permit pool closed".to_string()))?;

        let start = Instant::now();
        let submission = self.create(language_id, code, stdin).await?;
        let result = self.await_result(&submission).await?;

        info!(
            "Judge finished {} in {}ms: {}",
            submission.token,
            start.elapsed().as_millis(),
            result.status.description
        );
        Ok(result)
    }
}

async fn checked(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error body".to_string());
    Err(BotError::JudgeApi { status: status.as_u16(), body })
}
