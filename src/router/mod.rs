// src/router/mod.rs
//! Maps inbound commands and form submissions onto judge runs and replies.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::DeliveryConfig;
use crate::delivery::{
    deliver_text, Acknowledgement, Delivery, DeliveryTarget, FormField, InputForm, ReplyPayload, ReplyState,
};
use crate::errors::{BotError, Result};
use crate::judge::{language_id, supported_languages, CodeJudge};
use crate::models::ExecutionRequest;
use crate::moderation::{clear_recent, ChannelModerator};
use crate::report::format_report;

pub mod custom_id;
pub mod dedup;
pub mod sanitize;

pub use custom_id::CustomId;
pub use dedup::RecentEvents;
pub use sanitize::sanitize_code;

const COMMAND_ERROR: &str = "Command error.";
const DEDUP_CAPACITY: usize = 10_000;

/// A typed option value from a slash command.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Command {
        name: String,
        options: HashMap<String, OptionValue>,
    },
    FormSubmit {
        custom_id: String,
        fields: HashMap<String, String>,
    },
}

/// One inbound interaction, already decoded from the platform's wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub id: String,
    pub channel_id: Option<String>,
    pub kind: EventKind,
}

pub struct Router<J> {
    judge: J,
    delivery: DeliveryConfig,
    moderator: Option<Arc<dyn ChannelModerator>>,
    recent: Mutex<RecentEvents>,
}

impl<J: CodeJudge + 'static> Router<J> {
    pub fn new(judge: J, delivery: DeliveryConfig, dedup_window: Duration) -> Self {
        Self {
            judge,
            delivery,
            moderator: None,
            recent: Mutex::new(RecentEvents::new(dedup_window, DEDUP_CAPACITY)),
        }
    }

    pub fn with_moderator(mut self, moderator: Arc<dyn ChannelModerator>) -> Self {
        self.moderator = Some(moderator);
        self
    }

    /// Drops expired entries from the duplicate filter.
    pub fn evict_stale(&self) {
        if let Ok(mut recent) = self.recent.lock() {
            recent.evict(Instant::now());
        }
    }

    fn first_sighting(&self, id: &str) -> bool {
        match self.recent.lock() {
            Ok(mut recent) => recent.first_sighting(id, Instant::now()),
            Err(poisoned) => poisoned.into_inner().first_sighting(id, Instant::now()),
        }
    }

    /// Handles one event to completion. Never fails: expected errors become
    /// replies, an expired channel ends the flow quietly, and anything else
    /// is answered with a generic error.
    pub async fn dispatch(&self, event: InboundEvent, target: DeliveryTarget) {
        if !self.first_sighting(&event.id) {
            debug!("Ignoring duplicate interaction {}", event.id);
            return;
        }

        match self.handle(&event, &target).await {
            Ok(()) => {}
            Err(BotError::DeliveryExpired) => {
                debug!("Interaction {} expired before the reply was delivered", event.id);
            }
            Err(e) => {
                error!("Interaction {} failed: {}", event.id, e);
                let _ = target.finalize(error_payload()).await;
            }
        }
    }

    /// Runs `dispatch` on its own task. A panicking handler is logged and the
    /// user still gets the generic error reply, unless the handler had already
    /// answered.
    pub fn spawn(self: &Arc<Self>, event: InboundEvent, target: DeliveryTarget) -> JoinHandle<()> {
        let router = Arc::clone(self);
        let fallback = target.clone();
        let id = event.id.clone();
        let task = tokio::spawn(async move { router.dispatch(event, target).await });

        tokio::spawn(async move {
            if let Err(e) = task.await {
                error!("Handler for interaction {} crashed: {}", id, e);
                answer_crash(&fallback).await;
            }
        })
    }

    async fn handle(&self, event: &InboundEvent, target: &DeliveryTarget) -> Result<()> {
        match &event.kind {
            EventKind::Command { name, options } => match name.as_str() {
                "run" => self.run_command(options, target).await,
                "clear" => self.clear_command(event.channel_id.as_deref(), options, target).await,
                "help" => reply(target, help_text()).await,
                other => {
                    warn!("Unknown command: {}", other);
                    reply(target, "Unknown command.".to_string()).await
                }
            },
            EventKind::FormSubmit { custom_id, fields } => match custom_id.parse::<CustomId>() {
                Ok(CustomId::RunForm { language, private }) => {
                    let request = ExecutionRequest {
                        language,
                        source_code: fields.get("code").cloned().unwrap_or_default(),
                        stdin: fields.get("input").cloned(),
                    };
                    self.execute(request, private, target).await
                }
                Err(e) => {
                    warn!("Rejecting form {}: {}", custom_id, e);
                    reply(target, "Invalid action.".to_string()).await
                }
            },
        }
    }

    async fn run_command(&self, options: &HashMap<String, OptionValue>, target: &DeliveryTarget) -> Result<()> {
        let language = text_option(options, "lang").unwrap_or_default();
        let private = bool_option(options, "private").unwrap_or(false);
        let code = text_option(options, "code").filter(|c| !c.trim().is_empty());

        match code {
            Some(source_code) => {
                let request = ExecutionRequest {
                    language,
                    source_code,
                    stdin: text_option(options, "input"),
                };
                self.execute(request, private, target).await
            }
            None if language_id(&language).is_none() => {
                reply(target, BotError::UnsupportedLanguage(language).user_message()).await
            }
            None => delivered(target.show_form(&run_form(&language, private)).await),
        }
    }

    /// The core pipeline: acknowledge, sanitize, judge, decode, deliver.
    async fn execute(&self, request: ExecutionRequest, private: bool, target: &DeliveryTarget) -> Result<()> {
        let run_id = Uuid::new_v4();
        delivered(target.acknowledge(Acknowledgement::Deferred { ephemeral: private }).await)?;

        let code = sanitize_code(&request.source_code);
        info!(
            "[{}] Running {} program ({} chars)",
            run_id,
            request.language,
            code.chars().count()
        );

        match self.judge.submit(&request.language, &code, request.stdin.as_deref()).await {
            Ok(result) => {
                let report = format_report(&result);
                info!("[{}] {}", run_id, result.status.description);
                delivered(deliver_text(target, &report.text, &self.delivery).await)
            }
            Err(e) if e.is_expected() => {
                warn!("[{}] {}", run_id, e);
                delivered(target.finalize(ReplyPayload::text(e.user_message())).await)
            }
            Err(e) => Err(e),
        }
    }

    async fn clear_command(
        &self,
        channel_id: Option<&str>,
        options: &HashMap<String, OptionValue>,
        target: &DeliveryTarget,
    ) -> Result<()> {
        let (Some(moderator), Some(channel_id)) = (&self.moderator, channel_id) else {
            return reply(target, "Clearing messages is not available here.".to_string()).await;
        };
        let amount = match options.get("amount") {
            Some(OptionValue::Integer(n)) if (1..=100).contains(n) => *n as u8,
            _ => return reply(target, "Amount must be between 1 and 100.".to_string()).await,
        };

        delivered(target.acknowledge(Acknowledgement::Deferred { ephemeral: true }).await)?;
        let text = match clear_recent(moderator.as_ref(), channel_id, amount, chrono::Utc::now()).await {
            Ok(report) => report.summary(),
            Err(e) => {
                warn!("Clearing channel {} failed: {}", channel_id, e);
                format!("Could not clear messages: {}", e)
            }
        };
        delivered(target.finalize(ReplyPayload::text(text)).await)
    }
}

fn delivered(outcome: Delivery) -> Result<()> {
    match outcome {
        Delivery::Delivered => Ok(()),
        Delivery::Expired => Err(BotError::DeliveryExpired),
        Delivery::Failed => Err(BotError::DeliveryFailed),
    }
}

async fn answer_crash(target: &DeliveryTarget) {
    if target.state().await == ReplyState::Finalized {
        debug!("Crashed handler had already replied; no error reply sent");
        return;
    }
    let _ = target.finalize(error_payload()).await;
}

async fn reply(target: &DeliveryTarget, text: String) -> Result<()> {
    let payload = ReplyPayload { content: text, attachment: None, ephemeral: true };
    delivered(target.finalize(payload).await)
}

fn error_payload() -> ReplyPayload {
    ReplyPayload { content: COMMAND_ERROR.to_string(), attachment: None, ephemeral: true }
}

fn text_option(options: &HashMap<String, OptionValue>, name: &str) -> Option<String> {
    match options.get(name) {
        Some(OptionValue::Text(s)) => Some(s.clone()),
        _ => None,
    }
}

fn bool_option(options: &HashMap<String, OptionValue>, name: &str) -> Option<bool> {
    match options.get(name) {
        Some(OptionValue::Boolean(b)) => Some(*b),
        _ => None,
    }
}

fn run_form(language: &str, private: bool) -> InputForm {
    InputForm {
        custom_id: CustomId::RunForm { language: language.to_string(), private }.to_string(),
        title: format!("Run {}", language),
        fields: vec![
            FormField {
                id: "code".to_string(),
                label: "Code".to_string(),
                multiline: true,
                required: true,
                max_length: 4000,
            },
            FormField {
                id: "input".to_string(),
                label: "Input (stdin)".to_string(),
                multiline: true,
                required: false,
                max_length: 4000,
            },
        ],
    }
}

fn help_text() -> String {
    let languages: Vec<&str> = supported_languages().collect();
    [
        "**Commands**".to_string(),
        format!("• /run lang [code] [input] [private] - run a program ({})", languages.join(", ")),
        "  Leave `code` empty to paste it in a form.".to_string(),
        "• /clear amount - delete the last 1-100 messages of this channel".to_string(),
        "• /help - this message".to_string(),
    ]
    .join("\n")
}
