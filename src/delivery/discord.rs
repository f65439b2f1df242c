// src/delivery/discord.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::PlatformConfig;
use crate::delivery::{Acknowledgement, InputForm, ReplyChannel, ReplyPayload};
use crate::errors::ChannelError;
use crate::moderation::{ChannelModerator, MessageRef};

const UNKNOWN_WEBHOOK: i64 = 10015;
const UNKNOWN_INTERACTION: i64 = 10062;
const ALREADY_ACKNOWLEDGED: i64 = 40060;
const EPHEMERAL_FLAG: u64 = 1 << 6;

const CALLBACK_MESSAGE: u8 = 4;
const CALLBACK_DEFERRED_MESSAGE: u8 = 5;
const CALLBACK_DEFERRED_UPDATE: u8 = 6;
const CALLBACK_MODAL: u8 = 9;

/// Thin client for the chat platform's REST API.
#[derive(Debug, Clone)]
pub struct DiscordRest {
    client: Client,
    config: PlatformConfig,
}

#[derive(Deserialize)]
struct PlatformErrorBody {
    code: Option<i64>,
}

#[derive(Deserialize)]
struct MessageSummary {
    id: String,
    timestamp: DateTime<Utc>,
}

impl DiscordRest {
    pub fn new(client: Client, config: PlatformConfig) -> Self {
        Self { client, config }
    }

    fn base(&self) -> &str {
        self.config.api_base.trim_end_matches('/')
    }

    /// Reply channel for one interaction.
    pub fn interaction(&self, interaction_id: &str, token: &str) -> InteractionReply {
        InteractionReply {
            rest: self.clone(),
            interaction_id: interaction_id.to_string(),
            token: token.to_string(),
        }
    }

    fn with_bot_token(&self, builder: RequestBuilder) -> Result<RequestBuilder, ChannelError> {
        let token = self.config.bot_token.as_ref().ok_or_else(|| ChannelError::Rejected {
            status: 401,
            body: "DISCORD_TOKEN is not configured".to_string(),
        })?;
        Ok(builder.header("Authorization", format!("Bot {}", token)))
    }
}

/// The REST-backed reply channel of one interaction.
#[derive(Debug, Clone)]
pub struct InteractionReply {
    rest: DiscordRest,
    interaction_id: String,
    token: String,
}

impl InteractionReply {
    fn callback_url(&self) -> String {
        format!("{}/interactions/{}/{}/callback", self.rest.base(), self.interaction_id, self.token)
    }

    fn webhook_url(&self) -> String {
        format!("{}/webhooks/{}/{}", self.rest.base(), self.rest.config.application_id, self.token)
    }

    async fn callback(&self, kind: u8, data: Option<Value>) -> Result<(), ChannelError> {
        let mut body = json!({ "type": kind });
        if let Some(data) = data {
            body["data"] = data;
        }
        let resp = self.rest.client.post(self.callback_url()).json(&body).send().await?;
        checked(resp).await
    }

    async fn send_message(&self, builder: RequestBuilder, message: Value, payload: &ReplyPayload) -> Result<(), ChannelError> {
        let builder = with_payload(builder, message, payload)?;
        let resp = builder.send().await?;
        checked(resp).await
    }
}

#[async_trait]
impl ReplyChannel for InteractionReply {
    async fn acknowledge(&self, ack: Acknowledgement) -> Result<(), ChannelError> {
        debug!("Acknowledging interaction {} ({:?})", self.interaction_id, ack);
        match ack {
            Acknowledgement::Deferred { ephemeral } => {
                let flags = if ephemeral { EPHEMERAL_FLAG } else { 0 };
                self.callback(CALLBACK_DEFERRED_MESSAGE, Some(json!({ "flags": flags }))).await
            }
            Acknowledgement::Update => self.callback(CALLBACK_DEFERRED_UPDATE, None).await,
        }
    }

    async fn respond(&self, payload: &ReplyPayload) -> Result<(), ChannelError> {
        let builder = self.rest.client.post(self.callback_url());
        let data = message_body(payload);
        let resp = with_payload(builder, json!({ "type": CALLBACK_MESSAGE, "data": data }), payload)?
            .send()
            .await?;
        checked(resp).await
    }

    async fn edit_original(&self, payload: &ReplyPayload) -> Result<(), ChannelError> {
        let url = format!("{}/messages/@original", self.webhook_url());
        let builder = self.rest.client.patch(url);
        self.send_message(builder, message_body(payload), payload).await
    }

    async fn follow_up(&self, payload: &ReplyPayload) -> Result<(), ChannelError> {
        let builder = self.rest.client.post(self.webhook_url());
        self.send_message(builder, message_body(payload), payload).await
    }

    async fn show_form(&self, form: &InputForm) -> Result<(), ChannelError> {
        let rows: Vec<Value> = form
            .fields
            .iter()
            .map(|field| {
                let style = if field.multiline { 2 } else { 1 };
                json!({
                    "type": 1,
                    "components": [{
                        "type": 4,
                        "custom_id": field.id,
                        "label": field.label,
                        "style": style,
                        "required": field.required,
                        "max_length": field.max_length,
                    }]
                })
            })
            .collect();

        let data = json!({
            "custom_id": form.custom_id,
            "title": form.title,
            "components": rows,
        });
        self.callback(CALLBACK_MODAL, Some(data)).await
    }
}

#[async_trait]
impl ChannelModerator for DiscordRest {
    async fn recent_messages(&self, channel_id: &str, limit: u8) -> Result<Vec<MessageRef>, ChannelError> {
        let url = format!("{}/channels/{}/messages?limit={}", self.base(), channel_id, limit);
        let resp = self.with_bot_token(self.client.get(url))?.send().await?;
        let resp = ok_response(resp).await?;
        let messages: Vec<MessageSummary> = resp.json().await?;
        Ok(messages
            .into_iter()
            .map(|m| MessageRef { id: m.id, created_at: m.timestamp })
            .collect())
    }

    async fn delete_messages(&self, channel_id: &str, ids: &[String]) -> Result<(), ChannelError> {
        let builder = match ids {
            [] => return Ok(()),
            [single] => self
                .client
                .delete(format!("{}/channels/{}/messages/{}", self.base(), channel_id, single)),
            many => self
                .client
                .post(format!("{}/channels/{}/messages/bulk-delete", self.base(), channel_id))
                .json(&json!({ "messages": many })),
        };
        let resp = self.with_bot_token(builder)?.send().await?;
        checked(resp).await
    }
}

fn message_body(payload: &ReplyPayload) -> Value {
    let mut body = json!({ "content": payload.content });
    if payload.ephemeral {
        body["flags"] = json!(EPHEMERAL_FLAG);
    }
    if let Some(file) = &payload.attachment {
        body["attachments"] = json!([{ "id": 0, "filename": file.filename }]);
    }
    body
}

/// JSON body for plain messages, multipart when a file rides along.
fn with_payload(builder: RequestBuilder, body: Value, payload: &ReplyPayload) -> Result<RequestBuilder, ChannelError> {
    let Some(file) = &payload.attachment else {
        return Ok(builder.json(&body));
    };
    let part = Part::bytes(file.content.clone())
        .file_name(file.filename.clone())
        .mime_str("text/plain; charset=utf-8")?;
    let form = Form::new()
        .text("payload_json", body.to_string())
        .part("files[0]", part);
    Ok(builder.multipart(form))
}

async fn ok_response(resp: Response) -> Result<Response, ChannelError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error body".to_string());
    Err(classify(status.as_u16(), body))
}

async fn checked(resp: Response) -> Result<(), ChannelError> {
    ok_response(resp).await.map(|_| ())
}

/// Maps the platform's error codes onto the reply-channel failures the
/// delivery layer understands.
fn classify(status: u16, body: String) -> ChannelError {
    let code = serde_json::from_str::<PlatformErrorBody>(&body)
        .ok()
        .and_then(|b| b.code);
    match code {
        Some(UNKNOWN_INTERACTION) | Some(UNKNOWN_WEBHOOK) => ChannelError::Expired,
        Some(ALREADY_ACKNOWLEDGED) => ChannelError::AlreadyAcknowledged,
        _ => ChannelError::Rejected { status, body },
    }
}
