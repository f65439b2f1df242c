// src/delivery/mod.rs
//! Reply delivery over a channel that can be acknowledged once, may expire
//! at any moment, and caps the size of a single message.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, warn};
use tokio::sync::Mutex;

use crate::config::DeliveryConfig;
use crate::errors::ChannelError;

pub mod discord;

pub use discord::{DiscordRest, InteractionReply};

/// A file sent alongside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Content of one outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplyPayload {
    pub content: String,
    pub attachment: Option<Attachment>,
    /// Visible only to the invoking user.
    pub ephemeral: bool,
}

impl ReplyPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Self::default() }
    }
}

/// One text field of a secondary input form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub id: String,
    pub label: String,
    pub multiline: bool,
    pub required: bool,
    pub max_length: u32,
}

/// A secondary input form shown in place of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputForm {
    pub custom_id: String,
    pub title: String,
    pub fields: Vec<FormField>,
}

/// The single initial acknowledgment of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// "Working on it" placeholder that is later replaced by the reply.
    Deferred { ephemeral: bool },
    /// Acknowledge without a placeholder; the reply updates the source message.
    Update,
}

/// Raw operations of the platform's reply channel. Every method may fail
/// with `ChannelError::Expired` once the interaction is gone.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    async fn acknowledge(&self, ack: Acknowledgement) -> Result<(), ChannelError>;

    /// Initial response carrying content.
    async fn respond(&self, payload: &ReplyPayload) -> Result<(), ChannelError>;

    /// Replaces the content of the acknowledged response.
    async fn edit_original(&self, payload: &ReplyPayload) -> Result<(), ChannelError>;

    /// Sends an additional message for the same interaction.
    async fn follow_up(&self, payload: &ReplyPayload) -> Result<(), ChannelError>;

    /// Answers the interaction with an input form.
    async fn show_form(&self, form: &InputForm) -> Result<(), ChannelError>;
}

/// Where a reply slot stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    NotAcknowledged,
    Pending,
    Finalized,
}

/// Outcome of a delivery step. Neither failure is raised as an error.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The interaction is gone; the pipeline must stop.
    Expired,
    /// The platform refused or never received the request. The target is
    /// still live.
    Failed,
}

impl Delivery {
    pub fn is_delivered(self) -> bool {
        self == Delivery::Delivered
    }
}

struct Slot {
    state: ReplyState,
    expired: bool,
    ephemeral: bool,
}

/// One user-visible reply slot: acknowledged at most once, finalized once,
/// and any later content goes out as a new message.
///
/// The slot lock is held across each channel call, so racing deliveries to
/// the same interaction are applied one after another.
#[derive(Clone)]
pub struct DeliveryTarget {
    channel: Arc<dyn ReplyChannel>,
    slot: Arc<Mutex<Slot>>,
}

impl DeliveryTarget {
    pub fn new(channel: Arc<dyn ReplyChannel>) -> Self {
        Self {
            channel,
            slot: Arc::new(Mutex::new(Slot {
                state: ReplyState::NotAcknowledged,
                expired: false,
                ephemeral: false,
            })),
        }
    }

    pub async fn state(&self) -> ReplyState {
        self.slot.lock().await.state
    }

    pub async fn is_expired(&self) -> bool {
        self.slot.lock().await.expired
    }

    /// Attempts the one allowed acknowledgment. Already acknowledged or
    /// finalized targets are a successful no-op.
    pub async fn acknowledge(&self, ack: Acknowledgement) -> Delivery {
        let mut slot = self.slot.lock().await;
        if slot.expired {
            return Delivery::Expired;
        }
        if slot.state != ReplyState::NotAcknowledged {
            return Delivery::Delivered;
        }

        match self.channel.acknowledge(ack).await {
            Ok(()) | Err(ChannelError::AlreadyAcknowledged) => {
                slot.state = ReplyState::Pending;
                if let Acknowledgement::Deferred { ephemeral } = ack {
                    slot.ephemeral = ephemeral;
                }
                Delivery::Delivered
            }
            Err(e) => fail(&mut slot, "acknowledge", e),
        }
    }

    /// Puts final content into the reply. A target that is already finalized
    /// gets a new message instead.
    pub async fn finalize(&self, mut payload: ReplyPayload) -> Delivery {
        let mut slot = self.slot.lock().await;
        if slot.expired {
            return Delivery::Expired;
        }
        payload.ephemeral |= slot.ephemeral;

        let sent = match slot.state {
            ReplyState::NotAcknowledged => match self.channel.respond(&payload).await {
                Err(ChannelError::AlreadyAcknowledged) => self.channel.edit_original(&payload).await,
                other => other,
            },
            ReplyState::Pending => self.channel.edit_original(&payload).await,
            ReplyState::Finalized => self.channel.follow_up(&payload).await,
        };

        match sent {
            Ok(()) | Err(ChannelError::AlreadyAcknowledged) => {
                slot.state = ReplyState::Finalized;
                Delivery::Delivered
            }
            Err(e) => fail(&mut slot, "finalize", e),
        }
    }

    /// Answers with an input form. Only possible before any acknowledgment.
    pub async fn show_form(&self, form: &InputForm) -> Delivery {
        let mut slot = self.slot.lock().await;
        if slot.expired {
            return Delivery::Expired;
        }
        if slot.state != ReplyState::NotAcknowledged {
            warn!("Cannot show form {}: interaction already answered", form.custom_id);
            return Delivery::Failed;
        }

        match self.channel.show_form(form).await {
            Ok(()) => {
                slot.state = ReplyState::Finalized;
                Delivery::Delivered
            }
            Err(e) => fail(&mut slot, "show_form", e),
        }
    }
}

fn fail(slot: &mut Slot, step: &str, err: ChannelError) -> Delivery {
    match err {
        ChannelError::Expired => {
            slot.expired = true;
            warn!("Reply channel expired during {}", step);
            Delivery::Expired
        }
        other => {
            error!("Reply channel {} failed: {}", step, other);
            Delivery::Failed
        }
    }
}

/// Wraps text in a fixed-width code block, keeping inner fences from closing it.
pub fn code_block(text: &str) -> String {
    format!("```\n{}\n```", text.replace("```", "`\u{200b}``"))
}

/// Delivers an arbitrary-length report: inline when the wrapped text fits the
/// configured limit, otherwise as a short notice with the full text attached.
pub async fn deliver_text(target: &DeliveryTarget, text: &str, config: &DeliveryConfig) -> Delivery {
    let wrapped = code_block(text);
    let length = wrapped.chars().count();

    let payload = if length <= config.inline_limit {
        ReplyPayload::text(wrapped)
    } else {
        debug!("Report is {} characters; sending as attachment", length);
        ReplyPayload {
            content: format!(
                "Output is too long to show inline ({} characters); the full report is attached.",
                text.chars().count()
            ),
            attachment: Some(Attachment {
                filename: "output.txt".to_string(),
                content: text.as_bytes().to_vec(),
            }),
            ephemeral: false,
        }
    };

    target.finalize(payload).await
}
