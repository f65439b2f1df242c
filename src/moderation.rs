// src/moderation.rs

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::info;

use crate::errors::ChannelError;

/// The platform refuses bulk deletion of messages older than this.
pub const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Message housekeeping operations on a chat channel.
#[async_trait]
pub trait ChannelModerator: Send + Sync {
    /// Most recent messages first, at most `limit` of them.
    async fn recent_messages(&self, channel_id: &str, limit: u8) -> Result<Vec<MessageRef>, ChannelError>;

    async fn delete_messages(&self, channel_id: &str, ids: &[String]) -> Result<(), ChannelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearReport {
    pub deleted: usize,
    pub skipped_too_old: usize,
}

impl ClearReport {
    pub fn summary(&self) -> String {
        if self.skipped_too_old == 0 {
            format!("Deleted {} messages.", self.deleted)
        } else {
            format!(
                "Deleted {} messages; skipped {} older than {} days (platform limit).",
                self.deleted, self.skipped_too_old, BULK_DELETE_MAX_AGE_DAYS
            )
        }
    }
}

/// Deletes up to `amount` recent messages. Messages past the bulk-delete age
/// cutoff are left alone and counted in the report.
pub async fn clear_recent(
    moderator: &dyn ChannelModerator,
    channel_id: &str,
    amount: u8,
    now: DateTime<Utc>,
) -> Result<ClearReport, ChannelError> {
    let amount = amount.clamp(1, 100);
    let cutoff = now - Duration::days(BULK_DELETE_MAX_AGE_DAYS);
    let messages = moderator.recent_messages(channel_id, amount).await?;

    let (fresh, stale): (Vec<MessageRef>, Vec<MessageRef>) =
        messages.into_iter().partition(|m| m.created_at > cutoff);
    let ids: Vec<String> = fresh.into_iter().map(|m| m.id).collect();

    moderator.delete_messages(channel_id, &ids).await?;
    info!("Cleared {} messages in channel {} ({} too old)", ids.len(), channel_id, stale.len());

    Ok(ClearReport { deleted: ids.len(), skipped_too_old: stale.len() })
}
