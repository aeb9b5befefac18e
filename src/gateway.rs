//! Chat gateway abstraction.
//!
//! The moderation core talks to Discord only through [`ChatGateway`], so
//! the pipeline and the scheduler can be exercised in tests with a mock
//! instead of a live connection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use serenity::{Cache, ChannelId, ChannelType, GuildId, Http, MessageId, UserId};
use thiserror::Error;
use tokio::time::Duration;
use tracing::debug;

/// Errors that can occur during gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Discord API error
    #[error("Discord API error: {0}")]
    Discord(#[from] Box<serenity::Error>),

    /// Failed to get guild or member
    #[error("Failed to get guild or member: {0}")]
    GuildOrMemberNotFound(String),
}

impl From<serenity::Error> for GatewayError {
    fn from(error: serenity::Error) -> Self {
        Self::Discord(Box::new(error))
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// A message the bot has sent, addressed for later deletion.
#[derive(Debug, Clone, Copy)]
pub struct SentMessage {
    pub channel_id: u64,
    pub message_id: u64,
}

/// A scheduling-eligible channel with its last observed activity.
#[derive(Debug, Clone, Copy)]
pub struct ChannelActivity {
    pub guild_id: u64,
    pub channel_id: u64,
    /// `None` when the channel has no prior message
    pub last_activity: Option<DateTime<Utc>>,
}

/// Outbound operations against the chat platform.
///
/// Every call may fail transiently (permissions, message already gone);
/// callers decide whether a failure is cosmetic or enforcement-relevant.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send a plain message to a channel.
    async fn send(&self, channel_id: u64, content: &str) -> GatewayResult<SentMessage>;

    /// Delete a message from a channel.
    async fn delete(&self, channel_id: u64, message_id: u64) -> GatewayResult<()>;

    /// Apply a Discord-native communication timeout to a member.
    /// The platform lifts it automatically when it expires.
    async fn timeout_member(
        &self,
        guild_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
    ) -> GatewayResult<()>;

    /// Look up a text channel by name in a guild's cache.
    fn find_text_channel(&self, guild_id: u64, name: &str) -> Option<u64>;

    /// Every guild's designated discussion channel with its last activity,
    /// derived from the cached last-message snowflake.
    fn general_channels(&self, name: &str) -> Vec<ChannelActivity>;
}

/// Production gateway backed by the Serenity HTTP client and cache.
#[derive(Clone)]
pub struct SerenityGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenityGateway {
    #[must_use]
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    fn text_channel_in(&self, guild_id: GuildId, name: &str) -> Option<(ChannelId, Option<MessageId>)> {
        let guild = self.cache.guild(guild_id)?;
        guild
            .channels
            .values()
            .find(|channel| channel.kind == ChannelType::Text && channel.name == name)
            .map(|channel| (channel.id, channel.last_message_id))
    }
}

#[async_trait]
impl ChatGateway for SerenityGateway {
    async fn send(&self, channel_id: u64, content: &str) -> GatewayResult<SentMessage> {
        let message = ChannelId::new(channel_id)
            .say(&self.http, content)
            .await
            .map_err(GatewayError::from)?;
        Ok(SentMessage {
            channel_id,
            message_id: message.id.get(),
        })
    }

    async fn delete(&self, channel_id: u64, message_id: u64) -> GatewayResult<()> {
        ChannelId::new(channel_id)
            .delete_message(&self.http, MessageId::new(message_id))
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn timeout_member(
        &self,
        guild_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
    ) -> GatewayResult<()> {
        let guild_id = GuildId::new(guild_id);
        let user_id = UserId::new(user_id);

        let mut member = guild_id.member(&self.http, user_id).await.map_err(|e| {
            GatewayError::GuildOrMemberNotFound(format!(
                "Failed to get member {user_id} in guild {guild_id}: {e}"
            ))
        })?;

        member
            .disable_communication_until_datetime(&self.http, until.into())
            .await
            .map_err(GatewayError::from)?;

        Ok(())
    }

    fn find_text_channel(&self, guild_id: u64, name: &str) -> Option<u64> {
        self.text_channel_in(GuildId::new(guild_id), name)
            .map(|(id, _)| id.get())
    }

    fn general_channels(&self, name: &str) -> Vec<ChannelActivity> {
        self.cache
            .guilds()
            .into_iter()
            .filter_map(|guild_id| {
                self.text_channel_in(guild_id, name)
                    .map(|(channel_id, last_message)| ChannelActivity {
                        guild_id: guild_id.get(),
                        channel_id: channel_id.get(),
                        last_activity: last_message.map(|id| {
                            // Snowflakes carry their creation time
                            DateTime::from_timestamp(id.created_at().unix_timestamp(), 0)
                                .unwrap_or_default()
                        }),
                    })
            })
            .collect()
    }
}

/// Schedule a fire-and-forget deletion of a previously sent message.
///
/// Deletion failures are expected (the message may already be gone) and
/// are swallowed after a debug log.
pub fn spawn_auto_delete(gateway: Arc<dyn ChatGateway>, message: SentMessage, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = gateway.delete(message.channel_id, message.message_id).await {
            debug!(
                channel_id = message.channel_id,
                message_id = message.message_id,
                "Auto-delete skipped: {e}"
            );
        }
    });
}
