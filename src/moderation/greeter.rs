//! Single-flight delayed replies to greetings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::seq::IndexedRandom;
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::MODERATION_TARGET;
use crate::config::ModerationConfig;
use crate::gateway::{ChatGateway, spawn_auto_delete};
use crate::moderation::InboundMessage;

/// Normalized phrases that count as a greeting
const GREETING_PHRASES: [&str; 2] = ["hi", "hello"];

/// Canned replies, picked uniformly at random
const GREETING_REPLIES: [&str; 3] = [
    "👋 Hey there! Looks like nobody else is around right now.",
    "🤖 vigil-bot reporting in — the channel is a bit sleepy!",
    "👀 Hello! Don't be shy, start a topic.",
];

/// Debounces greeting replies per user.
///
/// The pending marker is a single-flight suppressor, not a resettable
/// timer: a second greeting while one is pending is dropped and does not
/// restart the clock.
#[derive(Clone)]
pub struct GreetingDebouncer {
    pending: Arc<DashMap<u64, DateTime<Utc>>>,
    gateway: Arc<dyn ChatGateway>,
    config: Arc<ModerationConfig>,
}

impl GreetingDebouncer {
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>, config: Arc<ModerationConfig>) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            gateway,
            config,
        }
    }

    /// Whether normalized text is exactly a greeting phrase.
    #[must_use]
    pub fn is_greeting(normalized: &str) -> bool {
        GREETING_PHRASES.contains(&normalized)
    }

    /// Start a delayed greeting reply for the author of `message`, unless
    /// one is already in flight for them.
    pub fn trigger(&self, message: &InboundMessage) {
        let user_id = message.author_id;
        let channel_id = message.channel_id;
        let marker = message.timestamp;

        if self.pending.contains_key(&user_id) {
            debug!(
                target: MODERATION_TARGET,
                user_id,
                "Duplicate greeting suppressed"
            );
            return;
        }
        self.pending.insert(user_id, marker);

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(this.config.greeting_delay_secs)).await;

            // Stale task: the marker was replaced or cleared in the meantime
            let still_ours = this
                .pending
                .get(&user_id)
                .is_some_and(|entry| *entry == marker);
            if !still_ours {
                return;
            }

            let reply = {
                let mut rng = rand::rng();
                GREETING_REPLIES.choose(&mut rng).copied().unwrap_or(GREETING_REPLIES[0])
            };
            match this.gateway.send(channel_id, reply).await {
                Ok(sent) => spawn_auto_delete(
                    Arc::clone(&this.gateway),
                    sent,
                    Duration::from_secs(this.config.greeting_reply_ttl_secs),
                ),
                Err(e) => warn!(
                    target: MODERATION_TARGET,
                    user_id,
                    "Failed to send greeting reply: {e}"
                ),
            }
            this.pending.remove(&user_id);
        });
    }
}
