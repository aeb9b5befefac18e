//! Per-message orchestration of the moderation pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::MODERATION_TARGET;
use crate::analytics::{CounterStore, MESSAGES_COUNTER};
use crate::config::ModerationConfig;
use crate::gateway::ChatGateway;
use crate::moderation::{
    BadWordFilter, GreetingDebouncer, MessageTracker, WarnReason, WarningEscalator, WarningRecord,
    normalize,
};

/// An inbound chat message, decoupled from the platform types.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub guild_id: u64,
    pub channel_id: u64,
    pub channel_name: String,
    pub message_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Runs each inbound message through the checks in fixed precedence
/// order, short-circuiting on the first match: bad words, then
/// flood/repeat spam, then the greeting debouncer.
///
/// Nothing in here is fatal: platform and store failures are logged and
/// absorbed so a single bad call never stalls the pipeline.
pub struct Moderator {
    filter: BadWordFilter,
    tracker: MessageTracker,
    escalator: WarningEscalator,
    greeter: GreetingDebouncer,
    counters: Arc<CounterStore>,
    gateway: Arc<dyn ChatGateway>,
    config: Arc<ModerationConfig>,
}

impl Moderator {
    #[must_use]
    pub fn new(
        filter: BadWordFilter,
        gateway: Arc<dyn ChatGateway>,
        counters: Arc<CounterStore>,
        config: Arc<ModerationConfig>,
    ) -> Self {
        Self {
            filter,
            tracker: MessageTracker::new(Arc::clone(&config)),
            escalator: WarningEscalator::new(
                Arc::clone(&gateway),
                Arc::clone(&counters),
                Arc::clone(&config),
            ),
            greeter: GreetingDebouncer::new(Arc::clone(&gateway), Arc::clone(&config)),
            counters,
            gateway,
            config,
        }
    }

    /// Handle one inbound message. Messages outside the watched channel
    /// bypass the whole pipeline.
    pub async fn handle_message(&self, message: InboundMessage) {
        if message.channel_name != self.config.general_channel {
            return;
        }

        // Counted before any check runs, violation or not
        if let Err(e) = self
            .counters
            .increment(MESSAGES_COUNTER, &message.author_id.to_string(), 1)
            .await
        {
            warn!(target: MODERATION_TARGET, "Failed to bump message counter: {e}");
        }

        let normalized = normalize(&message.content);

        if let Some(token) = self.filter.find_match(&normalized) {
            info!(
                target: MODERATION_TARGET,
                user_id = %message.author_id,
                token,
                "Banned token matched"
            );
            self.delete_offending(&message).await;
            self.escalator.warn(&message, WarnReason::AbusiveLanguage).await;
            return;
        }

        if let Some(verdict) =
            self.tracker
                .observe(message.author_id, &message.content, message.timestamp)
        {
            self.delete_offending(&message).await;
            self.escalator.warn(&message, verdict.into()).await;
            return;
        }

        if GreetingDebouncer::is_greeting(&normalized) {
            self.greeter.trigger(&message);
        }
    }

    async fn delete_offending(&self, message: &InboundMessage) {
        if let Err(e) = self
            .gateway
            .delete(message.channel_id, message.message_id)
            .await
        {
            warn!(
                target: MODERATION_TARGET,
                message_id = %message.message_id,
                "Failed to delete offending message: {e}"
            );
        }
    }

    /// Warning count accumulated by a user this session.
    #[must_use]
    pub fn warning_count(&self, user_id: u64) -> u32 {
        self.escalator.warning_count(user_id)
    }

    /// All warning records issued to a user this session.
    #[must_use]
    pub fn warnings_for(&self, user_id: u64) -> Vec<WarningRecord> {
        self.escalator.warnings_for(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::WARNINGS_COUNTER;
    use crate::gateway::{MockChatGateway, SentMessage};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counters {
        deletes: Arc<AtomicUsize>,
        sends: Arc<AtomicUsize>,
    }

    fn pipeline_gateway(counters: &Counters) -> MockChatGateway {
        let mut mock = MockChatGateway::new();
        let deletes = Arc::clone(&counters.deletes);
        let sends = Arc::clone(&counters.sends);
        mock.expect_delete().returning(move |_, _| {
            deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        mock.expect_send().returning(move |channel_id, _| {
            sends.fetch_add(1, Ordering::SeqCst);
            Ok(SentMessage { channel_id, message_id: 1 })
        });
        mock.expect_find_text_channel().returning(|_, _| None);
        mock.expect_timeout_member().returning(|_, _, _| Ok(()));
        mock
    }

    fn temp_store() -> Arc<CounterStore> {
        Arc::new(CounterStore::new(
            std::env::temp_dir().join(format!("vigil-dispatch-{}", uuid::Uuid::new_v4())),
        ))
    }

    fn moderator(counters: &Counters, store: Arc<CounterStore>) -> Moderator {
        Moderator::new(
            BadWordFilter::from_tokens(["spam"]),
            Arc::new(pipeline_gateway(counters)),
            store,
            Arc::new(ModerationConfig::default()),
        )
    }

    fn message_at(content: &str, timestamp: DateTime<Utc>) -> InboundMessage {
        InboundMessage {
            guild_id: 100,
            channel_id: 10,
            channel_name: "general".to_string(),
            message_id: 555,
            author_id: 42,
            author_name: "someone".to_string(),
            content: content.to_string(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_banned_token_deletes_and_warns() {
        let hooks = Counters {
            deletes: Arc::new(AtomicUsize::new(0)),
            sends: Arc::new(AtomicUsize::new(0)),
        };
        let store = temp_store();
        let moderator = moderator(&hooks, Arc::clone(&store));

        // Token hidden by punctuation, exposed by normalization
        moderator
            .handle_message(message_at("buy S.P.A.M today", Utc::now()))
            .await;

        assert_eq!(hooks.deletes.load(Ordering::SeqCst), 1);
        let warnings = store.read_all(WARNINGS_COUNTER).await.unwrap();
        assert_eq!(warnings.get("Abusive language"), Some(&1));

        // The per-user message counter was still bumped
        let messages = store.read_all(MESSAGES_COUNTER).await.unwrap();
        assert_eq!(messages.get("42"), Some(&1));
    }

    #[tokio::test]
    async fn test_normalization_miss_is_not_a_violation() {
        let hooks = Counters {
            deletes: Arc::new(AtomicUsize::new(0)),
            sends: Arc::new(AtomicUsize::new(0)),
        };
        let store = temp_store();
        let moderator = moderator(&hooks, Arc::clone(&store));

        // "SP@M" normalizes to "spm": no substring match
        moderator
            .handle_message(message_at("th1s is SP@M!!", Utc::now()))
            .await;

        assert_eq!(hooks.deletes.load(Ordering::SeqCst), 0);
        assert!(store.read_all(WARNINGS_COUNTER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flood_detected_on_sixth_message() {
        let hooks = Counters {
            deletes: Arc::new(AtomicUsize::new(0)),
            sends: Arc::new(AtomicUsize::new(0)),
        };
        let store = temp_store();
        let moderator = moderator(&hooks, Arc::clone(&store));
        let start = Utc::now();

        for i in 0..6 {
            let at = start + Duration::milliseconds(i * 400);
            moderator
                .handle_message(message_at(&format!("message {i}"), at))
                .await;
        }

        assert_eq!(hooks.deletes.load(Ordering::SeqCst), 1);
        let warnings = store.read_all(WARNINGS_COUNTER).await.unwrap();
        assert_eq!(warnings.get("Flood spam"), Some(&1));

        // Every message was still counted
        let messages = store.read_all(MESSAGES_COUNTER).await.unwrap();
        assert_eq!(messages.get("42"), Some(&6));
    }

    #[tokio::test]
    async fn test_repeated_text_detected_before_flood() {
        let hooks = Counters {
            deletes: Arc::new(AtomicUsize::new(0)),
            sends: Arc::new(AtomicUsize::new(0)),
        };
        let store = temp_store();
        let moderator = moderator(&hooks, Arc::clone(&store));
        let start = Utc::now();

        for i in 0..3 {
            let at = start + Duration::milliseconds(i * 500);
            moderator.handle_message(message_at("same thing", at)).await;
        }

        let warnings = store.read_all(WARNINGS_COUNTER).await.unwrap();
        assert_eq!(warnings.get("Repeated spam"), Some(&1));
        assert_eq!(warnings.get("Flood spam"), None);
    }

    #[tokio::test]
    async fn test_other_channels_bypass_the_pipeline() {
        let hooks = Counters {
            deletes: Arc::new(AtomicUsize::new(0)),
            sends: Arc::new(AtomicUsize::new(0)),
        };
        let store = temp_store();
        let moderator = moderator(&hooks, Arc::clone(&store));

        let mut message = message_at("buy S.P.A.M today", Utc::now());
        message.channel_name = "random".to_string();
        moderator.handle_message(message).await;

        assert_eq!(hooks.deletes.load(Ordering::SeqCst), 0);
        // Not even the message counter moves for unwatched channels
        assert!(store.read_all(MESSAGES_COUNTER).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_flows_through_to_debounced_reply() {
        let hooks = Counters {
            deletes: Arc::new(AtomicUsize::new(0)),
            sends: Arc::new(AtomicUsize::new(0)),
        };
        let store = temp_store();
        let moderator = moderator(&hooks, Arc::clone(&store));

        moderator.handle_message(message_at("Hi!", Utc::now())).await;
        tokio::time::sleep(std::time::Duration::from_secs(20)).await;

        assert_eq!(hooks.sends.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.deletes.load(Ordering::SeqCst), 0);
    }
}
