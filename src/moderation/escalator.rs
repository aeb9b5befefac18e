//! Warning escalation: per-user counts, notices, and the timed mute.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use derive_more::Display;
use tokio::time::Duration as TokioDuration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analytics::{CounterStore, WARNINGS_COUNTER};
use crate::config::ModerationConfig;
use crate::gateway::{ChatGateway, spawn_auto_delete};
use crate::moderation::{InboundMessage, SpamVerdict};
use crate::{ERROR_TARGET, MODERATION_TARGET};

/// Why a user is being warned. The display string doubles as the durable
/// counter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WarnReason {
    #[display("Abusive language")]
    AbusiveLanguage,
    #[display("Flood spam")]
    FloodSpam,
    #[display("Repeated spam")]
    RepeatedSpam,
}

impl From<SpamVerdict> for WarnReason {
    fn from(verdict: SpamVerdict) -> Self {
        match verdict {
            SpamVerdict::Flood => Self::FloodSpam,
            SpamVerdict::Repeated => Self::RepeatedSpam,
        }
    }
}

/// Record of a single issued warning.
#[derive(Debug, Clone)]
pub struct WarningRecord {
    pub id: String,
    pub user_id: u64,
    pub guild_id: u64,
    pub reason: String,
    pub count: u32,
    pub issued_at: DateTime<Utc>,
}

/// Escalates repeat offenders through warnings into a timed mute.
///
/// Warning counts are process-lifetime and only ever increase; once a
/// user reaches the threshold, every further warning re-applies the mute.
pub struct WarningEscalator {
    counts: DashMap<u64, u32>,
    records: DashMap<String, WarningRecord>,
    gateway: Arc<dyn ChatGateway>,
    counters: Arc<CounterStore>,
    config: Arc<ModerationConfig>,
}

impl WarningEscalator {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        counters: Arc<CounterStore>,
        config: Arc<ModerationConfig>,
    ) -> Self {
        Self {
            counts: DashMap::new(),
            records: DashMap::new(),
            gateway,
            counters,
            config,
        }
    }

    /// Issue a warning to the author of `message`, muting them once the
    /// threshold is reached. Returns the new warning count.
    ///
    /// Cosmetic platform failures (notice send, auto-delete) are swallowed;
    /// a failed mute is the enforcement outcome and is logged at error
    /// level.
    pub async fn warn(&self, message: &InboundMessage, reason: WarnReason) -> u32 {
        let count = {
            let mut entry = self.counts.entry(message.author_id).or_insert(0);
            *entry += 1;
            *entry
        };

        let record = WarningRecord {
            id: Uuid::new_v4().to_string(),
            user_id: message.author_id,
            guild_id: message.guild_id,
            reason: reason.to_string(),
            count,
            issued_at: Utc::now(),
        };
        info!(
            target: MODERATION_TARGET,
            warning_id = %record.id,
            user_id = %message.author_id,
            guild_id = %message.guild_id,
            reason = %reason,
            count,
            "Warning issued"
        );
        self.records.insert(record.id.clone(), record);

        let notice = format!(
            "⚠️ <@{}> Warning {count}/{}\nReason: **{reason}**",
            message.author_id, self.config.max_warnings
        );
        match self.gateway.send(message.channel_id, &notice).await {
            Ok(sent) => spawn_auto_delete(
                Arc::clone(&self.gateway),
                sent,
                TokioDuration::from_secs(self.config.warning_notice_ttl_secs),
            ),
            Err(e) => warn!(
                target: MODERATION_TARGET,
                user_id = %message.author_id,
                "Failed to post warning notice: {e}"
            ),
        }

        let mod_log = self
            .gateway
            .find_text_channel(message.guild_id, &self.config.mod_log_channel);
        if let Some(channel_id) = mod_log {
            let entry = format!(
                "⚠️ WARNING\nUser: {} ({})\nReason: {reason}\nCount: {count}",
                message.author_name, message.author_id
            );
            if let Err(e) = self.gateway.send(channel_id, &entry).await {
                warn!(target: MODERATION_TARGET, "Failed to post mod-log record: {e}");
            }
        }

        if let Err(e) = self
            .counters
            .increment(WARNINGS_COUNTER, &reason.to_string(), 1)
            .await
        {
            warn!(target: MODERATION_TARGET, "Failed to bump warning counter: {e}");
        }

        if count >= self.config.max_warnings {
            self.apply_mute(message, mod_log).await;
        }

        count
    }

    async fn apply_mute(&self, message: &InboundMessage, mod_log: Option<u64>) {
        let until = Utc::now() + Duration::minutes(self.config.timeout_minutes);

        match self
            .gateway
            .timeout_member(message.guild_id, message.author_id, until)
            .await
        {
            Ok(()) => {
                info!(
                    target: MODERATION_TARGET,
                    user_id = %message.author_id,
                    guild_id = %message.guild_id,
                    until = %until,
                    "Timed mute applied"
                );
                if let Some(channel_id) = mod_log {
                    let entry = format!(
                        "⏳ TIMEOUT → {} ({}m)",
                        message.author_name, self.config.timeout_minutes
                    );
                    if let Err(e) = self.gateway.send(channel_id, &entry).await {
                        warn!(target: MODERATION_TARGET, "Failed to post mute record: {e}");
                    }
                }
            }
            Err(e) => error!(
                target: ERROR_TARGET,
                user_id = %message.author_id,
                guild_id = %message.guild_id,
                "Failed to apply timed mute: {e}"
            ),
        }
    }

    /// Warning count accumulated by a user this session.
    #[must_use]
    pub fn warning_count(&self, user_id: u64) -> u32 {
        self.counts.get(&user_id).map_or(0, |entry| *entry)
    }

    /// All warning records issued to a user, oldest first.
    #[must_use]
    pub fn warnings_for(&self, user_id: u64) -> Vec<WarningRecord> {
        let mut records: Vec<WarningRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.count);
        records
    }
}
