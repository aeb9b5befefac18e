//! Per-user sliding-window flood and repeat detection.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::config::ModerationConfig;

/// Spam verdicts, in precedence order. At most one fires per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamVerdict {
    /// Too many messages inside the flood window
    Flood,
    /// The same text repeated too often inside the flood window
    Repeated,
}

#[derive(Debug, Clone)]
struct CachedMessage {
    text: String,
    seen_at: DateTime<Utc>,
}

/// Rolling per-user cache of recent messages.
///
/// Entries older than the flood window are evicted lazily on each new
/// message; there is no long-term memory beyond the window.
pub struct MessageTracker {
    caches: DashMap<u64, Vec<CachedMessage>>,
    config: Arc<ModerationConfig>,
}

impl MessageTracker {
    #[must_use]
    pub fn new(config: Arc<ModerationConfig>) -> Self {
        Self {
            caches: DashMap::new(),
            config,
        }
    }

    /// Record a message and check it against the flood and repeat rules.
    /// Flood takes precedence; the repeat check only runs if flood did
    /// not fire.
    pub fn observe(&self, user_id: u64, text: &str, now: DateTime<Utc>) -> Option<SpamVerdict> {
        let window = Duration::seconds(self.config.flood_window_secs);

        let mut cache = self.caches.entry(user_id).or_default();
        cache.push(CachedMessage {
            text: text.to_string(),
            seen_at: now,
        });
        cache.retain(|entry| now - entry.seen_at <= window);

        if cache.len() > self.config.max_messages {
            return Some(SpamVerdict::Flood);
        }

        let lowered = text.to_lowercase();
        let repeats = cache
            .iter()
            .filter(|entry| entry.text.to_lowercase() == lowered)
            .count();
        if repeats >= self.config.max_repeat {
            return Some(SpamVerdict::Repeated);
        }

        None
    }
}
