use std::{ops::Deref, sync::Arc};

use serenity::prelude::TypeMapKey;
use tokio::sync::mpsc::Sender;

use poise::serenity_prelude as serenity;

use crate::analytics::CounterStore;
use crate::config::{FileToggleStore, ModerationConfig};
use crate::moderation::Moderator;
use crate::scheduler::SweepRequest;

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

// Implement TypeMapKey for Data to allow storing it in Serenity's data map,
// so the raw event handler can reach the moderation state.
impl TypeMapKey for Data {
    type Value = Data;
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("config", &self.config)
            .field("sweep_tx", &self.sweep_tx)
            .finish_non_exhaustive()
    }
}

impl Data {
    #[must_use]
    pub fn new(inner: DataInner) -> Self {
        Self(Arc::new(inner))
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Shared services behind [`Data`], built once during framework setup.
pub struct DataInner {
    // Moderation settings loaded at startup
    pub config: Arc<ModerationConfig>,
    // Feature toggles, re-read from disk on use
    pub toggles: Arc<FileToggleStore>,
    // Persistent per-user counters and action logs
    pub counters: Arc<CounterStore>,
    // The message-moderation pipeline
    pub moderator: Moderator,
    // Channel to request silence-breaker sweeps
    pub sweep_tx: Sender<SweepRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_debug_impl() {
        fn assert_debug<T: std::fmt::Debug>() {}
        assert_debug::<Data>();
    }

    #[test]
    fn test_data_is_cheap_to_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<Data>();
    }
}
