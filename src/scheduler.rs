//! Silence breaker: a periodic sweep that nudges quiet channels.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Timelike, Utc};
use rand::Rng;
use tokio::sync::mpsc::Receiver;
use tokio::time::Duration as TokioDuration;
use tracing::{info, warn};

use crate::SCHEDULER_TARGET;
use crate::analytics::{ACTIONS_LOG, ActionLogEntry, CounterStore};
use crate::config::{ModerationConfig, ToggleSource};
use crate::gateway::{ChatGateway, spawn_auto_delete};

/// Action-log name for a fired silence break
pub const SILENCE_BREAK_ACTION: &str = "silence_break";

/// The engagement message posted into a quiet channel
const SILENCE_MESSAGE: &str = "💬 It has gone quiet in here — someone say something!";

/// Request type for the silence breaker task
#[derive(Debug, Clone)]
pub enum SweepRequest {
    /// Run a sweep immediately, outside the regular cadence
    SweepNow,
    /// Shut down the sweep task
    Shutdown,
}

/// Night bucket for the inactivity threshold: late evening through early
/// morning, local time.
#[must_use]
pub fn is_night(local_hour: u32) -> bool {
    local_hour < 5 || local_hour >= 21
}

/// Draw a fresh inactivity threshold in minutes. The draw is independent
/// every tick; there is no memory of near-misses.
#[must_use]
pub fn draw_threshold_minutes(config: &ModerationConfig, local_hour: u32) -> i64 {
    let (lo, hi) = if is_night(local_hour) {
        config.night_threshold_minutes
    } else {
        config.day_threshold_minutes
    };
    rand::rng().random_range(lo..=hi)
}

/// Periodic sweep over every guild's designated discussion channel,
/// posting an engagement message when one has been quiet for longer than
/// a freshly drawn, time-of-day-dependent threshold.
#[derive(Clone)]
pub struct SilenceBreaker {
    gateway: Arc<dyn ChatGateway>,
    counters: Arc<CounterStore>,
    toggles: Arc<dyn ToggleSource>,
    config: Arc<ModerationConfig>,
}

impl SilenceBreaker {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        counters: Arc<CounterStore>,
        toggles: Arc<dyn ToggleSource>,
        config: Arc<ModerationConfig>,
    ) -> Self {
        Self {
            gateway,
            counters,
            toggles,
            config,
        }
    }

    /// Spawn the sweep task.
    pub fn start(self, rx: Receiver<SweepRequest>) {
        tokio::spawn(async move {
            self.run(rx).await;
        });
    }

    async fn run(self, mut rx: Receiver<SweepRequest>) {
        let interval_secs = self.config.sweep_interval_secs;
        info!(
            target: SCHEDULER_TARGET,
            "Starting silence breaker with {interval_secs}s interval"
        );

        let mut interval = tokio::time::interval(TokioDuration::from_secs(interval_secs));

        loop {
            tokio::select! {
                Some(request) = rx.recv() => {
                    match request {
                        SweepRequest::SweepNow => {
                            info!(target: SCHEDULER_TARGET, "Received request for an immediate sweep");
                            self.sweep().await;
                        }
                        SweepRequest::Shutdown => {
                            info!(target: SCHEDULER_TARGET, "Received shutdown request for silence breaker");
                            break;
                        }
                    }
                }

                _ = interval.tick() => {
                    self.sweep().await;
                }
            }
        }

        info!(target: SCHEDULER_TARGET, "Silence breaker shut down");
    }

    /// Run one sweep against the wall clock.
    pub async fn sweep(&self) {
        self.sweep_at(Utc::now(), Local::now().hour()).await;
    }

    /// Run one sweep at an explicit instant and local hour.
    pub async fn sweep_at(&self, now: DateTime<Utc>, local_hour: u32) {
        // Toggle is re-read from its source once per tick, not per channel
        if !self.toggles.load().await.silence_breaker {
            return;
        }

        for target in self.gateway.general_channels(&self.config.general_channel) {
            // Channels with no prior message are not eligible
            let Some(last_activity) = target.last_activity else {
                continue;
            };

            let elapsed = now - last_activity;
            let threshold = Duration::minutes(draw_threshold_minutes(&self.config, local_hour));
            if elapsed < threshold {
                continue;
            }

            match self.gateway.send(target.channel_id, SILENCE_MESSAGE).await {
                Ok(sent) => {
                    info!(
                        target: SCHEDULER_TARGET,
                        guild_id = target.guild_id,
                        channel_id = target.channel_id,
                        elapsed_minutes = elapsed.num_minutes(),
                        threshold_minutes = threshold.num_minutes(),
                        "Silence breaker fired"
                    );
                    if let Err(e) = self
                        .counters
                        .append(ACTIONS_LOG, ActionLogEntry::now(SILENCE_BREAK_ACTION))
                        .await
                    {
                        warn!(target: SCHEDULER_TARGET, "Failed to record silence break: {e}");
                    }
                    spawn_auto_delete(
                        Arc::clone(&self.gateway),
                        sent,
                        TokioDuration::from_secs(self.config.silence_notice_ttl_secs),
                    );
                }
                Err(e) => {
                    warn!(
                        target: SCHEDULER_TARGET,
                        channel_id = target.channel_id,
                        "Failed to send silence breaker message: {e}"
                    );
                }
            }
        }
    }
}
