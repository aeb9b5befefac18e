//! Moderation pipeline for the watched community channel.
//!
//! Inbound messages flow through a fixed precedence order: banned-word
//! filter, then flood/repeat tracking, then the greeting debouncer. The
//! first stage that matches short-circuits the rest.

mod dispatcher;
mod escalator;
mod filter;
mod greeter;
mod tracker;

pub use dispatcher::{InboundMessage, Moderator};
pub use escalator::{WarnReason, WarningEscalator, WarningRecord};
pub use filter::{BadWordFilter, normalize};
pub use greeter::GreetingDebouncer;
pub use tracker::{MessageTracker, SpamVerdict};
