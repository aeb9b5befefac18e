pub mod analytics;
pub mod commands;
pub mod config;
pub mod data;
pub mod gateway;
pub mod handlers;
pub mod logging;
pub mod moderation;
pub mod scheduler;

// Log target names, one per subsystem
pub const BOT_NAME: &str = "vigil_bot";
pub const COMMAND_TARGET: &str = "vigil_bot::command";
pub const ERROR_TARGET: &str = "vigil_bot::error";
pub const EVENT_TARGET: &str = "vigil_bot::handlers";
pub const MODERATION_TARGET: &str = "vigil_bot::moderation";
pub const SCHEDULER_TARGET: &str = "vigil_bot::scheduler";
pub const CONSOLE_TARGET: &str = "vigil_bot";

pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
