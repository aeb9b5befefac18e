use std::env;
use std::sync::Arc;

use poise::serenity_prelude::{self as serenity};
use serenity::GatewayIntents;
use tokio::sync::mpsc;
use tracing::info;

use vigil_bot::analytics::CounterStore;
use vigil_bot::config::{
    ANALYTICS_DIR, BADWORDS_FILE, CONFIG_FILE, FileToggleStore, ModerationConfig, TOGGLES_FILE,
    ToggleSource,
};
use vigil_bot::gateway::SerenityGateway;
use vigil_bot::moderation::{BadWordFilter, Moderator};
use vigil_bot::scheduler::SilenceBreaker;
use vigil_bot::{BOT_NAME, Data, DataInner, Error, commands, handlers, logging};

/// Create the on-disk layout the bot expects before anything touches it.
async fn bootstrap_data_dirs() -> Result<(), Error> {
    tokio::fs::create_dir_all(ANALYTICS_DIR).await?;
    if let Some(parent) = std::path::Path::new(BADWORDS_FILE).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if let Some(parent) = std::path::Path::new(CONFIG_FILE).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    // Initialize logging
    logging::init()?;

    // Load environment variables
    let token = env::var("DISCORD_TOKEN").expect("DISCORD_TOKEN must be set");

    bootstrap_data_dirs().await?;

    // Load configuration and persistent stores
    let config = Arc::new(ModerationConfig::load(CONFIG_FILE).await);
    let toggles = Arc::new(FileToggleStore::new(TOGGLES_FILE));
    let counters = Arc::new(CounterStore::new(ANALYTICS_DIR));
    let filter = BadWordFilter::load(BADWORDS_FILE).await;
    info!("Loaded {} banned tokens", filter.len());

    // Configure the Poise framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::ping(), commands::toggle(), commands::warnings()],
            pre_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_start(ctx);
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_end(ctx);
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    logging::log_command_error(&error);
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                logging::log_console("Registering commands".to_string());
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                // The gateway needs the client's http and cache, so the
                // moderation services are wired up here rather than in main.
                let gateway = Arc::new(SerenityGateway::new(
                    Arc::clone(&ctx.http),
                    Arc::clone(&ctx.cache),
                ));

                let moderator = Moderator::new(
                    filter,
                    gateway.clone(),
                    Arc::clone(&counters),
                    Arc::clone(&config),
                );

                let (sweep_tx, sweep_rx) = mpsc::channel(16);
                let toggle_source: Arc<dyn ToggleSource> = toggles.clone();
                SilenceBreaker::new(
                    gateway,
                    Arc::clone(&counters),
                    toggle_source,
                    Arc::clone(&config),
                )
                .start(sweep_rx);

                let data = Data::new(DataInner {
                    config,
                    toggles,
                    counters,
                    moderator,
                    sweep_tx,
                });

                // Make the data reachable from the raw event handler
                ctx.data.write().await.insert::<Data>(data.clone());
                Ok(data)
            })
        })
        .build();

    // Configure the Serenity client
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .event_handler(handlers::Handler)
        .framework(framework)
        .await
        .expect("Failed to create client");

    info!("Starting {BOT_NAME}...");
    // Start the bot
    if let Err(err) = client.start().await {
        eprintln!("Error starting the bot: {}", err);
    }

    Ok(())
}

fn main() {
    // Run the async main function
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async_main());

    // Handle any errors that occurred during execution
    if let Err(err) = result {
        eprintln!("Error: {}", err);
    }
}
