mod config;
mod handlers;
mod models;
mod openrouter;
mod prefs;
mod webhook;

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use config::{Config, RunMode};
use handlers::Command;
use openrouter::{CompletionClient, OpenRouterClient};
use prefs::{MemoryPreferences, PreferenceStore};

pub struct BotState {
    pub config: Config,
    pub prefs: Arc<dyn PreferenceStore>,
    pub completions: Arc<dyn CompletionClient>,
}

impl BotState {
    fn new(config: Config) -> Self {
        let completions = OpenRouterClient::new(config.openrouter_api_key.clone());
        Self {
            config,
            prefs: Arc::new(MemoryPreferences::new()),
            completions: Arc::new(completions),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    info!("🚀 Starting routerchat...");

    let bot = Bot::new(&config.telegram_bot_token);

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let state = Arc::new(BotState::new(config));

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handlers::handle_command),
        )
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![state.clone()])
        .enable_ctrlc_handler()
        .build();

    match state.config.run_mode {
        RunMode::Polling => {
            info!("Bot running in long-polling mode");
            dispatcher.dispatch().await;
        }
        RunMode::Webhook => {
            info!("Bot running in webhook mode");
            let listener = match webhook::listener(bot, &state.config).await {
                Ok(listener) => listener,
                Err(e) => {
                    eprintln!("failed to start webhook listener: {e}");
                    std::process::exit(1);
                }
            };
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
    }
}
