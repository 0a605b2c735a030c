//! Command and chat-message handling.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use crate::BotState;
use crate::models;
use crate::openrouter::CompletionClient as _;
use crate::prefs::{InvalidModel, PreferenceStore as _};

const GREETING: &str = "👋 Hi! I'm an AI bot backed by OpenRouter models. \
Send me a message and I'll answer it with AI.";

const HELP: &str = "\
🤖 *Telegram AI Bot*

*Available commands:*
/start - Start the bot
/help - Show this help
/models - List the available AI models

*Usage:*
Just type a message and the bot will answer using AI.

*Model selection:*
Use /model [model\\_name] to change the model in use.
";

const MODEL_USAGE: &str = "Please provide a model name. Example: /model gemini-pro";

const THINKING_NOTICE: &str = "🧠 Thinking...";

const COMPLETION_FAILED: &str =
    "❌ Something went wrong while contacting the AI service. Please try again later.";

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "show help")]
    Help,
    #[command(description = "list the available AI models")]
    Models,
    #[command(description = "change the model in use")]
    Model(String),
}

/// One inbound user message, alive for a single handling cycle.
pub struct ChatMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: String,
    pub timestamp: String,
    pub text: String,
}

impl ChatMessage {
    /// Extract the fields we care about. `None` for messages without a
    /// sender or text body.
    pub fn from_message(msg: &Message) -> Option<Self> {
        let user = msg.from.as_ref()?;
        let text = msg.text()?;
        let username = user
            .username
            .clone()
            .unwrap_or_else(|| user.first_name.clone());

        Some(Self {
            chat_id: msg.chat.id,
            user_id: user.id,
            username,
            timestamp: format_timestamp(msg.date),
            text: text.to_string(),
        })
    }
}

fn format_timestamp(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M").to_string()
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let Some(ref user) = msg.from else {
        return Ok(());
    };
    let username = user.username.as_deref().unwrap_or(&user.first_name);
    info!("Command from {username} ({}): {cmd:?}", user.id);

    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, GREETING).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, HELP)
                .parse_mode(ParseMode::Markdown)
                .await?;
        }
        Command::Models => {
            bot.send_message(msg.chat.id, models_text())
                .parse_mode(ParseMode::Markdown)
                .await?;
        }
        Command::Model(arg) => {
            let reply = model_reply(&state, user.id, &arg);
            bot.send_message(msg.chat.id, reply).await?;
        }
    }

    Ok(())
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(chat_msg) = ChatMessage::from_message(&msg) else {
        return Ok(());
    };

    // Slash-prefixed text that didn't parse as a known command is ignored.
    if chat_msg.text.starts_with('/') {
        return Ok(());
    }

    let text_preview: String = chat_msg.text.chars().take(100).collect();
    info!(
        "Message from {} ({}) at {}: \"{text_preview}\"",
        chat_msg.username, chat_msg.user_id, chat_msg.timestamp
    );

    if let Err(e) = bot.send_chat_action(chat_msg.chat_id, ChatAction::Typing).await {
        warn!("Failed to send typing action: {e}");
    }

    let notice = match bot.send_message(chat_msg.chat_id, THINKING_NOTICE).await {
        Ok(sent) => Some(sent.id),
        Err(e) => {
            warn!("Failed to send thinking notice: {e}");
            None
        }
    };

    let reply = chat_reply(&state, &chat_msg).await;

    // Best-effort cleanup; a stale notice is not worth failing the cycle.
    if let Some(notice_id) = notice {
        if let Err(e) = bot.delete_message(chat_msg.chat_id, notice_id).await {
            warn!("Failed to delete thinking notice: {e}");
        }
    }

    if let Err(e) = bot
        .send_message(chat_msg.chat_id, &reply)
        .parse_mode(ParseMode::Markdown)
        .await
    {
        warn!("Failed to deliver reply: {e}");
    }

    Ok(())
}

/// The `/models` listing, built from the registry.
fn models_text() -> String {
    let mut text = String::from("*Available AI models (free):*\n");
    for model in models::SUPPORTED_MODELS {
        text.push_str(&format!("- {} ({})\n", model.id, model.label));
    }
    text.push_str("\nUse /model [model\\_name] to change the model in use.\n");
    text.push_str("Example: /model gemini-pro");
    text
}

/// The `/model <name>` reply. Mutates the preference store on success.
fn model_reply(state: &BotState, user: UserId, arg: &str) -> String {
    let Some(name) = arg.split_whitespace().next() else {
        return MODEL_USAGE.to_string();
    };

    match state.prefs.set(user, name) {
        Ok(()) => format!("AI model changed to: {name}"),
        Err(InvalidModel(rejected)) => format!(
            "Model '{rejected}' is not valid. Use /models to see the list of available models."
        ),
    }
}

/// Resolve the user's model, run one completion, and produce the final
/// reply text. Upstream failures become the generic failure notice.
async fn chat_reply(state: &BotState, msg: &ChatMessage) -> String {
    let model = state.prefs.get(msg.user_id);

    match state.completions.complete(model, &msg.text).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("Completion with model {model} failed: {e}");
            COMPLETION_FAILED.to_string()
        }
    }
}
