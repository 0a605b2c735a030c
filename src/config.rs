use std::fmt;

use url::Url;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required environment variable is absent or empty.
    Missing(&'static str),
    /// An environment variable is present but unusable.
    Invalid { name: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => {
                write!(f, "missing required environment variable '{}'", name)
            }
            Self::Invalid { name, reason } => {
                write!(f, "invalid value for '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// How updates are received from Telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Long polling against the Bot API. The default.
    Polling,
    /// Webhook HTTP server; Telegram pushes updates to `PUBLIC_URL`.
    Webhook,
}

pub struct Config {
    pub telegram_bot_token: String,
    pub openrouter_api_key: String,
    pub run_mode: RunMode,
    /// Deployment base URL. Required in webhook mode.
    pub public_url: Option<Url>,
    /// Port the webhook server binds to.
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source. Tests pass a map
    /// here instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2
            || token_parts[0].parse::<u64>().is_err()
            || token_parts[1].is_empty()
        {
            return Err(ConfigError::Invalid {
                name: "TELEGRAM_BOT_TOKEN",
                reason: "expected format: 123456789:ABCdefGHI...".to_string(),
            });
        }

        let openrouter_api_key = lookup("OPENROUTER_API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;

        let run_mode = match lookup("RUN_MODE") {
            None => RunMode::Polling,
            Some(value) => match value.to_lowercase().as_str() {
                "polling" => RunMode::Polling,
                "webhook" => RunMode::Webhook,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "RUN_MODE",
                        reason: format!("expected 'polling' or 'webhook', got '{other}'"),
                    });
                }
            },
        };

        let public_url = match lookup("PUBLIC_URL") {
            None => None,
            Some(value) => Some(Url::parse(&value).map_err(|e| ConfigError::Invalid {
                name: "PUBLIC_URL",
                reason: e.to_string(),
            })?),
        };

        if run_mode == RunMode::Webhook && public_url.is_none() {
            return Err(ConfigError::Missing("PUBLIC_URL"));
        }

        let port = match lookup("PORT") {
            None => 8080,
            Some(value) => value.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
        };

        Ok(Self {
            telegram_bot_token,
            openrouter_api_key,
            run_mode,
            public_url,
            port,
        })
    }
}
