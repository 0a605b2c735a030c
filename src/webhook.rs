//! Webhook runtime: Telegram callback listener plus service routes.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use teloxide::prelude::*;
use teloxide::update_listeners::UpdateListener;
use teloxide::update_listeners::webhooks::{self, Options};
use tokio::net::TcpListener;
use tracing::{error, info};
use url::Url;

use crate::config::Config;

/// Path Telegram posts updates to, under the configured public URL.
pub const WEBHOOK_PATH: &str = "/webhook";

#[derive(Clone)]
struct ServiceState {
    bot: Bot,
    webhook_url: Url,
}

/// Build the webhook update listener and start the HTTP server backing it.
///
/// The server handles the Telegram callback path plus `/health` and
/// `/set-webhook`, and shuts down when the listener stops. Registering the
/// webhook with Telegram happens on startup; `/set-webhook` re-runs it on
/// demand.
pub async fn listener(
    bot: Bot,
    config: &Config,
) -> Result<impl UpdateListener<Err = Infallible>, Box<dyn std::error::Error + Send + Sync>> {
    let public_url = config
        .public_url
        .as_ref()
        .ok_or("webhook mode requires PUBLIC_URL")?;
    let webhook_url = public_url.join(WEBHOOK_PATH)?;
    let address = SocketAddr::from(([0, 0, 0, 0], config.port));

    let (listener, stop_flag, router) =
        webhooks::axum_to_router(bot.clone(), Options::new(address, webhook_url.clone())).await?;

    let app = router.merge(service_routes(bot, webhook_url.clone()));

    let tcp_listener = TcpListener::bind(address).await?;
    info!("Webhook server listening on {address}");
    info!("  {}          - Telegram callback", WEBHOOK_PATH);
    info!("  /health           - Health check");
    info!("  /set-webhook      - Re-register the webhook with Telegram");
    info!("Webhook registered at {webhook_url}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(tcp_listener, app)
            .with_graceful_shutdown(stop_flag)
            .await
        {
            error!("Webhook server error: {e}");
        }
    });

    Ok(listener)
}

fn service_routes(bot: Bot, webhook_url: Url) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/set-webhook", get(register_webhook))
        .with_state(ServiceState { bot, webhook_url })
}

async fn health() -> &'static str {
    "OK"
}

async fn register_webhook(State(state): State<ServiceState>) -> (StatusCode, String) {
    match state.bot.set_webhook(state.webhook_url.clone()).await {
        Ok(_) => {
            info!("Webhook re-registered at {}", state.webhook_url);
            (
                StatusCode::OK,
                format!("Webhook set to: {}", state.webhook_url),
            )
        }
        Err(e) => {
            error!("Failed to set webhook: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to set webhook: {e}"),
            )
        }
    }
}
