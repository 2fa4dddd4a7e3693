mod api;
mod config;
mod engine;
mod error;
mod models;
mod notify;
mod observability;
mod state;
mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::notify::chat::BotApiChat;
use crate::notify::mail::HttpMailer;
use crate::notify::Notifier;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let notify_timeout = Duration::from_secs(config.notify_timeout_seconds);
    let notifier = Notifier::new(
        Arc::new(BotApiChat::new(
            config.chat_api_url.clone(),
            config.chat_api_token.clone(),
            notify_timeout,
        )),
        Arc::new(HttpMailer::new(config.mail_api_url.clone(), notify_timeout)),
        config.admin_email.clone(),
    );

    let shared_state = Arc::new(state::AppState::new(
        notifier,
        config.accept_timeout_minutes,
        config.event_buffer_size,
    ));

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::sweeper::run_sweeper(
        shared_state.clone(),
        Duration::from_secs(config.sweep_interval_seconds),
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
