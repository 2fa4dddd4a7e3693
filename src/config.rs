use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub accept_timeout_minutes: i64,
    pub sweep_interval_seconds: u64,
    pub chat_api_url: String,
    pub chat_api_token: String,
    pub mail_api_url: String,
    pub admin_email: String,
    pub notify_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            accept_timeout_minutes: parse_or_default("ACCEPT_TIMEOUT_MINUTES", 60)?,
            sweep_interval_seconds: parse_or_default("SWEEP_INTERVAL_SECONDS", 300)?,
            chat_api_url: env::var("CHAT_API_URL")
                .unwrap_or_else(|_| "http://localhost:8090/v1/push".to_string()),
            chat_api_token: env::var("CHAT_API_TOKEN").unwrap_or_default(),
            mail_api_url: env::var("MAIL_API_URL")
                .unwrap_or_else(|_| "http://localhost:8025/api/send".to_string()),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "fleet-admin@example.gov".to_string()),
            notify_timeout_seconds: parse_or_default("NOTIFY_TIMEOUT_SECONDS", 10)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
