use crate::telegram::TelegramError;
use thiserror::Error;
use traffic_core::{ErrorKind, UpstreamError};

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Messaging error: {0}")]
    Telegram(#[from] TelegramError),
    #[error("Camera upstream error: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),
}

impl BotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BotError::Telegram(e) => e.kind(),
            BotError::Upstream(e) => e.kind(),
            BotError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}
