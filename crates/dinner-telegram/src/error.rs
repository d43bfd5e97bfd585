//! Error types for the Telegram front end.

use dinner_core::CoreError;
use dinner_persistence::PersistenceError;
use thiserror::Error;
use tokio::task::JoinError;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN environment variable.")]
    NoToken,

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Webhook registration failed.
    #[error("Failed to register webhook: {0}")]
    WebhookFailed(String),

    /// Reconciliation, storage or roster error.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

impl From<PersistenceError> for TelegramError {
    fn from(e: PersistenceError) -> Self {
        TelegramError::Core(CoreError::from(e))
    }
}

impl From<JoinError> for TelegramError {
    fn from(e: JoinError) -> Self {
        TelegramError::Core(CoreError::from(e))
    }
}
