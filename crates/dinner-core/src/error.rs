//! Error taxonomy for the reconciliation and notification engine.

use std::path::PathBuf;

use dinner_models::UserId;
use dinner_persistence::PersistenceError;
use thiserror::Error;

/// A push message could not be delivered to one user.
#[derive(Debug, Clone, Error)]
#[error("failed to deliver to {user_id}: {message}")]
pub struct DeliveryError {
    pub user_id: UserId,
    pub message: String,
}

impl DeliveryError {
    pub fn new(user_id: &UserId, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.clone(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the core engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Inbound text is not a yes/no token. Callers treat this as "not a reply".
    #[error("unrecognized reply: {0:?}")]
    UnrecognizedReply(String),

    /// The reply store failed.
    #[error("storage error: {0}")]
    Storage(#[from] PersistenceError),

    /// The record kept appearing and disappearing between insert and update.
    #[error("reply for {user_id} in {scope_id} could not be written: store kept changing")]
    WriteContended { scope_id: String, user_id: String },

    /// The notifier failed for one user.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// A blocking store call panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The roster file is missing or malformed.
    #[error("failed to load config {path}: {message}")]
    ConfigLoad { path: PathBuf, message: String },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
