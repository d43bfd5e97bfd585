//! Push delivery through the Telegram Bot API.

use async_trait::async_trait;
use dinner_core::{DeliveryError, Notifier};
use dinner_models::UserId;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::debug;

/// Telegram user IDs double as private chat IDs, so a push to a user is a
/// message to the chat with the same ID.
pub fn chat_id_for(user_id: &UserId) -> Result<ChatId, DeliveryError> {
    user_id
        .as_str()
        .trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| DeliveryError::new(user_id, "not a Telegram chat id"))
}

/// Sends notifications as plain Telegram messages.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, user_id: &UserId, text: &str) -> Result<(), DeliveryError> {
        let chat_id = chat_id_for(user_id)?;
        self.bot
            .send_message(chat_id, text)
            .await
            .map_err(|e| DeliveryError::new(user_id, e.to_string()))?;
        debug!(chat_id = %chat_id, "Push message delivered");
        Ok(())
    }
}
