//! Command and message handlers for the Telegram bot.

use std::sync::Arc;

use dinner_core::is_stats_request;
use dinner_models::{ReconcileStatus, ReplyValue};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info};

use crate::state::BotState;

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and see how to reply")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Show today's dinner tally")]
    Stats,
}

/// Welcome text for /start.
pub fn welcome_text() -> String {
    "Welcome to the dinner poll! 🍽\n\n\
    Each day, tell me whether you are having dinner:\n\
    - \"yes\" or \"要\" if you are\n\
    - \"no\" or \"不要\" if you are not\n\n\
    You can change your answer any time today; the last one counts.\n\
    Send \"stats\", \"統計\" or \"晚餐\" (or /stats) to see who is coming.\n\n\
    Type /help for all commands."
        .to_string()
}

/// The confirmation sent back for a reply, if any. Repeats and non-replies
/// get no answer.
pub fn acknowledgement(status: ReconcileStatus, name: &str, text: &str) -> Option<String> {
    let value = ReplyValue::parse(text)?;
    let plan = match value {
        ReplyValue::Affirmative => "having dinner",
        ReplyValue::Negative => "skipping dinner",
    };
    match status {
        ReconcileStatus::Created => Some(format!("✅ Recorded: {name} is {plan} today.")),
        ReconcileStatus::Updated => Some(format!("🔄 Updated: {name} is now {plan} today.")),
        ReconcileStatus::DuplicateIgnored | ReconcileStatus::Unrecognized => None,
    }
}

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, welcome_text()).await?;
    info!(chat_id = %msg.chat.id, user = ?msg.from.as_ref().map(|u| &u.username), "User started bot");
    Ok(())
}

/// Handle the /help command.
pub async fn handle_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    let help_text = Command::descriptions().to_string();
    bot.send_message(msg.chat.id, help_text).await?;
    Ok(())
}

/// Handle the /stats command and the statistics keywords.
pub async fn handle_stats(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    match state.tally_text().await {
        Ok(text) => {
            bot.send_message(msg.chat.id, text).await?;
            info!(chat_id = %msg.chat.id, "Tally sent");
        }
        Err(e) => {
            error!(chat_id = %msg.chat.id, error = %e, "Failed to read tally");
            bot.send_message(msg.chat.id, "❌ Could not read today's tally. Please try again later.")
                .await?;
        }
    }
    Ok(())
}

/// Handle a plain text message: a statistics query or a yes/no reply.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if is_stats_request(text) {
        return handle_stats(bot, msg, state).await;
    }

    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };

    let full_name = user.full_name();
    let event = state.inbound(msg.chat.id.0, user.id.0, Some(full_name.as_str()), text);

    match state.record_reply(&event).await {
        Ok(status) => {
            if let Some(ack) = acknowledgement(status, &event.display_name, text) {
                bot.send_message(msg.chat.id, ack).await?;
            }
        }
        Err(e) => {
            // The sender gets no reply; the attempt is dropped.
            error!(
                chat_id = %msg.chat.id,
                user_id = %event.user_id,
                error = %e,
                "Failed to record reply"
            );
        }
    }

    Ok(())
}

/// Reply to `/`-prefixed text that is not a known command.
pub async fn handle_unknown_command(bot: Bot, msg: Message) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        let name = text.split_whitespace().next().unwrap_or(text);
        info!(cmd = %name, "Unrecognized command");
        bot.send_message(
            msg.chat.id,
            format!("Unknown command: {name}\n\nUse /help to see available commands."),
        )
        .await?;
    }
    Ok(())
}

/// Dispatch commands to appropriate handlers.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Stats => handle_stats(bot, msg, state).await,
    }
}
