//! Telegram front end for the dinner poll bot.
//!
//! Users answer "are you having dinner today?" in a private chat or a group.
//! Replies are reconciled into the reply store by `dinner-core`, and a
//! background ticker pushes the scheduled ASK and SUMMARY messages.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//!
//! Optional (see `dinner_core::config`):
//! - `DINNER_DB_PATH`, `DINNER_USERS_CONFIG`, `DINNER_TIMEZONE`,
//!   `DINNER_SCOPE_MODE`, `DINNER_RESET_AT`, `DINNER_TICK_SECS`,
//!   `DINNER_RUN_SCHEDULER`
//!
//! # Example
//!
//! ```no_run
//! use dinner_core::BotSettings;
//! use dinner_telegram::DinnerBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bot = DinnerBot::new(BotSettings::from_env())?;
//!     bot.start_polling().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Commands
//!
//! - `/start` - Welcome message and how to reply
//! - `/help` - Show available commands
//! - `/stats` - Today's tally

pub mod bot;
pub mod error;
pub mod handlers;
pub mod notifier;
pub mod state;

pub use bot::{run_ticker, DinnerBot, DEFAULT_WEBHOOK_PORT};
pub use error::{Result, TelegramError};
pub use handlers::{acknowledgement, welcome_text, Command};
pub use notifier::{chat_id_for, TelegramNotifier};
pub use state::BotState;
