//! Main Telegram bot implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dinner_core::{BotSettings, Scheduler};
use teloxide::dispatching::{DefaultKey, UpdateFilterExt, UpdateHandler};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use teloxide::RequestError;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Result, TelegramError};
use crate::handlers::{handle_command, handle_message, handle_unknown_command, Command};
use crate::notifier::TelegramNotifier;
use crate::state::BotState;

/// Default webhook port.
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;

/// The dinner poll bot.
pub struct DinnerBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Shared state across handlers.
    state: Arc<BotState>,
}

impl DinnerBot {
    /// Create a bot from settings.
    ///
    /// Requires `TELEGRAM_BOT_TOKEN` environment variable to be set.
    pub fn new(settings: BotSettings) -> Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| TelegramError::NoToken)?;
        let state = Arc::new(BotState::open(settings)?);
        Ok(Self::with_state(Bot::new(token), state))
    }

    /// Create a bot around existing state.
    pub fn with_state(bot: Bot, state: Arc<BotState>) -> Self {
        Self { bot, state }
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Start the bot in long-polling mode.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting dinner bot in polling mode...");
        let ticker = self.spawn_ticker();

        self.dispatcher().dispatch().await;

        if let Some(ticker) = ticker {
            ticker.abort();
        }
        Ok(())
    }

    /// Start the bot behind a webhook served on `port`, registered at `url`.
    pub async fn start_webhook(&self, url: Url, port: u16) -> Result<()> {
        info!(url = %url, port, "Starting dinner bot in webhook mode...");

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = webhooks::axum(self.bot.clone(), webhooks::Options::new(addr, url))
            .await
            .map_err(|e| TelegramError::WebhookFailed(e.to_string()))?;

        let ticker = self.spawn_ticker();

        self.dispatcher()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;

        if let Some(ticker) = ticker {
            ticker.abort();
        }
        Ok(())
    }

    fn dispatcher(&self) -> Dispatcher<Bot, RequestError, DefaultKey> {
        Dispatcher::builder(self.bot.clone(), schema(Arc::clone(&self.state)))
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd.kind);
            })
            .enable_ctrlc_handler()
            .build()
    }

    /// Spawn the minute ticker, unless this process is configured not to
    /// send scheduled notifications.
    fn spawn_ticker(&self) -> Option<JoinHandle<()>> {
        let settings = self.state.settings();
        if !settings.run_scheduler {
            info!("Scheduler disabled for this process");
            return None;
        }

        let notifier = Arc::new(TelegramNotifier::new(self.bot.clone()));
        let scheduler = self.state.scheduler(notifier);
        info!(
            rules = scheduler.rules().len(),
            tick_secs = settings.tick.as_secs(),
            reset = %settings.reset.slot,
            "Scheduler started"
        );
        let period = settings.tick;
        Some(tokio::spawn(async move {
            run_ticker(scheduler, period).await;
        }))
    }
}

/// Update routing: commands, unknown commands, then plain text.
fn schema(state: Arc<BotState>) -> UpdateHandler<RequestError> {
    let state_for_commands = Arc::clone(&state);
    let state_for_messages = Arc::clone(&state);

    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                    let state = Arc::clone(&state_for_commands);
                    debug!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                    async move { handle_command(bot, msg, cmd, state).await }
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some_and(|t| t.starts_with('/')))
                .endpoint(handle_unknown_command),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some_and(|t| !t.starts_with('/')))
                .endpoint(move |bot: Bot, msg: Message| {
                    let state = Arc::clone(&state_for_messages);
                    debug!(chat_id = %msg.chat.id, text = ?msg.text(), "Text message received");
                    async move { handle_message(bot, msg, state).await }
                }),
        )
}

/// Ticks the scheduler forever. A tick never fails; per-rule errors are
/// logged inside [`Scheduler::tick`].
pub async fn run_ticker(scheduler: Scheduler, period: Duration) {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;
        let report = scheduler.tick().await;
        if report.failed > 0 {
            warn!(slot = %report.slot, failed = report.failed, "Some notifications failed");
        } else {
            debug!(slot = %report.slot, skipped = report.skipped, caught_up = report.caught_up, "Tick");
        }
    }
}
