//! Shared state for the Telegram bot.

use std::sync::Arc;

use dinner_core::{
    current_tally, format_tally, resolve_display_name, BotSettings, Dispatcher, FileRosterProvider,
    InboundReply, Notifier, Reconciler, ResetPolicy, Roster, RosterProvider, Scheduler,
};
use dinner_models::{ReconcileStatus, UserId};
use dinner_persistence::{Clock, ReplyStore, SqliteReplyStore, SystemClock};
use tokio::task::spawn_blocking;
use tracing::info;

use crate::error::Result;

/// Everything the handlers and the ticker share.
pub struct BotState {
    settings: BotSettings,
    clock: Arc<dyn Clock>,
    store: Arc<dyn ReplyStore>,
    roster: Roster,
    reconciler: Arc<Reconciler>,
}

impl BotState {
    /// Opens the reply store and loads the roster named by `settings`, using
    /// the wall clock in the configured timezone.
    pub fn open(settings: BotSettings) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(settings.timezone));
        Self::with_clock(settings, clock)
    }

    /// Like [`BotState::open`], with an explicit clock.
    pub fn with_clock(settings: BotSettings, clock: Arc<dyn Clock>) -> Result<Self> {
        let store: Arc<dyn ReplyStore> =
            Arc::new(SqliteReplyStore::open(&settings.db_path, Arc::clone(&clock))?);
        let roster = FileRosterProvider::new(&settings.users_config).load();
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store),
            Arc::new(settings.scope_mode),
        ));

        info!(
            db = %settings.db_path.display(),
            users = roster.users().len(),
            timezone = %settings.timezone,
            scope_mode = %settings.scope_mode,
            "Bot state ready"
        );

        Ok(Self {
            settings,
            clock,
            store,
            roster,
            reconciler,
        })
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn store(&self) -> Arc<dyn ReplyStore> {
        Arc::clone(&self.store)
    }

    /// Builds the reply event for a text message, resolving the stored name.
    pub fn inbound(
        &self,
        chat_id: i64,
        user_id: u64,
        platform_name: Option<&str>,
        text: &str,
    ) -> InboundReply {
        let user_id = UserId::from(user_id.to_string());
        let display_name = resolve_display_name(&self.roster, &user_id, platform_name);
        InboundReply {
            chat_id: chat_id.to_string(),
            user_id,
            display_name,
            text: text.to_string(),
        }
    }

    /// Applies one reply to the store. SQLite calls block, so the work runs
    /// on tokio's blocking pool rather than on a handler's worker thread.
    pub async fn record_reply(&self, event: &InboundReply) -> Result<ReconcileStatus> {
        let reconciler = Arc::clone(&self.reconciler);
        let event = event.clone();
        let status = spawn_blocking(move || reconciler.reconcile(&event)).await??;
        Ok(status)
    }

    /// Today's tally, formatted for a chat reply.
    pub async fn tally_text(&self) -> Result<String> {
        let store = Arc::clone(&self.store);
        let tally = spawn_blocking(move || current_tally(store.as_ref())).await??;
        Ok(format_tally(&tally, self.clock.today()))
    }

    /// Builds the scheduler for the roster's rules, delivering through `notifier`.
    pub fn scheduler(&self, notifier: Arc<dyn Notifier>) -> Scheduler {
        Scheduler::new(
            Arc::clone(&self.store),
            Dispatcher::new(Arc::clone(&self.store), notifier),
            self.roster.rules(),
            ResetPolicy::new(self.settings.reset),
            Arc::clone(&self.clock),
        )
    }
}
