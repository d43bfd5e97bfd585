//! Dinner Core - reply reconciliation and scheduled notifications.
//!
//! This crate holds the bot's behaviour independent of any chat platform:
//!
//! - **config**: State paths and runtime settings from the environment
//! - **reconciler**: Turns inbound yes/no replies into store writes
//! - **roster**: Users, display names and notification rules from JSON
//! - **schedule**: Minute-exact rule matching and the weekly reset
//! - **dispatcher**: ASK and SUMMARY bodies and the [`Notifier`] seam
//! - **scheduler**: The per-minute tick that ties the above together

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod reconciler;
pub mod roster;
pub mod schedule;
pub mod scheduler;

pub use config::{
    config_dir, db_dir, db_path, ensure_all_dirs, env_file, load_env_files, state_dir,
    tick_interval, users_config_file, BotSettings,
};
pub use dispatcher::{
    ask_message, current_tally, format_tally, is_stats_request, Dispatcher, Notifier,
    STATS_KEYWORDS, TALLY_SCOPE,
};
pub use error::{CoreError, DeliveryError, Result};
pub use reconciler::{normalize_reply, InboundReply, Reconciler, ScopeMode, ScopeResolver};
pub use roster::{resolve_display_name, FileRosterProvider, Roster, RosterProvider, RosterUser, UNKNOWN_USER};
pub use schedule::{due_rules, ResetPolicy};
pub use scheduler::{Scheduler, TickReport, CATCH_UP_MINUTES};
