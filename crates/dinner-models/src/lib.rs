//! Core data models for the dinner bot.
//!
//! This crate provides the plain data types shared by the store, the
//! reconciliation engine and the Telegram front end: platform IDs, reply
//! records, aggregate rosters and weekly schedule rules.

pub mod aggregate;
pub mod ids;
pub mod reply;
pub mod schedule;

// Re-export main types
pub use aggregate::{aggregate_rows, AggregateResult};
pub use ids::{ScopeId, UserId};
pub use reply::{
    ReconcileStatus, ReplyRecord, ReplyValue, ScopeFilter, AFFIRMATIVE_TOKENS, NEGATIVE_TOKENS,
};
pub use schedule::{
    parse_weekday, weekday_name, NotificationRule, ResetRule, RuleKind, WeeklySlot,
};
