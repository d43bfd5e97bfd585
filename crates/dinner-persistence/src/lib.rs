//! Persistence layer for the dinner bot.
//!
//! This crate owns the only durable state in the system: one reply per
//! (scope, user, calendar day), kept in SQLite. "Today" is decided by a
//! [`Clock`] in the bot's configured timezone.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dinner_models::{ReplyValue, ScopeFilter, ScopeId, UserId};
//! use dinner_persistence::{ReplyStore, SqliteReplyStore, SystemClock};
//!
//! let clock = Arc::new(SystemClock::new(chrono_tz::Asia::Taipei));
//! let store = SqliteReplyStore::open("/tmp/replies.db", clock).unwrap();
//!
//! let (scope, user) = (ScopeId::from("group-1"), UserId::from("42"));
//! if !store.exists_today(&scope, &user).unwrap() {
//!     store.insert(&scope, &user, "Alice", ReplyValue::Affirmative).unwrap();
//! }
//! let tally = store.aggregate(&ScopeFilter::All).unwrap();
//! ```

pub mod clock;
pub mod error;
pub mod reply_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PersistenceError, Result};
pub use reply_store::{ReplyStore, SqliteReplyStore, UpdateOutcome};
