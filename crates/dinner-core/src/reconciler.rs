//! Reconciliation of inbound replies against the reply store.
//!
//! One reply per (scope, user, day): the first reply creates the record, a
//! different later reply overwrites it, and a repeat of the stored value is a
//! no-op. Which scope a message belongs to is decided by a [`ScopeResolver`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dinner_models::{ReconcileStatus, ReplyValue, ScopeId, UserId};
use dinner_persistence::{PersistenceError, ReplyStore, UpdateOutcome};
use tracing::{debug, info};

use crate::error::{CoreError, Result};

/// A text message as delivered by the messaging gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReply {
    /// The chat the message arrived in (private chat or group).
    pub chat_id: String,
    pub user_id: UserId,
    pub display_name: String,
    pub text: String,
}

/// Chooses the scope a reply is tracked under.
pub trait ScopeResolver: Send + Sync {
    fn resolve_scope(&self, event: &InboundReply) -> ScopeId;
}

/// Built-in scope strategies, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeMode {
    /// Each user is their own scope, wherever they reply from.
    #[default]
    PerUser,
    /// Replies are tracked per chat, so one user may answer separately in
    /// several groups.
    PerChat,
}

impl ScopeResolver for ScopeMode {
    fn resolve_scope(&self, event: &InboundReply) -> ScopeId {
        match self {
            Self::PerUser => ScopeId::from(&event.user_id),
            Self::PerChat => ScopeId::from(event.chat_id.as_str()),
        }
    }
}

impl FromStr for ScopeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "per_user" => Ok(Self::PerUser),
            "chat" | "group" | "per_chat" => Ok(Self::PerChat),
            other => Err(format!("unknown scope mode: {other}")),
        }
    }
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerUser => f.write_str("user"),
            Self::PerChat => f.write_str("chat"),
        }
    }
}

/// Normalizes reply text, failing with [`CoreError::UnrecognizedReply`].
pub fn normalize_reply(text: &str) -> Result<ReplyValue> {
    ReplyValue::parse(text).ok_or_else(|| CoreError::UnrecognizedReply(text.trim().to_string()))
}

/// Insert/update round trips before giving up on a key that keeps flipping
/// between present and absent.
const MAX_WRITE_ATTEMPTS: usize = 4;

/// Decides insert vs update vs no-op for each inbound reply.
pub struct Reconciler {
    store: Arc<dyn ReplyStore>,
    resolver: Arc<dyn ScopeResolver>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ReplyStore>, resolver: Arc<dyn ScopeResolver>) -> Self {
        Self { store, resolver }
    }

    /// Applies one inbound message to the store.
    ///
    /// Unrecognized text leaves the store untouched and yields
    /// [`ReconcileStatus::Unrecognized`]. Storage failures propagate.
    pub fn reconcile(&self, event: &InboundReply) -> Result<ReconcileStatus> {
        let value = match normalize_reply(&event.text) {
            Ok(value) => value,
            Err(CoreError::UnrecognizedReply(text)) => {
                debug!(user_id = %event.user_id, text = %text, "Ignoring non-reply text");
                return Ok(ReconcileStatus::Unrecognized);
            }
            Err(e) => return Err(e),
        };

        let scope_id = self.resolver.resolve_scope(event);
        let user_id = &event.user_id;
        let status = self.store_value(&scope_id, user_id, &event.display_name, value)?;

        info!(
            scope_id = %scope_id,
            user_id = %user_id,
            name = %event.display_name,
            value = %value,
            status = %status,
            "Reply reconciled"
        );
        Ok(status)
    }

    /// Insert or update, following the store's answer when the existence
    /// check goes stale: a key inserted by another worker turns into an
    /// update, and a key that vanished (midnight rollover, weekly reset)
    /// turns into an insert for the new day.
    fn store_value(
        &self,
        scope_id: &ScopeId,
        user_id: &UserId,
        display_name: &str,
        value: ReplyValue,
    ) -> Result<ReconcileStatus> {
        let mut exists = self.store.exists_today(scope_id, user_id)?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            if exists {
                match self.store.update_if_different(scope_id, user_id, value)? {
                    UpdateOutcome::Updated => return Ok(ReconcileStatus::Updated),
                    UpdateOutcome::Unchanged => return Ok(ReconcileStatus::DuplicateIgnored),
                    UpdateOutcome::Missing => {
                        debug!(scope_id = %scope_id, user_id = %user_id, "Record gone before update; inserting");
                        exists = false;
                    }
                }
            } else {
                match self.store.insert(scope_id, user_id, display_name, value) {
                    Ok(()) => return Ok(ReconcileStatus::Created),
                    Err(PersistenceError::DuplicateKey { .. }) => {
                        debug!(scope_id = %scope_id, user_id = %user_id, "Insert raced; updating instead");
                        exists = true;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Err(CoreError::WriteContended {
            scope_id: scope_id.to_string(),
            user_id: user_id.to_string(),
        })
    }
}
