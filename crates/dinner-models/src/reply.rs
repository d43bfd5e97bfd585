//! Reply types: the normalized yes/no value and the stored daily record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ScopeId, UserId};

/// Spellings accepted as "I want dinner".
pub const AFFIRMATIVE_TOKENS: &[&str] = &["要", "yes", "Yes", "YES", "y", "Y"];

/// Spellings accepted as "no dinner for me".
pub const NEGATIVE_TOKENS: &[&str] = &["不要", "no", "No", "NO", "n", "N"];

/// A normalized dinner reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyValue {
    /// The user wants dinner.
    Affirmative,
    /// The user skips dinner.
    Negative,
}

impl ReplyValue {
    /// Normalizes raw inbound text. Surrounding whitespace is ignored;
    /// the spelling itself must match one of the accepted tokens exactly.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if AFFIRMATIVE_TOKENS.contains(&text) {
            Some(Self::Affirmative)
        } else if NEGATIVE_TOKENS.contains(&text) {
            Some(Self::Negative)
        } else {
            None
        }
    }

    /// Canonical on-disk representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Affirmative => "yes",
            Self::Negative => "no",
        }
    }

    /// Reads a stored value. Older rows may hold the raw reply text, so
    /// every accepted spelling maps back to its enum value.
    pub fn from_stored(value: &str) -> Option<Self> {
        Self::parse(value)
    }
}

impl fmt::Display for ReplyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user's reply for one calendar day within one scope.
///
/// The natural key is `(scope_id, user_id, day)`; the store keeps at most
/// one record per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRecord {
    pub scope_id: ScopeId,
    pub user_id: UserId,
    pub display_name: String,
    pub value: ReplyValue,
    /// Calendar day in the store's timezone.
    pub day: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which records an aggregate query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeFilter {
    /// Every scope.
    All,
    /// A single group or private chat.
    Scope(ScopeId),
}

/// Outcome of reconciling one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    /// First reply of the day for this key.
    Created,
    /// An existing reply changed value.
    Updated,
    /// Same value as already stored; nothing written.
    DuplicateIgnored,
    /// Text was not a yes/no reply.
    Unrecognized,
}

impl fmt::Display for ReconcileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::DuplicateIgnored => "duplicate-ignored",
            Self::Unrecognized => "unrecognized",
        };
        f.write_str(label)
    }
}
