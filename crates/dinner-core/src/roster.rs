//! Roster config provider: who the bot knows and when to notify them.
//!
//! The roster is a JSON file:
//!
//! ```json
//! {
//!   "users": [
//!     {
//!       "user_id": "123456789",
//!       "name": "Alice",
//!       "notification_times": [
//!         { "day": "monday", "hour": 16, "minute": 30, "type": "ask" },
//!         { "day": "monday", "hour": 18, "minute": 0, "type": "summary" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! A missing or malformed file never stops the bot; it yields an empty roster.

use std::fs;
use std::path::{Path, PathBuf};

use dinner_models::{parse_weekday, NotificationRule, RuleKind, UserId, WeeklySlot};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CoreError, Result};

/// Display name used when a user is neither in the roster nor named by the platform.
pub const UNKNOWN_USER: &str = "Unknown user";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RosterFile {
    #[serde(default)]
    users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserEntry {
    user_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    notification_times: Vec<NotificationTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NotificationTime {
    day: String,
    hour: u32,
    minute: u32,
    #[serde(rename = "type")]
    kind: String,
}

/// One configured user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterUser {
    pub user_id: UserId,
    pub name: String,
    pub rules: Vec<NotificationRule>,
}

/// Immutable snapshot of the roster file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    users: Vec<RosterUser>,
}

impl Roster {
    /// Parses roster JSON. Invalid notification entries are skipped with a
    /// warning; only a structurally invalid document is an error.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: RosterFile = serde_json::from_str(json).map_err(|e| CoreError::ConfigLoad {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        Ok(Self::from_file(file))
    }

    /// Reads and parses the roster at `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CoreError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| match e {
            CoreError::ConfigLoad { message, .. } => CoreError::ConfigLoad {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Loads the roster at `path`, degrading to an empty roster on any error.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!(path = %path.display(), "Roster file not found; no users configured");
            return Self::default();
        }
        match Self::read(path) {
            Ok(roster) => {
                info!(
                    path = %path.display(),
                    users = roster.users.len(),
                    rules = roster.rules().len(),
                    "Loaded roster"
                );
                roster
            }
            Err(e) => {
                warn!(error = %e, "Failed to load roster; continuing with no users");
                Self::default()
            }
        }
    }

    fn from_file(file: RosterFile) -> Self {
        let users = file
            .users
            .into_iter()
            .map(|entry| {
                let user_id = UserId::new(entry.user_id);
                let name = entry
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_USER.to_string());
                let rules = entry
                    .notification_times
                    .iter()
                    .filter_map(|time| match to_rule(&user_id, &name, time) {
                        Ok(rule) => Some(rule),
                        Err(e) => {
                            warn!(user_id = %user_id, error = %e, "Skipping invalid notification time");
                            None
                        }
                    })
                    .collect();
                RosterUser {
                    user_id,
                    name,
                    rules,
                }
            })
            .collect();
        Self { users }
    }

    pub fn users(&self) -> &[RosterUser] {
        &self.users
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Configured name for `user_id`, if the user is in the roster.
    pub fn display_name(&self, user_id: &UserId) -> Option<&str> {
        self.users
            .iter()
            .find(|u| &u.user_id == user_id)
            .map(|u| u.name.as_str())
    }

    /// All notification rules across users, in file order.
    pub fn rules(&self) -> Vec<NotificationRule> {
        self.users
            .iter()
            .flat_map(|u| u.rules.iter().cloned())
            .collect()
    }
}

fn to_rule(
    user_id: &UserId,
    name: &str,
    time: &NotificationTime,
) -> std::result::Result<NotificationRule, String> {
    let weekday = parse_weekday(&time.day)?;
    let slot = WeeklySlot::new(weekday, time.hour, time.minute)
        .ok_or_else(|| format!("time out of range: {:02}:{:02}", time.hour, time.minute))?;
    let kind: RuleKind = time.kind.parse()?;
    Ok(NotificationRule {
        user_id: user_id.clone(),
        display_name: name.to_string(),
        slot,
        kind,
    })
}

/// Picks the name stored with a reply: roster name, then the platform name,
/// then [`UNKNOWN_USER`].
pub fn resolve_display_name(
    roster: &Roster,
    user_id: &UserId,
    platform_name: Option<&str>,
) -> String {
    roster
        .display_name(user_id)
        .or_else(|| platform_name.map(str::trim).filter(|n| !n.is_empty()))
        .unwrap_or(UNKNOWN_USER)
        .to_string()
}

/// Source of the roster.
pub trait RosterProvider: Send + Sync {
    fn load(&self) -> Roster;
}

/// Reads the roster from a JSON file on each `load`.
#[derive(Debug, Clone)]
pub struct FileRosterProvider {
    path: PathBuf,
}

impl FileRosterProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RosterProvider for FileRosterProvider {
    fn load(&self) -> Roster {
        Roster::load(&self.path)
    }
}
