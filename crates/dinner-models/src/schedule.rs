//! Weekly schedule types: per-user notification rules and the reset checkpoint.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::UserId;

/// What a notification rule sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Remind the user to reply for today.
    Ask,
    /// Push the current tally.
    Summary,
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" => Ok(Self::Ask),
            "summary" => Ok(Self::Summary),
            other => Err(format!("unknown notification type: {other}")),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ask => f.write_str("ask"),
            Self::Summary => f.write_str("summary"),
        }
    }
}

/// A wall-clock minute within the week. Matching is done at this granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeeklySlot {
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
}

impl WeeklySlot {
    /// Builds a slot, rejecting out-of-range hours and minutes.
    pub fn new(weekday: Weekday, hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self {
            weekday,
            hour,
            minute,
        })
    }

    /// The slot containing `at`, in `at`'s own timezone.
    pub fn of<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self {
            weekday: at.weekday(),
            hour: at.hour(),
            minute: at.minute(),
        }
    }
}

impl fmt::Display for WeeklySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:{:02}",
            weekday_name(self.weekday),
            self.hour,
            self.minute
        )
    }
}

impl FromStr for WeeklySlot {
    type Err = String;

    /// Parses `"<weekday> HH:MM"`, e.g. `"monday 00:00"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day, time) = s
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("expected '<weekday> HH:MM', got '{s}'"))?;
        let weekday = parse_weekday(day)?;
        let (hour, minute) = time
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got '{time}'"))?;
        let hour: u32 = hour.parse().map_err(|_| format!("invalid hour '{hour}'"))?;
        let minute: u32 = minute
            .parse()
            .map_err(|_| format!("invalid minute '{minute}'"))?;
        Self::new(weekday, hour, minute).ok_or_else(|| format!("time out of range: '{time}'"))
    }
}

/// Parses an English weekday name, full or abbreviated, in any case.
pub fn parse_weekday(s: &str) -> Result<Weekday, String> {
    Weekday::from_str(s.trim()).map_err(|_| format!("unknown weekday: {s}"))
}

/// Lowercase full weekday name, as used in the roster file.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// A per-user push rule. Immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRule {
    pub user_id: UserId,
    pub display_name: String,
    pub slot: WeeklySlot,
    pub kind: RuleKind,
}

impl NotificationRule {
    /// True iff this rule fires in `slot`.
    pub fn matches(&self, slot: &WeeklySlot) -> bool {
        self.slot == *slot
    }
}

/// The weekly checkpoint at which all replies are cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetRule {
    pub slot: WeeklySlot,
}

impl ResetRule {
    pub fn new(slot: WeeklySlot) -> Self {
        Self { slot }
    }

    pub fn matches(&self, slot: &WeeklySlot) -> bool {
        self.slot == *slot
    }
}

impl Default for ResetRule {
    /// Monday 00:00 starts a fresh week.
    fn default() -> Self {
        Self {
            slot: WeeklySlot {
                weekday: Weekday::Mon,
                hour: 0,
                minute: 0,
            },
        }
    }
}
