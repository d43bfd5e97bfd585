//! Schedule matching and the weekly reset policy.
//!
//! Matching is exact to the minute: a rule fires only in the one minute whose
//! weekday, hour and minute equal its own. The [`Scheduler`](crate::Scheduler)
//! makes sure each minute is evaluated even when its ticks drift.

use dinner_models::{NotificationRule, ResetRule, WeeklySlot};
use dinner_persistence::ReplyStore;
use tracing::info;

use crate::error::Result;

/// Rules that fire in `slot`, in configuration order.
pub fn due_rules<'a>(rules: &'a [NotificationRule], slot: &WeeklySlot) -> Vec<&'a NotificationRule> {
    rules.iter().filter(|rule| rule.matches(slot)).collect()
}

/// Clears all replies at the weekly checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetPolicy {
    rule: ResetRule,
}

impl ResetPolicy {
    pub fn new(rule: ResetRule) -> Self {
        Self { rule }
    }

    pub fn checkpoint(&self) -> WeeklySlot {
        self.rule.slot
    }

    pub fn is_due(&self, slot: &WeeklySlot) -> bool {
        self.rule.matches(slot)
    }

    /// Clears the store if `slot` is the checkpoint. Returns the number of
    /// records removed, or `None` when not due. Safe to repeat in the same
    /// minute: clearing an empty store removes nothing.
    pub fn apply(&self, store: &dyn ReplyStore, slot: &WeeklySlot) -> Result<Option<usize>> {
        if !self.is_due(slot) {
            return Ok(None);
        }
        let removed = store.clear_all()?;
        info!(checkpoint = %self.rule.slot, removed, "Weekly reset applied");
        Ok(Some(removed))
    }
}
