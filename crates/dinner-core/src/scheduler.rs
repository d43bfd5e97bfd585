//! Minute ticker that drives the weekly reset and the scheduled notifications.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use dinner_models::{NotificationRule, WeeklySlot};
use dinner_persistence::{Clock, ReplyStore};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::schedule::{due_rules, ResetPolicy};

/// How many minutes before the current one a late tick still evaluates.
pub const CATCH_UP_MINUTES: i64 = 5;

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub slot: WeeklySlot,
    /// The minute had already been evaluated; nothing ran.
    pub skipped: bool,
    /// Earlier minutes evaluated because the previous tick came late.
    pub caught_up: usize,
    /// Records cleared by the weekly reset, if it fired.
    pub reset: Option<usize>,
    pub sent: usize,
    pub failed: usize,
}

impl TickReport {
    fn new(slot: WeeklySlot) -> Self {
        Self {
            slot,
            skipped: false,
            caught_up: 0,
            reset: None,
            sent: 0,
            failed: 0,
        }
    }
}

/// Evaluates the configured rules once per wall-clock minute.
///
/// Ticks may arrive late or drift; every minute since the last evaluated
/// one (up to [`CATCH_UP_MINUTES`] back) is evaluated in order, so a rule is
/// not lost because no tick landed inside its minute.
pub struct Scheduler {
    store: Arc<dyn ReplyStore>,
    dispatcher: Dispatcher,
    rules: Vec<NotificationRule>,
    reset: ResetPolicy,
    clock: Arc<dyn Clock>,
    last_minute: Mutex<Option<i64>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn ReplyStore>,
        dispatcher: Dispatcher,
        rules: Vec<NotificationRule>,
        reset: ResetPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            rules,
            reset,
            clock,
            last_minute: Mutex::new(None),
        }
    }

    pub fn rules(&self) -> &[NotificationRule] {
        &self.rules
    }

    /// Runs one tick at the clock's current time.
    pub async fn tick(&self) -> TickReport {
        let now = self.clock.now();
        self.tick_at(now).await
    }

    /// Runs one tick as of `now`.
    ///
    /// Within each minute the reset runs before any notification, so a
    /// summary at the checkpoint sees the cleared store. A failure for one
    /// rule is logged and counted; the remaining rules still run.
    pub async fn tick_at(&self, now: DateTime<Tz>) -> TickReport {
        let slot = WeeklySlot::of(&now);
        let mut report = TickReport::new(slot);
        let current = now.timestamp().div_euclid(60);

        let Some(first) = self.claim_minutes(current) else {
            debug!(slot = %slot, "Minute already evaluated");
            report.skipped = true;
            return report;
        };

        let tz = now.timezone();
        for minute in first..=current {
            let Some(at) = tz.timestamp_opt(minute * 60, 0).single() else {
                continue;
            };
            if minute < current {
                debug!(slot = %WeeklySlot::of(&at), "Catching up missed minute");
                report.caught_up += 1;
            }
            self.run_minute(&at, &mut report).await;
        }

        if report.sent > 0 || report.failed > 0 || report.reset.is_some() {
            info!(
                slot = %slot,
                caught_up = report.caught_up,
                sent = report.sent,
                failed = report.failed,
                reset = ?report.reset,
                "Tick complete"
            );
        }
        report
    }

    async fn run_minute(&self, at: &DateTime<Tz>, report: &mut TickReport) {
        let slot = WeeklySlot::of(at);

        match self.apply_reset(slot).await {
            Ok(Some(cleared)) => report.reset = Some(report.reset.unwrap_or(0) + cleared),
            Ok(None) => {}
            Err(e) => warn!(slot = %slot, error = %e, "Weekly reset failed"),
        }

        let day = at.date_naive();
        for rule in due_rules(&self.rules, &slot) {
            match self.dispatcher.dispatch(rule, day).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        user_id = %rule.user_id,
                        kind = %rule.kind,
                        error = %e,
                        "Failed to send notification"
                    );
                }
            }
        }
    }

    /// Clears the store off the async workers; SQLite calls block.
    async fn apply_reset(&self, slot: WeeklySlot) -> crate::Result<Option<usize>> {
        if !self.reset.is_due(&slot) {
            return Ok(None);
        }
        let store = Arc::clone(&self.store);
        let policy = self.reset;
        tokio::task::spawn_blocking(move || policy.apply(store.as_ref(), &slot)).await?
    }

    /// Marks every minute up to `current` as evaluated and returns the first
    /// one still to run, or `None` if `current` already ran.
    fn claim_minutes(&self, current: i64) -> Option<i64> {
        let mut last = self.last_minute.lock().unwrap_or_else(|e| e.into_inner());
        let first = match *last {
            Some(prev) if prev >= current => return None,
            Some(prev) => (prev + 1).max(current - CATCH_UP_MINUTES),
            None => current,
        };
        *last = Some(current);
        Some(first)
    }
}
