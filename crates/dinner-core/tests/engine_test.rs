//! End-to-end tests: replies in, ticks forward, messages out.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Weekday};
use chrono_tz::{Asia::Taipei, Tz};
use dinner_core::{
    DeliveryError, Dispatcher, InboundReply, Notifier, Reconciler, ResetPolicy, Roster, Scheduler,
    ScopeMode,
};
use dinner_models::{ReconcileStatus, ReplyValue, ScopeFilter, ScopeId, UserId, WeeklySlot};
use dinner_persistence::{ManualClock, ReplyStore, SqliteReplyStore};
use tempfile::TempDir;

/// Captures sends; fails for users listed in `failing`.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failing: HashSet<String>,
}

impl RecordingNotifier {
    fn failing_for(users: &[&str]) -> Self {
        Self {
            sent: Mutex::default(),
            failing: users.iter().map(|u| u.to_string()).collect(),
        }
    }

    fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, user_id: &UserId, text: &str) -> Result<(), DeliveryError> {
        if self.failing.contains(user_id.as_str()) {
            return Err(DeliveryError::new(user_id, "blocked by user"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        Ok(())
    }
}

const ROSTER: &str = r#"{
    "users": [
        {"user_id": "100", "name": "Alice", "notification_times": [
            {"day": "monday", "hour": 16, "minute": 30, "type": "ask"}
        ]},
        {"user_id": "200", "name": "Bob", "notification_times": [
            {"day": "monday", "hour": 16, "minute": 30, "type": "ask"}
        ]},
        {"user_id": "300", "name": "Carol", "notification_times": [
            {"day": "monday", "hour": 16, "minute": 30, "type": "ask"},
            {"day": "monday", "hour": 18, "minute": 0, "type": "summary"},
            {"day": "monday", "hour": 0, "minute": 0, "type": "summary"}
        ]}
    ]
}"#;

struct Harness {
    _dir: TempDir,
    clock: Arc<ManualClock>,
    store: Arc<SqliteReplyStore>,
    notifier: Arc<RecordingNotifier>,
    reconciler: Reconciler,
    scheduler: Scheduler,
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Tz> {
    Taipei.with_ymd_and_hms(2026, 10, day, hour, minute, 0).unwrap()
}

fn harness(notifier: RecordingNotifier) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    // Monday 2026-10-19, 09:00.
    let clock = Arc::new(ManualClock::new(at(19, 9, 0)));
    let store = Arc::new(SqliteReplyStore::open(dir.path().join("replies.db"), clock.clone()).unwrap());
    let notifier = Arc::new(notifier);
    let roster = Roster::from_json(ROSTER).unwrap();

    let reconciler = Reconciler::new(store.clone(), Arc::new(ScopeMode::PerUser));
    let dispatcher = Dispatcher::new(store.clone(), notifier.clone());
    let scheduler = Scheduler::new(
        store.clone(),
        dispatcher,
        roster.rules(),
        ResetPolicy::default(),
        clock.clone(),
    );
    Harness {
        _dir: dir,
        clock,
        store,
        notifier,
        reconciler,
        scheduler,
    }
}

fn reply(user: &str, name: &str, text: &str) -> InboundReply {
    InboundReply {
        chat_id: user.to_string(),
        user_id: UserId::from(user),
        display_name: name.to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_replies_then_summary() {
    let h = harness(RecordingNotifier::default());

    assert_eq!(
        h.reconciler.reconcile(&reply("100", "Alice", "要")).unwrap(),
        ReconcileStatus::Created
    );
    assert_eq!(
        h.reconciler.reconcile(&reply("200", "Bob", "no")).unwrap(),
        ReconcileStatus::Created
    );
    assert_eq!(
        h.reconciler.reconcile(&reply("300", "Carol", "yes")).unwrap(),
        ReconcileStatus::Created
    );
    assert_eq!(
        h.reconciler.reconcile(&reply("200", "Bob", "Y")).unwrap(),
        ReconcileStatus::Updated
    );
    assert_eq!(
        h.reconciler.reconcile(&reply("100", "Alice", "hello")).unwrap(),
        ReconcileStatus::Unrecognized
    );

    let tally = h.store.aggregate(&ScopeFilter::All).unwrap();
    assert_eq!(tally.affirmative_names, vec!["Alice", "Bob", "Carol"]);
    assert!(tally.negative_names.is_empty());

    let report = h.scheduler.tick_at(at(19, 18, 0)).await;
    assert_eq!(report.sent, 1);
    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "300");
    assert!(messages[0].1.contains("Having dinner (3)"));
    assert!(messages[0].1.contains("- Bob"));
}

#[tokio::test]
async fn test_ask_fires_only_at_its_minute() {
    let h = harness(RecordingNotifier::default());

    for minute in [28, 29] {
        let report = h.scheduler.tick_at(at(19, 16, minute)).await;
        assert_eq!(report.sent, 0, "minute {minute}");
    }
    assert!(h.notifier.messages().is_empty());

    let report = h.scheduler.tick_at(at(19, 16, 30)).await;
    assert_eq!(report.slot, WeeklySlot::new(Weekday::Mon, 16, 30).unwrap());
    assert_eq!(report.sent, 3);
    let users: Vec<String> = h.notifier.messages().into_iter().map(|(u, _)| u).collect();
    assert_eq!(users, vec!["100", "200", "300"]);
    assert!(h.notifier.messages()[0].1.starts_with("Alice, "));

    for minute in [31, 32] {
        let report = h.scheduler.tick_at(at(19, 16, minute)).await;
        assert_eq!(report.sent, 0, "minute {minute}");
    }
    // Tuesday at the same time is a different slot.
    assert_eq!(h.scheduler.tick_at(at(20, 16, 30)).await.sent, 0);
    assert_eq!(h.notifier.messages().len(), 3);
}

#[tokio::test]
async fn test_late_tick_still_sends_asks() {
    let h = harness(RecordingNotifier::default());
    h.clock.set(at(19, 16, 29) + chrono::Duration::seconds(30));
    assert_eq!(h.scheduler.tick().await.sent, 0);

    // The ticker stalled past 16:30 entirely.
    h.clock.advance(chrono::Duration::seconds(100));
    let report = h.scheduler.tick().await;
    assert_eq!(report.slot, WeeklySlot::new(Weekday::Mon, 16, 31).unwrap());
    assert_eq!(report.caught_up, 1);
    assert_eq!(report.sent, 3);
    assert!(h.notifier.messages()[0].1.contains("10/19"));
}

#[tokio::test]
async fn test_failed_delivery_does_not_stop_others() {
    let h = harness(RecordingNotifier::failing_for(&["200"]));

    let report = h.scheduler.tick_at(at(19, 16, 30)).await;
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 1);
    let users: Vec<String> = h.notifier.messages().into_iter().map(|(u, _)| u).collect();
    assert_eq!(users, vec!["100", "300"]);
}

#[tokio::test]
async fn test_minute_guard_prevents_double_send() {
    let h = harness(RecordingNotifier::default());
    h.clock.set(at(19, 16, 30));

    assert_eq!(h.scheduler.tick().await.sent, 3);
    h.clock.advance(chrono::Duration::seconds(30));
    assert!(h.scheduler.tick().await.skipped);
    h.clock.advance(chrono::Duration::seconds(30));
    let next = h.scheduler.tick().await;
    assert!(!next.skipped);
    assert_eq!(next.sent, 0);
    assert_eq!(h.notifier.messages().len(), 3);
}

#[tokio::test]
async fn test_weekly_reset_runs_before_summary() {
    let h = harness(RecordingNotifier::default());
    // Replies from Sunday evening.
    h.clock.set(at(18, 20, 0));
    h.reconciler.reconcile(&reply("100", "Alice", "yes")).unwrap();
    h.reconciler.reconcile(&reply("200", "Bob", "不要")).unwrap();
    assert_eq!(h.store.count().unwrap(), 2);

    // Monday 00:00 is both the reset checkpoint and one of Carol's summaries.
    h.clock.set(at(19, 0, 0));
    let report = h.scheduler.tick().await;
    assert_eq!(report.reset, Some(2));
    assert_eq!(h.store.count().unwrap(), 0);

    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("Having dinner (0)"));
    assert!(messages[0].1.contains("Skipping dinner (0)"));
}

#[tokio::test]
async fn test_new_day_starts_fresh_without_reset() {
    let h = harness(RecordingNotifier::default());
    h.reconciler.reconcile(&reply("100", "Alice", "yes")).unwrap();

    h.clock.set(at(20, 9, 0));
    assert!(h.store.aggregate(&ScopeFilter::All).unwrap().is_empty());
    assert_eq!(
        h.reconciler.reconcile(&reply("100", "Alice", "yes")).unwrap(),
        ReconcileStatus::Created
    );
    // Yesterday's row is still stored until the weekly reset.
    assert_eq!(h.store.count().unwrap(), 2);

    let today = h
        .store
        .find_today(&ScopeId::from("100"), &UserId::from("100"))
        .unwrap()
        .unwrap();
    assert_eq!(today.value, ReplyValue::Affirmative);
    assert_eq!(today.day, at(20, 9, 0).date_naive());
}
