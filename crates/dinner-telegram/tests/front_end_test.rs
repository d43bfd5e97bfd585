//! Tests for the Telegram-facing helpers that do not need the Bot API.

use std::sync::Arc;

use chrono::TimeZone;
use chrono_tz::Asia::Taipei;
use dinner_core::BotSettings;
use dinner_models::{ReconcileStatus, UserId};
use dinner_persistence::ManualClock;
use dinner_telegram::{acknowledgement, chat_id_for, BotState};
use tempfile::TempDir;

fn state_with_roster(roster: &str) -> (TempDir, BotState) {
    let dir = tempfile::tempdir().unwrap();
    let users = dir.path().join("users_config.json");
    std::fs::write(&users, roster).unwrap();
    let settings = BotSettings::default().with_paths(dir.path().join("replies.db"), &users);
    let clock = Arc::new(ManualClock::new(
        Taipei.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
    ));
    let state = BotState::with_clock(settings, clock).unwrap();
    (dir, state)
}

#[tokio::test]
async fn test_reply_flow_with_acknowledgements() {
    let (_dir, state) = state_with_roster(r#"{"users": [{"user_id": "1", "name": "Alice"}]}"#);

    let first = state.inbound(1, 1, Some("alice_tg"), "yes");
    let status = state.record_reply(&first).await.unwrap();
    assert_eq!(status, ReconcileStatus::Created);
    assert_eq!(
        acknowledgement(status, &first.display_name, &first.text).as_deref(),
        Some("✅ Recorded: Alice is having dinner today.")
    );

    let repeat = state.inbound(1, 1, Some("alice_tg"), "Y");
    let status = state.record_reply(&repeat).await.unwrap();
    assert_eq!(status, ReconcileStatus::DuplicateIgnored);
    assert_eq!(acknowledgement(status, &repeat.display_name, &repeat.text), None);

    let change = state.inbound(1, 1, Some("alice_tg"), "不要");
    assert_eq!(state.record_reply(&change).await.unwrap(), ReconcileStatus::Updated);

    let tally = state.tally_text().await.unwrap();
    assert!(tally.contains("Skipping dinner (1):\n- Alice"));
}

#[tokio::test]
async fn test_missing_roster_still_records_replies() {
    let dir = tempfile::tempdir().unwrap();
    let settings = BotSettings::default().with_paths(
        dir.path().join("replies.db"),
        dir.path().join("absent.json"),
    );
    let clock = Arc::new(ManualClock::new(
        Taipei.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
    ));
    let state = BotState::with_clock(settings, clock).unwrap();
    assert!(state.roster().is_empty());

    let event = state.inbound(5, 5, None, "no");
    assert_eq!(event.display_name, "Unknown user");
    assert_eq!(state.record_reply(&event).await.unwrap(), ReconcileStatus::Created);
}

#[test]
fn test_notification_targets_are_chat_ids() {
    assert_eq!(chat_id_for(&UserId::from("987654321")).unwrap().0, 987654321);
    assert!(chat_id_for(&UserId::from("alice")).is_err());
}
