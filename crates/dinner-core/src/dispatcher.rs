//! Notification bodies and delivery.
//!
//! The dispatcher builds the ASK and SUMMARY texts and hands them to a
//! [`Notifier`]. It never writes to the store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dinner_models::{AggregateResult, NotificationRule, RuleKind, ScopeFilter, UserId};
use dinner_persistence::ReplyStore;
use tracing::info;

use crate::error::{DeliveryError, Result};

/// Tallies always cover every scope, for both on-demand queries and
/// scheduled summaries.
pub const TALLY_SCOPE: ScopeFilter = ScopeFilter::All;

/// Statistics keywords recognized in plain text.
pub const STATS_KEYWORDS: &[&str] = &["統計", "晚餐", "stats", "Stats"];

/// Push-style delivery to a single user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user_id: &UserId, text: &str) -> std::result::Result<(), DeliveryError>;
}

/// True if `text` asks for the current tally rather than being a reply.
pub fn is_stats_request(text: &str) -> bool {
    STATS_KEYWORDS.contains(&text.trim())
}

/// The reminder asking a user whether they want dinner on `day`.
pub fn ask_message(name: &str, day: NaiveDate) -> String {
    format!(
        "{}, are you having dinner today ({})? Reply \"yes\"/\"要\" or \"no\"/\"不要\".",
        name,
        day.format("%m/%d")
    )
}

/// The tally text used for summaries and statistics replies.
pub fn format_tally(result: &AggregateResult, day: NaiveDate) -> String {
    format!(
        "🍽 Dinner tally ({})\n✅ Having dinner ({}):\n{}\n\n❌ Skipping dinner ({}):\n{}",
        day.format("%m/%d"),
        result.affirmative_names.len(),
        name_list(&result.affirmative_names),
        result.negative_names.len(),
        name_list(&result.negative_names),
    )
}

fn name_list(names: &[String]) -> String {
    if names.is_empty() {
        return "(none)".to_string();
    }
    names
        .iter()
        .map(|name| format!("- {name}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Today's tally under the global aggregation policy.
pub fn current_tally(store: &dyn ReplyStore) -> Result<AggregateResult> {
    Ok(store.aggregate(&TALLY_SCOPE)?)
}

/// Sends the message for one fired rule.
pub struct Dispatcher {
    store: Arc<dyn ReplyStore>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn ReplyStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Builds the body for `rule` on `day`. The tally read runs on the
    /// blocking pool.
    pub async fn render(&self, rule: &NotificationRule, day: NaiveDate) -> Result<String> {
        match rule.kind {
            RuleKind::Ask => Ok(ask_message(&rule.display_name, day)),
            RuleKind::Summary => {
                let store = Arc::clone(&self.store);
                let tally =
                    tokio::task::spawn_blocking(move || current_tally(store.as_ref())).await??;
                Ok(format_tally(&tally, day))
            }
        }
    }

    /// Renders and delivers the message for `rule`.
    pub async fn dispatch(&self, rule: &NotificationRule, day: NaiveDate) -> Result<()> {
        let text = self.render(rule, day).await?;
        self.notifier.send(&rule.user_id, &text).await?;
        info!(
            user_id = %rule.user_id,
            name = %rule.display_name,
            kind = %rule.kind,
            "Notification sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc, Mutex};
    use std::time::Duration;

    use chrono::Weekday;
    use dinner_models::{ReplyRecord, ReplyValue, ScopeId, WeeklySlot};
    use dinner_persistence::{PersistenceError, UpdateOutcome};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_ask_message_mentions_name_and_date() {
        let text = ask_message("Alice", day());
        assert!(text.starts_with("Alice, "));
        assert!(text.contains("10/19"));
        assert!(text.contains("不要"));
    }

    #[test]
    fn test_format_tally() {
        let result = AggregateResult {
            affirmative_names: vec!["A".to_string(), "C".to_string()],
            negative_names: vec![],
        };
        let text = format_tally(&result, day());
        assert_eq!(
            text,
            "🍽 Dinner tally (10/19)\n✅ Having dinner (2):\n- A\n- C\n\n❌ Skipping dinner (0):\n(none)"
        );
    }

    #[test]
    fn test_stats_keywords() {
        assert!(is_stats_request("統計"));
        assert!(is_stats_request(" 晚餐 "));
        assert!(is_stats_request("stats"));
        assert!(!is_stats_request("yes"));
        assert!(!is_stats_request("statistics please"));
    }

    /// A store whose tally read waits for another task to open a gate.
    struct GatedStore {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl ReplyStore for GatedStore {
        fn insert(
            &self,
            _: &ScopeId,
            _: &UserId,
            _: &str,
            _: ReplyValue,
        ) -> dinner_persistence::Result<()> {
            unreachable!("dispatcher never writes")
        }
        fn exists_today(&self, _: &ScopeId, _: &UserId) -> dinner_persistence::Result<bool> {
            unreachable!("dispatcher never writes")
        }
        fn update_if_different(
            &self,
            _: &ScopeId,
            _: &UserId,
            _: ReplyValue,
        ) -> dinner_persistence::Result<UpdateOutcome> {
            unreachable!("dispatcher never writes")
        }
        fn aggregate(&self, _: &ScopeFilter) -> dinner_persistence::Result<AggregateResult> {
            let gate = self.gate.lock().unwrap();
            gate.recv_timeout(Duration::from_secs(2))
                .map_err(|_| PersistenceError::InvalidData("gate never opened".to_string()))?;
            Ok(AggregateResult {
                affirmative_names: vec!["A".to_string()],
                negative_names: vec![],
            })
        }
        fn clear_all(&self) -> dinner_persistence::Result<usize> {
            unreachable!("dispatcher never writes")
        }
        fn find_today(
            &self,
            _: &ScopeId,
            _: &UserId,
        ) -> dinner_persistence::Result<Option<ReplyRecord>> {
            Ok(None)
        }
        fn count(&self) -> dinner_persistence::Result<usize> {
            Ok(0)
        }
    }

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn send(&self, _: &UserId, _: &str) -> std::result::Result<(), DeliveryError> {
            Ok(())
        }
    }

    // Single-threaded runtime: if the tally read ran on the runtime thread,
    // the task opening the gate could never run.
    #[tokio::test(flavor = "current_thread")]
    async fn test_summary_tally_runs_off_the_runtime_thread() {
        let (open, gate) = mpsc::channel();
        let store = Arc::new(GatedStore {
            gate: Mutex::new(gate),
        });
        let dispatcher = Dispatcher::new(store, Arc::new(SilentNotifier));
        let rule = NotificationRule {
            user_id: UserId::from("u"),
            display_name: "U".to_string(),
            slot: WeeklySlot::new(Weekday::Mon, 18, 0).unwrap(),
            kind: RuleKind::Summary,
        };

        let opener = tokio::spawn(async move { open.send(()).unwrap() });
        let text = dispatcher.render(&rule, day()).await.unwrap();
        opener.await.unwrap();
        assert!(text.contains("Having dinner (1):\n- A"));
    }
}
