//! Aggregation of raw reply rows into yes/no rosters.

use serde::{Deserialize, Serialize};

use crate::reply::ReplyValue;

/// Display names partitioned by reply. Derived on every query, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub affirmative_names: Vec<String>,
    pub negative_names: Vec<String>,
}

impl AggregateResult {
    /// Returns true if nobody has replied.
    pub fn is_empty(&self) -> bool {
        self.affirmative_names.is_empty() && self.negative_names.is_empty()
    }

    /// Total number of counted replies.
    pub fn total(&self) -> usize {
        self.affirmative_names.len() + self.negative_names.len()
    }
}

/// Partitions `(display_name, stored_value)` rows, keeping row order.
///
/// Rows whose stored value is not a known token land in neither list.
pub fn aggregate_rows<I, N, V>(rows: I) -> AggregateResult
where
    I: IntoIterator<Item = (N, V)>,
    N: Into<String>,
    V: AsRef<str>,
{
    let mut result = AggregateResult::default();
    for (name, value) in rows {
        match ReplyValue::from_stored(value.as_ref()) {
            Some(ReplyValue::Affirmative) => result.affirmative_names.push(name.into()),
            Some(ReplyValue::Negative) => result.negative_names.push(name.into()),
            None => {}
        }
    }
    result
}
