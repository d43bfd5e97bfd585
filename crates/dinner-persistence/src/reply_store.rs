//! Reply store: one record per (scope, user, calendar day).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use dinner_models::{
    aggregate_rows, AggregateResult, ReplyRecord, ReplyValue, ScopeFilter, ScopeId, UserId,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{PersistenceError, Result};

const REPLY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS replies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scope_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    display_name TEXT NOT NULL,
    reply_value TEXT NOT NULL,
    reply_day TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_replies_natural_key
    ON replies (scope_id, user_id, reply_day);

CREATE INDEX IF NOT EXISTS idx_replies_day ON replies (reply_day);
"#;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// What [`ReplyStore::update_if_different`] found for today's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The stored value was replaced.
    Updated,
    /// The stored value already equals the new one.
    Unchanged,
    /// No record exists today, e.g. the day rolled over or the store was
    /// cleared after the existence check.
    Missing,
}

/// Durable storage of daily replies.
///
/// "Today" is always the calendar day of the store's clock. Implementations
/// must reject a second record for the same natural key.
pub trait ReplyStore: Send + Sync {
    /// Records a first reply for today. Fails with
    /// [`PersistenceError::DuplicateKey`] if one already exists.
    fn insert(
        &self,
        scope_id: &ScopeId,
        user_id: &UserId,
        display_name: &str,
        value: ReplyValue,
    ) -> Result<()>;

    /// True iff a record exists for this key today.
    fn exists_today(&self, scope_id: &ScopeId, user_id: &UserId) -> Result<bool>;

    /// Overwrites today's value if it differs.
    fn update_if_different(
        &self,
        scope_id: &ScopeId,
        user_id: &UserId,
        value: ReplyValue,
    ) -> Result<UpdateOutcome>;

    /// Today's replies matching `filter`, split into yes/no rosters.
    fn aggregate(&self, filter: &ScopeFilter) -> Result<AggregateResult>;

    /// Deletes every record regardless of day or scope. Returns the number removed.
    fn clear_all(&self) -> Result<usize>;

    /// Today's record for this key, if any.
    fn find_today(&self, scope_id: &ScopeId, user_id: &UserId) -> Result<Option<ReplyRecord>>;

    /// Number of stored records across all days.
    fn count(&self) -> Result<usize>;
}

/// SQLite-backed [`ReplyStore`].
///
/// Every call opens its own connection; SQLite's file locking plus the
/// unique natural-key index serialize writers across threads and processes.
pub struct SqliteReplyStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SqliteReplyStore {
    /// Opens (creating if needed) the database at `path` and applies the schema.
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            clock,
        };
        let _ = store.connect()?;
        info!(path = %store.path.display(), "Reply store ready");
        Ok(store)
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| PersistenceError::DirectoryError {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(REPLY_SCHEMA)?;
        Ok(conn)
    }

    fn today_key(&self) -> String {
        self.clock.today().format(DAY_FORMAT).to_string()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }
}

impl ReplyStore for SqliteReplyStore {
    fn insert(
        &self,
        scope_id: &ScopeId,
        user_id: &UserId,
        display_name: &str,
        value: ReplyValue,
    ) -> Result<()> {
        let conn = self.connect()?;
        let day = self.today_key();
        let now = self.now_utc().to_rfc3339();

        let inserted = conn.execute(
            "INSERT INTO replies (scope_id, user_id, display_name, reply_value, reply_day, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                scope_id.as_str(),
                user_id.as_str(),
                display_name,
                value.as_str(),
                day,
                now
            ],
        );

        match inserted {
            Ok(_) => {
                debug!(scope_id = %scope_id, user_id = %user_id, value = %value, day = %day, "Inserted reply");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(PersistenceError::DuplicateKey {
                    scope_id: scope_id.to_string(),
                    user_id: user_id.to_string(),
                    day,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn exists_today(&self, scope_id: &ScopeId, user_id: &UserId) -> Result<bool> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM replies WHERE scope_id = ?1 AND user_id = ?2 AND reply_day = ?3",
            params![scope_id.as_str(), user_id.as_str(), self.today_key()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn update_if_different(
        &self,
        scope_id: &ScopeId,
        user_id: &UserId,
        value: ReplyValue,
    ) -> Result<UpdateOutcome> {
        let mut conn = self.connect()?;
        let day = self.today_key();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, reply_value FROM replies
                 WHERE scope_id = ?1 AND user_id = ?2 AND reply_day = ?3",
                params![scope_id.as_str(), user_id.as_str(), day],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((id, stored)) = existing else {
            return Ok(UpdateOutcome::Missing);
        };

        if ReplyValue::from_stored(&stored) == Some(value) {
            return Ok(UpdateOutcome::Unchanged);
        }

        tx.execute(
            "UPDATE replies SET reply_value = ?1, updated_at = ?2 WHERE id = ?3",
            params![value.as_str(), self.now_utc().to_rfc3339(), id],
        )?;
        tx.commit()?;

        debug!(scope_id = %scope_id, user_id = %user_id, from = %stored, to = %value, "Updated reply");
        Ok(UpdateOutcome::Updated)
    }

    fn aggregate(&self, filter: &ScopeFilter) -> Result<AggregateResult> {
        let conn = self.connect()?;
        let day = self.today_key();

        let rows: Vec<(String, String)> = match filter {
            ScopeFilter::All => {
                let mut stmt = conn.prepare(
                    "SELECT display_name, reply_value FROM replies
                     WHERE reply_day = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map(params![day], |row| Ok((row.get(0)?, row.get(1)?)))?;
                let collected = rows.collect::<std::result::Result<Vec<_>, _>>()?;
                collected
            }
            ScopeFilter::Scope(scope_id) => {
                let mut stmt = conn.prepare(
                    "SELECT display_name, reply_value FROM replies
                     WHERE reply_day = ?1 AND scope_id = ?2 ORDER BY id",
                )?;
                let rows = stmt.query_map(params![day, scope_id.as_str()], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;
                let collected = rows.collect::<std::result::Result<Vec<_>, _>>()?;
                collected
            }
        };

        Ok(aggregate_rows(rows))
    }

    fn clear_all(&self) -> Result<usize> {
        let conn = self.connect()?;
        let removed = conn.execute("DELETE FROM replies", [])?;
        info!(removed, "Cleared all replies");
        Ok(removed)
    }

    fn find_today(&self, scope_id: &ScopeId, user_id: &UserId) -> Result<Option<ReplyRecord>> {
        let conn = self.connect()?;
        let row: Option<(String, String, String, String, String)> = conn
            .query_row(
                "SELECT display_name, reply_value, reply_day, created_at, updated_at FROM replies
                 WHERE scope_id = ?1 AND user_id = ?2 AND reply_day = ?3",
                params![scope_id.as_str(), user_id.as_str(), self.today_key()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((display_name, value_raw, day_raw, created_raw, updated_raw)) = row else {
            return Ok(None);
        };

        let value = ReplyValue::from_stored(&value_raw).ok_or_else(|| {
            PersistenceError::InvalidData(format!("unknown reply value '{value_raw}'"))
        })?;

        Ok(Some(ReplyRecord {
            scope_id: scope_id.clone(),
            user_id: user_id.clone(),
            display_name,
            value,
            day: parse_day(&day_raw)?,
            created_at: parse_timestamp(&created_raw)?,
            updated_at: parse_timestamp(&updated_raw)?,
        }))
    }

    fn count(&self) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM replies", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| PersistenceError::InvalidData(format!("negative row count {count}")))
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PersistenceError::InvalidData(format!("bad timestamp '{raw}': {e}")))
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DAY_FORMAT)
        .map_err(|e| PersistenceError::InvalidData(format!("bad day '{raw}': {e}")))
}
