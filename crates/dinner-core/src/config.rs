//! Shared configuration for the dinner bot.
//!
//! Locates the bot's state directory and files, and collects runtime
//! settings from the environment.
//!
//! # Storage Structure
//!
//! All application data is stored under `~/.dinner-bot/`:
//!
//! ```text
//! ~/.dinner-bot/
//! ├── db/           # SQLite reply store
//! │   └── replies.db
//! └── config/       # users_config.json and .env.local
//! ```
//!
//! # Environment Variables
//!
//! - `DINNER_STATE_DIR`: Override the base state directory
//! - `DINNER_DB_PATH`: Override the reply database file
//! - `DINNER_USERS_CONFIG`: Override the roster file
//! - `DINNER_TIMEZONE`: IANA timezone for days and schedules (default `Asia/Taipei`)
//! - `DINNER_SCOPE_MODE`: `user` or `chat` (default `user`)
//! - `DINNER_RESET_AT`: Weekly reset checkpoint (default `monday 00:00`)
//! - `DINNER_TICK_SECS`: Scheduler tick interval, 1 to 60 (default 20)
//! - `DINNER_RUN_SCHEDULER`: Whether this process sends notifications (default `true`)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use chrono_tz::Tz;
use dinner_models::{ResetRule, WeeklySlot};
use tracing::{debug, warn};

use crate::reconciler::ScopeMode;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "DINNER_STATE_DIR";

/// Environment variable for the reply database path.
pub const DB_PATH_ENV: &str = "DINNER_DB_PATH";

/// Environment variable for the roster file path.
pub const USERS_CONFIG_ENV: &str = "DINNER_USERS_CONFIG";

pub const TIMEZONE_ENV: &str = "DINNER_TIMEZONE";
pub const SCOPE_MODE_ENV: &str = "DINNER_SCOPE_MODE";
pub const RESET_AT_ENV: &str = "DINNER_RESET_AT";
pub const TICK_SECS_ENV: &str = "DINNER_TICK_SECS";
pub const RUN_SCHEDULER_ENV: &str = "DINNER_RUN_SCHEDULER";

/// Default timezone for the calendar day and weekly schedules.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Taipei;

/// Default scheduler tick; several ticks land in every minute.
pub const DEFAULT_TICK_SECS: u64 = 20;

/// Longest accepted tick interval. Minutes a slow tick passes over are
/// caught up by the scheduler.
pub const MAX_TICK_SECS: u64 = 60;

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".dinner-bot";

// Subdirectory names
const DB_SUBDIR: &str = "db";
const CONFIG_SUBDIR: &str = "config";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the bot's state directory.
///
/// The state directory is determined by:
/// 1. `DINNER_STATE_DIR` environment variable if set
/// 2. `~/.dinner-bot` if home directory is available
/// 3. `.dinner-bot` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the database directory.
pub fn db_dir() -> PathBuf {
    state_dir().join(DB_SUBDIR)
}

/// Get the default reply database path.
pub fn db_path() -> PathBuf {
    db_dir().join("replies.db")
}

/// Get the user config directory.
pub fn config_dir() -> PathBuf {
    state_dir().join(CONFIG_SUBDIR)
}

/// Get the default roster file path.
pub fn users_config_file() -> PathBuf {
    config_dir().join("users_config.json")
}

/// Get the .env.local file path.
///
/// Environment file for secrets (bot token).
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Ensure the state directory and all subdirectories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(db_dir())?;
    std::fs::create_dir_all(config_dir())?;
    Ok(())
}

/// Load environment files: the config dir's `.env.local` first, then
/// `.env.local` and `.env` in the working directory. Variables already set
/// are never overridden.
pub fn load_env_files() {
    let env_local = env_file();
    if env_local.exists() {
        match dotenvy::from_path(&env_local) {
            Ok(()) => debug!(path = %env_local.display(), "Loaded env file"),
            Err(e) => warn!(path = %env_local.display(), error = %e, "Failed to load env file"),
        }
    }
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
}

/// Runtime settings for the bot process.
#[derive(Debug, Clone, PartialEq)]
pub struct BotSettings {
    pub db_path: PathBuf,
    pub users_config: PathBuf,
    pub timezone: Tz,
    pub scope_mode: ScopeMode,
    pub reset: ResetRule,
    pub tick: Duration,
    pub run_scheduler: bool,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            db_path: db_path(),
            users_config: users_config_file(),
            timezone: DEFAULT_TIMEZONE,
            scope_mode: ScopeMode::default(),
            reset: ResetRule::default(),
            tick: Duration::from_secs(DEFAULT_TICK_SECS),
            run_scheduler: true,
        }
    }
}

impl BotSettings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Malformed values fall back to their
    /// defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(path) = get(DB_PATH_ENV) {
            settings.db_path = PathBuf::from(path);
        }
        if let Some(path) = get(USERS_CONFIG_ENV) {
            settings.users_config = PathBuf::from(path);
        }
        if let Some(tz) = get(TIMEZONE_ENV) {
            settings.timezone = parse_or_default(TIMEZONE_ENV, &tz, DEFAULT_TIMEZONE);
        }
        if let Some(mode) = get(SCOPE_MODE_ENV) {
            settings.scope_mode = parse_or_default(SCOPE_MODE_ENV, &mode, ScopeMode::default());
        }
        if let Some(at) = get(RESET_AT_ENV) {
            let slot: WeeklySlot = parse_or_default(RESET_AT_ENV, &at, ResetRule::default().slot);
            settings.reset = ResetRule::new(slot);
        }
        if let Some(secs) = get(TICK_SECS_ENV) {
            settings.tick = tick_interval(parse_or_default(TICK_SECS_ENV, &secs, DEFAULT_TICK_SECS));
        }
        if let Some(flag) = get(RUN_SCHEDULER_ENV) {
            settings.run_scheduler = parse_flag(&flag).unwrap_or_else(|| {
                warn!(key = RUN_SCHEDULER_ENV, value = %flag, "Invalid flag; using default");
                true
            });
        }
        settings
    }

    /// Overrides the paths, keeping the other settings.
    pub fn with_paths(mut self, db_path: impl AsRef<Path>, users_config: impl AsRef<Path>) -> Self {
        self.db_path = db_path.as_ref().to_path_buf();
        self.users_config = users_config.as_ref().to_path_buf();
        self
    }
}

/// Clamps a tick interval into `1..=60` seconds.
pub fn tick_interval(secs: u64) -> Duration {
    if secs > MAX_TICK_SECS {
        warn!(secs, max = MAX_TICK_SECS, "Tick interval too coarse; clamping");
    }
    Duration::from_secs(secs.clamp(1, MAX_TICK_SECS))
}

fn parse_or_default<T>(key: &str, value: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().unwrap_or_else(|e| {
        warn!(key, value, error = %e, "Invalid setting; using default");
        default
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
