//! Runtime settings shared by the aggregation core and its hosts.
//!
//! Every field carries a serde default so partially written or outdated
//! config files still load: missing keys fall back to the values below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default inactivity gap after which an auto-clear fires.
pub const DEFAULT_TIMEOUT_CLEAR_MS: i64 = 20_000;

/// Default period of the realtime rate refresh tick.
pub const DEFAULT_REALTIME_TICK_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Clear all entities when no event arrived for `timeout_clear_ms`.
    pub auto_clear_on_timeout: bool,
    /// Flush the session to `log_dir` before a clear or reset.
    pub save_history: bool,
    /// Append `add_log` lines to the session's `fight.log`.
    pub fight_log: bool,
    /// Root of the per-session history directories.
    pub log_dir: PathBuf,
    /// Directory holding `users.json` (the player cache).
    pub data_dir: PathBuf,
    /// Optional JSON table of skill id -> display name.
    pub skill_names: Option<PathBuf>,
    pub realtime_tick_ms: u64,
    pub timeout_clear_ms: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_clear_on_timeout: false,
            save_history: true,
            fight_log: false,
            log_dir: PathBuf::from("logs"),
            data_dir: PathBuf::from("."),
            skill_names: None,
            realtime_tick_ms: DEFAULT_REALTIME_TICK_MS,
            timeout_clear_ms: DEFAULT_TIMEOUT_CLEAR_MS,
        }
    }
}

impl Settings {
    /// Path of the persisted player cache inside `data_dir`.
    pub fn player_cache_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }
}
