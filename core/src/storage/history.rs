//! Per-session history dumps.
//!
//! Layout under the configured log directory:
//!
//! ```text
//! logs/<session start millis>/
//!   summary.json        SessionSummary
//!   allUserData.json    id -> EntitySummary
//!   users/<id>.json     UserSkillData
//!   fight.log           "[timestamp] line" entries (optional)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::io_lock::IoLock;
use crate::error::StorageError;
use crate::stats::{EntitySummary, UserSkillData};

pub const SUMMARY_FILE: &str = "summary.json";
pub const ALL_USERS_FILE: &str = "allUserData.json";
pub const USERS_DIR: &str = "users";
pub const FIGHT_LOG_FILE: &str = "fight.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub start_time: i64,
    pub end_time: i64,
    pub duration: i64,
    pub user_count: usize,
    pub version: String,
}

/// Owned copy of registry state taken at flush time.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub start_time: i64,
    pub end_time: i64,
    pub users: BTreeMap<u64, EntitySummary>,
    pub details: Vec<UserSkillData>,
}

impl SessionSnapshot {
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            start_time: self.start_time,
            end_time: self.end_time,
            duration: self.end_time - self.start_time,
            user_count: self.users.len(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Writes session snapshots and fight-log lines. Clones share one
/// [`IoLock`], so writes issued from any clone are linearized.
#[derive(Debug, Clone)]
pub struct HistoryWriter {
    log_dir: PathBuf,
    lock: IoLock,
}

impl HistoryWriter {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            lock: IoLock::new(),
        }
    }

    pub fn session_dir(&self, start_time: i64) -> PathBuf {
        self.log_dir.join(start_time.to_string())
    }

    /// Write all files for `snapshot`. Failures are logged and returned.
    pub async fn save_session(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let result = self.write_session(snapshot).await;
        match &result {
            Ok(()) => tracing::info!(
                start_time = snapshot.start_time,
                users = snapshot.users.len(),
                "Saved session history"
            ),
            Err(e) => tracing::error!(
                error = %e,
                path = ?e.path(),
                start_time = snapshot.start_time,
                "Failed to save session history"
            ),
        }
        result
    }

    async fn write_session(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let dir = self.session_dir(snapshot.start_time);
        let users_dir = dir.join(USERS_DIR);

        let mut io = self.lock.acquire().await;
        io.ensure_dir(&users_dir).await?;
        io.write_json(&dir.join(SUMMARY_FILE), &snapshot.summary()).await?;
        io.write_json(&dir.join(ALL_USERS_FILE), &snapshot.users).await?;
        for detail in &snapshot.details {
            io.write_json(&users_dir.join(format!("{}.json", detail.id)), detail)
                .await?;
        }
        Ok(())
    }

    /// Append one already formatted line to the session's fight log.
    pub async fn append_fight_log(&self, start_time: i64, line: &str) -> Result<(), StorageError> {
        let dir = self.session_dir(start_time);
        let mut io = self.lock.acquire().await;
        let result = async {
            io.ensure_dir(&dir).await?;
            io.append(&dir.join(FIGHT_LOG_FILE), line.as_bytes()).await
        }
        .await;
        if let Err(e) = &result {
            tracing::error!(error = %e, path = ?e.path(), "Failed to append fight log");
        }
        result
    }

    /// Serialize `value` to `path` under the shared lock.
    pub async fn write_json_file<T: Serialize + ?Sized>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<(), StorageError> {
        let mut io = self.lock.acquire().await;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            io.ensure_dir(parent).await?;
        }
        io.write_json(path, value).await
    }
}

/// Summaries of every readable session under `log_dir`, newest first.
/// A missing `log_dir` yields an empty list.
pub async fn list_sessions(log_dir: &Path) -> Result<Vec<SessionSummary>, StorageError> {
    let mut entries = match tokio::fs::read_dir(log_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StorageError::Io {
                path: log_dir.to_path_buf(),
                source,
            });
        }
    };

    let mut sessions = Vec::new();
    loop {
        let entry = entries.next_entry().await.map_err(|source| StorageError::Io {
            path: log_dir.to_path_buf(),
            source,
        })?;
        let Some(entry) = entry else {
            break;
        };
        let path = entry.path().join(SUMMARY_FILE);
        match read_json::<SessionSummary>(&path).await {
            Ok(summary) => sessions.push(summary),
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable session"),
        }
    }

    sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    Ok(sessions)
}

/// The `allUserData.json` map of the session that started at `start_time`.
pub async fn load_session(
    log_dir: &Path,
    start_time: i64,
) -> Result<BTreeMap<u64, EntitySummary>, StorageError> {
    let path = log_dir.join(start_time.to_string()).join(ALL_USERS_FILE);
    read_json(&path).await
}

/// One entity's detail file from a stored session.
pub async fn load_session_user(
    log_dir: &Path,
    start_time: i64,
    id: u64,
) -> Result<UserSkillData, StorageError> {
    let path = log_dir
        .join(start_time.to_string())
        .join(USERS_DIR)
        .join(format!("{}.json", id));
    read_json(&path).await
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StorageError::Deserialize {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_data::SkillNames;
    use crate::stats::EntityRecord;

    const T0: i64 = 1_700_000_000_000;

    fn snapshot(start_time: i64) -> SessionSnapshot {
        let mut e = EntityRecord::new(1001);
        e.name = "Aria".to_string();
        e.add_damage(T0, 1241, "ice", 500, false, false, false, 0);
        e.attributes.insert("max_hp".to_string(), 1500.into());

        SessionSnapshot {
            start_time,
            end_time: start_time + 65_000,
            users: BTreeMap::from([(e.id, e.summary())]),
            details: vec![e.skill_data(&SkillNames::new())],
        }
    }

    #[tokio::test]
    async fn test_save_session_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = HistoryWriter::new(tmp.path());
        let snap = snapshot(T0);

        writer.save_session(&snap).await.unwrap();

        let dir = tmp.path().join(T0.to_string());
        assert!(dir.join(SUMMARY_FILE).is_file());
        assert!(dir.join(ALL_USERS_FILE).is_file());
        assert!(dir.join(USERS_DIR).join("1001.json").is_file());

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(raw["startTime"], T0);
        assert_eq!(raw["duration"], 65_000);
        assert_eq!(raw["userCount"], 1);

        let users = load_session(tmp.path(), T0).await.unwrap();
        assert_eq!(users[&1001], snap.users[&1001]);

        let detail = load_session_user(tmp.path(), T0, 1001).await.unwrap();
        assert_eq!(detail.name, "Aria");
        assert_eq!(detail.skills[&1241].id, 1241);
        assert_eq!(detail.attributes["max_hp"], 1500);

        let raw: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.join(USERS_DIR).join("1001.json")).unwrap(),
        )
        .unwrap();
        assert!(raw["skills"].is_object());
        assert_eq!(raw["skills"]["1241"]["id"], 1241);
    }

    #[tokio::test]
    async fn test_list_sessions_newest_first_and_skips_junk() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = HistoryWriter::new(tmp.path());
        writer.save_session(&snapshot(T0)).await.unwrap();
        writer.save_session(&snapshot(T0 + 90_000)).await.unwrap();
        std::fs::create_dir(tmp.path().join("not-a-session")).unwrap();

        let sessions = list_sessions(tmp.path()).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].start_time, T0 + 90_000);
        assert_eq!(sessions[1].start_time, T0);
    }

    #[tokio::test]
    async fn test_list_sessions_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let sessions = list_sessions(&tmp.path().join("nope")).await.unwrap();
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_fight_log_appends_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = HistoryWriter::new(tmp.path());
        writer.append_fight_log(T0, "[t] first\n").await.unwrap();
        writer.clone().append_fight_log(T0, "[t] second\n").await.unwrap();

        let log = std::fs::read_to_string(tmp.path().join(T0.to_string()).join(FIGHT_LOG_FILE))
            .unwrap();
        assert_eq!(log, "[t] first\n[t] second\n");
    }

    #[tokio::test]
    async fn test_save_session_reports_io_failure() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the log directory should be.
        let blocker = tmp.path().join("logs");
        std::fs::write(&blocker, b"").unwrap();

        let writer = HistoryWriter::new(&blocker);
        let err = writer.save_session(&snapshot(T0)).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
