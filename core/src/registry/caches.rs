//! Lookup caches consulted when an entity record is first created.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::StorageError;
use crate::stats::EnemySummary;

/// What we remember about a player across clears and restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachedPlayer {
    pub name: Option<String>,
    pub profession: Option<String>,
    #[serde(rename = "fightPoint")]
    pub fight_point: Option<u64>,
    pub hp: Option<i64>,
    pub max_hp: Option<i64>,
}

/// Player identity cache persisted as `users.json`.
///
/// Entries learned from setters are saved but never hydrate records in the
/// running process. Hydration reads only the entries present at load time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerCache {
    players: BTreeMap<u64, CachedPlayer>,
    #[serde(skip)]
    loaded: BTreeMap<u64, CachedPlayer>,
    #[serde(skip)]
    dirty: bool,
}

impl PlayerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let mut cache: PlayerCache =
            serde_json::from_str(&contents).map_err(|source| StorageError::Deserialize {
                path: path.to_path_buf(),
                source,
            })?;
        cache.loaded = cache.players.clone();
        tracing::debug!(players = cache.len(), path = ?path, "Loaded player cache");
        Ok(cache)
    }

    /// Current entry for `id`, including values learned this run.
    pub fn get(&self, id: u64) -> Option<&CachedPlayer> {
        self.players.get(&id)
    }

    /// Entry for `id` as it was loaded.
    pub fn hydration(&self, id: u64) -> Option<&CachedPlayer> {
        self.loaded.get(&id)
    }

    /// Apply `f` to the entry for `id`, marking the cache dirty if it changed.
    pub fn update(&mut self, id: u64, f: impl FnOnce(&mut CachedPlayer)) {
        let entry = self.players.entry(id).or_default();
        let before = entry.clone();
        f(entry);
        if *entry != before {
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl FromIterator<(u64, CachedPlayer)> for PlayerCache {
    fn from_iter<I: IntoIterator<Item = (u64, CachedPlayer)>>(iter: I) -> Self {
        let players: BTreeMap<u64, CachedPlayer> = iter.into_iter().collect();
        Self {
            loaded: players.clone(),
            players,
            dirty: false,
        }
    }
}

/// Transient hostile entities seen this session.
#[derive(Debug, Clone, Default)]
pub struct EnemyCache {
    enemies: BTreeMap<u64, EnemySummary>,
}

impl EnemyCache {
    pub fn touch(&mut self, id: u64) -> &mut EnemySummary {
        self.enemies.entry(id).or_default()
    }

    pub fn get(&self, id: u64) -> Option<&EnemySummary> {
        self.enemies.get(&id)
    }

    pub fn remove(&mut self, id: u64) -> Option<EnemySummary> {
        self.enemies.remove(&id)
    }

    pub fn clear(&mut self) {
        self.enemies.clear();
    }

    pub fn snapshot(&self) -> BTreeMap<u64, EnemySummary> {
        self.enemies.clone()
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }
}
