//! Aggregation registry: owns every entity record of the current session.
//!
//! Ingestion, setters and queries are synchronous. Persistence calls do
//! their registry work up front and return a future that owns a
//! [`SessionSnapshot`] and a writer handle, so a slow write never holds the
//! registry.
//!
//! The inactivity auto-clear runs inside ingestion calls, which cannot
//! await. Snapshots it captures are queued and written by
//! [`Registry::flush_pending`], which hosts call from the same periodic tick
//! that drives [`Registry::update_all_realtime_dps`].

mod caches;


pub use caches::{CachedPlayer, EnemyCache, PlayerCache};

use hashbrown::HashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

use resona_types::Settings;

use crate::clock::{Clock, system_clock};
use crate::error::StorageError;
use crate::game_data::SkillNames;
use crate::stats::{
    EnemySummary, EntityRecord, EntitySummary, UserSkillData,
    entity::{ATTR_HP, ATTR_MAX_HP},
};
use crate::storage::{HistoryWriter, SessionSnapshot};

pub struct Registry {
    settings: Settings,
    clock: Clock,
    entities: HashMap<u64, EntityRecord>,
    players: PlayerCache,
    enemies: EnemyCache,
    skill_names: Arc<SkillNames>,
    history: HistoryWriter,
    session_start: i64,
    last_event: Option<i64>,
    local_id: Option<u64>,
    pending: Vec<SessionSnapshot>,
}

impl Registry {
    pub fn new(settings: Settings) -> Self {
        let clock = system_clock();
        let session_start = clock();
        let history = HistoryWriter::new(settings.log_dir.clone());
        Self {
            settings,
            clock,
            entities: HashMap::new(),
            players: PlayerCache::new(),
            enemies: EnemyCache::default(),
            skill_names: Arc::new(SkillNames::new()),
            history,
            session_start,
            last_event: None,
            local_id: None,
            pending: Vec::new(),
        }
    }

    /// Replace the time source. Restarts the session at the new clock's now.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.session_start = clock();
        self.clock = clock;
        self
    }

    pub fn with_skill_names(mut self, names: Arc<SkillNames>) -> Self {
        self.skill_names = names;
        self
    }

    pub fn with_player_cache(mut self, players: PlayerCache) -> Self {
        self.players = players;
        self
    }

    #[inline]
    fn now(&self) -> i64 {
        (self.clock)()
    }

    // --- Accessors ---

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session_start(&self) -> i64 {
        self.session_start
    }

    pub fn entity(&self, id: u64) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn player_cache(&self) -> &PlayerCache {
        &self.players
    }

    pub fn pending_flushes(&self) -> usize {
        self.pending.len()
    }

    pub fn local_id(&self) -> Option<u64> {
        self.local_id
    }

    pub fn set_local_id(&mut self, id: u64) {
        self.local_id = Some(id);
    }

    // --- Entity Management ---

    /// The record for `id`, created on first use and hydrated from the player
    /// cache as loaded. Identity learned from setters never hydrates, so a
    /// record created after a clear starts with default identity.
    pub fn get_or_create(&mut self, id: u64) -> &mut EntityRecord {
        let players = &self.players;
        self.entities.entry(id).or_insert_with(|| {
            let mut record = EntityRecord::new(id);
            if let Some(cached) = players.hydration(id) {
                if let Some(name) = &cached.name {
                    record.name = name.clone();
                }
                if let Some(profession) = &cached.profession {
                    record.profession = profession.clone();
                }
                if let Some(fight_point) = cached.fight_point {
                    record.fight_point = fight_point;
                }
                if let Some(max_hp) = cached.max_hp {
                    record.attributes.insert(ATTR_MAX_HP.to_string(), max_hp.into());
                }
                if let Some(hp) = cached.hp {
                    record.attributes.insert(ATTR_HP.to_string(), hp.into());
                }
            }
            tracing::debug!(id, name = %record.name, "Tracking new entity");
            record
        })
    }

    // --- Ingestion ---

    pub fn add_damage(
        &mut self,
        id: u64,
        skill_id: u64,
        element: &str,
        amount: u64,
        is_crit: bool,
        is_lucky: bool,
        is_cause_lucky: bool,
        hp_lessen: u64,
        target_id: Option<u64>,
    ) {
        self.check_timeout_clear();
        let now = self.touch();
        self.get_or_create(id).add_damage(
            now,
            skill_id,
            element,
            amount,
            is_crit,
            is_lucky,
            is_cause_lucky,
            hp_lessen,
        );
        if let Some(target) = target_id {
            self.enemies.touch(target);
        }
    }

    /// Healing from id 0 has no attributable source and is dropped.
    /// Healing targets are players, so `_target_id` does not feed the enemy
    /// registry.
    pub fn add_healing(
        &mut self,
        id: u64,
        skill_id: u64,
        element: &str,
        amount: u64,
        is_crit: bool,
        is_lucky: bool,
        is_cause_lucky: bool,
        _target_id: Option<u64>,
    ) {
        self.check_timeout_clear();
        if id == 0 {
            return;
        }
        let now = self.touch();
        self.get_or_create(id).add_healing(
            now,
            skill_id,
            element,
            amount,
            is_crit,
            is_lucky,
            is_cause_lucky,
        );
    }

    pub fn add_taken_damage(&mut self, id: u64, amount: u64, is_fatal: bool) {
        self.check_timeout_clear();
        self.touch();
        self.get_or_create(id).add_taken_damage(amount, is_fatal);
    }

    fn touch(&mut self) -> i64 {
        let now = self.now();
        self.last_event = Some(now);
        now
    }

    /// Full clear after `timeout_clear_ms` without events, when enabled.
    /// The pre-clear snapshot (if history is on) is queued for
    /// [`Registry::flush_pending`]. Returns whether a clear happened.
    pub fn check_timeout_clear(&mut self) -> bool {
        if !self.settings.auto_clear_on_timeout || self.entities.is_empty() {
            return false;
        }
        let Some(last) = self.last_event else {
            return false;
        };
        let now = self.now();
        if now - last <= self.settings.timeout_clear_ms {
            return false;
        }

        tracing::info!(idle_ms = now - last, "Inactivity timeout, clearing all entities");
        if let Some(snapshot) = self.capture_snapshot(now) {
            self.pending.push(snapshot);
        }
        self.discard_entities(now);
        true
    }

    // --- Metadata Setters ---

    pub fn set_name(&mut self, id: u64, name: &str) {
        self.get_or_create(id).name = name.to_string();
        self.players.update(id, |p| p.name = Some(name.to_string()));
    }

    pub fn set_profession(&mut self, id: u64, profession: &str) {
        self.get_or_create(id).profession = profession.to_string();
        self.players
            .update(id, |p| p.profession = Some(profession.to_string()));
    }

    /// Explicit override of the sub profession inferred from skills.
    pub fn set_sub_profession(&mut self, id: u64, sub_profession: &str) {
        self.get_or_create(id).sub_profession = sub_profession.to_string();
    }

    pub fn set_fight_point(&mut self, id: u64, fight_point: u64) {
        self.get_or_create(id).fight_point = fight_point;
        self.players.update(id, |p| p.fight_point = Some(fight_point));
    }

    pub fn set_attribute(&mut self, id: u64, key: &str, value: serde_json::Value) {
        let number = value.as_i64();
        self.get_or_create(id)
            .attributes
            .insert(key.to_string(), value);
        match (key, number) {
            (ATTR_HP, Some(hp)) => self.players.update(id, |p| p.hp = Some(hp)),
            (ATTR_MAX_HP, Some(max_hp)) => self.players.update(id, |p| p.max_hp = Some(max_hp)),
            _ => {}
        }
    }

    // --- Enemies ---

    pub fn set_enemy_name(&mut self, id: u64, name: &str) {
        self.enemies.touch(id).name = Some(name.to_string());
    }

    pub fn set_enemy_hp(&mut self, id: u64, hp: i64) {
        self.enemies.touch(id).hp = Some(hp);
    }

    pub fn set_enemy_max_hp(&mut self, id: u64, max_hp: i64) {
        self.enemies.touch(id).max_hp = Some(max_hp);
    }

    pub fn remove_enemy(&mut self, id: u64) -> bool {
        self.enemies.remove(id).is_some()
    }

    /// Forget every tracked enemy.
    pub fn refresh_enemy_cache(&mut self) {
        self.enemies.clear();
    }

    pub fn all_enemies_data(&self) -> BTreeMap<u64, EnemySummary> {
        self.enemies.snapshot()
    }

    // --- Queries ---

    pub fn all_users_data(&self) -> BTreeMap<u64, EntitySummary> {
        self.entities
            .iter()
            .map(|(&id, record)| (id, record.summary()))
            .collect()
    }

    /// Only the local entity, or nothing if it is unknown or not yet seen.
    pub fn solo_user_data(&self) -> BTreeMap<u64, EntitySummary> {
        self.local_id
            .and_then(|id| self.entities.get(&id).map(|record| (id, record.summary())))
            .into_iter()
            .collect()
    }

    pub fn user_skill_data(&self, id: u64) -> Option<UserSkillData> {
        self.entities
            .get(&id)
            .map(|record| record.skill_data(&self.skill_names))
    }

    pub fn user_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    // --- Realtime ---

    pub fn update_all_realtime_dps(&mut self) {
        let now = self.now();
        for record in self.entities.values_mut() {
            record.update_realtime_stats(now);
        }
    }

    // --- Lifecycle ---

    /// Owned copy of the session for the history writer, or `None` when
    /// history is off or there is nothing to save.
    fn capture_snapshot(&self, end_time: i64) -> Option<SessionSnapshot> {
        if !self.settings.save_history || self.entities.is_empty() {
            return None;
        }
        let mut details: Vec<UserSkillData> = self
            .entities
            .values()
            .map(|record| record.skill_data(&self.skill_names))
            .collect();
        details.sort_by_key(|d| d.id);
        Some(SessionSnapshot {
            start_time: self.session_start,
            end_time,
            users: self.all_users_data(),
            details,
        })
    }

    fn discard_entities(&mut self, now: i64) {
        self.entities.clear();
        self.session_start = now;
    }

    /// Future that writes `snapshot`, if any, through a clone of the history
    /// writer. It borrows nothing from the registry.
    fn flush(
        &self,
        snapshot: Option<SessionSnapshot>,
    ) -> impl Future<Output = Result<(), StorageError>> + use<> {
        let history = self.history.clone();
        async move {
            match snapshot {
                Some(snapshot) => history.save_session(&snapshot).await,
                None => Ok(()),
            }
        }
    }

    /// Write the current session to history without clearing it.
    /// No-op when history saving is disabled.
    ///
    /// The snapshot is taken before this returns. The returned future owns
    /// everything it needs, so a host can release its lock on the registry
    /// before awaiting the write. The same holds for every lifecycle call
    /// below.
    pub fn save_all_user_data(&self) -> impl Future<Output = Result<(), StorageError>> + use<> {
        self.flush(self.capture_snapshot(self.now()))
    }

    /// Discard every entity and start a new session. The pre-clear state is
    /// flushed when history saving is on; the clear has already happened when
    /// a flush error is returned.
    pub fn clear_all(&mut self) -> impl Future<Output = Result<(), StorageError>> + use<> {
        let now = self.now();
        let snapshot = self.capture_snapshot(now);
        let cleared = self.entities.len();
        self.discard_entities(now);
        tracing::info!(cleared, session_start = now, "Cleared all entities");
        self.flush(snapshot)
    }

    /// Zero every entity's statistics in place, keeping identities, and
    /// start a new session. Flush semantics match [`Registry::clear_all`].
    pub fn reset_statistics(&mut self) -> impl Future<Output = Result<(), StorageError>> + use<> {
        let now = self.now();
        let snapshot = self.capture_snapshot(now);
        for record in self.entities.values_mut() {
            record.reset_stats();
        }
        self.session_start = now;
        tracing::info!(
            entities = self.entities.len(),
            session_start = now,
            "Reset statistics"
        );
        self.flush(snapshot)
    }

    /// Write snapshots queued by inactivity clears, oldest first. A failed
    /// snapshot is dropped (and logged by the writer); the first error is
    /// returned after the rest have been attempted.
    pub fn flush_pending(&mut self) -> impl Future<Output = Result<(), StorageError>> + use<> {
        let pending = std::mem::take(&mut self.pending);
        let history = self.history.clone();
        async move {
            let mut first_err = None;
            for snapshot in pending {
                if let Err(e) = history.save_session(&snapshot).await {
                    first_err.get_or_insert(e);
                }
            }
            match first_err {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    /// Append a timestamped line to the current session's fight log, when
    /// the fight log is enabled.
    pub fn add_log(&self, line: &str) -> impl Future<Output = Result<(), StorageError>> + use<> {
        let entry = self.settings.fight_log.then(|| {
            let stamp = chrono::DateTime::from_timestamp_millis(self.now())
                .map(|t| {
                    t.with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S%.3f")
                        .to_string()
                })
                .unwrap_or_default();
            format!("[{}] {}\n", stamp, line)
        });
        let history = self.history.clone();
        let session_start = self.session_start;
        async move {
            match entry {
                Some(entry) => history.append_fight_log(session_start, &entry).await,
                None => Ok(()),
            }
        }
    }

    /// Persist the player cache to `data_dir/users.json` if it changed.
    pub async fn save_player_cache(&mut self) -> Result<(), StorageError> {
        if !self.players.is_dirty() {
            return Ok(());
        }
        let path = self.settings.player_cache_path();
        self.history.write_json_file(&path, &self.players).await?;
        self.players.mark_clean();
        tracing::debug!(players = self.players.len(), "Saved player cache");
        Ok(())
    }
}
