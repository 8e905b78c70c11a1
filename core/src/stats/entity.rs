use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::accumulator::MetricAccumulator;
use super::summary::{EntitySummary, SkillSummary, UserSkillData};
use crate::game_data::{SkillNames, sub_profession_for};

/// Healing skills share the skill id space with damage skills. When both
/// categories report the same raw id, the healing summary is emitted at
/// `id + HEALING_KEY_OFFSET`.
pub const HEALING_KEY_OFFSET: u64 = 1_000_000_000;

pub const ATTR_HP: &str = "hp";
pub const ATTR_MAX_HP: &str = "max_hp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Damage,
    Healing,
}

/// Usage entries are keyed by category and raw id, so a healing id never
/// lands on a damage entry.
pub type SkillKey = (SkillCategory, u64);

#[derive(Debug, Clone)]
pub struct SkillUsage {
    pub category: SkillCategory,
    pub element: String,
    pub stats: MetricAccumulator,
}

/// A tracked participant and everything accumulated for it this session.
#[derive(Debug, Clone, Default)]
pub struct EntityRecord {
    pub id: u64,
    pub name: String,
    pub profession: String,
    pub sub_profession: String,
    pub fight_point: u64,
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub damage: MetricAccumulator,
    pub healing: MetricAccumulator,
    pub skill_usage: HashMap<SkillKey, SkillUsage>,
    pub taken_damage: u64,
    pub dead_count: u32,
}

impl EntityRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn add_damage(
        &mut self,
        now: i64,
        skill_id: u64,
        element: &str,
        amount: u64,
        is_crit: bool,
        is_lucky: bool,
        is_cause_lucky: bool,
        hp_lessen: u64,
    ) {
        self.damage
            .add_record(now, amount, is_crit, is_lucky, hp_lessen);
        self.record_skill(
            now,
            skill_id,
            SkillCategory::Damage,
            element,
            amount,
            is_crit,
            is_cause_lucky,
            hp_lessen,
        );
    }

    pub fn add_healing(
        &mut self,
        now: i64,
        skill_id: u64,
        element: &str,
        amount: u64,
        is_crit: bool,
        is_lucky: bool,
        is_cause_lucky: bool,
    ) {
        self.healing.add_record(now, amount, is_crit, is_lucky, 0);
        self.record_skill(
            now,
            skill_id,
            SkillCategory::Healing,
            element,
            amount,
            is_crit,
            is_cause_lucky,
            0,
        );
    }

    fn record_skill(
        &mut self,
        now: i64,
        skill_id: u64,
        category: SkillCategory,
        element: &str,
        amount: u64,
        is_crit: bool,
        is_lucky: bool,
        hp_lessen: u64,
    ) {
        let usage = self
            .skill_usage
            .entry((category, skill_id))
            .or_insert_with(|| SkillUsage {
                category,
                element: element.to_string(),
                stats: MetricAccumulator::new(),
            });
        usage
            .stats
            .add_record(now, amount, is_crit, is_lucky, hp_lessen);
        // Per-skill rates are never read; only lifetime totals are.
        usage.stats.clear_window();

        if let Some(sub) = sub_profession_for(skill_id) {
            self.sub_profession = sub.to_string();
        }
    }

    pub fn add_taken_damage(&mut self, amount: u64, is_fatal: bool) {
        self.taken_damage += amount;
        if is_fatal {
            self.dead_count += 1;
        }
    }

    pub fn update_realtime_stats(&mut self, now: i64) {
        self.damage.update_realtime_stats(now);
        self.healing.update_realtime_stats(now);
    }

    /// Zero all accumulated figures and attributes. Identity (id, name,
    /// profession, sub profession) survives.
    pub fn reset_stats(&mut self) {
        self.damage = MetricAccumulator::new();
        self.healing = MetricAccumulator::new();
        self.taken_damage = 0;
        self.dead_count = 0;
        self.fight_point = 0;
        self.skill_usage.clear();
        self.attributes.clear();
    }

    pub fn composite_profession(&self) -> String {
        if self.sub_profession.is_empty() {
            self.profession.clone()
        } else {
            format!("{}-{}", self.profession, self.sub_profession)
        }
    }

    pub fn attribute_i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(serde_json::Value::as_i64)
    }

    pub fn summary(&self) -> EntitySummary {
        EntitySummary {
            realtime_dps: self.damage.realtime.value,
            realtime_dps_max: self.damage.realtime.max,
            total_dps: self.damage.total_per_second(),
            total_damage: self.damage.stats,
            total_count: self.damage.count.merged(&self.healing.count),
            realtime_hps: self.healing.realtime.value,
            realtime_hps_max: self.healing.realtime.max,
            total_hps: self.healing.total_per_second(),
            total_healing: self.healing.stats,
            taken_damage: self.taken_damage,
            dead_count: self.dead_count,
            profession: self.composite_profession(),
            name: self.name.clone(),
            fight_point: self.fight_point,
            hp: self.attribute_i64(ATTR_HP),
            max_hp: self.attribute_i64(ATTR_MAX_HP),
        }
    }

    /// Per-skill figures keyed by raw skill id.
    ///
    /// A healing skill whose raw id is also a damage skill is keyed at
    /// `id + HEALING_KEY_OFFSET`; its `id` field still holds the raw id. If
    /// that key overflows or is taken by another damage skill the healing
    /// entry is left out.
    pub fn skill_summary(&self, names: &SkillNames) -> BTreeMap<u64, SkillSummary> {
        let mut entries: Vec<(&SkillKey, &SkillUsage)> = self.skill_usage.iter().collect();
        entries.sort_by_key(|(key, _)| **key);

        let mut skills = BTreeMap::new();
        for (&(category, id), usage) in entries {
            let summary = Self::project_skill(id, usage, names);
            let key = match category {
                SkillCategory::Damage => Some(id),
                SkillCategory::Healing if !skills.contains_key(&id) => Some(id),
                SkillCategory::Healing => id
                    .checked_add(HEALING_KEY_OFFSET)
                    .filter(|key| !skills.contains_key(key)),
            };
            match key {
                Some(key) => {
                    skills.insert(key, summary);
                }
                None => tracing::warn!(
                    entity = self.id,
                    skill = id,
                    "No free summary key for healing skill, skipped"
                ),
            }
        }
        skills
    }

    fn project_skill(id: u64, usage: &SkillUsage, names: &SkillNames) -> SkillSummary {
        let count = usage.stats.count;
        let ratio = |n: u64| {
            if count.total == 0 {
                0.0
            } else {
                n as f64 / count.total as f64
            }
        };
        SkillSummary {
            id,
            display_name: names.display_name(id),
            category: usage.category,
            element: usage.element.clone(),
            total_damage: usage.stats.stats.total,
            total_count: count.total,
            crit_count: count.critical,
            lucky_count: count.lucky,
            crit_rate: ratio(count.critical),
            lucky_rate: ratio(count.lucky),
            damage_breakdown: usage.stats.stats,
            count_breakdown: count,
        }
    }

    pub fn skill_data(&self, names: &SkillNames) -> UserSkillData {
        UserSkillData {
            id: self.id,
            name: self.name.clone(),
            profession: self.composite_profession(),
            skills: self.skill_summary(names),
            attributes: self.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_damage_feeds_primary_and_skill() {
        let mut e = EntityRecord::new(1001);
        e.add_damage(T0, 1241, "ice", 500, false, false, false, 0);

        assert_eq!(e.damage.stats.normal, 500);
        assert_eq!(e.damage.stats.total, 500);
        assert_eq!(e.sub_profession, "Beam");

        let usage = &e.skill_usage[&(SkillCategory::Damage, 1241)];
        assert_eq!(usage.category, SkillCategory::Damage);
        assert_eq!(usage.element, "ice");
        assert_eq!(usage.stats.stats.total, 500);
        assert_eq!(usage.stats.window_len(), 0);
    }

    #[test]
    fn test_skill_uses_breakdown_lucky_flag() {
        let mut e = EntityRecord::new(1);
        e.add_damage(T0, 42, "", 100, false, true, false, 0);

        assert_eq!(e.damage.stats.lucky, 100);
        assert_eq!(
            e.skill_usage[&(SkillCategory::Damage, 42)]
                .stats
                .stats
                .normal,
            100
        );
    }

    #[test]
    fn test_healing_key_does_not_collide() {
        let mut e = EntityRecord::new(1);
        e.add_damage(T0, 20301, "light", 300, false, false, false, 0);
        e.add_healing(T0, 20301, "light", 700, true, false, false);

        assert_eq!(e.skill_usage.len(), 2);
        assert_eq!(
            e.skill_usage[&(SkillCategory::Damage, 20301)]
                .stats
                .stats
                .total,
            300
        );
        let heal = &e.skill_usage[&(SkillCategory::Healing, 20301)];
        assert_eq!(heal.category, SkillCategory::Healing);
        assert_eq!(heal.stats.stats.critical, 700);
        assert_eq!(e.healing.stats.total, 700);
    }

    #[test]
    fn test_unknown_skill_keeps_sub_profession() {
        let mut e = EntityRecord::new(1);
        e.add_damage(T0, 1241, "", 1, false, false, false, 0);
        e.add_damage(T0, 5, "", 1, false, false, false, 0);
        assert_eq!(e.sub_profession, "Beam");
    }

    #[test]
    fn test_taken_damage_and_deaths() {
        let mut e = EntityRecord::new(1);
        e.add_taken_damage(250, false);
        e.add_taken_damage(750, true);
        assert_eq!(e.taken_damage, 1000);
        assert_eq!(e.dead_count, 1);
    }

    #[test]
    fn test_summary_projection() {
        let mut e = EntityRecord::new(7);
        e.name = "Aria".to_string();
        e.profession = "Frost Mage".to_string();
        e.attributes.insert(ATTR_HP.to_string(), 900.into());
        e.attributes.insert(ATTR_MAX_HP.to_string(), 1200.into());
        e.add_damage(T0, 1241, "ice", 400, true, false, false, 0);
        e.add_damage(T0 + 1000, 1241, "ice", 600, false, false, false, 0);
        e.add_healing(T0 + 500, 9, "", 50, false, true, false);
        e.update_realtime_stats(T0 + 1000);

        let s = e.summary();
        assert_eq!(s.profession, "Frost Mage-Beam");
        assert_eq!(s.name, "Aria");
        assert_eq!(s.total_damage.total, 1000);
        assert_eq!(s.total_dps, 1000.0);
        assert_eq!(s.realtime_dps, 1000);
        assert_eq!(s.realtime_hps, 50);
        assert_eq!(s.total_count.total, 3);
        assert_eq!(s.total_count.critical, 1);
        assert_eq!(s.total_count.lucky, 1);
        assert_eq!(s.hp, Some(900));
        assert_eq!(s.max_hp, Some(1200));
    }

    #[test]
    fn test_composite_profession_without_sub() {
        let mut e = EntityRecord::new(1);
        e.profession = "Shield Knight".to_string();
        assert_eq!(e.composite_profession(), "Shield Knight");
    }

    #[test]
    fn test_skill_summary_unoffsets_and_names() {
        let mut names = SkillNames::new();
        names.insert(20301, "Lifebloom");

        let mut e = EntityRecord::new(1);
        e.add_healing(T0, 20301, "wood", 100, true, false, false);
        e.add_healing(T0, 20301, "wood", 100, false, false, true);
        e.add_damage(T0, 77, "fire", 10, false, false, false, 0);

        let skills = e.skill_summary(&names);
        assert_eq!(skills.len(), 2);

        assert_eq!(skills[&77].id, 77);
        assert_eq!(skills[&77].display_name, "77");
        assert_eq!(skills[&77].crit_rate, 0.0);

        let heal = &skills[&20301];
        assert_eq!(heal.id, 20301);
        assert_eq!(heal.display_name, "Lifebloom");
        assert_eq!(heal.category, SkillCategory::Healing);
        assert_eq!(heal.total_damage, 200);
        assert_eq!(heal.total_count, 2);
        assert_eq!(heal.crit_count, 1);
        assert_eq!(heal.crit_rate, 0.5);
        assert_eq!(heal.lucky_rate, 0.5);
    }

    #[test]
    fn test_skill_summary_shared_id_keeps_both_categories() {
        let mut e = EntityRecord::new(1);
        e.add_damage(T0, 20301, "light", 300, false, false, false, 0);
        e.add_healing(T0, 20301, "light", 700, false, false, false);

        let skills = e.skill_summary(&SkillNames::new());
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[&20301].category, SkillCategory::Damage);
        assert_eq!(skills[&20301].total_damage, 300);

        let heal = &skills[&(20301 + HEALING_KEY_OFFSET)];
        assert_eq!(heal.id, 20301);
        assert_eq!(heal.category, SkillCategory::Healing);
        assert_eq!(heal.total_damage, 700);

        let json = serde_json::to_value(&skills).unwrap();
        assert!(json.is_object());
        assert!(json.get("20301").is_some());
        assert!(json.get("1000020301").is_some());
    }

    #[test]
    fn test_large_healing_id_does_not_overflow() {
        let mut e = EntityRecord::new(1);
        e.add_healing(T0, u64::MAX - 5, "", 40, false, false, false);
        e.add_damage(T0, u64::MAX - 5, "", 10, false, false, false, 0);

        assert_eq!(e.healing.stats.total, 40);
        assert_eq!(e.skill_usage.len(), 2);

        // The healing entry has no free key beside the damage one.
        let skills = e.skill_summary(&SkillNames::new());
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[&(u64::MAX - 5)].category, SkillCategory::Damage);
    }

    #[test]
    fn test_damage_id_at_offset_stays_damage() {
        let mut e = EntityRecord::new(1);
        e.add_healing(T0, 5, "", 70, false, false, false);
        e.add_damage(T0, 5 + HEALING_KEY_OFFSET, "", 20, false, false, false, 0);

        assert_eq!(
            e.skill_usage[&(SkillCategory::Healing, 5)]
                .stats
                .stats
                .total,
            70
        );
        assert_eq!(
            e.skill_usage[&(SkillCategory::Damage, 5 + HEALING_KEY_OFFSET)]
                .stats
                .stats
                .total,
            20
        );

        let skills = e.skill_summary(&SkillNames::new());
        assert_eq!(skills[&5].category, SkillCategory::Healing);
        assert_eq!(
            skills[&(5 + HEALING_KEY_OFFSET)].category,
            SkillCategory::Damage
        );
    }

    #[test]
    fn test_reset_stats_keeps_identity() {
        let mut e = EntityRecord::new(3);
        e.name = "Bo".to_string();
        e.profession = "Marksman".to_string();
        e.fight_point = 12_000;
        e.attributes.insert(ATTR_HP.to_string(), 5.into());
        e.add_damage(T0, 2292, "", 10, false, false, false, 0);
        e.add_taken_damage(10, true);

        e.reset_stats();

        assert_eq!(e.id, 3);
        assert_eq!(e.name, "Bo");
        assert_eq!(e.composite_profession(), "Marksman-Wildpack");
        assert_eq!(e.fight_point, 0);
        assert!(e.attributes.is_empty());
        assert!(e.skill_usage.is_empty());
        assert!(e.damage.is_empty());
        assert_eq!(e.taken_damage, 0);
        assert_eq!(e.dead_count, 0);
    }
}
