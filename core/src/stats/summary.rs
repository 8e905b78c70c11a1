//! Read-only projections of entity state, serialized as-is into query
//! responses and history files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::accumulator::{AmountBreakdown, CountBreakdown};
use super::entity::SkillCategory;

/// Point-in-time view of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub realtime_dps: u64,
    pub realtime_dps_max: u64,
    pub total_dps: f64,
    pub total_damage: AmountBreakdown,
    /// Damage and healing hit counts, summed field-wise.
    pub total_count: CountBreakdown,
    pub realtime_hps: u64,
    pub realtime_hps_max: u64,
    pub total_hps: f64,
    pub total_healing: AmountBreakdown,
    pub taken_damage: u64,
    pub dead_count: u32,
    /// `"<profession>-<sub profession>"`, or just the profession.
    pub profession: String,
    pub name: String,
    #[serde(rename = "fightPoint")]
    pub fight_point: u64,
    pub hp: Option<i64>,
    pub max_hp: Option<i64>,
}

/// Lifetime figures for one skill of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSummary {
    /// Raw skill id (healing entries are reported without their key offset).
    pub id: u64,
    pub display_name: String,
    #[serde(rename = "type")]
    pub category: SkillCategory,
    #[serde(rename = "elementype")]
    pub element: String,
    pub total_damage: u64,
    pub total_count: u64,
    pub crit_count: u64,
    pub lucky_count: u64,
    pub crit_rate: f64,
    pub lucky_rate: f64,
    pub damage_breakdown: AmountBreakdown,
    pub count_breakdown: CountBreakdown,
}

/// Per-entity detail file contents (`users/<id>.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSkillData {
    pub id: u64,
    pub name: String,
    pub profession: String,
    /// Keyed by raw skill id; see [`EntityRecord::skill_summary`].
    ///
    /// [`EntityRecord::skill_summary`]: super::EntityRecord::skill_summary
    pub skills: BTreeMap<u64, SkillSummary>,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySummary {
    pub name: Option<String>,
    pub hp: Option<i64>,
    pub max_hp: Option<i64>,
}
