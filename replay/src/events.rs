//! Recorded event stream format: one JSON object per line, tagged by `type`.
//!
//! ```text
//! {"type":"damage","ts":1700000000000,"id":1001,"skill":1241,"amount":500,"crit":true}
//! {"type":"name","ts":1700000000010,"id":1001,"name":"Aria"}
//! {"type":"tick","ts":1700000000100}
//! ```

use resona_core::Registry;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    Damage {
        ts: i64,
        id: u64,
        skill: u64,
        #[serde(default)]
        element: String,
        amount: u64,
        #[serde(default)]
        crit: bool,
        #[serde(default)]
        lucky: bool,
        #[serde(default)]
        cause_lucky: bool,
        #[serde(default)]
        hp_lessen: u64,
        #[serde(default)]
        target: Option<u64>,
    },
    Healing {
        ts: i64,
        id: u64,
        skill: u64,
        #[serde(default)]
        element: String,
        amount: u64,
        #[serde(default)]
        crit: bool,
        #[serde(default)]
        lucky: bool,
        #[serde(default)]
        cause_lucky: bool,
        #[serde(default)]
        target: Option<u64>,
    },
    Taken {
        ts: i64,
        id: u64,
        amount: u64,
        #[serde(default)]
        fatal: bool,
    },
    Name {
        ts: i64,
        id: u64,
        name: String,
    },
    Profession {
        ts: i64,
        id: u64,
        profession: String,
    },
    FightPoint {
        ts: i64,
        id: u64,
        value: u64,
    },
    Attr {
        ts: i64,
        id: u64,
        key: String,
        value: serde_json::Value,
    },
    EnemyName {
        ts: i64,
        id: u64,
        name: String,
    },
    EnemyHp {
        ts: i64,
        id: u64,
        #[serde(default)]
        hp: Option<i64>,
        #[serde(default)]
        max_hp: Option<i64>,
    },
    Local {
        ts: i64,
        id: u64,
    },
    Log {
        ts: i64,
        line: String,
    },
    Reset {
        ts: i64,
    },
    Clear {
        ts: i64,
    },
    Tick {
        ts: i64,
    },
}

/// What the driver must do after the synchronous part of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    None,
    Log(String),
    Reset,
    Clear,
}

impl ReplayEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Damage { ts, .. }
            | Self::Healing { ts, .. }
            | Self::Taken { ts, .. }
            | Self::Name { ts, .. }
            | Self::Profession { ts, .. }
            | Self::FightPoint { ts, .. }
            | Self::Attr { ts, .. }
            | Self::EnemyName { ts, .. }
            | Self::EnemyHp { ts, .. }
            | Self::Local { ts, .. }
            | Self::Log { ts, .. }
            | Self::Reset { ts }
            | Self::Clear { ts }
            | Self::Tick { ts } => *ts,
        }
    }

    /// Apply the synchronous part of the event to `registry`.
    pub fn apply(self, registry: &mut Registry) -> FollowUp {
        match self {
            Self::Damage {
                id,
                skill,
                element,
                amount,
                crit,
                lucky,
                cause_lucky,
                hp_lessen,
                target,
                ..
            } => registry.add_damage(
                id,
                skill,
                &element,
                amount,
                crit,
                lucky,
                cause_lucky,
                hp_lessen,
                target,
            ),
            Self::Healing {
                id,
                skill,
                element,
                amount,
                crit,
                lucky,
                cause_lucky,
                target,
                ..
            } => registry.add_healing(
                id,
                skill,
                &element,
                amount,
                crit,
                lucky,
                cause_lucky,
                target,
            ),
            Self::Taken {
                id, amount, fatal, ..
            } => registry.add_taken_damage(id, amount, fatal),
            Self::Name { id, name, .. } => registry.set_name(id, &name),
            Self::Profession { id, profession, .. } => registry.set_profession(id, &profession),
            Self::FightPoint { id, value, .. } => registry.set_fight_point(id, value),
            Self::Attr { id, key, value, .. } => registry.set_attribute(id, &key, value),
            Self::EnemyName { id, name, .. } => registry.set_enemy_name(id, &name),
            Self::EnemyHp { id, hp, max_hp, .. } => {
                if let Some(hp) = hp {
                    registry.set_enemy_hp(id, hp);
                }
                if let Some(max_hp) = max_hp {
                    registry.set_enemy_max_hp(id, max_hp);
                }
            }
            Self::Local { id, .. } => registry.set_local_id(id),
            Self::Log { line, .. } => return FollowUp::Log(line),
            Self::Reset { .. } => return FollowUp::Reset,
            Self::Clear { .. } => return FollowUp::Clear,
            Self::Tick { .. } => {}
        }
        FollowUp::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resona_types::Settings;

    fn registry() -> Registry {
        Registry::new(Settings {
            save_history: false,
            ..Settings::default()
        })
    }

    #[test]
    fn test_parse_damage_with_defaults() {
        let event: ReplayEvent =
            serde_json::from_str(r#"{"type":"damage","ts":5,"id":1001,"skill":1241,"amount":500}"#)
                .unwrap();
        assert_eq!(event.timestamp(), 5);
        assert_eq!(
            event,
            ReplayEvent::Damage {
                ts: 5,
                id: 1001,
                skill: 1241,
                element: String::new(),
                amount: 500,
                crit: false,
                lucky: false,
                cause_lucky: false,
                hp_lessen: 0,
                target: None,
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let parsed = serde_json::from_str::<ReplayEvent>(r#"{"type":"teleport","ts":1}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_apply_events() {
        let mut registry = registry();
        let lines = [
            r#"{"type":"name","ts":1,"id":7,"name":"Aria"}"#,
            r#"{"type":"damage","ts":2,"id":7,"skill":1241,"amount":500,"target":90}"#,
            r#"{"type":"healing","ts":3,"id":7,"skill":20301,"amount":80,"crit":true}"#,
            r#"{"type":"attr","ts":4,"id":7,"key":"hp","value":950}"#,
            r#"{"type":"enemy_hp","ts":5,"id":90,"max_hp":10000}"#,
            r#"{"type":"local","ts":6,"id":7}"#,
        ];
        for line in lines {
            let event: ReplayEvent = serde_json::from_str(line).unwrap();
            assert_eq!(event.apply(&mut registry), FollowUp::None);
        }

        let solo = registry.solo_user_data();
        let aria = &solo[&7];
        assert_eq!(aria.name, "Aria");
        assert_eq!(aria.total_damage.total, 500);
        assert_eq!(aria.total_healing.critical, 80);
        assert_eq!(aria.hp, Some(950));
        assert_eq!(registry.all_enemies_data()[&90].max_hp, Some(10000));
    }

    #[test]
    fn test_lifecycle_events_defer_to_driver() {
        let mut registry = registry();
        let log: ReplayEvent =
            serde_json::from_str(r#"{"type":"log","ts":1,"line":"pull"}"#).unwrap();
        assert_eq!(log.apply(&mut registry), FollowUp::Log("pull".to_string()));

        let clear: ReplayEvent = serde_json::from_str(r#"{"type":"clear","ts":1}"#).unwrap();
        assert_eq!(clear.apply(&mut registry), FollowUp::Clear);
    }
}
