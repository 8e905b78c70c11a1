//! Per-entity combat statistics.
//!
//! ```text
//! EntityRecord
//!  ├── damage:  MetricAccumulator   (realtime window + lifetime totals)
//!  ├── healing: MetricAccumulator
//!  └── skill_usage: key -> SkillUsage (lifetime totals only)
//! ```

pub mod accumulator;
pub mod entity;
pub mod summary;

pub use accumulator::{
    AmountBreakdown, CountBreakdown, Instantaneous, MetricAccumulator, REALTIME_WINDOW_MS,
};
pub use entity::{EntityRecord, HEALING_KEY_OFFSET, SkillCategory, SkillKey, SkillUsage};
pub use summary::{EnemySummary, EntitySummary, SkillSummary, UserSkillData};
