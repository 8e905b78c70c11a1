pub mod clock;
pub mod config;
pub mod error;
pub mod game_data;
pub mod registry;
pub mod stats;
pub mod storage;

// Re-exports for convenience
pub use clock::{Clock, system_clock};
pub use error::{ConfigError, StorageError};
pub use registry::{PlayerCache, Registry};
pub use stats::{EntityRecord, EntitySummary, MetricAccumulator, SkillSummary, UserSkillData};
pub use storage::{HistoryWriter, SessionSnapshot, SessionSummary};
