use std::sync::Arc;

/// Source of "now" in epoch milliseconds. Hosts replaying recorded events
/// swap in a clock that follows event timestamps.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}
