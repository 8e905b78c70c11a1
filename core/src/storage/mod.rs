//! Filesystem persistence: session history dumps, fight logs and the
//! player cache, all serialized through one [`IoLock`].

pub mod history;
pub mod io_lock;

pub use history::{
    HistoryWriter, SessionSnapshot, SessionSummary, list_sessions, load_session,
    load_session_user,
};
pub use io_lock::{IoGuard, IoLock};
