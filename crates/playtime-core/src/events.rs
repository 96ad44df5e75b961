//! Events emitted by the watcher

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::time::Duration;

/// Events emitted by one watcher tick
#[derive(Debug, Clone, PartialEq)]
pub enum WatcherEvent {
    /// A catalog executable appeared
    GameStarted {
        exe: String,
        name: String,
        pid: u32,
        exe_path: PathBuf,
        started_at: DateTime<Local>,
    },

    /// A running executable disappeared; the session was handed to the store
    GameStopped {
        exe: String,
        name: String,
        started_at: DateTime<Local>,
        ended_at: DateTime<Local>,
        duration: Duration,
    },

    /// The store rejected a completed session
    RecordFailed {
        name: String,
        duration: Duration,
        error: String,
    },
}
