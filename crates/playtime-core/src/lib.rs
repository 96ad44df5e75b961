//! Process watcher for steam-playtime
//!
//! This crate is the heart of steam-playtime, containing:
//! - Per-executable session state machine (absent -> running -> absent)
//! - Start/stop edge detection against the game catalog, one scan per tick
//! - Merging completed sessions into the playtime store
//! - A one-way channel carrying plain-text log lines to the presentation side

mod events;
mod log;
mod watcher;

pub use events::*;
pub use log::*;
pub use watcher::*;

use playtime_host::HostError;
use thiserror::Error;

/// Watcher errors
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Process scan failed: {0}")]
    Scan(#[from] HostError),
}

pub type CoreResult<T> = Result<T, CoreError>;
