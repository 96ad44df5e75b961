//! Shared utilities for steam-playtime
//!
//! This crate provides:
//! - Wall-clock time with a debug-only mock override
//! - Timestamp and date formats used by the playtime document
//! - Default paths for config and data
//! - Playtime duration formatting

mod format;
mod paths;
mod time;

pub use format::*;
pub use paths::*;
pub use time::*;
