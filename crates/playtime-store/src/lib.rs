//! Persistence layer for steam-playtime
//!
//! Provides:
//! - The playtime document (date -> game -> daily record), validated at load
//! - A JSON file store with tolerant loading and replace-on-save writes
//! - Read-side aggregation for display (today / this week / all time)

mod document;
mod json;
mod report;
mod traits;

pub use document::*;
pub use json::*;
pub use report::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid store path: {0}")]
    InvalidPath(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
