//! Store trait definitions

use chrono::{DateTime, Local};
use std::time::Duration;

use crate::{DailyGameRecord, PlaytimeDocument, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    /// Create the backing document if it does not exist yet. Never
    /// overwrites existing content.
    fn init(&self) -> StoreResult<()>;

    /// Read the whole document. Missing, empty or unparsable content yields
    /// an empty document; problems are logged, never returned.
    fn load(&self) -> PlaytimeDocument;

    /// Replace the persisted document.
    fn save(&self, document: &PlaytimeDocument) -> StoreResult<()>;

    /// Add a completed session to today's record for `game`.
    fn record_session(
        &self,
        game: &str,
        started_at: DateTime<Local>,
        duration: Duration,
    ) -> StoreResult<DailyGameRecord> {
        self.record_session_at(game, started_at, duration, playtime_util::now())
    }

    /// Add a completed session that ended at `ended_at`.
    ///
    /// The session is bucketed under `ended_at`'s date even when it started
    /// the day before; `last_close` is `ended_at`.
    fn record_session_at(
        &self,
        game: &str,
        started_at: DateTime<Local>,
        duration: Duration,
        ended_at: DateTime<Local>,
    ) -> StoreResult<DailyGameRecord>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
