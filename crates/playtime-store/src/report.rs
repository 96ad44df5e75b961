//! Read-side aggregation for display

use chrono::{NaiveDate, NaiveDateTime};
use playtime_util::{parse_date, same_iso_week};
use std::collections::HashMap;
use tracing::warn;

use crate::{DayEntry, GameEntry, PlaytimeDocument};

/// One game's playtime across the whole document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub name: String,
    pub today: u64,
    pub week: u64,
    pub total: u64,
    /// From the most recent date the game was played
    pub last_open: Option<NaiveDateTime>,
    pub last_close: Option<NaiveDateTime>,
    last_date: NaiveDate,
}

/// Totals for today, the current ISO week, and all time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaytimeReport {
    pub today_total: u64,
    pub week_total: u64,
    /// Ordered by today's time descending, then by name
    pub games: Vec<GameSummary>,
    /// Entries that were skipped as unreadable
    pub skipped: usize,
}

impl PlaytimeReport {
    /// Aggregate the document relative to `today`.
    ///
    /// Malformed day buckets, unparsable date keys and malformed game
    /// records are skipped with a warning.
    pub fn build(document: &PlaytimeDocument, today: NaiveDate) -> Self {
        let mut report = Self::default();
        let mut games: HashMap<&str, GameSummary> = HashMap::new();

        for (date_key, day) in document.days() {
            let DayEntry::Games(entries) = day else {
                warn!(date = %date_key, "Invalid daily data format (not an object), skipping date");
                report.skipped += 1;
                continue;
            };
            let Some(date) = parse_date(date_key) else {
                warn!(date = %date_key, "Unrecognized date key, skipping date");
                report.skipped += 1;
                continue;
            };

            let is_today = date == today;
            let is_this_week = same_iso_week(date, today);

            for (name, entry) in entries {
                let GameEntry::Record(record) = entry else {
                    warn!(date = %date_key, game = %name, "Invalid game data format, skipping game");
                    report.skipped += 1;
                    continue;
                };

                let summary = games.entry(name.as_str()).or_insert_with(|| GameSummary {
                    name: name.clone(),
                    today: 0,
                    week: 0,
                    total: 0,
                    last_open: record.last_open,
                    last_close: record.last_close,
                    last_date: date,
                });

                summary.total = summary.total.saturating_add(record.total);
                if is_today {
                    summary.today = summary.today.saturating_add(record.total);
                    report.today_total = report.today_total.saturating_add(record.total);
                }
                if is_this_week {
                    summary.week = summary.week.saturating_add(record.total);
                    report.week_total = report.week_total.saturating_add(record.total);
                }
                if date > summary.last_date {
                    summary.last_date = date;
                    summary.last_open = record.last_open;
                    summary.last_close = record.last_close;
                }
            }
        }

        report.games = games.into_values().collect();
        report
            .games
            .sort_by(|a, b| b.today.cmp(&a.today).then_with(|| a.name.cmp(&b.name)));
        report
    }

    /// Games played today with their seconds, most played first.
    pub fn today_ranking(&self) -> Vec<(&str, u64)> {
        let mut ranking: Vec<(&str, u64)> = self
            .games
            .iter()
            .filter(|g| g.today > 0)
            .map(|g| (g.name.as_str(), g.today))
            .collect();
        ranking.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranking
    }

    pub fn game(&self, name: &str) -> Option<&GameSummary> {
        self.games.iter().find(|g| g.name == name)
    }
}
