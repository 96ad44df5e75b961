//! Process watcher: turns process snapshots into play sessions

use chrono::{DateTime, Local};
use playtime_catalog::{Catalog, exe_key};
use playtime_host::{ProcessInfo, ProcessSource};
use playtime_store::Store;
use playtime_util::format_playtime;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::{CoreResult, LogSink, WatcherEvent};

/// A catalog executable currently seen running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningSession {
    /// Display name the session will be accounted under
    pub name: String,

    /// Time of the tick that first saw the executable
    pub started_at: DateTime<Local>,

    /// PID of the first matching process
    pub pid: u32,
}

/// Watches the process table for catalog executables.
///
/// Each executable is either absent or running. A tick that sees a new
/// executable opens a session; a tick that no longer sees it closes the
/// session and merges the elapsed whole seconds into the store. Several
/// processes with the same filename count as one session.
pub struct ProcessWatcher {
    catalog: Catalog,
    source: Box<dyn ProcessSource>,
    store: Arc<dyn Store>,
    log: LogSink,
    running: HashMap<String, RunningSession>,
}

impl ProcessWatcher {
    pub fn new(
        catalog: Catalog,
        source: Box<dyn ProcessSource>,
        store: Arc<dyn Store>,
        log: LogSink,
    ) -> Self {
        info!(
            executables = catalog.len(),
            games = catalog.game_count(),
            "Process watcher initialized"
        );
        log.emit("Process watcher initialized");
        log.emit(format!(
            "Monitoring {} executables from {} games",
            catalog.len(),
            catalog.game_count()
        ));

        Self {
            catalog,
            source,
            store,
            log,
            running: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Sessions currently open, keyed by lowercase executable filename
    pub fn running(&self) -> &HashMap<String, RunningSession> {
        &self.running
    }

    pub fn is_running(&self, exe: &str) -> bool {
        self.running.contains_key(exe)
    }

    /// Run one scan now and process start/stop edges.
    pub fn tick(&mut self) -> CoreResult<Vec<WatcherEvent>> {
        self.tick_at(playtime_util::now())
    }

    /// Run one scan at `now` and process start/stop edges.
    ///
    /// A failed scan returns the error and leaves the running set untouched,
    /// so a transient failure never closes sessions. Store failures while
    /// closing a session are reported as [`WatcherEvent::RecordFailed`] and
    /// do not stop the tick.
    pub fn tick_at(&mut self, now: DateTime<Local>) -> CoreResult<Vec<WatcherEvent>> {
        let processes = match self.source.snapshot() {
            Ok(processes) => processes,
            Err(e) => {
                self.log.emit(format!("Process scan failed: {}", e));
                return Err(e.into());
            }
        };

        let present = self.match_catalog(&processes);
        let mut events = Vec::new();

        for (exe, process) in &present {
            if self.running.contains_key(exe) {
                continue;
            }
            if let Some(event) = self.start_session(exe, process, now) {
                events.push(event);
            }
        }

        let present: HashSet<&str> = present.iter().map(|(exe, _)| exe.as_str()).collect();
        let mut stopped: Vec<String> = self
            .running
            .keys()
            .filter(|exe| !present.contains(exe.as_str()))
            .cloned()
            .collect();
        stopped.sort();

        for exe in stopped {
            if let Some(session) = self.running.remove(&exe) {
                events.extend(self.finish_session(exe, session, now));
            }
        }

        debug!(
            processes = processes.len(),
            running = self.running.len(),
            events = events.len(),
            "Watcher tick"
        );

        Ok(events)
    }

    /// Close every open session at `now`, as if all games had exited.
    pub fn finish_all(&mut self, now: DateTime<Local>) -> Vec<WatcherEvent> {
        let mut open: Vec<(String, RunningSession)> = self.running.drain().collect();
        open.sort_by(|a, b| a.0.cmp(&b.0));

        let mut events = Vec::new();
        for (exe, session) in open {
            events.extend(self.finish_session(exe, session, now));
        }
        events
    }

    /// Catalog executables present in the snapshot, first process per
    /// filename, in snapshot order.
    fn match_catalog<'a>(&self, processes: &'a [ProcessInfo]) -> Vec<(String, &'a ProcessInfo)> {
        let mut seen = HashSet::new();
        let mut present = Vec::new();

        for process in processes {
            let Some(exe) = exe_key(process.exe_path()) else {
                continue;
            };
            if self.catalog.contains(&exe) && seen.insert(exe.clone()) {
                present.push((exe, process));
            }
        }
        present
    }

    fn start_session(
        &mut self,
        exe: &str,
        process: &ProcessInfo,
        now: DateTime<Local>,
    ) -> Option<WatcherEvent> {
        let entry = self.catalog.get(exe)?;

        info!(
            exe = %exe,
            game = %entry.name,
            pid = process.pid,
            path = %process.exe_path().display(),
            "Game started"
        );
        self.log.emit(format!(
            "Game started: {} ({}), PID {}, path {}",
            exe,
            entry.name,
            process.pid,
            process.exe_path().display()
        ));

        let event = WatcherEvent::GameStarted {
            exe: exe.to_string(),
            name: entry.name.clone(),
            pid: process.pid,
            exe_path: process.exe_path.clone(),
            started_at: now,
        };
        self.running.insert(
            exe.to_string(),
            RunningSession {
                name: entry.name.clone(),
                started_at: now,
                pid: process.pid,
            },
        );
        Some(event)
    }

    fn finish_session(
        &self,
        exe: String,
        session: RunningSession,
        now: DateTime<Local>,
    ) -> Vec<WatcherEvent> {
        let seconds = (now - session.started_at).num_seconds().max(0);
        let duration = Duration::from_secs(seconds.unsigned_abs());

        info!(
            exe = %exe,
            game = %session.name,
            seconds = duration.as_secs(),
            "Game stopped"
        );
        self.log.emit(format!(
            "Game stopped: {} ({}), played {}",
            exe,
            session.name,
            format_playtime(duration.as_secs())
        ));

        let mut events = vec![WatcherEvent::GameStopped {
            exe,
            name: session.name.clone(),
            started_at: session.started_at,
            ended_at: now,
            duration,
        }];

        match self
            .store
            .record_session_at(&session.name, session.started_at, duration, now)
        {
            Ok(record) => {
                self.log.emit(format!(
                    "{} today: {}",
                    session.name,
                    format_playtime(record.total)
                ));
            }
            Err(e) => {
                error!(game = %session.name, error = %e, "Failed to record session");
                self.log
                    .emit(format!("Failed to save playtime for {}: {}", session.name, e));
                events.push(WatcherEvent::RecordFailed {
                    name: session.name,
                    duration,
                    error: e.to_string(),
                });
            }
        }

        events
    }
}

impl std::fmt::Debug for ProcessWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessWatcher")
            .field("catalog", &self.catalog.len())
            .field("running", &self.running)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use playtime_catalog::CatalogEntry;
    use playtime_host::MockProcessSource;
    use playtime_store::{
        DailyGameRecord, JsonFileStore, PlaytimeDocument, StoreError, StoreResult,
    };

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, h, m, s).unwrap()
    }

    fn make_catalog() -> Catalog {
        Catalog::from_entries([
            (
                "game.exe",
                CatalogEntry {
                    name: "Test Game".into(),
                    appid: "100".into(),
                    exe_path: "/steam/common/Test/game.exe".into(),
                },
            ),
            (
                "launcher.exe",
                CatalogEntry {
                    name: "Test Game".into(),
                    appid: "100".into(),
                    exe_path: "/steam/common/Test/launcher.exe".into(),
                },
            ),
            (
                "other.exe",
                CatalogEntry {
                    name: "Other".into(),
                    appid: "200".into(),
                    exe_path: "/steam/common/Other/other.exe".into(),
                },
            ),
        ])
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        host: MockProcessSource,
        store: Arc<JsonFileStore>,
        watcher: ProcessWatcher,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path().join("playtime.json")).unwrap());
        let host = MockProcessSource::new();
        let watcher = ProcessWatcher::new(
            make_catalog(),
            Box::new(host.clone()),
            store.clone(),
            LogSink::console(),
        );
        Fixture {
            _dir: dir,
            host,
            store,
            watcher,
        }
    }

    struct BrokenStore;

    impl Store for BrokenStore {
        fn init(&self) -> StoreResult<()> {
            Ok(())
        }

        fn load(&self) -> PlaytimeDocument {
            PlaytimeDocument::new()
        }

        fn save(&self, _document: &PlaytimeDocument) -> StoreResult<()> {
            Err(StoreError::InvalidPath("read-only".into()))
        }

        fn record_session_at(
            &self,
            _game: &str,
            _started_at: DateTime<Local>,
            _duration: Duration,
            _ended_at: DateTime<Local>,
        ) -> StoreResult<DailyGameRecord> {
            Err(StoreError::InvalidPath("read-only".into()))
        }

        fn is_healthy(&self) -> bool {
            false
        }
    }

    #[test]
    fn start_fires_once_per_presence() {
        let mut f = fixture();
        f.host.spawn(42, "/steam/common/Test/Game.EXE");

        let events = f.watcher.tick_at(at(10, 0, 0)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            WatcherEvent::GameStarted { exe, pid: 42, .. } if exe == "game.exe"
        ));

        assert!(f.watcher.tick_at(at(10, 0, 1)).unwrap().is_empty());
        assert!(f.watcher.tick_at(at(10, 0, 2)).unwrap().is_empty());
        assert_eq!(f.watcher.running()["game.exe"].started_at, at(10, 0, 0));
    }

    #[test]
    fn stop_records_elapsed_seconds() {
        let mut f = fixture();
        f.host.spawn(42, "/steam/common/Test/game.exe");
        f.watcher.tick_at(at(10, 0, 0)).unwrap();

        f.host.exit(42);
        let events = f.watcher.tick_at(at(10, 2, 5)).unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            WatcherEvent::GameStopped { name, duration, .. } => {
                assert_eq!(name, "Test Game");
                assert_eq!(*duration, Duration::from_secs(125));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!f.watcher.is_running("game.exe"));

        let record = f.store.load().record("2025-03-14", "Test Game").cloned().unwrap();
        assert_eq!(record.total, 125);
        assert_eq!(record.last_open, Some(at(10, 0, 0).naive_local()));
        assert_eq!(record.last_close, Some(at(10, 2, 5).naive_local()));
    }

    #[test]
    fn duplicate_processes_are_one_session() {
        let mut f = fixture();
        f.host.spawn(1, "/a/game.exe");
        f.host.spawn(2, "/b/game.exe");

        let events = f.watcher.tick_at(at(10, 0, 0)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(f.watcher.running()["game.exe"].pid, 1);

        // One copy exiting keeps the session open
        f.host.exit(1);
        assert!(f.watcher.tick_at(at(10, 0, 30)).unwrap().is_empty());

        f.host.exit(2);
        let events = f.watcher.tick_at(at(10, 1, 0)).unwrap();
        assert!(matches!(
            &events[0],
            WatcherEvent::GameStopped { duration, .. } if *duration == Duration::from_secs(60)
        ));
    }

    #[test]
    fn unknown_and_pathless_processes_are_ignored() {
        let mut f = fixture();
        f.host.spawn(1, "/usr/bin/bash");
        f.host.spawn(2, "/");

        assert!(f.watcher.tick_at(at(10, 0, 0)).unwrap().is_empty());
        assert!(f.watcher.running().is_empty());
    }

    #[test]
    fn scan_failure_keeps_running_set() {
        let mut f = fixture();
        f.host.spawn(42, "/steam/common/Test/game.exe");
        f.watcher.tick_at(at(10, 0, 0)).unwrap();

        f.host.exit(42);
        f.host.set_fail_scan(true);
        assert!(f.watcher.tick_at(at(10, 0, 1)).is_err());
        assert!(f.watcher.is_running("game.exe"));

        f.host.set_fail_scan(false);
        let events = f.watcher.tick_at(at(10, 0, 10)).unwrap();
        assert!(matches!(
            &events[0],
            WatcherEvent::GameStopped { duration, .. } if *duration == Duration::from_secs(10)
        ));
    }

    #[test]
    fn executables_of_one_game_share_the_record() {
        let mut f = fixture();
        f.host.spawn(1, "/steam/common/Test/launcher.exe");
        f.watcher.tick_at(at(10, 0, 0)).unwrap();
        f.host.clear();
        f.watcher.tick_at(at(10, 0, 20)).unwrap();

        f.host.spawn(2, "/steam/common/Test/game.exe");
        f.watcher.tick_at(at(11, 0, 0)).unwrap();
        f.host.clear();
        f.watcher.tick_at(at(11, 0, 30)).unwrap();

        let document = f.store.load();
        assert_eq!(document.record("2025-03-14", "Test Game").unwrap().total, 50);
    }

    #[test]
    fn store_failure_is_not_fatal() {
        let host = MockProcessSource::new();
        let (sink, mut rx) = LogSink::channel();
        let mut watcher = ProcessWatcher::new(
            make_catalog(),
            Box::new(host.clone()),
            Arc::new(BrokenStore),
            sink,
        );

        host.spawn(7, "/x/other.exe");
        watcher.tick_at(at(9, 0, 0)).unwrap();
        host.clear();
        let events = watcher.tick_at(at(9, 0, 5)).unwrap();

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], WatcherEvent::GameStopped { .. }));
        assert!(matches!(events[1], WatcherEvent::RecordFailed { .. }));
        assert!(watcher.running().is_empty());

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line.message);
        }
        assert!(lines.iter().any(|l| l.starts_with("Failed to save playtime for Other")));

        // Next tick still works
        host.spawn(8, "/x/other.exe");
        assert_eq!(watcher.tick_at(at(9, 1, 0)).unwrap().len(), 1);
    }

    #[test]
    fn finish_all_closes_open_sessions() {
        let mut f = fixture();
        f.host.spawn(1, "/x/game.exe");
        f.host.spawn(2, "/x/other.exe");
        f.watcher.tick_at(at(10, 0, 0)).unwrap();

        let events = f.watcher.finish_all(at(10, 0, 40));
        assert_eq!(events.len(), 2);
        assert!(f.watcher.running().is_empty());

        let document = f.store.load();
        assert_eq!(document.record("2025-03-14", "Test Game").unwrap().total, 40);
        assert_eq!(document.record("2025-03-14", "Other").unwrap().total, 40);
    }

    #[test]
    fn log_lines_describe_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path().join("playtime.json")).unwrap());
        let host = MockProcessSource::new();
        let (sink, mut rx) = LogSink::channel();
        let mut watcher = ProcessWatcher::new(make_catalog(), Box::new(host.clone()), store, sink);

        host.spawn(42, "/steam/common/Test/game.exe");
        watcher.tick_at(at(10, 0, 0)).unwrap();
        host.clear();
        watcher.tick_at(at(11, 1, 1)).unwrap();

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line.message);
        }

        assert_eq!(lines[0], "Process watcher initialized");
        assert_eq!(lines[1], "Monitoring 3 executables from 2 games");
        assert_eq!(
            lines[2],
            "Game started: game.exe (Test Game), PID 42, path /steam/common/Test/game.exe"
        );
        assert_eq!(lines[3], "Game stopped: game.exe (Test Game), played 1h1m1s");
        assert_eq!(lines[4], "Test Game today: 1h1m1s");
    }
}
