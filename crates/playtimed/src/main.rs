//! playtimed - The steam-playtime background service
//!
//! This is the main entry point for the playtimed service.
//! It wires together all the components:
//! - Configuration loading
//! - Game catalog scan of the Steam libraries
//! - Store initialization
//! - Process watcher and its polling task
//! - Log-line consumer and the `report` view

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use playtime_catalog::scan_steam_games;
use playtime_config::{Settings, WatcherSettings, load_config};
use playtime_core::{LogLine, LogSink, ProcessWatcher};
use playtime_host::SysinfoProcessSource;
use playtime_store::{JsonFileStore, PlaytimeReport, Store};
use playtime_util::{
    DATETIME_FORMAT, default_config_path, default_data_dir, format_date, format_playtime,
    playtime_file,
};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// playtimed - Steam game playtime tracker
#[derive(Parser, Debug)]
#[command(name = "playtimed")]
#[command(about = "Tracks how long installed Steam games run", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/steam-playtime/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set STEAM_PLAYTIME_DATA_DIR env var)
    #[arg(short, long, env = "STEAM_PLAYTIME_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Watch running processes and record playtime (default)
    Watch,
    /// Print today's and this week's playtime
    Report,
}

/// Main service state
struct Service {
    watcher: ProcessWatcher,
    timing: WatcherSettings,
    log_rx: mpsc::UnboundedReceiver<LogLine>,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let settings = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            steam_path = %settings.steam_path.display(),
            "Configuration loaded"
        );

        // Build the catalog
        let catalog = scan_steam_games(&settings.steam_path, &settings.exe_blacklist);
        if catalog.is_empty() {
            warn!(
                steam_path = %settings.steam_path.display(),
                "No game executables found, nothing will be tracked"
            );
        }

        // Initialize store
        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.data_dir.clone());
        let data_path = playtime_file(&data_dir);
        let store: Arc<dyn Store> = Arc::new(
            JsonFileStore::open(&data_path)
                .with_context(|| format!("Failed to open playtime data {:?}", data_path))?,
        );

        info!(data_path = %data_path.display(), "Store initialized");

        // Initialize watcher
        let (sink, log_rx) = LogSink::channel();
        let watcher = ProcessWatcher::new(
            catalog,
            Box::new(SysinfoProcessSource::new()),
            store,
            sink.clone(),
        );
        sink.emit(format!("Playtime data: {}", data_path.display()));

        Ok(Self {
            watcher,
            timing: settings.watcher,
            log_rx,
        })
    }

    async fn run(self) -> Result<()> {
        let Self {
            watcher,
            timing,
            mut log_rx,
        } = self;

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        // Spawn the polling task
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let mut poller = tokio::spawn(poll_loop(watcher, timing, shutdown_rx));

        info!(
            poll_interval_secs = timing.poll_interval.as_secs(),
            "Service running"
        );

        let exit = forward_logs(
            &mut log_rx,
            &mut poller,
            wait_for_signal(&mut sigterm, &mut sigint),
        )
        .await;

        let stopped_early = match exit {
            Exit::Signal => {
                // Graceful shutdown: the poller closes open sessions before exiting
                info!("Shutting down playtimed");
                let _ = shutdown_tx.send(());
                if let Err(e) = poller.await {
                    error!(error = %e, "Polling task failed");
                }
                false
            }
            Exit::PollerStopped(Ok(())) => {
                error!("Polling task exited unexpectedly, monitoring stopped");
                true
            }
            Exit::PollerStopped(Err(e)) => {
                error!(error = %e, "Polling task failed, monitoring stopped");
                true
            }
        };

        while let Ok(line) = log_rx.try_recv() {
            println!("{}", line);
        }

        if stopped_early {
            anyhow::bail!("Monitoring stopped unexpectedly");
        }

        info!("Shutdown complete");
        Ok(())
    }
}

/// Why the foreground loop ended
#[derive(Debug)]
enum Exit {
    Signal,
    PollerStopped(Result<(), JoinError>),
}

async fn wait_for_signal(sigterm: &mut Signal, sigint: &mut Signal) {
    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
        _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
    }
}

/// Print log lines until `shutdown` resolves or the polling task ends.
async fn forward_logs(
    log_rx: &mut mpsc::UnboundedReceiver<LogLine>,
    poller: &mut JoinHandle<()>,
    shutdown: impl Future<Output = ()>,
) -> Exit {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Exit::Signal,

            result = &mut *poller => return Exit::PollerStopped(result),

            Some(line) = log_rx.recv() => {
                println!("{}", line);
            }
        }
    }
}

/// Tick the watcher on a fixed cadence until shutdown is requested.
///
/// Ticks never overlap: a slow tick delays the next one. A tick that fails
/// is followed by the backoff pause before scanning resumes.
async fn poll_loop(
    mut watcher: ProcessWatcher,
    timing: WatcherSettings,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut timer = tokio::time::interval(timing.poll_interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,

            _ = timer.tick() => {
                let result = tokio::task::block_in_place(|| watcher.tick());
                match result {
                    Ok(events) => {
                        for event in &events {
                            debug!(event = ?event, "Watcher event");
                        }
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            backoff_secs = timing.error_backoff.as_secs(),
                            "Watcher tick failed, backing off"
                        );
                        tokio::select! {
                            _ = &mut shutdown => break,
                            _ = tokio::time::sleep(timing.error_backoff) => {}
                        }
                        timer.reset();
                    }
                }
            }
        }
    }

    let closed = tokio::task::block_in_place(|| watcher.finish_all(playtime_util::now()));
    if !closed.is_empty() {
        info!(sessions = closed.len(), "Recorded sessions still open at shutdown");
    }
}

/// Print today's ranking and the weekly table.
fn run_report(args: &Args) -> Result<()> {
    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => match load_config(&args.config) {
            Ok(Settings { data_dir, .. }) => data_dir,
            Err(e) => {
                debug!(error = %e, "No usable config, using default data directory");
                default_data_dir()
            }
        },
    };

    let store = JsonFileStore::read_only(playtime_file(&data_dir));
    let today = playtime_util::now().date_naive();
    let report = PlaytimeReport::build(&store.load(), today);

    print!("{}", render_report(&report, today));
    Ok(())
}

fn render_report(report: &PlaytimeReport, today: NaiveDate) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Today ({}): {}",
        format_date(today),
        format_playtime(report.today_total)
    );
    let ranking = report.today_ranking();
    if ranking.is_empty() {
        let _ = writeln!(out, "  No games played today");
    }
    for (rank, (name, seconds)) in ranking.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}  {}", rank + 1, name, format_playtime(*seconds));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "This week: {}", format_playtime(report.week_total));
    let _ = writeln!(
        out,
        "  {:<32} {:>10} {:>10} {:>10}  {}",
        "Game", "Today", "Week", "Total", "Last played"
    );
    for game in &report.games {
        let last = game
            .last_close
            .or(game.last_open)
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {:<32} {:>10} {:>10} {:>10}  {}",
            game.name,
            format_playtime(game.today),
            format_playtime(game.week),
            format_playtime(game.total),
            last
        );
    }

    if report.skipped > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Skipped {} unreadable entries", report.skipped);
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    if playtime_util::is_mock_time_active() {
        warn!("Mock time is active, timestamps are shifted");
    }

    match args.command.unwrap_or(Mode::Watch) {
        Mode::Report => run_report(&args),
        Mode::Watch => {
            info!(version = env!("CARGO_PKG_VERSION"), "playtimed starting");

            let service = Service::new(&args).inspect_err(|e| {
                error!(error = %format!("{:#}", e), "Monitoring not started");
            })?;
            service.run().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playtime_catalog::{Catalog, CatalogEntry};
    use playtime_host::{HostResult, MockProcessSource, ProcessInfo, ProcessSource};
    use playtime_store::PlaytimeDocument;
    use serde_json::json;
    use std::time::Duration;

    fn make_catalog() -> Catalog {
        Catalog::from_entries([(
            "game.exe",
            CatalogEntry {
                name: "Game".into(),
                appid: "1".into(),
                exe_path: "/x/game.exe".into(),
            },
        )])
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    struct ExplodingSource;

    impl ProcessSource for ExplodingSource {
        fn snapshot(&mut self) -> HostResult<Vec<ProcessInfo>> {
            panic!("process table exploded");
        }
    }

    #[test]
    fn args_default_to_watch() {
        let args = Args::parse_from(["playtimed"]);
        assert_eq!(args.command, None);
        assert_eq!(args.log_level, "info");

        let args = Args::parse_from(["playtimed", "--data-dir", "/tmp/pt", "report"]);
        assert_eq!(args.command, Some(Mode::Report));
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/pt")));
    }

    #[test]
    fn report_lists_today_and_week() {
        let (document, _) = PlaytimeDocument::from_value(json!({
            "2025-03-13": { "Other": { "total": 120 } },
            "2025-03-14": {
                "Game": {
                    "total": 3661,
                    "last_open": "2025-03-14 10:00:00",
                    "last_close": "2025-03-14 11:01:01"
                },
                "Broken": 5
            }
        }));
        let today = playtime_util::parse_date("2025-03-14").unwrap();
        let report = PlaytimeReport::build(&document, today);

        let text = render_report(&report, today);
        assert!(text.starts_with("Today (2025-03-14): 1h1m1s\n"));
        assert!(text.contains("  1. Game  1h1m1s\n"));
        assert!(text.contains("This week: 1h3m1s\n"));
        assert!(text.contains("2025-03-14 11:01:01"));
        assert!(text.contains("Skipped 1 unreadable entries"));
    }

    #[test]
    fn empty_report() {
        let today = playtime_util::parse_date("2025-03-14").unwrap();
        let report = PlaytimeReport::build(&PlaytimeDocument::new(), today);

        let text = render_report(&report, today);
        assert!(text.contains("No games played today"));
        assert!(text.contains("This week: 0s"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn poll_loop_backs_off_resumes_and_records_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(playtime_file(dir.path())).unwrap());
        let host = MockProcessSource::new();
        let watcher = ProcessWatcher::new(
            make_catalog(),
            Box::new(host.clone()),
            store.clone(),
            LogSink::console(),
        );
        let timing = WatcherSettings {
            poll_interval: Duration::from_millis(10),
            error_backoff: Duration::from_millis(100),
        };

        host.set_fail_scan(true);
        host.spawn(1, "/x/game.exe");
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let poller = tokio::spawn(poll_loop(watcher, timing, shutdown_rx));

        // Failed scans are spaced by the backoff, not the poll interval
        tokio::time::sleep(Duration::from_millis(250)).await;
        let failed = host.scan_count();
        assert!(failed >= 1);
        assert!(failed <= 5, "{} scans during backoff", failed);

        // Scanning resumes once the process table is readable again
        host.set_fail_scan(false);
        wait_until(|| host.scan_count() >= failed + 3).await;
        assert!(!poller.is_finished());

        shutdown_tx.send(()).unwrap();
        poller.await.unwrap();

        // The game was still running, so shutdown recorded its session
        let today = format_date(playtime_util::now().date_naive());
        let document = store.load();
        let record = document.record(&today, "Game").unwrap();
        assert!(record.total < 60);
        assert!(record.last_close.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn forward_logs_prints_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(playtime_file(dir.path())).unwrap());
        let (sink, mut log_rx) = LogSink::channel();
        let watcher = ProcessWatcher::new(
            make_catalog(),
            Box::new(MockProcessSource::new()),
            store,
            sink,
        );
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let mut poller = tokio::spawn(poll_loop(watcher, WatcherSettings::default(), shutdown_rx));

        let exit = forward_logs(
            &mut log_rx,
            &mut poller,
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;
        assert!(matches!(exit, Exit::Signal));

        shutdown_tx.send(()).unwrap();
        poller.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn forward_logs_notices_dead_poller() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(playtime_file(dir.path())).unwrap());
        let (sink, mut log_rx) = LogSink::channel();
        let watcher = ProcessWatcher::new(make_catalog(), Box::new(ExplodingSource), store, sink);
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();
        let mut poller = tokio::spawn(poll_loop(watcher, WatcherSettings::default(), shutdown_rx));

        let exit = tokio::time::timeout(
            Duration::from_secs(5),
            forward_logs(&mut log_rx, &mut poller, std::future::pending()),
        )
        .await
        .expect("dead poller not noticed");

        match exit {
            Exit::PollerStopped(Err(e)) => assert!(e.is_panic()),
            other => panic!("unexpected exit {:?}", other),
        }
    }
}
