//! Plain-text log lines for the presentation side

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::info;

/// `tracing` target for lines that fell back to the console
pub const LOG_TARGET: &str = "playtime::log";

/// One human-readable log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub message: String,
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}",
            playtime_util::format_clock_time(&self.at),
            self.message
        )
    }
}

/// Sending half of the log-line channel.
///
/// Sending never blocks and never fails the caller. Lines that cannot be
/// delivered (no channel, or the receiver is gone) are logged at `info`
/// instead, so they still reach the console.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    tx: Option<mpsc::UnboundedSender<LogLine>>,
}

impl LogSink {
    pub fn new(tx: mpsc::UnboundedSender<LogLine>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that only logs to the console
    pub fn console() -> Self {
        Self::default()
    }

    /// Create a connected sink and its receiver
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LogLine>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn is_connected(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    pub fn emit(&self, message: impl Into<String>) {
        let message = message.into();
        let Some(tx) = &self.tx else {
            info!(target: LOG_TARGET, "{}", message);
            return;
        };

        let line = LogLine {
            at: playtime_util::now(),
            message,
        };
        if let Err(e) = tx.send(line) {
            info!(target: LOG_TARGET, "{}", e.0.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    /// Run `f` under an INFO-level fmt subscriber and return what it printed.
    fn console_output(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f);
        captured.text()
    }

    #[test]
    fn lines_arrive_in_order() {
        let (sink, mut rx) = LogSink::channel();
        sink.emit("first");
        sink.emit(String::from("second"));

        assert_eq!(rx.try_recv().unwrap().message, "first");
        assert_eq!(rx.try_recv().unwrap().message, "second");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_harmless() {
        let (sink, rx) = LogSink::channel();
        assert!(sink.is_connected());
        drop(rx);

        assert!(!sink.is_connected());
        let output = console_output(|| sink.emit("Game X today: 5m"));
        assert!(output.contains("Game X today: 5m"));
    }

    #[test]
    fn console_sink_accepts_lines() {
        let sink = LogSink::console();
        assert!(!sink.is_connected());
        let output = console_output(|| sink.emit("console only"));
        assert!(output.contains("console only"));
        assert!(output.contains(LOG_TARGET));
    }

    #[test]
    fn delivered_lines_are_not_duplicated_on_console() {
        let (sink, mut rx) = LogSink::channel();
        let output = console_output(|| sink.emit("to the channel"));

        assert!(!output.contains("to the channel"));
        assert_eq!(rx.try_recv().unwrap().message, "to the channel");
    }

    #[test]
    fn display_has_clock_prefix() {
        use chrono::TimeZone;

        let line = LogLine {
            at: Local.with_ymd_and_hms(2025, 1, 1, 9, 5, 3).unwrap(),
            message: "hello".into(),
        };
        assert_eq!(line.to_string(), "[09:05:03] hello");
    }
}
