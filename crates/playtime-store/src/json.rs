//! JSON file store implementation

use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::{DailyGameRecord, PlaytimeDocument, Store, StoreError, StoreResult};

/// Playtime document kept in a single JSON file.
///
/// Every merge reads the file, updates one record and writes the whole
/// document back, so the file stays the source of truth across restarts
/// and for readers in other processes.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating the file (and its parent
    /// directory) with an empty document if needed.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        store.init()?;
        Ok(store)
    }

    /// Open without touching the filesystem (read-only consumers).
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Write to a sibling temp file, then rename it over the target.
    fn replace_file(&self, bytes: &[u8]) -> StoreResult<()> {
        let tmp = self.temp_path();
        if let Err(e) = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, &self.path)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn read_document(&self) -> StoreResult<Option<PlaytimeDocument>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            return Ok(None);
        }

        let (document, issues) = PlaytimeDocument::from_json_str(&text)?;
        for issue in &issues {
            warn!(path = %self.path.display(), issue = %issue, "Skipping malformed playtime entry");
        }
        Ok(Some(document))
    }
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .finish()
    }
}

impl Store for JsonFileStore {
    fn init(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        if self.path.is_dir() {
            return Err(StoreError::InvalidPath(format!(
                "{} is a directory",
                self.path.display()
            )));
        }

        if !self.path.exists() {
            self.save(&PlaytimeDocument::new())?;
            debug!(path = %self.path.display(), "Created empty playtime document");
        }

        Ok(())
    }

    fn load(&self) -> PlaytimeDocument {
        match self.read_document() {
            Ok(Some(document)) => document,
            Ok(None) => {
                warn!(path = %self.path.display(), "Playtime data missing or empty, using empty document");
                PlaytimeDocument::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to load playtime data, using empty document");
                PlaytimeDocument::new()
            }
        }
    }

    fn save(&self, document: &PlaytimeDocument) -> StoreResult<()> {
        let result = document
            .to_json_pretty()
            .and_then(|json| self.replace_file(json.as_bytes()));

        if let Err(e) = &result {
            error!(path = %self.path.display(), error = %e, "Failed to save playtime data");
        }
        result
    }

    fn record_session_at(
        &self,
        game: &str,
        started_at: DateTime<Local>,
        duration: Duration,
        ended_at: DateTime<Local>,
    ) -> StoreResult<DailyGameRecord> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut document = self.load();
        let (record, discarded) = document.add_session(
            ended_at.date_naive(),
            game,
            duration.as_secs(),
            started_at.naive_local(),
            ended_at.naive_local(),
        );

        if let Some(raw) = discarded {
            warn!(game = %game, discarded = %raw, "Replaced malformed playtime entry");
        }

        self.save(&document)?;

        debug!(
            game = %game,
            added_secs = duration.as_secs(),
            total_secs = record.total,
            "Session recorded"
        );
        Ok(record)
    }

    fn is_healthy(&self) -> bool {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
            _ => true,
        }
    }
}
