//! Catalog types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One monitored executable and the game it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Display name from the manifest; playtime is accounted under this name
    pub name: String,

    /// Steam app id
    pub appid: String,

    /// Absolute path of the executable inside the install directory
    pub exe_path: PathBuf,
}

/// Lowercase executable filename -> game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from (filename, entry) pairs; filenames are lowercased.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, CatalogEntry)>,
        S: AsRef<str>,
    {
        let mut catalog = Self::new();
        for (exe, entry) in entries {
            catalog.insert(exe.as_ref(), entry);
        }
        catalog
    }

    /// Insert or replace the entry for an executable filename.
    pub fn insert(&mut self, exe: &str, entry: CatalogEntry) -> Option<CatalogEntry> {
        self.entries.insert(exe.to_lowercase(), entry)
    }

    /// Look up an executable filename (already lowercased).
    pub fn get(&self, exe: &str) -> Option<&CatalogEntry> {
        self.entries.get(exe)
    }

    pub fn contains(&self, exe: &str) -> bool {
        self.entries.contains_key(exe)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct games (several executables can share one name)
    pub fn game_count(&self) -> usize {
        let mut names: Vec<&str> = self.entries.values().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }
}

/// Lowercase filename of an executable path, used as the catalog key.
pub fn exe_key(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
}
