//! Steam library scanning
//!
//! Reads `steamapps/appmanifest_<appid>.acf` in every Steam library and
//! registers each executable found under the game's install directory.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{Catalog, CatalogEntry, CatalogError, CatalogResult};

/// Helper executables that ship alongside games but are never the game itself
pub const DEFAULT_EXE_BLACKLIST: &[&str] = &[
    "unitycrashhandler.exe",
    "unitycrashhandler64.exe",
    "uninstall.exe",
    "crashreporter.exe",
];

const MANIFEST_PREFIX: &str = "appmanifest_";
const MANIFEST_SUFFIX: &str = ".acf";

/// How far below the install directory executables are searched for
pub const MAX_EXE_DEPTH: usize = 8;

/// The fields of an app manifest the catalog needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppManifest {
    pub appid: String,
    pub name: String,
    pub install_dir: String,
}

/// Scan a Steam installation and build the executable catalog.
///
/// `extra_blacklist` entries are compared against lowercase filenames in
/// addition to [`DEFAULT_EXE_BLACKLIST`]. Nothing here is fatal: unreadable
/// manifests and directories are skipped.
pub fn scan_steam_games(steam_path: impl AsRef<Path>, extra_blacklist: &[String]) -> Catalog {
    let steam_path = steam_path.as_ref();
    let mut catalog = Catalog::new();

    let primary = steam_path.join("steamapps");
    if !primary.is_dir() {
        warn!(path = %primary.display(), "Steam apps directory not found");
        return catalog;
    }

    let blacklist: Vec<String> = DEFAULT_EXE_BLACKLIST
        .iter()
        .map(|s| s.to_string())
        .chain(extra_blacklist.iter().map(|s| s.to_lowercase()))
        .collect();

    for steamapps in library_folders(&primary) {
        scan_library(&steamapps, &blacklist, &mut catalog);
    }

    info!(
        executables = catalog.len(),
        games = catalog.game_count(),
        "Steam games scanned"
    );
    catalog
}

/// All `steamapps` directories: the primary one plus those listed in
/// `libraryfolders.vdf`.
fn library_folders(primary: &Path) -> Vec<PathBuf> {
    let mut folders = vec![primary.to_path_buf()];

    let vdf_path = primary.join("libraryfolders.vdf");
    let Ok(content) = std::fs::read(&vdf_path) else {
        return folders;
    };

    for line in String::from_utf8_lossy(&content).lines() {
        let Some((key, value)) = parse_kv_line(line) else {
            continue;
        };
        if !key.eq_ignore_ascii_case("path") {
            continue;
        }
        let steamapps = PathBuf::from(value.replace("\\\\", "\\")).join("steamapps");
        if !folders.contains(&steamapps) && steamapps.is_dir() {
            debug!(path = %steamapps.display(), "Additional Steam library");
            folders.push(steamapps);
        }
    }

    folders
}

fn scan_library(steamapps: &Path, blacklist: &[String], catalog: &mut Catalog) {
    let entries = match std::fs::read_dir(steamapps) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %steamapps.display(), error = %e, "Failed to read Steam library");
            return;
        }
    };

    let common = steamapps.join("common");

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        let Some(appid) = file_name
            .strip_prefix(MANIFEST_PREFIX)
            .and_then(|rest| rest.strip_suffix(MANIFEST_SUFFIX))
        else {
            continue;
        };

        let manifest = match read_manifest(&entry.path(), appid) {
            Ok(manifest) => manifest,
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "Skipping manifest");
                continue;
            }
        };

        let game_root = common.join(&manifest.install_dir);
        if !game_root.is_dir() {
            debug!(game = %manifest.name, path = %game_root.display(), "Install directory missing");
            continue;
        }

        for exe_path in collect_executables(&game_root) {
            let Some(key) = crate::exe_key(&exe_path) else {
                continue;
            };
            if blacklist.iter().any(|b| *b == key) {
                continue;
            }
            catalog.insert(
                &key,
                CatalogEntry {
                    name: manifest.name.clone(),
                    appid: manifest.appid.clone(),
                    exe_path,
                },
            );
        }
    }
}

/// Parse an app manifest, keeping the first `name` and `installdir` values.
pub fn read_manifest(path: &Path, appid: &str) -> CatalogResult<AppManifest> {
    let content = std::fs::read(path)?;
    parse_manifest(&String::from_utf8_lossy(&content), appid).ok_or_else(|| {
        CatalogError::MissingKey {
            path: path.display().to_string(),
            key: "name/installdir",
        }
    })
}

/// Parse manifest text; `None` if either required key is absent.
pub fn parse_manifest(content: &str, appid: &str) -> Option<AppManifest> {
    let mut name = None;
    let mut install_dir = None;

    for line in content.lines() {
        let Some((key, value)) = parse_kv_line(line) else {
            continue;
        };
        if name.is_none() && key.eq_ignore_ascii_case("name") {
            name = Some(value.to_string());
        } else if install_dir.is_none() && key.eq_ignore_ascii_case("installdir") {
            install_dir = Some(value.to_string());
        }
        if name.is_some() && install_dir.is_some() {
            break;
        }
    }

    Some(AppManifest {
        appid: appid.to_string(),
        name: name.filter(|n| !n.is_empty())?,
        install_dir: install_dir.filter(|d| !d.is_empty())?,
    })
}

/// Split a KeyValues line of the form `"key"   "value"`.
fn parse_kv_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim().strip_prefix('"')?;
    let (key, rest) = rest.split_once('"')?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some((key, value))
}

/// Collect `*.exe` files under `dir`, at most [`MAX_EXE_DEPTH`] levels deep.
/// Symlinks are not followed.
fn collect_executables(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .max_depth(MAX_EXE_DEPTH)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .ends_with(".exe")
        })
        .map(|entry| entry.into_path())
        .collect()
}
