//! Process source trait

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from process enumeration
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Process scan failed: {0}")]
    ScanFailed(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// A process whose executable path could be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub exe_path: PathBuf,
}

impl ProcessInfo {
    pub fn new(pid: u32, exe_path: impl Into<PathBuf>) -> Self {
        Self {
            pid,
            exe_path: exe_path.into(),
        }
    }

    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }
}

/// Source of running-process snapshots
///
/// Implementations drop processes whose executable cannot be resolved
/// (access denied, exited mid-scan, zombies) instead of failing. An `Err`
/// means the whole process table was unavailable.
pub trait ProcessSource: Send {
    fn snapshot(&mut self) -> HostResult<Vec<ProcessInfo>>;
}

impl<T: ProcessSource + ?Sized> ProcessSource for Box<T> {
    fn snapshot(&mut self) -> HostResult<Vec<ProcessInfo>> {
        (**self).snapshot()
    }
}
