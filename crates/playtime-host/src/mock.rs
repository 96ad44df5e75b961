//! Mock process source for testing

use std::sync::{Arc, Mutex};

use crate::{HostError, HostResult, ProcessInfo, ProcessSource};

/// Process source whose contents are set by the test.
///
/// Clones share state, so a test can keep one handle while the watcher owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockProcessSource {
    processes: Arc<Mutex<Vec<ProcessInfo>>>,
    fail_scan: Arc<Mutex<bool>>,
    scans: Arc<Mutex<usize>>,
}

impl MockProcessSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a process to the simulated table
    pub fn spawn(&self, pid: u32, exe_path: &str) {
        self.processes
            .lock()
            .unwrap()
            .push(ProcessInfo::new(pid, exe_path));
    }

    /// Remove a process from the simulated table
    pub fn exit(&self, pid: u32) {
        self.processes.lock().unwrap().retain(|p| p.pid != pid);
    }

    pub fn clear(&self) {
        self.processes.lock().unwrap().clear();
    }

    /// Make the following snapshots fail until reset
    pub fn set_fail_scan(&self, fail: bool) {
        *self.fail_scan.lock().unwrap() = fail;
    }

    /// Number of snapshots taken so far
    pub fn scan_count(&self) -> usize {
        *self.scans.lock().unwrap()
    }
}

impl ProcessSource for MockProcessSource {
    fn snapshot(&mut self) -> HostResult<Vec<ProcessInfo>> {
        *self.scans.lock().unwrap() += 1;

        if *self.fail_scan.lock().unwrap() {
            return Err(HostError::ScanFailed("Mock scan failure".into()));
        }

        Ok(self.processes.lock().unwrap().clone())
    }
}
