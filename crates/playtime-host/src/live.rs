//! Live process table via `sysinfo`

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

use crate::{HostResult, ProcessInfo, ProcessSource};

/// Reads the OS process list; only executable paths are refreshed.
pub struct SysinfoProcessSource {
    sys: System,
}

impl SysinfoProcessSource {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for SysinfoProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoProcessSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoProcessSource")
            .field("processes", &self.sys.processes().len())
            .finish()
    }
}

impl ProcessSource for SysinfoProcessSource {
    fn snapshot(&mut self) -> HostResult<Vec<ProcessInfo>> {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        );

        let mut skipped = 0usize;
        let processes: Vec<ProcessInfo> = self
            .sys
            .processes()
            .iter()
            .filter_map(|(pid, process)| match process.exe() {
                Some(exe) if !exe.as_os_str().is_empty() => {
                    Some(ProcessInfo::new(pid.as_u32(), exe))
                }
                _ => {
                    skipped += 1;
                    None
                }
            })
            .collect();

        debug!(
            resolved = processes.len(),
            skipped, "Process table scanned"
        );
        Ok(processes)
    }
}
