//! Resident memory of the monitored server processes.

use std::ffi::OsString;
use std::sync::{Mutex, PoisonError};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::trace;

/// Highest pid the kernel hands out (`pid_max` upper bound).
const MAX_PID: u32 = 4_194_304;

/// Source of per-process memory readings.
pub trait ProcessMemory: Send + Sync {
    /// Pids of the processes to report on.
    fn list_monitored_process_ids(&self) -> Vec<u32>;

    /// Resident set size in bytes, or 0 when unknown.
    fn resident_memory_bytes(&self, pid: u32) -> u64;
}

/// Process table backed by `sysinfo`, filtered to one executable name.
pub struct SysinfoMemory {
    system: Mutex<System>,
    process_name: OsString,
}

impl SysinfoMemory {
    /// Monitor processes called `knotd`.
    pub fn new() -> Self {
        Self::for_process("knotd")
    }

    pub fn for_process(process_name: impl Into<OsString>) -> Self {
        Self {
            system: Mutex::new(System::new()),
            process_name: process_name.into(),
        }
    }

    fn refresh(system: &mut System, processes: ProcessesToUpdate<'_>) {
        system.refresh_processes_specifics(processes, true, ProcessRefreshKind::nothing().with_memory());
    }
}

impl Default for SysinfoMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoMemory")
            .field("process_name", &self.process_name)
            .finish_non_exhaustive()
    }
}

impl ProcessMemory for SysinfoMemory {
    fn list_monitored_process_ids(&self) -> Vec<u32> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        Self::refresh(&mut system, ProcessesToUpdate::All);

        // Threads share the process name on Linux; only count the leaders.
        let mut pids: Vec<u32> = system
            .processes_by_exact_name(&self.process_name)
            .filter(|process| process.thread_kind().is_none())
            .map(|process| process.pid().as_u32())
            .collect();
        pids.sort_unstable();
        pids
    }

    fn resident_memory_bytes(&self, pid: u32) -> u64 {
        if pid == 0 || pid > MAX_PID {
            return 0;
        }

        let pid = Pid::from_u32(pid);
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        Self::refresh(&mut system, ProcessesToUpdate::Some(&[pid]));
        match system.process(pid) {
            Some(process) => process.memory(),
            None => {
                trace!(%pid, "process gone");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn own_pid() -> u32 {
        std::process::id()
    }

    fn own_name() -> OsString {
        let mut system = System::new();
        let pid = Pid::from_u32(own_pid());
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).unwrap().name().to_os_string()
    }

    #[test]
    fn reads_own_resident_memory() {
        let memory = SysinfoMemory::for_process(own_name());
        assert!(memory.resident_memory_bytes(own_pid()) > 0);
    }

    #[test]
    fn lists_processes_by_exact_name() {
        let memory = SysinfoMemory::for_process(own_name());
        assert!(memory.list_monitored_process_ids().contains(&own_pid()));
    }

    #[test]
    fn unmatched_name_lists_nothing() {
        let memory = SysinfoMemory::for_process("no-such-daemon-x");
        assert!(memory.list_monitored_process_ids().is_empty());
    }

    #[test]
    fn out_of_range_pid_is_zero() {
        let memory = SysinfoMemory::new();
        assert_eq!(memory.resident_memory_bytes(0), 0);
        assert_eq!(memory.resident_memory_bytes(MAX_PID + 1), 0);
        assert_eq!(memory.resident_memory_bytes(u32::MAX), 0);
    }

    #[test]
    fn exited_process_reads_zero() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        let memory = SysinfoMemory::new();
        assert_eq!(memory.resident_memory_bytes(pid), 0);
    }
}
