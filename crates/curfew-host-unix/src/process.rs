//! Process table scans

use curfew_host_api::{HostError, HostResult};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// One running process as seen by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub name: String,
    pub uid: Option<u32>,
}

/// Snapshot of the process table: names and owning uids.
/// Blocking; call through `spawn_blocking` from async code.
pub fn scan_processes() -> Vec<ProcessEntry> {
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::All, ProcessRefreshKind::everything());

    system
        .processes()
        .values()
        .map(|process| ProcessEntry {
            name: process.name().to_string_lossy().into_owned(),
            uid: process.user_id().map(|uid| **uid),
        })
        .collect()
}

/// Whether any process matches one of `names`, optionally owned by `uid`
pub fn any_running(processes: &[ProcessEntry], names: &[String], uid: Option<u32>) -> bool {
    processes.iter().any(|p| {
        names.iter().any(|n| *n == p.name) && uid.is_none_or(|uid| p.uid == Some(uid))
    })
}

/// Scan on the blocking pool and test for `names`
pub async fn names_running(names: Vec<String>, uid: Option<u32>) -> HostResult<bool> {
    tokio::task::spawn_blocking(move || any_running(&scan_processes(), &names, uid))
        .await
        .map_err(|e| HostError::Internal(format!("Process scan task failed: {}", e)))
}
