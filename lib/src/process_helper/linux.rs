use log::warn;

use procfs::process;

/// All pids currently belonging to a process group.
///
/// The group id of a child spawned through [super::spawn_in_group] equals the
/// child's own pid.
pub fn group_pids(pgrp: libc::pid_t) -> Vec<libc::pid_t> {
    let all_processes = match process::all_processes() {
        Err(error) => {
            warn!("Failed to get full process list: {error}");
            return Vec::new();
        }
        Ok(processes) => processes,
    };

    all_processes
        .into_iter()
        .filter_map(|process| process.ok())
        .filter_map(|process| match process.stat() {
            Ok(stat) if stat.pgrp == pgrp => Some(process.pid),
            _ => None,
        })
        .collect()
}
