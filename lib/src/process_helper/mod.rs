use std::process::Command;

use command_group::{CommandGroup, GroupChild};
use log::debug;

// Unix specific process handling
#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use self::unix::*;

// Windows specific process handling
#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use self::windows::*;

// Linux only helpers for inspecting process groups. Used by tests.
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::*;

/// Spawn a prepared command as the leader of a fresh process group.
///
/// The group is what allows the engine to later take down the child together
/// with everything the child forked, without touching the engine itself.
pub fn spawn_in_group(command: &mut Command) -> std::io::Result<GroupChild> {
    command.group_spawn()
}

/// Forcibly end a child and all of its descendants by killing the whole
/// process group.
pub fn kill_group(name: &str, child: &mut GroupChild) -> std::io::Result<()> {
    match child.kill() {
        Err(ref err) if err.kind() == std::io::ErrorKind::InvalidData => {
            // Process already exited
            debug!("Task {name} has already finished by itself");
            Ok(())
        }
        result => result,
    }
}
