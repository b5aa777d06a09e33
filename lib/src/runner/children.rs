use std::collections::BTreeMap;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use command_group::GroupChild;

use crate::process_helper::kill_group;

/// The child process handles of all currently running tasks, keyed by task
/// name.
///
/// Every handle is inserted and removed by the one worker executing the task.
/// The only other reader is the validator, which reaches in during a
/// cancellation cascade to kill process groups.
#[derive(Clone, Default)]
pub struct Children(Arc<Mutex<BTreeMap<String, GroupChild>>>);

impl Children {
    pub fn insert(&self, name: &str, child: GroupChild) {
        self.0.lock().unwrap().insert(name.to_string(), child);
    }

    pub fn remove(&self, name: &str) {
        self.0.lock().unwrap().remove(name);
    }

    /// Poll the task's child without blocking. `Ok(None)` means the child is
    /// still running.
    pub fn try_wait(&self, name: &str) -> std::io::Result<Option<ExitStatus>> {
        match self.0.lock().unwrap().get_mut(name) {
            Some(child) => child.try_wait(),
            None => Ok(None),
        }
    }

    /// Kill the process group of a task. A task without a registered child is
    /// a no-op.
    pub fn kill(&self, name: &str) -> std::io::Result<()> {
        match self.0.lock().unwrap().get_mut(name) {
            Some(child) => kill_group(name, child),
            None => Ok(()),
        }
    }
}
