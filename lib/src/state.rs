use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::debug;
use serde_derive::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::Error;

/// The state is shared between the producer, the workers and the validator.
/// A single reader/writer lock is enough: all transitions triggered by task
/// results serialize on the validator anyway.
pub type SharedState = Arc<RwLock<State>>;

/// The lifecycle of a single task within a run.
///
/// A task that was never touched is `Disabled`. The resolver enables the goal
/// closure, the producer moves ready tasks to `Waiting`, workers to `Running`,
/// and the validator settles them into one of the terminal states.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Display, Serialize, Deserialize)]
pub enum TaskState {
    Disabled,
    Enabled,
    Waiting,
    Running,
    Cancelled,
    Success,
    Failure,
}

/// The per-task lifecycle map, persisted as a sidecar next to the recipe.
///
/// States are written under their human-readable names so the file stays
/// legible and survives reordering of the enum.
#[derive(Debug, Serialize, Deserialize)]
pub struct State {
    states: BTreeMap<String, TaskState>,
    #[serde(skip)]
    path: PathBuf,
}

impl State {
    /// Open the state file at `path`, or start with an empty map if there is
    /// no file yet.
    pub fn open(path: &Path) -> Result<State, Error> {
        if !path.exists() {
            return Ok(State {
                states: BTreeMap::new(),
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)
            .map_err(|err| Error::Load(path.to_path_buf(), err.to_string()))?;
        let mut state: State = serde_json::from_str(&content)
            .map_err(|err| Error::Load(path.to_path_buf(), err.to_string()))?;
        state.path = path.to_path_buf();

        Ok(state)
    }

    /// Persist the current map. The file is written to a temporary sibling
    /// first and renamed over the real path, so a crash mid-write never
    /// leaves a torn checkpoint behind.
    pub fn save(&self) -> Result<(), Error> {
        let serialized = serde_json::to_string_pretty(self)
            .map_err(|err| Error::Load(self.path.clone(), err.to_string()))?;

        let mut partial = self.path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        fs::write(&partial, serialized)?;
        fs::rename(&partial, &self.path)?;
        debug!("State saved at: {:?}", self.path);

        Ok(())
    }

    /// Delete the state file. Nothing to delete is fine.
    pub fn remove(&self) -> Result<(), Error> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            result => Ok(result?),
        }
    }

    /// A task that never got a state is implicitly `Disabled`.
    fn current(&self, name: &str) -> TaskState {
        self.states
            .get(name)
            .copied()
            .unwrap_or(TaskState::Disabled)
    }

    fn transition(&mut self, name: &str, expected: TaskState, to: TaskState) -> Result<(), Error> {
        let found = self.current(name);
        if found != expected {
            return Err(Error::StateTransition {
                task: name.to_string(),
                expected,
                found,
                to,
            });
        }
        self.states.insert(name.to_string(), to);
        Ok(())
    }

    pub fn set_disabled(&mut self, name: &str) {
        self.states.insert(name.to_string(), TaskState::Disabled);
    }

    pub fn set_enabled(&mut self, name: &str) -> Result<(), Error> {
        self.transition(name, TaskState::Disabled, TaskState::Enabled)
    }

    pub fn set_waiting(&mut self, name: &str) -> Result<(), Error> {
        self.transition(name, TaskState::Enabled, TaskState::Waiting)
    }

    pub fn set_running(&mut self, name: &str) -> Result<(), Error> {
        self.transition(name, TaskState::Waiting, TaskState::Running)
    }

    pub fn set_cancelled(&mut self, name: &str) -> Result<(), Error> {
        self.transition(name, TaskState::Running, TaskState::Cancelled)
    }

    pub fn set_success(&mut self, name: &str) -> Result<(), Error> {
        self.transition(name, TaskState::Running, TaskState::Success)
    }

    pub fn set_failure(&mut self, name: &str) -> Result<(), Error> {
        self.transition(name, TaskState::Running, TaskState::Failure)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.current(name) == TaskState::Disabled
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.current(name) == TaskState::Enabled
    }

    pub fn is_waiting(&self, name: &str) -> bool {
        self.current(name) == TaskState::Waiting
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.current(name) == TaskState::Running
    }

    pub fn is_cancelled(&self, name: &str) -> bool {
        self.current(name) == TaskState::Cancelled
    }

    pub fn is_success(&self, name: &str) -> bool {
        self.current(name) == TaskState::Success
    }

    pub fn is_failure(&self, name: &str) -> bool {
        self.current(name) == TaskState::Failure
    }

    /// Whether the task reached a terminal state.
    pub fn is_done(&self, name: &str) -> bool {
        matches!(self.current(name), TaskState::Success | TaskState::Failure)
    }

    /// The number of tasks currently in `Enabled`. Used by the scheduler to
    /// size its dispatch channel.
    pub fn enabled_count(&self) -> usize {
        self.states
            .values()
            .filter(|state| **state == TaskState::Enabled)
            .count()
    }
}
