use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info};

use crate::error::Error;
use crate::recipe::Recipe;
use crate::state::SharedState;

use super::children::Children;
use super::TaskOutcome;

/// The consuming half of the scheduler.
///
/// Results arrive in whatever order the workers finish, but are processed
/// strictly one at a time, so every state transition triggered by a result
/// serializes here. After each result the state is checkpointed to disk; the
/// one exception is the final success of the goal, where the state file is
/// removed instead.
pub(crate) struct Validator {
    pub recipe: Arc<Recipe>,
    pub state: SharedState,
    pub children: Children,
    pub goal: String,
    pub results: Receiver<TaskOutcome>,
    pub redispatch: Sender<bool>,
    pub done: Sender<Result<(), Error>>,
    pub abort: Arc<AtomicBool>,
}

impl Validator {
    pub fn run(self) {
        // The loop ends once every worker is gone and the queue is drained,
        // which is what guarantees that no child process outlives the run.
        for (name, result) in self.results.iter() {
            let save = match result {
                Ok(()) => self.on_success(&name),
                Err(err) => self.on_failure(&name, err),
            };
            if save {
                if let Err(err) = self.state.read().unwrap().save() {
                    error!("Failed to save the state: {err}");
                }
            }
        }
    }

    /// Returns whether the state should be checkpointed afterwards.
    fn on_success(&self, name: &str) -> bool {
        if self.state.read().unwrap().is_cancelled(name) {
            // The child exited cleanly while the cascade was taking it down.
            // The run already failed; don't promote the task.
            debug!("Cancellation confirmed: {name}");
            return true;
        }

        self.state
            .write()
            .unwrap()
            .set_success(name)
            .expect("a finished task must be Running");
        debug!("Success: {name}");

        if name == self.goal {
            // A fully successful run leaves no state file behind.
            if let Err(err) = self.state.read().unwrap().remove() {
                error!("Failed to remove the state file: {err}");
            }
            let _ = self.redispatch.send(false);
            let _ = self.done.send(Ok(()));
            return false;
        }

        let _ = self.redispatch.send(true);
        true
    }

    /// Returns whether the state should be checkpointed afterwards.
    fn on_failure(&self, name: &str, err: Error) -> bool {
        if self.state.read().unwrap().is_cancelled(name) {
            // The expected fallout of the cascade; the shutdown signal was
            // already sent when the first genuine failure came through.
            debug!("Cancellation confirmed: {name}");
            return true;
        }

        if self.allows_failure(name) {
            info!("Allowed failure: {name}");
            self.state
                .write()
                .unwrap()
                .set_success(name)
                .expect("a finished task must be Running");
            let _ = self.redispatch.send(true);
            return true;
        }

        debug!("Failure: {name}");
        // Flag first so no worker starts another queued task, then take down
        // everything that is already running.
        self.abort.store(true, Ordering::SeqCst);
        self.cancel_running(name);
        let _ = self.redispatch.send(false);
        let _ = self.done.send(Err(Error::Task(name.to_string(), Box::new(err))));
        true
    }

    fn allows_failure(&self, name: &str) -> bool {
        self.recipe
            .tasks
            .get(name)
            .map(|task| task.allow_failure)
            .unwrap_or(false)
    }

    /// The cancellation cascade: mark the failing task as failed, then cancel
    /// every other task that is still running and kill its process group.
    fn cancel_running(&self, failed: &str) {
        let mut state = self.state.write().unwrap();
        for name in self.recipe.tasks.keys() {
            if name == failed {
                state
                    .set_failure(name)
                    .expect("the failing task must be Running");
                continue;
            }
            if state.is_running(name) {
                debug!("Cancellation requested: {name}");
                state
                    .set_cancelled(name)
                    .expect("only Running tasks get cancelled");
                if let Err(err) = self.children.kill(name) {
                    error!("Unable to terminate '{name}': {err}");
                }
            }
        }
    }
}
