use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use log::debug;

use crate::executor;
use crate::recipe::Recipe;
use crate::state::SharedState;

use super::children::Children;
use super::TaskOutcome;

/// One member of the worker pool. Takes dispatched tasks off the queue,
/// executes them and reports the outcome to the validator.
pub(crate) struct Worker {
    pub recipe: Arc<Recipe>,
    pub state: SharedState,
    pub children: Children,
    pub queue: Receiver<String>,
    pub results: Sender<TaskOutcome>,
    pub abort: Arc<AtomicBool>,
}

impl Worker {
    pub fn run(self) {
        for name in self.queue.iter() {
            // A failed run is winding down. Whatever is still queued stays
            // untouched so the state file records it as not yet run.
            if self.abort.load(Ordering::SeqCst) {
                continue;
            }

            self.state
                .write()
                .unwrap()
                .set_running(&name)
                .expect("a dispatched task must be Waiting");
            debug!("Running: {name}");

            let task = self
                .recipe
                .tasks
                .get(&name)
                .expect("a dispatched task must be in the recipe");
            let result = executor::execute(&name, task, &self.recipe, &self.state, &self.children);

            if self.results.send((name, result)).is_err() {
                return;
            }
        }
    }
}
