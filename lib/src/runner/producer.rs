use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use log::debug;

use crate::recipe::Recipe;
use crate::state::SharedState;

/// The producing half of the scheduler.
///
/// Scans the whole task table for ready tasks, parks them in the queue and
/// then sleeps until the validator reports that another task finished. The
/// scan is O(tasks) per finished task, which is fine for recipe-sized inputs.
pub(crate) struct Producer {
    pub recipe: Arc<Recipe>,
    pub state: SharedState,
    pub queue: Sender<String>,
    pub redispatch: Receiver<bool>,
}

impl Producer {
    pub fn run(self) {
        loop {
            debug!("Searching ready tasks");
            for name in self.ready_tasks() {
                self.state
                    .write()
                    .unwrap()
                    .set_waiting(&name)
                    .expect("a ready task must be Enabled");
                debug!("Waiting: {name}");
                if self.queue.send(name).is_err() {
                    return;
                }
            }
            match self.redispatch.recv() {
                Ok(true) => continue,
                // `false` or a closed channel both end the run. Dropping the
                // queue sender closes the queue; workers drain what's left
                // and exit.
                _ => return,
            }
        }
    }

    /// A task is ready iff it is enabled and all its dependencies succeeded.
    fn ready_tasks(&self) -> Vec<String> {
        let state = self.state.read().unwrap();
        self.recipe
            .tasks
            .iter()
            .filter(|(name, task)| {
                state.is_enabled(name) && task.deps.iter().all(|dep| state.is_success(dep))
            })
            .map(|(name, _)| {
                debug!("Ready: {name}");
                name.clone()
            })
            .collect()
    }
}
