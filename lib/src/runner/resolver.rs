use std::collections::HashSet;

use log::debug;

use crate::error::Error;
use crate::state::State;

use super::Runner;

impl Runner {
    /// Mark the goal task and its transitive dependencies as enabled.
    ///
    /// Tasks recorded as `Success` by a previous run keep that state and act
    /// as already-satisfied prerequisites. Everything else in the closure is
    /// (re-)enabled, which is what lets an interrupted run resume where it
    /// stopped. The visited set keeps shared subtrees from being walked
    /// twice.
    pub(crate) fn enable_closure(&self, goal: &str) -> Result<(), Error> {
        let mut state = self.state.write().unwrap();
        let mut visited = HashSet::new();
        self.enable(goal, &mut state, &mut visited)
    }

    fn enable(
        &self,
        name: &str,
        state: &mut State,
        visited: &mut HashSet<String>,
    ) -> Result<(), Error> {
        let task = self
            .recipe
            .tasks
            .get(name)
            .ok_or_else(|| Error::UndefinedTask(name.to_string()))?;
        if !visited.insert(name.to_string()) {
            return Ok(());
        }

        if state.is_success(name) {
            debug!("Not enabled: {name}");
        } else {
            state.set_disabled(name);
            state
                .set_enabled(name)
                .expect("a freshly disabled task must accept Enabled");
            debug!("Enabled: {name}");
        }

        for dep in &task.deps {
            self.enable(dep, state, visited)?;
        }
        Ok(())
    }
}
