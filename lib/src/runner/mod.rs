use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};
use std::thread;

use crossbeam_channel::bounded;
use log::{debug, info};

use crate::error::Error;
use crate::recipe::Recipe;
use crate::state::{SharedState, State};

/// The child process bookkeeping shared between workers and the validator.
pub mod children;
/// The producer scans the state for ready tasks and hands them to workers.
mod producer;
/// The resolver enables the transitive dependency closure of the goal.
mod resolver;
/// The validator consumes task results and decides how the run continues.
mod validator;
/// Workers execute one task at a time.
mod worker;

use children::Children;
use producer::Producer;
use validator::Validator;
use worker::Worker;

/// A task result on its way from a worker to the validator.
pub(crate) type TaskOutcome = (String, Result<(), Error>);

/// A loaded recipe bound to its state file, ready to run goals.
pub struct Runner {
    recipe: Arc<Recipe>,
    state: SharedState,
    children: Children,
}

impl Runner {
    /// Load and check the recipe at `path` and open the state file sitting
    /// next to it.
    pub fn open(path: &Path) -> Result<Runner, Error> {
        let recipe = Recipe::load(path)?;
        if let Ok(pretty) = serde_json::to_string_pretty(&recipe) {
            debug!("Recipe: {pretty}");
        }
        recipe
            .check()
            .map_err(|err| Error::Load(path.to_path_buf(), err.to_string()))?;

        let state = State::open(&state_path(path))?;

        Ok(Runner {
            recipe: Arc::new(recipe),
            state: Arc::new(RwLock::new(state)),
            children: Children::default(),
        })
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Run the recipe's main task.
    pub fn run_main(&self, workers: usize) -> Result<(), Error> {
        let main = self.recipe.main_task().ok_or(Error::NoMainTask)?.to_string();
        self.run(&main, workers)
    }

    /// Run a specific task instead of the recipe's main task.
    pub fn run_task(&self, goal: &str, workers: usize) -> Result<(), Error> {
        self.run(goal, workers)
    }

    /// Drive the goal task and its dependency closure to completion with a
    /// bounded worker pool.
    ///
    /// One producer, `workers` workers and one validator run as threads,
    /// wired up by bounded channels. The calling thread blocks on the `done`
    /// channel and joins everything before returning, so no scheduler thread
    /// outlives the run.
    fn run(&self, goal: &str, workers: usize) -> Result<(), Error> {
        let workers = workers.max(1);
        info!("Main: {goal}");
        info!("Workers: {workers}");

        self.enable_closure(goal)?;
        let enabled = self.state.read().unwrap().enabled_count();
        if enabled == 0 {
            info!("Nothing to run: '{goal}' already succeeded");
            return Ok(());
        }

        // Sized so the producer can park every enabled task at once without
        // blocking.
        let (queue_sender, queue_receiver) = bounded::<String>(enabled);
        let (result_sender, result_receiver) = bounded::<TaskOutcome>(workers);
        let (redispatch_sender, redispatch_receiver) = bounded::<bool>(0);
        let (done_sender, done_receiver) = bounded::<Result<(), Error>>(0);
        let abort = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();

        handles.push(thread::spawn({
            let producer = Producer {
                recipe: self.recipe.clone(),
                state: self.state.clone(),
                queue: queue_sender,
                redispatch: redispatch_receiver,
            };
            move || producer.run()
        }));

        for _ in 0..workers {
            handles.push(thread::spawn({
                let worker = Worker {
                    recipe: self.recipe.clone(),
                    state: self.state.clone(),
                    children: self.children.clone(),
                    queue: queue_receiver.clone(),
                    results: result_sender.clone(),
                    abort: abort.clone(),
                };
                move || worker.run()
            }));
        }
        // The validator's drain ends once every worker has dropped its
        // sender, so this one must not stick around.
        drop(result_sender);
        drop(queue_receiver);

        handles.push(thread::spawn({
            let validator = Validator {
                recipe: self.recipe.clone(),
                state: self.state.clone(),
                children: self.children.clone(),
                goal: goal.to_string(),
                results: result_receiver,
                redispatch: redispatch_sender,
                done: done_sender,
                abort,
            };
            move || validator.run()
        }));

        let result = done_receiver
            .recv()
            .expect("the validator exited without reporting a result");
        // A straggler failure may try to report a second result; with the
        // receiver gone that send turns into an ignored disconnect instead of
        // blocking the validator forever.
        drop(done_receiver);
        for handle in handles {
            handle.join().expect("a scheduler thread panicked");
        }

        result
    }
}

/// The state file lives right next to the recipe as `<recipe>.state`.
fn state_path(recipe_path: &Path) -> PathBuf {
    let mut path = recipe_path.as_os_str().to_os_string();
    path.push(".state");
    PathBuf::from(path)
}
