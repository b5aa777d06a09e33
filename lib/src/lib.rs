//! Stove-lib is the engine behind the `stove` binary.
//!
//! It contains:
//!
//! - The [Recipe](recipe::Recipe) and [Task](recipe::Task) model with its
//!   JSON/TOML loaders.
//! - The [State](state::State) store that checkpoints per-task lifecycle
//!   between runs.
//! - The [executor], which runs a single task in its own process group.
//! - The [Runner](runner::Runner), which schedules a whole recipe with a
//!   bounded worker pool.
//!
//! Stove-lib is a stand-alone crate, so the engine can be embedded or
//! integration-tested without going through the command line front-end.

/// Stove-lib's own Error implementation.
pub mod error;
/// Everything regarding running a single task's child process.
pub mod executor;
/// Platform specific process handling.
pub mod process_helper;
/// The declarative recipe document: tasks, commands, dependencies.
pub mod recipe;
/// The scheduler driving a recipe run: producer, worker pool, validator.
pub mod runner;
/// The per-task lifecycle states and their on-disk checkpoint.
pub mod state;

pub use error::Error;
