use std::path::PathBuf;
use std::process::ExitStatus;

use crate::state::TaskState;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Anything that went wrong while reading, decoding or checking a recipe
    /// file. The message is prefixed with the offending path.
    #[error("({}) {}", .0.display(), .1)]
    Load(PathBuf, String),

    #[error("Unknown filetype: {}", .0.display())]
    UnknownFiletype(PathBuf),

    #[error("In task '{}': unknown referenced task: {}", .0, .1)]
    UnknownDependency(String, String),

    #[error("Unknown referenced main task: {}", .0)]
    UnknownMainTask(String),

    #[error("Dependency cycle through task '{}'", .0)]
    DependencyCycle(String),

    #[error("The task is not defined in the recipe: {}", .0)]
    UndefinedTask(String),

    #[error("The recipe has no main task")]
    NoMainTask,

    #[error("Failed to spawn process: {}", .0)]
    FailedToSpawn(String),

    /// A child process that ran but didn't exit with code 0.
    /// The inner status prints as `exit status: <code>` on POSIX.
    #[error("Process failed with {}", .0)]
    ProcessFailed(ExitStatus),

    /// An illegal lifecycle transition. Always a bug in the engine.
    #[error("Task '{}' must be {} to become {}, not {}", .task, .expected, .to, .found)]
    StateTransition {
        task: String,
        expected: TaskState,
        found: TaskState,
        to: TaskState,
    },

    /// The error a failed run hands back to the caller: the name of the
    /// failing task plus whatever its execution reported.
    #[error("({}) {}", .0, .1)]
    Task(String, Box<Error>),

    #[error("Io Error: {}", .0)]
    IoError(#[from] std::io::Error),
}
