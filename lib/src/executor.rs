use std::fs::File;
use std::process::Command;
use std::thread::sleep;
use std::time::Duration;

use crate::error::Error;
use crate::process_helper::{default_interpreter, spawn_in_group};
use crate::recipe::{Recipe, Task};
use crate::runner::children::Children;
use crate::state::SharedState;

/// How often a waiting worker polls its child for completion. Polling instead
/// of a blocking wait keeps the child handle reachable for the cancellation
/// cascade.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run one task to completion in a child process.
///
/// The child inherits the engine's environment extended by the recipe and
/// task environments, gets its stdio redirected if the task asks for it, and
/// is spawned as the leader of a fresh process group. The handle is parked in
/// `children` for the duration of the run so the validator can terminate the
/// whole group on cancellation.
pub fn execute(
    name: &str,
    task: &Task,
    recipe: &Recipe,
    state: &SharedState,
    children: &Children,
) -> Result<(), Error> {
    if task.cmd.is_empty() {
        return Ok(());
    }

    let argv = interpreter_argv(task, recipe);
    let mut command = Command::new(&argv[0]);
    command.args(&argv[1..]);
    command.envs(&recipe.env);
    command.envs(&task.env);
    if let Some(path) = task.stdout_path() {
        command.stdout(File::create(path)?);
    }
    if let Some(path) = task.stderr_path() {
        command.stderr(File::create(path)?);
    }

    let child =
        spawn_in_group(&mut command).map_err(|err| Error::FailedToSpawn(err.to_string()))?;
    children.insert(name, child);

    // The cascade may have cancelled this task between the `Running`
    // transition and the registration of the handle above. Nobody else will
    // see the child, so take it down here.
    if state.read().unwrap().is_cancelled(name) {
        let _ = children.kill(name);
    }

    wait(name, children)
}

/// Wait for the task's child to exit and translate the exit status.
fn wait(name: &str, children: &Children) -> Result<(), Error> {
    loop {
        match children.try_wait(name) {
            Err(err) => {
                children.remove(name);
                return Err(err.into());
            }
            Ok(Some(status)) => {
                children.remove(name);
                if status.success() {
                    return Ok(());
                }
                return Err(Error::ProcessFailed(status));
            }
            Ok(None) => sleep(WAIT_POLL_INTERVAL),
        }
    }
}

/// Compose the argv for a task.
///
/// The task's own interpreter template wins over the recipe-wide one; with
/// neither in place the platform default is used. A template that is present
/// but empty also means the platform default, even when the other level would
/// have provided one. Every `{cmd}` occurrence in the chosen template is
/// replaced with the task's command string.
pub fn interpreter_argv(task: &Task, recipe: &Recipe) -> Vec<String> {
    let template = match (&task.interp, &recipe.interp) {
        (Some(parts), _) | (None, Some(parts)) => parts,
        (None, None) => return default_interpreter(&task.cmd),
    };
    if template.is_empty() {
        return default_interpreter(&task.cmd);
    }
    template
        .iter()
        .map(|part| part.replace("{cmd}", &task.cmd))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::state::State;

    fn task_with_cmd(cmd: &str) -> Task {
        Task {
            cmd: cmd.to_string(),
            ..Default::default()
        }
    }

    fn empty_state(dir: &tempfile::TempDir) -> SharedState {
        let state = State::open(&dir.path().join("recipe.toml.state")).unwrap();
        Arc::new(RwLock::new(state))
    }

    #[test]
    fn task_interpreter_wins_over_recipe() {
        let recipe = Recipe {
            interp: Some(vec!["bash".into(), "-c".into(), "{cmd}".into()]),
            ..Default::default()
        };
        let task = Task {
            interp: Some(vec!["python3".into(), "-c".into(), "{cmd}".into()]),
            cmd: "print()".into(),
            ..Default::default()
        };
        assert_eq!(
            interpreter_argv(&task, &recipe),
            vec!["python3", "-c", "print()"]
        );
    }

    #[test]
    fn recipe_interpreter_applies_when_task_has_none() {
        let recipe = Recipe {
            interp: Some(vec!["bash".into(), "-c".into(), "exec {cmd}".into()]),
            ..Default::default()
        };
        let task = task_with_cmd("echo hi");
        assert_eq!(
            interpreter_argv(&task, &recipe),
            vec!["bash", "-c", "exec echo hi"]
        );
    }

    #[test]
    fn empty_task_interpreter_means_platform_default() {
        // An explicitly empty template skips the recipe-wide one entirely.
        let recipe = Recipe {
            interp: Some(vec!["bash".into(), "-c".into(), "{cmd}".into()]),
            ..Default::default()
        };
        let task = Task {
            interp: Some(vec![]),
            cmd: "echo hi".into(),
            ..Default::default()
        };
        assert_eq!(
            interpreter_argv(&task, &recipe),
            default_interpreter("echo hi")
        );
    }

    #[test]
    fn placeholder_is_replaced_everywhere() {
        let recipe = Recipe::default();
        let task = Task {
            interp: Some(vec!["timer".into(), "{cmd}".into(), "--log={cmd}.log".into()]),
            cmd: "build".into(),
            ..Default::default()
        };
        assert_eq!(
            interpreter_argv(&task, &recipe),
            vec!["timer", "build", "--log=build.log"]
        );
    }

    #[test]
    fn empty_command_succeeds_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let result = execute(
            "noop",
            &task_with_cmd(""),
            &Recipe::default(),
            &empty_state(&dir),
            &Children::default(),
        );
        assert!(result.is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn zero_exit_is_a_success() {
        let dir = tempfile::tempdir().unwrap();
        let result = execute(
            "ok",
            &task_with_cmd("true"),
            &Recipe::default(),
            &empty_state(&dir),
            &Children::default(),
        );
        assert!(result.is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn non_zero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = execute(
            "bad",
            &task_with_cmd("false"),
            &Recipe::default(),
            &empty_state(&dir),
            &Children::default(),
        );
        let message = result.unwrap_err().to_string();
        assert!(message.contains("exit"), "unexpected message: {message}");
    }

    #[test]
    fn missing_interpreter_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let task = Task {
            interp: Some(vec!["surely-not-on-anyones-path".into()]),
            cmd: "irrelevant".into(),
            ..Default::default()
        };
        let result = execute(
            "ghost",
            &task,
            &Recipe::default(),
            &empty_state(&dir),
            &Children::default(),
        );
        assert!(matches!(result, Err(Error::FailedToSpawn(_))));
    }

    #[test]
    #[cfg(unix)]
    fn stdout_is_redirected_and_env_is_overlaid() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("captured.txt");

        let mut recipe = Recipe::default();
        recipe.env.insert("GREETING".into(), "hello".into());
        recipe.env.insert("NAME".into(), "recipe".into());

        let mut task = task_with_cmd("echo \"$GREETING $NAME\"");
        task.env.insert("NAME".into(), "task".into());
        task.stdout = Some(target.display().to_string());

        execute(
            "greet",
            &task,
            &recipe,
            &empty_state(&dir),
            &Children::default(),
        )?;

        // The task env overrides the recipe env for the same key.
        assert_eq!(std::fs::read_to_string(&target)?, "hello task\n");
        Ok(())
    }
}
