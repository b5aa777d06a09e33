use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use json_comments::StripComments;
use log::warn;
use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

/// A single unit of work: one command line plus its metadata.
#[derive(PartialEq, Eq, Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Task {
    /// Names of the tasks that have to succeed before this one may start.
    pub deps: Vec<String>,
    /// Task-local environment, overlaid on the recipe environment.
    pub env: BTreeMap<String, String>,
    /// Task-local interpreter template. Overrides the recipe template when
    /// present; an explicitly empty template falls back to the platform
    /// default.
    pub interp: Option<Vec<String>>,
    /// The command string. An empty command is a no-op that succeeds.
    pub cmd: String,
    /// Redirect the child's stdout into this file. Inherited when unset.
    pub stdout: Option<String>,
    /// Redirect the child's stderr into this file. Inherited when unset.
    pub stderr: Option<String>,
    /// Report a non-zero exit of this task as a success to the scheduler.
    pub allow_failure: bool,
}

impl Task {
    /// The stdout redirection target, with the empty string treated the same
    /// as an absent one.
    pub fn stdout_path(&self) -> Option<&Path> {
        redirection_path(&self.stdout)
    }

    /// The stderr redirection target.
    pub fn stderr_path(&self) -> Option<&Path> {
        redirection_path(&self.stderr)
    }
}

fn redirection_path(target: &Option<String>) -> Option<&Path> {
    match target.as_deref() {
        Some("") | None => None,
        Some(path) => Some(Path::new(path)),
    }
}

/// The top-level declarative document: tasks, their commands and their
/// dependencies. Immutable once loaded.
#[derive(PartialEq, Eq, Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Recipe {
    /// The default goal task.
    pub main: Option<String>,
    /// Environment applied to every task.
    pub env: BTreeMap<String, String>,
    /// The recipe-wide interpreter template. Each element may contain the
    /// `{cmd}` placeholder, which is substituted with a task's command.
    pub interp: Option<Vec<String>>,
    /// All tasks, keyed by their unique name.
    pub tasks: BTreeMap<String, Task>,
}

impl Recipe {
    /// Read and decode a recipe file. The decoder is picked by extension:
    /// `.json` (C-style comments allowed) or `.toml`.
    pub fn load(path: &Path) -> Result<Recipe, Error> {
        let wrap = |err: String| Error::Load(path.to_path_buf(), err);

        let extension = path.extension().and_then(|ext| ext.to_str());
        let recipe = match extension {
            Some("json") => {
                let file = File::open(path).map_err(|err| wrap(err.to_string()))?;
                let reader = StripComments::new(BufReader::new(file));
                serde_json::from_reader(reader).map_err(|err| wrap(err.to_string()))?
            }
            Some("toml") => {
                let content =
                    std::fs::read_to_string(path).map_err(|err| wrap(err.to_string()))?;
                toml::from_str(&content).map_err(|err| wrap(err.to_string()))?
            }
            _ => return Err(Error::UnknownFiletype(path.to_path_buf())),
        };

        Ok(recipe)
    }

    /// The goal of the recipe, with an empty `main` treated as absent.
    pub fn main_task(&self) -> Option<&str> {
        self.main.as_deref().filter(|main| !main.is_empty())
    }

    /// Check the recipe for inconsistencies that would break a run: dangling
    /// dependency references, an unknown main task and dependency cycles.
    /// Suspicious but harmless constructs only produce warnings.
    pub fn check(&self) -> Result<(), Error> {
        if self.tasks.is_empty() {
            warn!("Empty list of tasks");
            return Ok(());
        }

        for (name, task) in &self.tasks {
            if task.cmd.is_empty() {
                warn!("In task '{name}': No cmd");
            }
            for dep in &task.deps {
                if !self.tasks.contains_key(dep) {
                    return Err(Error::UnknownDependency(name.clone(), dep.clone()));
                }
            }
        }

        match self.main_task() {
            None => warn!("No main task"),
            Some(main) => {
                if !self.tasks.contains_key(main) {
                    return Err(Error::UnknownMainTask(main.to_string()));
                }
            }
        }

        self.check_cycles()
    }

    /// Depth-first walk over the dependency graph. A task that shows up on
    /// its own dependency path is a cycle and rejected, so neither the
    /// resolver nor the scheduler can be sent in circles.
    fn check_cycles(&self) -> Result<(), Error> {
        #[derive(PartialEq)]
        enum Mark {
            OnPath,
            Finished,
        }

        fn visit<'a>(
            recipe: &'a Recipe,
            name: &'a str,
            marks: &mut BTreeMap<&'a str, Mark>,
        ) -> Result<(), Error> {
            match marks.get(name) {
                Some(Mark::Finished) => return Ok(()),
                Some(Mark::OnPath) => return Err(Error::DependencyCycle(name.to_string())),
                None => {}
            }
            marks.insert(name, Mark::OnPath);
            // Dangling references were already rejected above.
            for dep in &recipe.tasks[name].deps {
                visit(recipe, dep, marks)?;
            }
            marks.insert(name, Mark::Finished);
            Ok(())
        }

        let mut marks = BTreeMap::new();
        for name in self.tasks.keys() {
            visit(self, name, &mut marks)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn write_recipe(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn load_toml() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_recipe(
            &dir,
            "build.toml",
            r#"
main = "t1"
interp = ["bash", "-c", "exec {cmd}"]

[env]
PROFILE = "release"

[tasks.t1]
deps = ["t2"]
cmd = "echo t1"

[tasks.t2]
deps = []
cmd = "echo t2"
interp = []
stdout = "t2.log"
allow_failure = true
"#,
        );

        let recipe = Recipe::load(&path)?;
        recipe.check()?;

        assert_eq!(recipe.main_task(), Some("t1"));
        assert_eq!(recipe.env["PROFILE"], "release");
        assert_eq!(
            recipe.interp,
            Some(vec!["bash".into(), "-c".into(), "exec {cmd}".into()])
        );

        let t2 = &recipe.tasks["t2"];
        assert_eq!(t2.interp, Some(vec![]));
        assert_eq!(t2.stdout_path(), Some(Path::new("t2.log")));
        assert_eq!(t2.stderr_path(), None);
        assert!(t2.allow_failure);

        Ok(())
    }

    #[test]
    fn load_json_with_comments() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_recipe(
            &dir,
            "build.json",
            r#"
{
    // The default goal.
    "main": "t1",
    "interp": ["bash", "-c", "exec {cmd}"],
    "tasks": {
        "t1": {"deps": ["t2"], "cmd": "echo t1"},
        /* A block comment is fine too. */
        "t2": {"deps": [], "cmd": "echo t2"}
    }
}
"#,
        );

        let recipe = Recipe::load(&path)?;
        recipe.check()?;
        assert_eq!(recipe.tasks["t1"].deps, vec!["t2".to_string()]);
        assert!(recipe.tasks["t2"].interp.is_none());

        Ok(())
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recipe(&dir, "build.yaml", "main: t1");
        let result = Recipe::load(&path);
        assert!(matches!(result, Err(Error::UnknownFiletype(_))));
    }

    #[test]
    fn load_errors_carry_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recipe(&dir, "broken.json", "{ not json");
        let message = Recipe::load(&path).unwrap_err().to_string();
        assert!(message.contains("broken.json"));
    }

    #[test]
    fn dangling_dependency_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recipe(
            &dir,
            "build.toml",
            r#"
main = "t1"

[tasks.t1]
deps = ["ghost"]
cmd = "echo t1"
"#,
        );
        let recipe = Recipe::load(&path).unwrap();
        let message = recipe.check().unwrap_err().to_string();
        assert!(message.contains("t1"));
        assert!(message.contains("ghost"));
    }

    #[test]
    fn unknown_main_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recipe(
            &dir,
            "build.toml",
            r#"
main = "ghost"

[tasks.t1]
cmd = "echo t1"
"#,
        );
        let recipe = Recipe::load(&path).unwrap();
        assert!(matches!(
            recipe.check(),
            Err(Error::UnknownMainTask(main)) if main == "ghost"
        ));
    }

    #[test]
    fn dependency_cycles_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recipe(
            &dir,
            "build.toml",
            r#"
main = "t1"

[tasks.t1]
deps = ["t2"]
cmd = "echo t1"

[tasks.t2]
deps = ["t3"]
cmd = "echo t2"

[tasks.t3]
deps = ["t1"]
cmd = "echo t3"
"#,
        );
        let recipe = Recipe::load(&path).unwrap();
        assert!(matches!(recipe.check(), Err(Error::DependencyCycle(_))));
    }

    #[test]
    fn shared_subtrees_are_not_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recipe(
            &dir,
            "build.toml",
            r#"
main = "all"

[tasks.all]
deps = ["left", "right"]
cmd = ""

[tasks.left]
deps = ["base"]
cmd = "echo left"

[tasks.right]
deps = ["base"]
cmd = "echo right"

[tasks.base]
cmd = "echo base"
"#,
        );
        let recipe = Recipe::load(&path).unwrap();
        assert!(recipe.check().is_ok());
    }
}
