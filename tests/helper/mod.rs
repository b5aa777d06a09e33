#![allow(dead_code)]
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;

use stove_lib::state::State;

/// Write a recipe file into the test directory and hand back its path.
pub fn write_recipe(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    Ok(path)
}

/// The state sidecar belonging to a recipe path.
pub fn state_path(recipe: &Path) -> PathBuf {
    let mut path = recipe.as_os_str().to_os_string();
    path.push(".state");
    PathBuf::from(path)
}

/// Reopen the persisted state of a recipe for inspection.
pub fn reload_state(recipe: &Path) -> Result<State> {
    Ok(State::open(&state_path(recipe))?)
}

/// The lines a run appended to an output file. A missing file reads as no
/// lines at all.
pub fn read_lines(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => content.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}
