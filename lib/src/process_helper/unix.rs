/// The interpreter used when neither the task nor the recipe provides one.
/// `exec` replaces the shell with the command, saving one process level.
pub fn default_interpreter(cmd: &str) -> Vec<String> {
    vec!["/bin/sh".to_string(), "-c".to_string(), format!("exec {cmd}")]
}
