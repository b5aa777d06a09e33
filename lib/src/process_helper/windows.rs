/// The interpreter used when neither the task nor the recipe provides one.
pub fn default_interpreter(cmd: &str) -> Vec<String> {
    vec!["cmd".to_string(), "/c".to_string(), cmd.to_string()]
}
