use std::path::PathBuf;

use clap::{Parser, ValueHint};

#[derive(Parser, Debug)]
#[command(
    name = "stove",
    about = "Run the tasks of declarative recipe files in parallel",
    author,
    version
)]
pub struct CliArguments {
    /// Paths of the recipe files to run, processed in order.
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    pub recipes: Vec<PathBuf>,

    /// Amount of parallel workers. Defaults to the number of CPUs.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Run this task instead of the recipe's main task.
    #[arg(short = 'm', long = "main", value_name = "TASK")]
    pub main: Option<String>,

    /// Show more information
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Show less information
    #[arg(short, long)]
    pub quiet: bool,
}
