use anyhow::Result;
use clap::Parser;
use log::error;
use simplelog::{Config, LevelFilter, SimpleLogger};

use stove_lib::runner::Runner;

mod cli;

use cli::CliArguments;

fn main() -> Result<()> {
    let arguments = CliArguments::parse();

    let level = if arguments.verbose {
        LevelFilter::Debug
    } else if arguments.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    SimpleLogger::init(level, Config::default())?;

    let workers = arguments.workers.unwrap_or_else(default_worker_count).max(1);

    for path in &arguments.recipes {
        let runner = match Runner::open(path) {
            Ok(runner) => runner,
            Err(err) => fatal(&err),
        };

        let result = match &arguments.main {
            Some(task) => runner.run_task(task, workers),
            None => runner.run_main(workers),
        };
        if let Err(err) = result {
            fatal(&err);
        }
    }

    Ok(())
}

/// Log the error that ends this invocation and exit non-zero.
fn fatal(err: &stove_lib::Error) -> ! {
    error!("{err}");
    std::process::exit(1);
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1)
}
