use crate::cli::FetchBenchCli;
use clap::Parser;

/// Initialise the CLI and logging for the benchmark runner.
pub fn init() -> FetchBenchCli {
    env_logger::init();

    FetchBenchCli::parse()
}
