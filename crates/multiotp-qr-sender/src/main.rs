#![doc = include_str!("../README.md")]

mod sender;

use clap::Parser;
use sender::config::{CliArgs, RunConfig};
use sender::run::{Collaborators, run};
use sender::telemetry::init_logging;
use std::process::ExitCode;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    let config = match RunConfig::try_from(args) {
        Ok(config) => config,
        Err(err) => {
            println!("invalid configuration:\n\t{err:#}");
            return ExitCode::FAILURE;
        }
    };

    // Nothing can be logged or reported until the log file exists.
    let log = match init_logging(&config.log_dir, config.keep_logs) {
        Ok(log) => log,
        Err(err) => {
            println!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let collaborators = Collaborators::from_config(&config);
    match run(&config, &log, collaborators).await {
        Ok(report) => {
            print!("{}", report.render_summary());
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("err ({err}), check log: {}", log.path.display());
            ExitCode::FAILURE
        }
    }
}
