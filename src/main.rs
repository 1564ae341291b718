//! baton - round-robin agent relay with a durable message log.

use clap::Parser;
use std::process::ExitCode;

use baton::cli::Commands;

#[tokio::main]
async fn main() -> ExitCode {
    // Hold the guard so buffered file logs are flushed on exit.
    let _guard = match baton::logging::init() {
        Ok((guard, _log_dir)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let args = Commands::parse();

    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
