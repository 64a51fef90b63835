use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use dockship::logging;
use dockship::pipeline::connect_ssh;
use dockship::{Cli, GitHub, Pipeline, Terminal};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let pipeline = match setup(cli) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    // Stage failures are logged where they happen.
    match pipeline.run(&mut Terminal::new(), &GitHub::new(), &connect_ssh) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1)),
    }
}

fn setup(cli: Cli) -> anyhow::Result<Pipeline> {
    let pipeline = Pipeline::from_cli(cli).context("failed to load configuration")?;
    let log_path = logging::init(&pipeline.log_dir()).context("failed to open the run log")?;
    tracing::info!("Logging to {}", log_path.display());
    Ok(pipeline)
}
