// deepsense-cli/src/main.rs
//
// Entry point of the `deepsense` binary.
//
// Parses arguments, sets up logging, resolves the configuration and runs the
// selected command. Results are printed to stdout as JSON; failures are
// printed as `{"error", "details"}` objects and mapped to exit codes
// (0 success, 1 failure, 2 invalid input, 3 cancelled).

use clap::Parser;
use deepsense_cli::config::load_config;
use deepsense_cli::error::{CliResult, EXIT_OK, error_json, exit_code};
use deepsense_cli::{Cli, Commands, logging, run_analyze, run_ask, run_check};
use deepsense_core::AnalyzeResponse;
use std::process;

/// Runs the selected command and returns the JSON to print, if any.
fn run(cli: &Cli) -> CliResult<Option<String>> {
    match &cli.command {
        Commands::Analyze(args) => {
            let config = load_config(cli.config.as_deref())?;
            let outcome = run_analyze(args, config)?;
            let response = AnalyzeResponse::success(outcome.analysis);
            Ok(Some(serde_json::to_string(&response)?))
        }
        Commands::Ask(args) => {
            let config = load_config(cli.config.as_deref())?;
            let answer = run_ask(args, &config)?;
            Ok(Some(serde_json::to_string(&answer)?))
        }
        Commands::Check => {
            run_check()?;
            Ok(None)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(path) = logging::init(cli.verbose, cli.log_dir.as_deref()) {
        eprintln!("Logging to {}", path.display());
    }

    let code = match run(&cli) {
        Ok(output) => {
            if let Some(json) = output {
                println!("{}", json);
            }
            EXIT_OK
        }
        Err(e) => {
            log::error!("{}", e);
            println!("{}", error_json(&e));
            exit_code(&e)
        }
    };

    process::exit(code);
}
