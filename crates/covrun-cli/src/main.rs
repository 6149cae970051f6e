//! covrun: coverage runs for Cargo projects
//!
//! ## Usage
//!
//! ```bash
//! covrun run                      # clean, test, report, open
//! covrun run --keep-going         # report even when tests fail
//! covrun plan                     # print the commands without running them
//! covrun report --format lcov     # aggregate existing counters only
//! ```

use clap::Parser;
use covrun::SystemRunner;
use covrun_cli::{handlers, logging, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    logging::init(config.verbosity, config.color.should_color());

    let runner = SystemRunner;
    match cli.command {
        Commands::Run(args) => handlers::execute_run(&config, &args, &runner),
        Commands::Clean(args) => handlers::execute_clean(&config, &args),
        Commands::Test(args) => handlers::execute_test(&config, &args, &runner),
        Commands::Report(args) => handlers::execute_report(&config, &args, &runner),
        Commands::Open(args) => handlers::execute_open(&config, &args, &runner),
        Commands::Plan(args) => handlers::execute_plan(&config, &args),
        Commands::Config(args) => handlers::execute_config(&config, &args),
        Commands::Doctor(args) => handlers::execute_doctor(&config, &args, &runner),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_config_path(cli.config.clone())
}
