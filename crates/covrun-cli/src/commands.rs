//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// covrun: clean, instrument, test and report coverage for a Cargo project
#[derive(Parser, Debug)]
#[command(name = "covrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Config file (defaults to ./covrun.yaml when present)
    #[arg(short, long, global = true, env = "COVRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: clean, test, report, open
    Run(RunArgs),

    /// Delete stale coverage counter files
    Clean(CleanArgs),

    /// Run cargo test with coverage instrumentation
    Test(TestArgs),

    /// Aggregate counters into a report with grcov
    Report(ReportArgs),

    /// Open the generated report
    Open(OverrideArgs),

    /// Print the commands the pipeline would run
    Plan(PlanArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Check that cargo and grcov are available
    Doctor(OverrideArgs),
}

/// Overrides shared by every pipeline command
#[derive(Args, Debug, Default, Clone)]
pub struct OverrideArgs {
    /// Build output directory holding the counter files (`<target dir>/debug`)
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Report output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long)]
    pub format: Option<FormatArg>,

    /// Cargo toolchain for the test step (`none` to use the default)
    #[arg(long)]
    pub toolchain: Option<String>,
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Shared overrides
    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Print the plan instead of executing it
    #[arg(long)]
    pub dry_run: bool,

    /// Generate the report even when tests fail
    #[arg(long)]
    pub keep_going: bool,

    /// Do not open the report
    #[arg(long)]
    pub no_open: bool,

    /// Skip the cleanup step
    #[arg(long)]
    pub no_clean: bool,

    /// Extra arguments forwarded to `cargo test`
    #[arg(last = true)]
    pub cargo_args: Vec<String>,
}

/// Arguments for the clean command
#[derive(Parser, Debug, Default)]
pub struct CleanArgs {
    /// Shared overrides
    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// List matching files without deleting them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the test command
#[derive(Parser, Debug, Default)]
pub struct TestArgs {
    /// Shared overrides
    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Run cleanup first
    #[arg(long)]
    pub clean: bool,

    /// Extra arguments forwarded to `cargo test`
    #[arg(last = true)]
    pub cargo_args: Vec<String>,
}

/// Arguments for the report command
#[derive(Parser, Debug, Default)]
pub struct ReportArgs {
    /// Shared overrides
    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Open the report after generation
    #[arg(long)]
    pub open: bool,
}

/// Arguments for the plan command
#[derive(Parser, Debug, Default)]
pub struct PlanArgs {
    /// Shared overrides
    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug, Default)]
pub struct ConfigArgs {
    /// Write a default config file
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file with --init
    #[arg(long)]
    pub force: bool,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    /// Browsable HTML
    Html,
    /// lcov tracefile
    Lcov,
    /// Cobertura XML
    Cobertura,
    /// covdir JSON
    Covdir,
}

impl From<FormatArg> for covrun::ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => Self::Html,
            FormatArg::Lcov => Self::Lcov,
            FormatArg::Cobertura => Self::Cobertura,
            FormatArg::Covdir => Self::Covdir,
        }
    }
}

/// Color output argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_run_command() {
            let cli = Cli::parse_from(["covrun", "run"]);
            assert!(matches!(cli.command, Commands::Run(_)));
            assert_eq!(cli.verbose, 0);
            assert!(!cli.quiet);
        }

        #[test]
        fn test_parse_run_flags() {
            let cli = Cli::parse_from([
                "covrun",
                "run",
                "--dry-run",
                "--keep-going",
                "--no-open",
                "--build-dir",
                "out/debug",
                "--format",
                "lcov",
                "--",
                "--workspace",
            ]);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert!(args.dry_run);
            assert!(args.keep_going);
            assert!(args.no_open);
            assert_eq!(args.overrides.build_dir, Some(PathBuf::from("out/debug")));
            assert_eq!(args.overrides.format, Some(FormatArg::Lcov));
            assert_eq!(args.cargo_args, vec!["--workspace"]);
        }

        #[test]
        fn test_parse_verbosity() {
            let cli = Cli::parse_from(["covrun", "-vv", "plan"]);
            assert_eq!(cli.verbose, 2);
        }

        #[test]
        fn test_parse_global_config() {
            let cli = Cli::parse_from(["covrun", "clean", "--config", "ci.yaml", "--dry-run"]);
            assert_eq!(cli.config, Some(PathBuf::from("ci.yaml")));
            let Commands::Clean(args) = cli.command else {
                panic!("expected clean");
            };
            assert!(args.dry_run);
        }

        #[test]
        fn test_parse_test_forwarded_args() {
            let cli = Cli::parse_from(["covrun", "test", "--clean", "--", "-p", "covrun"]);
            let Commands::Test(args) = cli.command else {
                panic!("expected test");
            };
            assert!(args.clean);
            assert_eq!(args.cargo_args, vec!["-p", "covrun"]);
        }

        #[test]
        fn test_parse_config_init() {
            let cli = Cli::parse_from(["covrun", "config", "--init", "--force"]);
            let Commands::Config(args) = cli.command else {
                panic!("expected config");
            };
            assert!(args.init && args.force);
        }

        #[test]
        fn test_invalid_format_rejected() {
            assert!(Cli::try_parse_from(["covrun", "report", "--format", "pdf"]).is_err());
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["covrun"]).is_err());
        }
    }

    mod conversion_tests {
        use super::*;
        use crate::config::ColorChoice;

        #[test]
        fn test_format_conversion() {
            assert_eq!(
                covrun::ReportFormat::from(FormatArg::Cobertura),
                covrun::ReportFormat::Cobertura
            );
        }

        #[test]
        fn test_color_conversion() {
            assert_eq!(ColorChoice::from(ColorArg::Never), ColorChoice::Never);
            assert_eq!(ColorChoice::from(ColorArg::default()), ColorChoice::Auto);
        }
    }
}
