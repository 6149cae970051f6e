//! covrun CLI library
//!
//! Command-line surface over the [`covrun`] pipeline.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)] // String building is clear and correct
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    CleanArgs, Cli, ColorArg, Commands, ConfigArgs, FormatArg, OverrideArgs, PlanArgs, ReportArgs,
    RunArgs, TestArgs,
};
pub use config::{apply_overrides, CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_plan, ProgressReporter};
