//! covrun: gcov coverage runs for Cargo projects
//!
//! Replaces the usual four-line coverage script with a typed pipeline:
//!
//! ```text
//! ┌─────────┐    ┌──────────────┐    ┌──────────────┐    ┌─────────┐
//! │  clean  │───►│  cargo test  │───►│    grcov     │───►│  open   │
//! │ *.gcda  │    │ -Zprofile …  │    │ -t html …    │    │ index   │
//! └─────────┘    └──────────────┘    └──────────────┘    └─────────┘
//! ```
//!
//! Every external invocation is a [`CommandSpec`] executed through a
//! [`CommandRunner`], so the whole pipeline can be planned, printed and
//! tested without a toolchain.
//!
//! ```no_run
//! use covrun::{CovConfig, NoopObserver, Pipeline, SystemRunner};
//!
//! let config = CovConfig::load(None)?;
//! let pipeline = Pipeline::from_config(&config)?;
//! let report = pipeline.run(&SystemRunner, Pipeline::default_selection(&config), &mut NoopObserver)?;
//! report.ensure_success()?;
//! # Ok::<(), covrun::CovError>(())
//! ```

#![warn(missing_docs)]

pub mod cleanup;
pub mod command;
pub mod config;
mod error;
pub mod exclusions;
pub mod instrumentation;
pub mod pipeline;
pub mod report;

pub use cleanup::{CleanupFailure, CleanupPlan, CleanupReport, GCDA_PATTERN};
pub use command::{
    shell_quote, CommandRunner, CommandSpec, ExitOutcome, RecordingRunner, SystemRunner,
};
pub use config::{CleanupOptions, CovConfig, ReportOptions, DEFAULT_BUILD_DIR, DEFAULT_CONFIG_FILE};
pub use error::{CovError, CovResult};
pub use exclusions::ExclusionSet;
pub use instrumentation::InstrumentationProfile;
pub use pipeline::{
    NoopObserver, Pipeline, PipelineObserver, PipelineReport, PlannedStep, Step, StepOutcome,
    StepSelection, StepStatus,
};
pub use report::{ReportFormat, ReportSpec, Viewer};
