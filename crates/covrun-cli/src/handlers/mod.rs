//! Command handlers - extracted from main.rs for testability
//!
//! Handlers that launch tools take a [`covrun::CommandRunner`], so tests
//! drive them with a recording runner.

pub mod config;
pub mod doctor;
pub mod pipeline;

pub use config::{execute_config, write_default_config};
pub use doctor::{check_tools, execute_doctor, ToolCheck};
pub use pipeline::{
    execute_clean, execute_open, execute_plan, execute_report, execute_run, execute_test,
    run_selection,
};
