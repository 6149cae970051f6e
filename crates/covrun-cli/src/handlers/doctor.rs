//! Doctor command handler

use crate::commands::OverrideArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use covrun::{CommandRunner, CommandSpec, CovConfig};

/// One tool probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    /// Display name
    pub name: String,
    /// Probe command
    pub command: CommandSpec,
    /// Whether the probe exited successfully
    pub ok: bool,
}

/// Version probes for the tools `cov` needs
#[must_use]
pub fn probes(cov: &CovConfig) -> Vec<(String, CommandSpec)> {
    let mut cargo = CommandSpec::new("cargo");
    let mut cargo_name = "cargo".to_string();
    if let Some(ref toolchain) = cov.instrumentation.toolchain {
        cargo = cargo.arg(format!("+{toolchain}"));
        cargo_name = format!("cargo +{toolchain}");
    }
    vec![
        (cargo_name, cargo.arg("--version")),
        ("grcov".to_string(), CommandSpec::new("grcov").arg("--version")),
    ]
}

/// Run every probe, never stopping early
pub fn check_tools(cov: &CovConfig, runner: &dyn CommandRunner) -> Vec<ToolCheck> {
    probes(cov)
        .into_iter()
        .map(|(name, command)| {
            let ok = runner.run(&command).is_ok_and(|outcome| outcome.success());
            ToolCheck { name, command, ok }
        })
        .collect()
}

/// Execute the doctor command
pub fn execute_doctor(
    config: &CliConfig,
    args: &OverrideArgs,
    runner: &dyn CommandRunner,
) -> CliResult<()> {
    let cov = config.pipeline_config(args)?;
    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    reporter.header("Environment");

    let checks = check_tools(&cov, runner);
    for check in &checks {
        if check.ok {
            reporter.success(&check.name);
        } else {
            reporter.failure(&format!("{} (`{}` failed)", check.name, check.command));
        }
    }

    if cov.instrumentation.requires_nightly() && cov.instrumentation.toolchain.is_none() {
        reporter.warning("-Z flags are enabled but no toolchain is set; the default toolchain must be nightly");
    }
    if let Err(e) = cov.validate() {
        reporter.failure(&e.to_string());
        return Err(e.into());
    }

    let missing: Vec<_> = checks
        .iter()
        .filter(|c| !c.ok)
        .map(|c| c.name.as_str())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CliError::doctor(format!("unavailable: {}", missing.join(", "))))
    }
}
