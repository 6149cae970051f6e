//! Pipeline command handlers: run, clean, test, report, open, plan

use crate::commands::{CleanArgs, OverrideArgs, PlanArgs, ReportArgs, RunArgs, TestArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_plan, ProgressReporter};
use covrun::{CommandRunner, CovConfig, Pipeline, PipelineReport, Step, StepSelection};

fn reporter(config: &CliConfig) -> ProgressReporter {
    ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
}

/// Run `selection` with progress output and a summary
pub fn run_selection(
    config: &CliConfig,
    cov: &CovConfig,
    selection: StepSelection,
    runner: &dyn CommandRunner,
) -> CliResult<PipelineReport> {
    let pipeline = Pipeline::from_config(cov)?;
    tracing::debug!(steps = ?selection.steps(), build_dir = %cov.build_dir.display(), "pipeline ready");
    let mut reporter = reporter(config);
    let result = pipeline.run(runner, selection, &mut reporter);
    reporter.finish();
    let report = result?;
    reporter.summary(&report);
    report.ensure_success()?;
    Ok(report)
}

fn print_plan(cov: &CovConfig, selection: StepSelection, json: bool) -> CliResult<()> {
    let pipeline = Pipeline::from_config(cov)?;
    let plan = pipeline.plan(selection)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render_plan(&plan));
    }
    Ok(())
}

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs, runner: &dyn CommandRunner) -> CliResult<()> {
    let mut cov = config.pipeline_config(&args.overrides)?;
    cov.keep_going |= args.keep_going;
    if args.no_open {
        cov.open = false;
    }
    cov.instrumentation
        .test_args
        .extend(args.cargo_args.iter().cloned());

    let selection = Pipeline::default_selection(&cov).with(Step::Clean, !args.no_clean);
    if args.dry_run {
        return print_plan(&cov, selection, false);
    }
    run_selection(config, &cov, selection, runner).map(|_| ())
}

/// Execute the clean command
pub fn execute_clean(config: &CliConfig, args: &CleanArgs) -> CliResult<()> {
    let cov = config.pipeline_config(&args.overrides)?;
    let pipeline = Pipeline::from_config(&cov)?;
    if args.dry_run {
        for path in pipeline.cleanup().matches()? {
            println!("{}", path.display());
        }
        return Ok(());
    }
    let report = pipeline.cleanup().execute()?;
    let reporter = reporter(config);
    reporter.success(&format!(
        "Removed {} file(s) ({} bytes) under {}",
        report.removed_count(),
        report.bytes,
        pipeline.cleanup().root.display()
    ));
    for failure in &report.failures {
        reporter.warning(&format!("{}: {}", failure.path.display(), failure.message));
    }
    Ok(())
}

/// Execute the test command
pub fn execute_test(config: &CliConfig, args: &TestArgs, runner: &dyn CommandRunner) -> CliResult<()> {
    let mut cov = config.pipeline_config(&args.overrides)?;
    cov.instrumentation
        .test_args
        .extend(args.cargo_args.iter().cloned());
    let selection = StepSelection::only(Step::Test).with(Step::Clean, args.clean);
    run_selection(config, &cov, selection, runner).map(|_| ())
}

/// Execute the report command
pub fn execute_report(
    config: &CliConfig,
    args: &ReportArgs,
    runner: &dyn CommandRunner,
) -> CliResult<()> {
    let cov = config.pipeline_config(&args.overrides)?;
    let selection = StepSelection::only(Step::Report).with(Step::Open, args.open);
    run_selection(config, &cov, selection, runner).map(|_| ())
}

/// Execute the open command
pub fn execute_open(
    config: &CliConfig,
    args: &OverrideArgs,
    runner: &dyn CommandRunner,
) -> CliResult<()> {
    let cov = config.pipeline_config(args)?;
    let spec = cov.report_spec();
    let Some(entry) = spec.entry_file() else {
        return Err(CliError::invalid_argument(format!(
            "{} reports cannot be opened in a viewer",
            spec.format
        )));
    };
    if !entry.is_file() {
        return Err(CliError::invalid_argument(format!(
            "no report at {}; run `covrun report` first",
            entry.display()
        )));
    }
    run_selection(config, &cov, StepSelection::only(Step::Open), runner).map(|_| ())
}

/// Execute the plan command
pub fn execute_plan(config: &CliConfig, args: &PlanArgs) -> CliResult<()> {
    let cov = config.pipeline_config(&args.overrides)?;
    print_plan(&cov, Pipeline::default_selection(&cov), args.json)
}
