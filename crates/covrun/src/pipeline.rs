//! The clean → test → report → open pipeline

use crate::cleanup::{CleanupPlan, CleanupReport};
use crate::command::{CommandRunner, CommandSpec};
use crate::config::CovConfig;
use crate::error::{CovError, CovResult};
use crate::instrumentation::InstrumentationProfile;
use crate::report::{ReportSpec, Viewer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// One pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Remove stale counter files
    Clean,
    /// Run the instrumented test suite
    Test,
    /// Aggregate counters into a report
    Report,
    /// Open the report
    Open,
}

impl Step {
    /// All steps in execution order
    pub const ALL: [Self; 4] = [Self::Clean, Self::Test, Self::Report, Self::Open];

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Test => "test",
            Self::Report => "report",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which steps to run; execution order is always [`Step::ALL`] order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepSelection {
    /// Run cleanup
    pub clean: bool,
    /// Run tests
    pub test: bool,
    /// Generate report
    pub report: bool,
    /// Open report
    pub open: bool,
}

impl StepSelection {
    /// Every step
    #[must_use]
    pub const fn all() -> Self {
        Self {
            clean: true,
            test: true,
            report: true,
            open: true,
        }
    }

    /// A single step
    #[must_use]
    pub const fn only(step: Step) -> Self {
        Self::none().with(step, true)
    }

    /// No steps
    #[must_use]
    pub const fn none() -> Self {
        Self {
            clean: false,
            test: false,
            report: false,
            open: false,
        }
    }

    /// Toggle one step
    #[must_use]
    pub const fn with(mut self, step: Step, enabled: bool) -> Self {
        match step {
            Step::Clean => self.clean = enabled,
            Step::Test => self.test = enabled,
            Step::Report => self.report = enabled,
            Step::Open => self.open = enabled,
        }
        self
    }

    /// Whether `step` is selected
    #[must_use]
    pub const fn contains(self, step: Step) -> bool {
        match step {
            Step::Clean => self.clean,
            Step::Test => self.test,
            Step::Report => self.report,
            Step::Open => self.open,
        }
    }

    /// Selected steps in execution order
    #[must_use]
    pub fn steps(self) -> Vec<Step> {
        Step::ALL.into_iter().filter(|s| self.contains(*s)).collect()
    }
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum StepStatus {
    /// Completed normally
    Succeeded,
    /// External tool exited unsuccessfully but the pipeline continued
    Failed {
        /// Exit code, if any
        code: Option<i32>,
    },
    /// Nothing to do
    Skipped {
        /// Why
        reason: String,
    },
    /// Environment problem that does not fail the run
    Warned {
        /// What went wrong
        message: String,
    },
}

/// Record of one executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Step
    pub step: Step,
    /// Result
    pub status: StepStatus,
    /// Wall time
    pub duration: Duration,
    /// Cleanup statistics, for the clean step
    pub cleanup: Option<CleanupReport>,
}

/// Everything that happened during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Outcomes in execution order
    pub outcomes: Vec<StepOutcome>,
    /// Report entry page, when one was generated
    pub entry_file: Option<PathBuf>,
    /// Total wall time
    pub duration: Duration,
}

impl PipelineReport {
    /// Outcome of `step`, if it ran
    #[must_use]
    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.step == step)
    }

    /// First step that failed while the pipeline kept going
    #[must_use]
    pub fn first_failure(&self) -> Option<(Step, Option<i32>)> {
        self.outcomes.iter().find_map(|o| match o.status {
            StepStatus::Failed { code } => Some((o.step, code)),
            _ => None,
        })
    }

    /// Turn a deferred failure into an error
    pub fn ensure_success(&self) -> CovResult<()> {
        match self.first_failure() {
            Some((step, code)) => Err(CovError::StepFailed { step, code }),
            None => Ok(()),
        }
    }

    /// Steps that ran, in order
    #[must_use]
    pub fn steps(&self) -> Vec<Step> {
        self.outcomes.iter().map(|o| o.step).collect()
    }
}

/// A step as it would run, for dry runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    /// Step
    pub step: Step,
    /// External command, if the step launches one
    pub command: Option<CommandSpec>,
    /// Files the clean step would delete
    pub matches: Vec<PathBuf>,
    /// Why the step would be skipped
    pub skip_reason: Option<String>,
}

/// Progress callbacks
pub trait PipelineObserver {
    /// A step is about to run
    fn step_started(&mut self, _step: Step) {}

    /// A step has finished (including deferred failures)
    fn step_finished(&mut self, _outcome: &StepOutcome) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Validated, ready-to-run pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    cleanup: CleanupPlan,
    instrumentation: InstrumentationProfile,
    target_dir: Option<PathBuf>,
    report: ReportSpec,
    viewer: Viewer,
    keep_going: bool,
}

impl Pipeline {
    /// Build a pipeline, validating the config first
    pub fn from_config(config: &CovConfig) -> CovResult<Self> {
        config.validate()?;
        let pipeline = Self {
            cleanup: config.cleanup_plan(),
            instrumentation: config.instrumentation.clone(),
            target_dir: config.cargo_target_dir(),
            report: config.report_spec(),
            viewer: config.viewer.clone(),
            keep_going: config.keep_going,
        };
        debug_assert_eq!(pipeline.cleanup.root, pipeline.report.build_dir);
        Ok(pipeline)
    }

    /// Default step selection for `config`
    #[must_use]
    pub fn default_selection(config: &CovConfig) -> StepSelection {
        StepSelection::all().with(Step::Open, config.open)
    }

    /// Cleanup plan
    #[must_use]
    pub const fn cleanup(&self) -> &CleanupPlan {
        &self.cleanup
    }

    /// Report spec
    #[must_use]
    pub const fn report(&self) -> &ReportSpec {
        &self.report
    }

    /// The `cargo test` command, building into the report's build directory
    #[must_use]
    pub fn test_command(&self) -> CommandSpec {
        let spec = self.instrumentation.test_command();
        match self.target_dir {
            Some(ref dir) => spec.env("CARGO_TARGET_DIR", dir.to_string_lossy()),
            None => spec,
        }
    }

    /// The `grcov` command
    #[must_use]
    pub fn report_command(&self) -> CommandSpec {
        self.report.command()
    }

    /// The viewer command, for browsable formats
    #[must_use]
    pub fn open_command(&self) -> Option<CommandSpec> {
        self.report
            .entry_file()
            .map(|entry| self.viewer.command(&entry))
    }

    /// Describe what `run` would do, without side effects
    pub fn plan(&self, selection: StepSelection) -> CovResult<Vec<PlannedStep>> {
        selection
            .steps()
            .into_iter()
            .map(|step| {
                let planned = match step {
                    Step::Clean => PlannedStep {
                        step,
                        command: None,
                        matches: self.cleanup.matches()?,
                        skip_reason: None,
                    },
                    Step::Test => Self::planned(step, Some(self.test_command())),
                    Step::Report => Self::planned(step, Some(self.report_command())),
                    Step::Open => match self.open_command() {
                        Some(cmd) => Self::planned(step, Some(cmd)),
                        None => PlannedStep {
                            skip_reason: Some(self.no_entry_reason()),
                            ..Self::planned(step, None)
                        },
                    },
                };
                Ok(planned)
            })
            .collect()
    }

    fn planned(step: Step, command: Option<CommandSpec>) -> PlannedStep {
        PlannedStep {
            step,
            command,
            matches: Vec::new(),
            skip_reason: None,
        }
    }

    fn no_entry_reason(&self) -> String {
        format!("{} reports have no entry page", self.report.format)
    }

    /// Run the selected steps in order.
    ///
    /// Stops at the first failing step. With `keep_going`, a failed test
    /// step is recorded and the report step still runs; the caller decides
    /// what to do with the deferred failure via
    /// [`PipelineReport::ensure_success`].
    pub fn run(
        &self,
        runner: &dyn CommandRunner,
        selection: StepSelection,
        observer: &mut dyn PipelineObserver,
    ) -> CovResult<PipelineReport> {
        let start = Instant::now();
        let mut report = PipelineReport::default();

        for step in selection.steps() {
            observer.step_started(step);
            tracing::info!(%step, "step started");
            let step_start = Instant::now();

            let (status, cleanup) = match step {
                Step::Clean => {
                    let cleaned = self.cleanup.execute()?;
                    let status = if cleaned.is_clean() {
                        StepStatus::Succeeded
                    } else {
                        StepStatus::Warned {
                            message: format!(
                                "{} stale file(s) could not be removed",
                                cleaned.failures.len()
                            ),
                        }
                    };
                    (status, Some(cleaned))
                }
                Step::Test => (self.run_tests(runner, selection)?, None),
                Step::Report => {
                    self.run_report(runner)?;
                    report.entry_file = self.report.entry_file();
                    (StepStatus::Succeeded, None)
                }
                Step::Open => (self.open_report(runner), None),
            };

            let outcome = StepOutcome {
                step,
                status,
                duration: step_start.elapsed(),
                cleanup,
            };
            tracing::info!(%step, status = ?outcome.status, elapsed = ?outcome.duration, "step finished");
            observer.step_finished(&outcome);
            report.outcomes.push(outcome);
        }

        report.duration = start.elapsed();
        Ok(report)
    }

    fn run_tests(
        &self,
        runner: &dyn CommandRunner,
        selection: StepSelection,
    ) -> CovResult<StepStatus> {
        let spec = self.test_command();
        tracing::debug!(command = %spec, "instrumented test run");
        let outcome = runner.run(&spec)?;
        if outcome.success() {
            return Ok(StepStatus::Succeeded);
        }
        if self.keep_going && selection.report {
            tracing::warn!(code = ?outcome.code, "tests failed, generating report anyway");
            Ok(StepStatus::Failed { code: outcome.code })
        } else {
            Err(CovError::StepFailed {
                step: Step::Test,
                code: outcome.code,
            })
        }
    }

    fn run_report(&self, runner: &dyn CommandRunner) -> CovResult<()> {
        if !self.report.build_dir.is_dir() {
            tracing::warn!(
                build_dir = %self.report.build_dir.display(),
                "build directory does not exist; grcov will find no counters"
            );
        }
        let spec = self.report_command();
        tracing::debug!(command = %spec, "aggregating coverage");
        let outcome = runner.run(&spec)?;
        if outcome.success() {
            Ok(())
        } else {
            Err(CovError::StepFailed {
                step: Step::Report,
                code: outcome.code,
            })
        }
    }

    fn open_report(&self, runner: &dyn CommandRunner) -> StepStatus {
        let Some(entry) = self.report.entry_file() else {
            return StepStatus::Skipped {
                reason: self.no_entry_reason(),
            };
        };
        let spec = self.viewer.command(&entry);
        match runner.run(&spec) {
            Ok(outcome) if outcome.success() => StepStatus::Succeeded,
            Ok(outcome) => {
                tracing::warn!(program = %spec.program, code = ?outcome.code, "viewer failed");
                let code = outcome
                    .code
                    .map(|c| format!(" (exit code {c})"))
                    .unwrap_or_default();
                StepStatus::Warned {
                    message: format!(
                        "`{}` could not open the report{code}; open {} manually",
                        spec.program,
                        entry.display()
                    ),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not open report");
                StepStatus::Warned {
                    message: format!("open {} manually: {e}", entry.display()),
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::command::{ExitOutcome, RecordingRunner};
    use crate::report::ReportFormat;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
    }

    impl PipelineObserver for EventLog {
        fn step_started(&mut self, step: Step) {
            self.events.push(format!("start:{step}"));
        }

        fn step_finished(&mut self, outcome: &StepOutcome) {
            self.events.push(format!("finish:{}", outcome.step));
        }
    }

    fn config_in(temp: &TempDir) -> CovConfig {
        CovConfig::new()
            .with_build_dir(temp.path().join("target/debug"))
            .with_open(true)
    }

    fn run_all(config: &CovConfig, runner: &RecordingRunner) -> CovResult<PipelineReport> {
        let pipeline = Pipeline::from_config(config).unwrap();
        pipeline.run(runner, StepSelection::all(), &mut NoopObserver)
    }

    mod selection_tests {
        use super::*;

        #[test]
        fn test_all_in_order() {
            assert_eq!(StepSelection::all().steps(), Step::ALL.to_vec());
        }

        #[test]
        fn test_only() {
            assert_eq!(StepSelection::only(Step::Report).steps(), vec![Step::Report]);
        }

        #[test]
        fn test_order_is_fixed() {
            let selection = StepSelection::none()
                .with(Step::Open, true)
                .with(Step::Clean, true);
            assert_eq!(selection.steps(), vec![Step::Clean, Step::Open]);
        }

        #[test]
        fn test_default_selection_respects_open_flag() {
            let config = CovConfig::new().with_open(false);
            let selection = Pipeline::default_selection(&config);
            assert!(!selection.open);
            assert!(selection.clean && selection.test && selection.report);
        }

        #[test]
        fn test_step_display() {
            assert_eq!(Step::Clean.to_string(), "clean");
            assert_eq!(
                serde_json::to_string(&Step::Report).unwrap(),
                "\"report\""
            );
        }
    }

    mod run_tests {
        use super::*;

        #[test]
        fn test_full_run_order_and_commands() {
            let temp = TempDir::new().unwrap();
            let config = config_in(&temp);
            let runner = RecordingRunner::new();

            let report = run_all(&config, &runner).unwrap();

            assert_eq!(report.steps(), Step::ALL.to_vec());
            let calls = runner.calls();
            assert_eq!(calls.len(), 3);
            assert_eq!(calls[0].program, "cargo");
            assert_eq!(calls[1].program, "grcov");
            assert_eq!(
                calls[2].args.last().map(PathBuf::from),
                Some(temp.path().join("target/debug/coverage/index.html"))
            );
            assert!(report.ensure_success().is_ok());
        }

        #[test]
        fn test_cleanup_runs_before_tests() {
            let temp = TempDir::new().unwrap();
            let config = config_in(&temp);
            let deps = temp.path().join("target/debug/deps");
            fs::create_dir_all(&deps).unwrap();
            fs::write(deps.join("stale.gcda"), b"old").unwrap();
            fs::write(deps.join("keep.d"), b"dep").unwrap();

            let report = run_all(&config, &RecordingRunner::new()).unwrap();

            let cleaned = report.outcome(Step::Clean).unwrap().cleanup.clone().unwrap();
            assert_eq!(cleaned.removed_count(), 1);
            assert!(!deps.join("stale.gcda").exists());
            assert!(deps.join("keep.d").exists());
        }

        #[test]
        fn test_clean_test_and_report_share_build_dir() {
            let temp = TempDir::new().unwrap();
            let config = config_in(&temp);
            let pipeline = Pipeline::from_config(&config).unwrap();
            let runner = RecordingRunner::new();

            let selection = StepSelection::only(Step::Test).with(Step::Report, true);
            pipeline.run(&runner, selection, &mut NoopObserver).unwrap();

            let calls = runner.calls();
            let cargo_target = PathBuf::from(calls[0].env_value("CARGO_TARGET_DIR").unwrap());
            let grcov_input = PathBuf::from(&calls[1].args[0]);
            assert_eq!(cargo_target.join("debug"), grcov_input);
            assert_eq!(grcov_input, pipeline.cleanup().root);
        }

        #[test]
        fn test_relative_build_dir_reaches_cargo() {
            let config = CovConfig::new().with_build_dir("out/debug");
            let pipeline = Pipeline::from_config(&config).unwrap();

            let cargo = pipeline.test_command();
            assert_eq!(cargo.env_value("CARGO_TARGET_DIR"), Some("out"));
            assert_eq!(pipeline.report_command().args[0], "out/debug");
        }

        #[test]
        fn test_default_build_dir_keeps_cargo_env() {
            let pipeline = Pipeline::from_config(&CovConfig::new()).unwrap();
            let cargo = pipeline.test_command();
            assert_eq!(cargo.env_value("CARGO_TARGET_DIR"), None);
            assert_eq!(cargo.envs.len(), 3);
        }

        #[test]
        fn test_non_profile_build_dir_rejected() {
            let config = CovConfig::new().with_build_dir("out");
            assert!(matches!(Pipeline::from_config(&config), Err(CovError::Config { .. })));
        }

        #[test]
        fn test_instrumentation_env_on_test_step() {
            let temp = TempDir::new().unwrap();
            let runner = RecordingRunner::new();
            run_all(&config_in(&temp), &runner).unwrap();

            let cargo = &runner.calls()[0];
            assert_eq!(cargo.env_value("CARGO_INCREMENTAL"), Some("0"));
            assert_eq!(cargo.env_value("RUSTDOCFLAGS"), Some("-Cpanic=abort"));
            assert!(cargo
                .env_value("RUSTFLAGS")
                .unwrap()
                .contains("-Zpanic_abort_tests"));
        }

        #[test]
        fn test_failed_tests_halt_pipeline() {
            let temp = TempDir::new().unwrap();
            let runner = RecordingRunner::new().with_exit("cargo", ExitOutcome::code(101));

            let err = run_all(&config_in(&temp), &runner).unwrap_err();

            assert!(matches!(
                err,
                CovError::StepFailed {
                    step: Step::Test,
                    code: Some(101)
                }
            ));
            assert_eq!(runner.programs(), vec!["cargo"]);
        }

        #[test]
        fn test_keep_going_still_reports() {
            let temp = TempDir::new().unwrap();
            let config = config_in(&temp).with_keep_going(true);
            let runner = RecordingRunner::new().with_exit("cargo", ExitOutcome::code(101));

            let report = run_all(&config, &runner).unwrap();

            assert_eq!(runner.programs().len(), 3);
            assert_eq!(report.first_failure(), Some((Step::Test, Some(101))));
            assert!(matches!(
                report.ensure_success(),
                Err(CovError::StepFailed { step: Step::Test, .. })
            ));
        }

        #[test]
        fn test_keep_going_without_report_step_fails() {
            let temp = TempDir::new().unwrap();
            let config = config_in(&temp).with_keep_going(true);
            let pipeline = Pipeline::from_config(&config).unwrap();
            let runner = RecordingRunner::new().with_exit("cargo", ExitOutcome::code(1));

            let result = pipeline.run(&runner, StepSelection::only(Step::Test), &mut NoopObserver);
            assert!(result.is_err());
        }

        #[test]
        fn test_report_failure_skips_open() {
            let temp = TempDir::new().unwrap();
            let runner = RecordingRunner::new().with_exit("grcov", ExitOutcome::code(2));

            let err = run_all(&config_in(&temp), &runner).unwrap_err();

            assert_eq!(err.exit_code(), Some(2));
            assert_eq!(runner.programs(), vec!["cargo", "grcov"]);
        }

        #[test]
        fn test_missing_grcov_is_spawn_error() {
            let temp = TempDir::new().unwrap();
            let runner = RecordingRunner::new().with_missing("grcov");

            let err = run_all(&config_in(&temp), &runner).unwrap_err();
            assert!(matches!(err, CovError::Spawn { ref program, .. } if program == "grcov"));
        }

        #[test]
        fn test_missing_viewer_is_warning() {
            let temp = TempDir::new().unwrap();
            let mut config = config_in(&temp);
            config.viewer = Viewer::Program("no-such-viewer".to_string());
            let runner = RecordingRunner::new().with_missing("no-such-viewer");

            let report = run_all(&config, &runner).unwrap();

            let open = report.outcome(Step::Open).unwrap();
            assert!(matches!(open.status, StepStatus::Warned { .. }));
            assert!(report.ensure_success().is_ok());
        }

        #[test]
        fn test_viewer_nonzero_exit_is_warning() {
            let temp = TempDir::new().unwrap();
            let mut config = config_in(&temp);
            config.viewer = Viewer::Program("browser".to_string());
            let runner = RecordingRunner::new().with_exit("browser", ExitOutcome::code(3));

            let report = run_all(&config, &runner).unwrap();

            match &report.outcome(Step::Open).unwrap().status {
                StepStatus::Warned { message } => assert!(message.contains("exit code 3")),
                other => panic!("expected warning, got {other:?}"),
            }
            assert!(report.ensure_success().is_ok());
        }

        #[test]
        fn test_non_browsable_format_skips_open() {
            let temp = TempDir::new().unwrap();
            let config = config_in(&temp).with_format(ReportFormat::Lcov);
            let runner = RecordingRunner::new();

            let report = run_all(&config, &runner).unwrap();

            assert_eq!(runner.programs(), vec!["cargo", "grcov"]);
            assert!(matches!(
                report.outcome(Step::Open).unwrap().status,
                StepStatus::Skipped { .. }
            ));
            assert_eq!(report.entry_file, None);
        }

        #[test]
        fn test_observer_sees_every_step() {
            let temp = TempDir::new().unwrap();
            let pipeline = Pipeline::from_config(&config_in(&temp)).unwrap();
            let mut log = EventLog::default();

            pipeline
                .run(
                    &RecordingRunner::new(),
                    StepSelection::only(Step::Clean).with(Step::Report, true),
                    &mut log,
                )
                .unwrap();

            assert_eq!(
                log.events,
                vec!["start:clean", "finish:clean", "start:report", "finish:report"]
            );
        }

        #[test]
        fn test_invalid_config_rejected() {
            let mut config = CovConfig::new();
            config.report.exclusions.start.push("(".to_string());
            assert!(Pipeline::from_config(&config).is_err());
        }
    }

    mod plan_tests {
        use super::*;

        #[test]
        fn test_plan_has_no_side_effects() {
            let temp = TempDir::new().unwrap();
            let config = config_in(&temp);
            let debug = temp.path().join("target/debug");
            fs::create_dir_all(&debug).unwrap();
            fs::write(debug.join("a.gcda"), b"x").unwrap();

            let pipeline = Pipeline::from_config(&config).unwrap();
            let plan = pipeline.plan(StepSelection::all()).unwrap();

            assert_eq!(plan.len(), 4);
            assert_eq!(plan[0].matches, vec![debug.join("a.gcda")]);
            assert!(debug.join("a.gcda").exists());
            assert_eq!(plan[1].command.as_ref().unwrap().program, "cargo");
            assert_eq!(plan[2].command.as_ref().unwrap().program, "grcov");
            assert!(plan[3].command.is_some());
        }

        #[test]
        fn test_plan_open_skipped_for_lcov() {
            let config = CovConfig::new().with_format(ReportFormat::Lcov);
            let pipeline = Pipeline::from_config(&config).unwrap();
            let plan = pipeline.plan(StepSelection::only(Step::Open)).unwrap();
            assert!(plan[0].command.is_none());
            assert_eq!(
                plan[0].skip_reason.as_deref(),
                Some("lcov reports have no entry page")
            );
        }
    }
}
