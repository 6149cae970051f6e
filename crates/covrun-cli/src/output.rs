//! Output formatting and progress reporting

use console::{style, Style, Term};
use covrun::{
    shell_quote, PipelineObserver, PipelineReport, PlannedStep, Step, StepOutcome, StepStatus,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for pipeline execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner for a short step.
    ///
    /// Steps that stream tool output (test, report) print a header instead,
    /// so the spinner does not fight with cargo's own progress lines.
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(message.to_string());
        self.spinner = Some(pb);
    }

    /// Clear the spinner, if any
    pub fn finish(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn line(&self, prefix: &str, message: &str) {
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print the end-of-run summary
    pub fn summary(&self, report: &PipelineReport) {
        let failed = report.first_failure().is_some();
        if self.quiet && !failed {
            return;
        }

        let _ = self.term.write_line("");
        let steps = report
            .steps()
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" → ");
        let secs = report.duration.as_secs_f64();
        let status = if failed { "FAILED" } else { "DONE" };

        if self.use_color {
            let status_style = if failed {
                Style::new().red().bold()
            } else {
                Style::new().green().bold()
            };
            let _ = self.term.write_line(&format!(
                "{} {steps} in {secs:.2}s",
                status_style.apply_to(status)
            ));
        } else {
            let _ = self.term.write_line(&format!("{status} {steps} in {secs:.2}s"));
        }

        if let Some(ref entry) = report.entry_file {
            self.info(&format!("Report: {}", entry.display()));
        }
    }
}

fn step_title(step: Step) -> &'static str {
    match step {
        Step::Clean => "Removing stale coverage data",
        Step::Test => "Running instrumented tests",
        Step::Report => "Generating coverage report",
        Step::Open => "Opening report",
    }
}

impl PipelineObserver for ProgressReporter {
    fn step_started(&mut self, step: Step) {
        match step {
            Step::Clean | Step::Open => self.start_spinner(step_title(step)),
            Step::Test | Step::Report => self.header(step_title(step)),
        }
    }

    fn step_finished(&mut self, outcome: &StepOutcome) {
        self.finish();
        let title = step_title(outcome.step);
        match outcome.status {
            StepStatus::Succeeded => {
                let detail = outcome.cleanup.as_ref().map_or_else(String::new, |c| {
                    format!(" ({} file(s), {} bytes)", c.removed_count(), c.bytes)
                });
                self.success(&format!(
                    "{title}{detail} in {:.2}s",
                    outcome.duration.as_secs_f64()
                ));
            }
            StepStatus::Failed { code } => self.failure(&format!(
                "{title} failed{}",
                code.map(|c| format!(" (exit code {c})")).unwrap_or_default()
            )),
            StepStatus::Skipped { ref reason } => self.info(&format!("{title} skipped: {reason}")),
            StepStatus::Warned { ref message } => self.warning(&format!("{title}: {message}")),
        }
    }
}

/// Render a plan as shell-like text
#[must_use]
pub fn render_plan(plan: &[PlannedStep]) -> String {
    let mut out = String::new();
    for (i, planned) in plan.iter().enumerate() {
        out.push_str(&format!("# {}. {}\n", i + 1, planned.step));
        match planned.step {
            Step::Clean => {
                if planned.matches.is_empty() {
                    out.push_str("#    no stale files\n");
                }
                for path in &planned.matches {
                    out.push_str(&format!("rm {}\n", shell_quote(&path.to_string_lossy())));
                }
            }
            _ => {
                if let Some(ref command) = planned.command {
                    out.push_str(&format!("{command}\n"));
                }
                if let Some(ref reason) = planned.skip_reason {
                    out.push_str(&format!("#    skipped: {reason}\n"));
                }
            }
        }
    }
    out
}
