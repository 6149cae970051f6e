//! External command specs and the runner seam
//!
//! Every step that shells out builds a [`CommandSpec`] first. Specs are plain
//! data, so a dry run can print them and tests can assert on them through
//! [`RecordingRunner`] without launching `cargo` or `grcov`.

use crate::error::{CovError, CovResult};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

/// A fully resolved external command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Program to launch (looked up on `PATH`)
    pub program: String,
    /// Arguments in order
    pub args: Vec<String>,
    /// Environment overrides, applied on top of the inherited environment
    pub envs: Vec<(String, String)>,
    /// Working directory, `None` inherits the caller's
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a spec for `program` with no arguments
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set one environment variable, replacing an earlier value for the same key
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.envs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.envs.push((key, value));
        }
        self
    }

    /// Set several environment variables
    #[must_use]
    pub fn envs<I, K, V>(self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        vars.into_iter().fold(self, |spec, (k, v)| spec.env(k, v))
    }

    /// Set the working directory
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Look up an environment override
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `arg` appears anywhere in the argument list
    #[must_use]
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value following the first occurrence of `flag`
    #[must_use]
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.envs.iter().map(|(k, v)| (k, v)));
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// Quote a word the way a POSIX shell would accept it
///
/// Words made only of safe characters are returned unchanged.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:+,@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref dir) = self.current_dir {
            write!(f, "cd {} && ", shell_quote(&dir.to_string_lossy()))?;
        }
        for (key, value) in &self.envs {
            write!(f, "{key}={} ", shell_quote(value))?;
        }
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// How an external process finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitOutcome {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl ExitOutcome {
    /// A zero exit
    pub const SUCCESS: Self = Self { code: Some(0) };

    /// Outcome with an explicit exit code
    #[must_use]
    pub const fn code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Outcome of a process killed by a signal
    #[must_use]
    pub const fn signaled() -> Self {
        Self { code: None }
    }

    /// Whether the process exited with status zero
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl From<std::process::ExitStatus> for ExitOutcome {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Executes command specs
pub trait CommandRunner {
    /// Run `spec` to completion.
    ///
    /// Returns `Err` only when the process could not be started. A process
    /// that starts and fails is reported through [`ExitOutcome`].
    fn run(&self, spec: &CommandSpec) -> CovResult<ExitOutcome>;
}

/// Runs commands on the host, inheriting stdio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> CovResult<ExitOutcome> {
        tracing::debug!(command = %spec, "spawning");
        let status = spec
            .to_command()
            .status()
            .map_err(|e| CovError::spawn(&spec.program, e))?;
        let outcome = ExitOutcome::from(status);
        tracing::debug!(program = %spec.program, code = ?outcome.code, "process exited");
        Ok(outcome)
    }
}

/// Test double that records every spec instead of running it
///
/// Programs succeed unless scripted otherwise with [`Self::with_exit`] or
/// marked missing with [`Self::with_missing`].
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<CommandSpec>>,
    exits: HashMap<String, ExitOutcome>,
    missing: HashSet<String>,
}

impl RecordingRunner {
    /// Create a runner where every program succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `program` exit with `outcome`
    #[must_use]
    pub fn with_exit(mut self, program: impl Into<String>, outcome: ExitOutcome) -> Self {
        self.exits.insert(program.into(), outcome);
        self
    }

    /// Make `program` fail to launch
    #[must_use]
    pub fn with_missing(mut self, program: impl Into<String>) -> Self {
        self.missing.insert(program.into());
        self
    }

    /// Specs received so far, in call order
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Programs received so far, in call order
    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.program.clone()).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> CovResult<ExitOutcome> {
        self.calls.borrow_mut().push(spec.clone());
        if self.missing.contains(&spec.program) {
            return Err(CovError::spawn(
                &spec.program,
                std::io::Error::new(std::io::ErrorKind::NotFound, "program not found"),
            ));
        }
        Ok(self
            .exits
            .get(&spec.program)
            .copied()
            .unwrap_or(ExitOutcome::SUCCESS))
    }
}
