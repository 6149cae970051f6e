//! Instrumented `cargo test` environment
//!
//! The gcov-style profiler needs a very particular build: no incremental
//! compilation, one codegen unit, no optimization, dead code kept so every
//! function has counters, overflow checks off, and `panic=abort` for tests
//! and doctests so each test process terminates the same way and flushes its
//! `.gcda` files.

use crate::command::CommandSpec;
use serde::{Deserialize, Serialize};

/// Compiler settings for an instrumented test build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationProfile {
    /// `CARGO_INCREMENTAL`
    pub incremental: bool,
    /// `-Zprofile`
    pub profile: bool,
    /// `-Ccodegen-units=N`
    pub codegen_units: u32,
    /// `-Copt-level=N`
    pub opt_level: u8,
    /// `-Clink-dead-code`
    pub link_dead_code: bool,
    /// `-Coverflow-checks=on|off`
    pub overflow_checks: bool,
    /// `-Zpanic_abort_tests -Cpanic=abort`
    pub panic_abort_tests: bool,
    /// `RUSTDOCFLAGS=-Cpanic=abort`
    pub panic_abort_doctests: bool,
    /// Appended to `RUSTFLAGS` after the fixed set
    pub extra_rustflags: Vec<String>,
    /// Passed as `cargo +<toolchain>`; `None` uses the default toolchain
    pub toolchain: Option<String>,
    /// Extra arguments for `cargo test`
    pub test_args: Vec<String>,
}

impl Default for InstrumentationProfile {
    fn default() -> Self {
        Self {
            incremental: false,
            profile: true,
            codegen_units: 1,
            opt_level: 0,
            link_dead_code: true,
            overflow_checks: false,
            panic_abort_tests: true,
            panic_abort_doctests: true,
            extra_rustflags: Vec::new(),
            toolchain: Some("nightly".to_string()),
            test_args: Vec::new(),
        }
    }
}

impl InstrumentationProfile {
    /// Create the default gcov profile
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the toolchain override
    #[must_use]
    pub fn with_toolchain(mut self, toolchain: Option<String>) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Append extra `cargo test` arguments
    #[must_use]
    pub fn with_test_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.test_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The `RUSTFLAGS` words, in order
    #[must_use]
    pub fn rustflags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if self.profile {
            flags.push("-Zprofile".to_string());
        }
        flags.push(format!("-Ccodegen-units={}", self.codegen_units));
        flags.push(format!("-Copt-level={}", self.opt_level));
        if self.link_dead_code {
            flags.push("-Clink-dead-code".to_string());
        }
        flags.push(format!(
            "-Coverflow-checks={}",
            if self.overflow_checks { "on" } else { "off" }
        ));
        if self.panic_abort_tests {
            flags.push("-Zpanic_abort_tests".to_string());
            flags.push("-Cpanic=abort".to_string());
        }
        flags.extend(self.extra_rustflags.iter().cloned());
        flags
    }

    /// The `RUSTDOCFLAGS` words, in order
    #[must_use]
    pub fn rustdocflags(&self) -> Vec<String> {
        if self.panic_abort_doctests {
            vec!["-Cpanic=abort".to_string()]
        } else {
            Vec::new()
        }
    }

    /// Environment for the test step.
    ///
    /// Order is stable: `CARGO_INCREMENTAL`, `RUSTFLAGS`, `RUSTDOCFLAGS`.
    /// `RUSTDOCFLAGS` is omitted when empty.
    #[must_use]
    pub fn to_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            (
                "CARGO_INCREMENTAL".to_string(),
                if self.incremental { "1" } else { "0" }.to_string(),
            ),
            ("RUSTFLAGS".to_string(), self.rustflags().join(" ")),
        ];
        let docflags = self.rustdocflags();
        if !docflags.is_empty() {
            env.push(("RUSTDOCFLAGS".to_string(), docflags.join(" ")));
        }
        env
    }

    /// Whether any unstable `-Z` flag is in use
    #[must_use]
    pub fn requires_nightly(&self) -> bool {
        self.rustflags().iter().any(|f| f.starts_with("-Z"))
    }

    /// The `cargo test` invocation for this profile
    #[must_use]
    pub fn test_command(&self) -> CommandSpec {
        let mut spec = CommandSpec::new("cargo");
        if let Some(ref toolchain) = self.toolchain {
            spec = spec.arg(format!("+{toolchain}"));
        }
        spec.arg("test")
            .args(self.test_args.iter().cloned())
            .envs(self.to_env())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const DEFAULT_RUSTFLAGS: &str = "-Zprofile -Ccodegen-units=1 -Copt-level=0 -Clink-dead-code -Coverflow-checks=off -Zpanic_abort_tests -Cpanic=abort";

    #[test]
    fn test_default_env_matches_gcov_recipe() {
        let env = InstrumentationProfile::default().to_env();
        assert_eq!(
            env,
            vec![
                ("CARGO_INCREMENTAL".to_string(), "0".to_string()),
                ("RUSTFLAGS".to_string(), DEFAULT_RUSTFLAGS.to_string()),
                ("RUSTDOCFLAGS".to_string(), "-Cpanic=abort".to_string()),
            ]
        );
    }

    #[test]
    fn test_extra_rustflags_appended_last() {
        let profile = InstrumentationProfile {
            extra_rustflags: vec!["--cfg".to_string(), "coverage".to_string()],
            ..InstrumentationProfile::default()
        };
        let flags = profile.rustflags();
        assert_eq!(flags[flags.len() - 2..], ["--cfg", "coverage"]);
        assert!(profile.to_env()[1].1.starts_with(DEFAULT_RUSTFLAGS));
    }

    #[test]
    fn test_overflow_checks_on() {
        let profile = InstrumentationProfile {
            overflow_checks: true,
            ..InstrumentationProfile::default()
        };
        assert!(profile.rustflags().contains(&"-Coverflow-checks=on".to_string()));
    }

    #[test]
    fn test_no_doctest_abort_omits_rustdocflags() {
        let profile = InstrumentationProfile {
            panic_abort_doctests: false,
            ..InstrumentationProfile::default()
        };
        assert!(profile.to_env().iter().all(|(k, _)| k != "RUSTDOCFLAGS"));
    }

    #[test]
    fn test_requires_nightly() {
        assert!(InstrumentationProfile::default().requires_nightly());

        let stable = InstrumentationProfile {
            profile: false,
            panic_abort_tests: false,
            ..InstrumentationProfile::default()
        };
        assert!(!stable.requires_nightly());
    }

    #[test]
    fn test_test_command_with_toolchain() {
        let spec = InstrumentationProfile::default()
            .with_test_args(["--workspace"])
            .test_command();
        assert_eq!(spec.program, "cargo");
        assert_eq!(spec.args, vec!["+nightly", "test", "--workspace"]);
        assert_eq!(spec.env_value("RUSTFLAGS"), Some(DEFAULT_RUSTFLAGS));
        assert_eq!(spec.env_value("CARGO_INCREMENTAL"), Some("0"));
        assert_eq!(spec.env_value("RUSTDOCFLAGS"), Some("-Cpanic=abort"));
    }

    #[test]
    fn test_test_command_without_toolchain() {
        let spec = InstrumentationProfile::default()
            .with_toolchain(None)
            .test_command();
        assert_eq!(spec.args, vec!["test"]);
    }

    #[test]
    fn test_deserialize_partial() {
        let profile: InstrumentationProfile =
            serde_yaml_ng::from_str("codegen_units: 4\ntoolchain: null\n").unwrap();
        assert_eq!(profile.codegen_units, 4);
        assert_eq!(profile.toolchain, None);
        assert!(profile.link_dead_code);
    }
}
