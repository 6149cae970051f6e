//! Pipeline configuration
//!
//! Read from `covrun.yaml` when present. Every field has a default, so an
//! empty file (or no file) reproduces the stock gcov + grcov HTML run.

use crate::cleanup::{CleanupPlan, GCDA_PATTERN};
use crate::error::{CovError, CovResult};
use crate::exclusions::ExclusionSet;
use crate::instrumentation::InstrumentationProfile;
use crate::report::{ReportFormat, ReportSpec, Viewer};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "covrun.yaml";

/// Where `cargo test` puts its artifacts without `CARGO_TARGET_DIR`
pub const DEFAULT_BUILD_DIR: &str = "target/debug";

/// Profile directory cargo uses for test builds
const TEST_PROFILE_DIR: &str = "debug";

/// Stale artifact cleanup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupOptions {
    /// Globs relative to the build directory
    pub patterns: Vec<String>,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            patterns: vec![GCDA_PATTERN.to_string()],
        }
    }
}

/// Report settings; the build directory comes from [`CovConfig::build_dir`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Output path, defaults to `<build_dir>/coverage`
    pub output_dir: Option<PathBuf>,
    /// grcov output type
    pub format: ReportFormat,
    /// `--llvm`
    pub llvm: bool,
    /// `--branch`
    pub branch: bool,
    /// `--ignore-not-existing`
    pub ignore_not_existing: bool,
    /// Line and branch exclusions
    pub exclusions: ExclusionSet,
    /// Path globs passed as `--ignore`
    pub ignore: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        let spec = ReportSpec::default();
        Self {
            output_dir: None,
            format: spec.format,
            llvm: spec.llvm,
            branch: spec.branch,
            ignore_not_existing: spec.ignore_not_existing,
            exclusions: spec.exclusions,
            ignore: spec.ignore,
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CovConfig {
    /// Build output directory shared by cleanup, test and report; always
    /// `<target dir>/debug`
    pub build_dir: PathBuf,
    /// Source root handed to grcov
    pub source_root: PathBuf,
    /// Cleanup step
    pub cleanup: CleanupOptions,
    /// Test step environment
    pub instrumentation: InstrumentationProfile,
    /// Report step
    pub report: ReportOptions,
    /// Viewer for the open step
    pub viewer: Viewer,
    /// Run the open step
    pub open: bool,
    /// Still generate a report when tests fail
    pub keep_going: bool,
}

impl Default for CovConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            source_root: PathBuf::from("."),
            cleanup: CleanupOptions::default(),
            instrumentation: InstrumentationProfile::default(),
            report: ReportOptions::default(),
            viewer: Viewer::System,
            open: true,
            keep_going: false,
        }
    }
}

impl CovConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist. Without one,
    /// [`DEFAULT_CONFIG_FILE`] in the working directory is used if present.
    pub fn load(path: Option<&Path>) -> CovResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    tracing::debug!("no {DEFAULT_CONFIG_FILE}, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> CovResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CovError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml(&content).map_err(|source| CovError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse YAML text; an empty document yields defaults
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml_ng::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> CovResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Set the build directory
    #[must_use]
    pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = dir.into();
        self
    }

    /// Set the report output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report.output_dir = Some(dir.into());
        self
    }

    /// Set report format
    #[must_use]
    pub const fn with_format(mut self, format: ReportFormat) -> Self {
        self.report.format = format;
        self
    }

    /// Set whether the report is opened
    #[must_use]
    pub const fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    /// Set keep-going
    #[must_use]
    pub const fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    /// Set the cargo toolchain override
    #[must_use]
    pub fn with_toolchain(mut self, toolchain: Option<String>) -> Self {
        self.instrumentation.toolchain = toolchain;
        self
    }

    /// Effective report output directory
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.report
            .output_dir
            .clone()
            .unwrap_or_else(|| self.build_dir.join("coverage"))
    }

    /// `CARGO_TARGET_DIR` that makes `cargo test` write into `build_dir`.
    ///
    /// `None` for the stock `target/debug`, where cargo needs no override.
    #[must_use]
    pub fn cargo_target_dir(&self) -> Option<PathBuf> {
        if self.build_dir == Path::new(DEFAULT_BUILD_DIR) {
            return None;
        }
        self.build_dir.parent().map(Path::to_path_buf)
    }

    /// Cleanup plan rooted at the build directory
    #[must_use]
    pub fn cleanup_plan(&self) -> CleanupPlan {
        CleanupPlan::new(&self.build_dir).with_patterns(self.cleanup.patterns.iter().cloned())
    }

    /// Report spec reading from the build directory
    #[must_use]
    pub fn report_spec(&self) -> ReportSpec {
        ReportSpec {
            build_dir: self.build_dir.clone(),
            source_root: self.source_root.clone(),
            output_dir: self.output_dir(),
            format: self.report.format,
            llvm: self.report.llvm,
            branch: self.report.branch,
            ignore_not_existing: self.report.ignore_not_existing,
            exclusions: self.report.exclusions.clone(),
            ignore: self.report.ignore.clone(),
        }
    }

    /// Check patterns and paths before anything runs
    pub fn validate(&self) -> CovResult<()> {
        if self.build_dir.as_os_str().is_empty() {
            return Err(CovError::config("build_dir must not be empty"));
        }
        let has_target_parent = self
            .build_dir
            .parent()
            .is_some_and(|p| !p.as_os_str().is_empty());
        if self.build_dir.file_name() != Some(OsStr::new(TEST_PROFILE_DIR)) || !has_target_parent {
            return Err(CovError::config(format!(
                "build_dir must be <target dir>/{TEST_PROFILE_DIR}, got {}",
                self.build_dir.display()
            )));
        }
        if self.cleanup.patterns.is_empty() {
            return Err(CovError::config("cleanup.patterns must list at least one glob"));
        }
        if self.instrumentation.codegen_units == 0 {
            return Err(CovError::config("instrumentation.codegen_units must be at least 1"));
        }
        self.cleanup_plan().validate()?;
        self.report.exclusions.validate()?;
        Ok(())
    }
}
