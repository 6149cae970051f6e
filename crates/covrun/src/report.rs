//! grcov report generation and the report viewer

use crate::command::CommandSpec;
use crate::exclusions::ExclusionSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// grcov output type (`-t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Browsable HTML site with an `index.html`
    #[default]
    Html,
    /// lcov tracefile
    Lcov,
    /// Cobertura XML
    Cobertura,
    /// Mozilla covdir JSON
    Covdir,
}

impl ReportFormat {
    /// grcov's name for the format
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Lcov => "lcov",
            Self::Cobertura => "cobertura",
            Self::Covdir => "covdir",
        }
    }

    /// Whether the output is a directory with an entry page
    #[must_use]
    pub const fn is_browsable(self) -> bool {
        matches!(self, Self::Html)
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "lcov" => Ok(Self::Lcov),
            "cobertura" => Ok(Self::Cobertura),
            "covdir" => Ok(Self::Covdir),
            other => Err(format!("unknown report format `{other}`")),
        }
    }
}

/// Everything grcov needs to render one report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSpec {
    /// Directory holding the raw counter files
    pub build_dir: PathBuf,
    /// Source root for path resolution (`-s`)
    pub source_root: PathBuf,
    /// Output path (`-o`)
    pub output_dir: PathBuf,
    /// Output type (`-t`)
    pub format: ReportFormat,
    /// `--llvm`: parse counters with the LLVM-compatible reader
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

impl Default for ReportSpec {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from("target/debug"),
            source_root: PathBuf::from("."),
            output_dir: PathBuf::from("target/debug/coverage"),
            format: ReportFormat::Html,
            llvm: true,
            branch: true,
            ignore_not_existing: true,
            exclusions: ExclusionSet::default(),
            ignore: Vec::new(),
        }
    }
}

impl ReportSpec {
    /// Create the default HTML report spec
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the build directory
    #[must_use]
    pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = dir.into();
        self
    }

    /// Set the output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the output format
    #[must_use]
    pub const fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// The `grcov` invocation
    #[must_use]
    pub fn command(&self) -> CommandSpec {
        let mut spec = CommandSpec::new("grcov")
            .arg(self.build_dir.to_string_lossy())
            .arg("-s")
            .arg(self.source_root.to_string_lossy())
            .arg("-t")
            .arg(self.format.as_str());
        if self.llvm {
            spec = spec.arg("--llvm");
        }
        if self.branch {
            spec = spec.arg("--branch");
        }
        if self.ignore_not_existing {
            spec = spec.arg("--ignore-not-existing");
        }
        for glob in &self.ignore {
            spec = spec.arg("--ignore").arg(glob.as_str());
        }
        spec.arg("-o")
            .arg(self.output_dir.to_string_lossy())
            .args(self.exclusions.to_args())
    }

    /// Page to open after generation, for browsable formats
    #[must_use]
    pub fn entry_file(&self) -> Option<PathBuf> {
        self.format
            .is_browsable()
            .then(|| self.output_dir.join("index.html"))
    }
}

/// Opens a generated report
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "program")]
pub enum Viewer {
    /// The platform's default file opener
    #[default]
    System,
    /// A specific program, called with the file path as its only argument
    Program(String),
}

impl Viewer {
    /// Command that opens `path`
    #[must_use]
    pub fn command(&self, path: &Path) -> CommandSpec {
        let file = path.to_string_lossy();
        match self {
            Self::Program(program) => CommandSpec::new(program.as_str()).arg(file),
            Self::System => system_opener().arg(file),
        }
    }
}

#[cfg(target_os = "macos")]
fn system_opener() -> CommandSpec {
    CommandSpec::new("open")
}

#[cfg(target_os = "windows")]
fn system_opener() -> CommandSpec {
    CommandSpec::new("cmd").args(["/C", "start", ""])
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn system_opener() -> CommandSpec {
    CommandSpec::new("xdg-open")
}
