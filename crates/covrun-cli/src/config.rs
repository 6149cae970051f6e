//! CLI configuration

use crate::commands::OverrideArgs;
use covrun::CovConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - debug logs
    Verbose,
    /// Trace - everything
    Trace,
}

impl Verbosity {
    /// Map `-q` / `-v` counts to a level
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Trace,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Trace)
    }

    /// Default tracing filter directive for this level
    #[must_use]
    pub const fn filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "covrun=debug,covrun_cli=debug,info",
            Self::Trace => "trace",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stderr().features().colors_supported(),
        }
    }
}

/// Process-level CLI settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Explicit config file
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set config file path
    #[must_use]
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Load the pipeline config and apply command-line overrides
    pub fn pipeline_config(&self, overrides: &OverrideArgs) -> covrun::CovResult<CovConfig> {
        let config = CovConfig::load(self.config_path.as_deref())?;
        Ok(apply_overrides(config, overrides))
    }
}

/// Command-line values win over file values
#[must_use]
pub fn apply_overrides(mut config: CovConfig, overrides: &OverrideArgs) -> CovConfig {
    if let Some(ref dir) = overrides.build_dir {
        config = config.with_build_dir(dir);
    }
    if let Some(ref dir) = overrides.output {
        config = config.with_output_dir(dir);
    }
    if let Some(format) = overrides.format {
        config = config.with_format(format.into());
    }
    if let Some(ref toolchain) = overrides.toolchain {
        let toolchain = match toolchain.as_str() {
            "" | "none" => None,
            name => Some(name.to_string()),
        };
        config = config.with_toolchain(toolchain);
    }
    config
}
