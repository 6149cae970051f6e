//! Config command handler

use crate::commands::{ConfigArgs, OverrideArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use covrun::{CovConfig, DEFAULT_CONFIG_FILE};
use std::path::{Path, PathBuf};

/// Execute the config command
pub fn execute_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    if args.init {
        let path = config
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        write_default_config(&path, args.force)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let effective = config.pipeline_config(&OverrideArgs::default())?;
    print!("{}", effective.to_yaml()?);
    Ok(())
}

/// Write the default configuration to `path`
pub fn write_default_config(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() && !force {
        return Err(CliError::invalid_argument(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    let yaml = CovConfig::default().to_yaml()?;
    std::fs::write(path, yaml)?;
    Ok(())
}
