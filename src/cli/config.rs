//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::PipelineConfig;
use anyhow::{Context, Result};

/// Convert CLI arguments to a [`PipelineConfig`]
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the pipeline configuration from CLI arguments
    ///
    /// Precedence, lowest first: defaults, `--config` file, `BGTRANSFORM_*`
    /// environment variables, `--model`.
    pub(crate) fn from_cli(cli: &Cli) -> Result<PipelineConfig> {
        let config = match &cli.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        let mut config = config
            .apply_env_overrides()
            .context("Invalid environment configuration")?;

        if let Some(model) = &cli.model {
            config.model_path = Some(model.clone());
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate CLI arguments before building configuration
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.width == Some(0) {
            anyhow::bail!("--width must be at least 1");
        }
        if cli.height == Some(0) {
            anyhow::bail!("--height must be at least 1");
        }
        if let Some(model) = &cli.model {
            if !model.is_file() {
                anyhow::bail!("Model file not found: {}", model.display());
            }
        }
        if let Some(config) = &cli.config {
            if !config.is_file() {
                anyhow::bail!("Config file not found: {}", config.display());
            }
        }
        Ok(())
    }
}
