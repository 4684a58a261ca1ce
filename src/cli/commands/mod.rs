//! Subcommands module for the devstation CLI
//!
//! This module contains all the subcommand implementations.

pub mod context;
pub mod diff;
pub mod list;
pub mod synth;
pub mod validate;

use crate::cli::output::OutputFormatter;
use anyhow::{Context, Result};
use devstation::app::App;
use devstation::config::Config;
use devstation::context::ContextStore;
use devstation::parameters::{parse_override, Parameters};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Parameters properties file
    pub parameters_path: PathBuf,
    /// `key=value` parameter overrides
    pub overrides: Vec<String>,
    /// Context cache file
    pub context_path: PathBuf,
    /// Cloud assembly output directory
    pub outdir: PathBuf,
    /// Verbosity level
    pub verbosity: u8,
}

impl CommandContext {
    /// Create a new command context from CLI arguments; flags win over config
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.colors.enabled;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        Self {
            parameters_path: cli
                .parameters
                .clone()
                .unwrap_or_else(|| config.defaults.parameters.clone()),
            overrides: cli.params.clone(),
            context_path: cli
                .context
                .clone()
                .unwrap_or_else(|| config.defaults.context.clone()),
            outdir: cli
                .outdir
                .clone()
                .unwrap_or_else(|| config.defaults.outdir.clone()),
            verbosity: cli.verbosity(),
            output,
            config,
        }
    }

    /// Load parameters with command-line overrides applied
    pub fn parameters(&self) -> Result<Parameters> {
        let overrides = self
            .overrides
            .iter()
            .map(|text| parse_override(text))
            .collect::<devstation::Result<Vec<_>>>()?;
        debug!(path = %self.parameters_path.display(), overrides = overrides.len(), "Loading parameters");
        let parameters = Parameters::load(&self.parameters_path, &overrides)?;
        Ok(parameters)
    }

    /// Load the context cache; a missing file is an empty cache
    pub fn context_store(&self) -> Result<ContextStore> {
        let store = ContextStore::load(&self.context_path)?;
        Ok(store)
    }

    /// Declare every stack from parameters and cached context
    pub fn app(&self) -> Result<App> {
        let parameters = self.parameters()?;
        let context = self.context_store()?;
        let app = App::from_parameters(&parameters, &context)?;
        Ok(app)
    }

    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    /// Read a file from the output directory, if present
    pub fn read_output(&self, file: &str) -> Result<Option<String>> {
        devstation::assembly::read_template(&self.outdir, file)
            .with_context(|| format!("Failed to read {}", self.outdir.join(file).display()))
    }
}
