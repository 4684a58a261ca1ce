//! CLI module for devstation
//!
//! This module provides the command-line interface, including argument
//! parsing and subcommand handling.

pub mod commands;
pub mod completions;
pub mod diff;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// devstation - development workstation infrastructure
///
/// Declares the stacks behind a personal development workstation and
/// synthesizes them into CloudFormation templates.
#[derive(Parser, Debug, Clone)]
#[command(name = "devstation")]
#[command(version)]
#[command(about = "Synthesize development workstation infrastructure", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the parameters properties file
    #[arg(short = 'p', long, global = true)]
    pub parameters: Option<PathBuf>,

    /// Override a parameter (key=value), applied after the file
    #[arg(long = "param", global = true, action = clap::ArgAction::Append)]
    pub params: Vec<String>,

    /// Path to the context cache file
    #[arg(long, global = true)]
    pub context: Option<PathBuf>,

    /// Cloud assembly output directory
    #[arg(short = 'o', long, global = true)]
    pub outdir: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "DEVSTATION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Synthesize stacks into a cloud assembly
    Synth(commands::synth::SynthArgs),

    /// List stacks in deployment order
    #[command(alias = "ls")]
    List(commands::list::ListArgs),

    /// Run static checks over the templates
    Validate(commands::validate::ValidateArgs),

    /// Compare synthesized templates with the output directory
    Diff(commands::diff::DiffArgs),

    /// Inspect and manage cached context lookups
    Context(commands::context::ContextArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["devstation", "synth"]).unwrap();
        assert!(matches!(cli.command, Commands::Synth(_)));
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["devstation", "-vvvv", "list"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }

    #[test]
    fn test_param_overrides() {
        let cli = Cli::try_parse_from([
            "devstation",
            "--param",
            "personalName=alice",
            "--param",
            "awsRegion=eu-west-1",
            "synth",
        ])
        .unwrap();
        assert_eq!(cli.params, vec!["personalName=alice", "awsRegion=eu-west-1"]);
    }

    #[test]
    fn test_global_paths() {
        let cli = Cli::try_parse_from([
            "devstation",
            "validate",
            "-p",
            "custom.properties",
            "-o",
            "out",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.parameters, Some(PathBuf::from("custom.properties")));
        assert_eq!(cli.outdir, Some(PathBuf::from("out")));
        assert!(cli.is_json());
    }
}
