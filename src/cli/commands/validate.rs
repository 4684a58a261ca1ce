//! Validate command - static checks over templates
//!
//! Lints the stacks declared from the current parameters, or with
//! `--assembly` the templates already written to the output directory.

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use devstation::lint::{LintConfig, Linter, RuleCategory, Severity};

/// Arguments for the validate command
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Stack names or glob patterns (default: all stacks)
    pub stacks: Vec<String>,

    /// Check the templates in the output directory instead of synthesizing
    #[arg(long)]
    pub assembly: bool,

    /// Skip a rule by id (repeatable)
    #[arg(long = "skip", action = clap::ArgAction::Append)]
    pub skip_rules: Vec<String>,

    /// Skip a rule category (repeatable)
    #[arg(long = "skip-category", value_parser = parse_category, action = clap::ArgAction::Append)]
    pub skip_categories: Vec<RuleCategory>,

    /// Only report issues at or above this severity
    #[arg(long, value_parser = parse_severity)]
    pub min_severity: Option<Severity>,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

fn parse_category(s: &str) -> std::result::Result<RuleCategory, String> {
    match s.to_lowercase().replace('-', "_").as_str() {
        "network" => Ok(RuleCategory::Network),
        "security" => Ok(RuleCategory::Security),
        "references" => Ok(RuleCategory::References),
        "image_builder" | "imagebuilder" => Ok(RuleCategory::ImageBuilder),
        other => Err(format!("unknown rule category '{}'", other)),
    }
}

fn parse_severity(s: &str) -> std::result::Result<Severity, String> {
    match s.to_lowercase().as_str() {
        "hint" => Ok(Severity::Hint),
        "warning" => Ok(Severity::Warning),
        "error" => Ok(Severity::Error),
        "critical" => Ok(Severity::Critical),
        other => Err(format!("unknown severity '{}'", other)),
    }
}

impl ValidateArgs {
    /// Lint settings from config with flags applied on top
    fn lint_config(&self, base: &LintConfig) -> LintConfig {
        let mut config = base.clone();
        config.skip_rules.extend(self.skip_rules.iter().cloned());
        config
            .skip_categories
            .extend(self.skip_categories.iter().copied());
        if let Some(severity) = self.min_severity {
            config.min_severity = severity;
        }
        config.warnings_as_errors |= self.strict;
        config
    }

    /// Execute the validate command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let linter = Linter::new(self.lint_config(&ctx.config.lint));

        let result = if self.assembly {
            linter.check_assembly(ctx.outdir())?
        } else {
            let app = ctx.app()?;
            let stacks = app.select(&self.stacks)?;
            linter.check_stacks(&stacks)
        };

        if ctx.output.is_json() {
            ctx.output.json(&result);
        } else {
            for issue in &result.issues {
                ctx.output.issue(issue);
            }
            ctx.output.plain(&result.summary());
        }

        Ok(result.exit_code())
    }
}
