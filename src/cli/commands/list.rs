//! List command - stacks in deployment order

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use serde::Serialize;

/// Arguments for the list command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Show resource counts and dependencies
    #[arg(long, short = 'l')]
    pub long: bool,

    /// Print the stack dependency graph in DOT format
    #[arg(long, conflicts_with = "long")]
    pub dot: bool,
}

#[derive(Debug, Serialize)]
struct StackSummary<'a> {
    name: &'a str,
    environment: String,
    resources: usize,
    dependencies: &'a [String],
}

impl ListArgs {
    /// Execute the list command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let app = ctx.app()?;

        if self.dot {
            print!("{}", app.dependency_graph()?.to_dot());
            return Ok(0);
        }

        let summaries: Vec<StackSummary<'_>> = app
            .deploy_order()?
            .into_iter()
            .map(|stack| StackSummary {
                name: stack.name(),
                environment: stack.environment().to_string(),
                resources: stack.template().resources.len(),
                dependencies: stack.dependencies(),
            })
            .collect();

        if ctx.output.is_json() {
            ctx.output.json(&summaries);
        } else if self.long {
            let rows: Vec<Vec<String>> = summaries
                .iter()
                .map(|s| {
                    vec![
                        s.name.to_string(),
                        s.resources.to_string(),
                        s.environment.clone(),
                        s.dependencies.join(", "),
                    ]
                })
                .collect();
            ctx.output
                .table(&["STACK", "RESOURCES", "ENVIRONMENT", "DEPENDS ON"], &rows);
        } else {
            for summary in &summaries {
                ctx.output.plain(summary.name);
            }
        }

        Ok(0)
    }
}
