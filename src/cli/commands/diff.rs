//! Diff command - compare synthesized templates with the output directory

use super::CommandContext;
use crate::cli::diff::{ColorizedDiff, DiffOptions, DiffSummary, StackChange};
use anyhow::Result;
use clap::Parser;
use devstation::app::SynthOptions;
use devstation::assembly::TemplateFormat;
use serde::Serialize;

/// Arguments for the diff command
#[derive(Parser, Debug, Clone)]
pub struct DiffArgs {
    /// Stack names or glob patterns (default: all stacks)
    pub stacks: Vec<String>,

    /// Template format of the files being compared
    #[arg(long, short = 'f')]
    pub format: Option<TemplateFormat>,

    /// Lines of context around each change
    #[arg(long, short = 'U', default_value = "3")]
    pub context_lines: usize,

    /// Exit with status 1 when any stack differs
    #[arg(long)]
    pub fail: bool,
}

#[derive(Debug, Serialize)]
struct StackDiff {
    stack: String,
    change: StackChange,
    summary: DiffSummary,
}

impl DiffArgs {
    /// Execute the diff command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let app = ctx.app()?;
        let options = SynthOptions {
            patterns: self.stacks.clone(),
            format: self.format.unwrap_or(ctx.config.defaults.format),
            // Placeholders are fine for a preview
            allow_missing_context: true,
        };
        let assembly = app.synth(&options)?;

        let differ = ColorizedDiff::with_options(DiffOptions {
            context_lines: self.context_lines,
            use_color: ctx.output.use_color(),
        });

        let mut diffs = Vec::new();
        for (name, artifact) in &assembly.manifest().artifacts {
            let file = &artifact.properties.template_file;
            let new = assembly.template_text(name).unwrap_or_default();
            let old = ctx.read_output(file)?;
            let change = StackChange::classify(old.as_deref(), new);
            let summary = differ.summary(old.as_deref().unwrap_or_default(), new);

            if !ctx.output.is_json() {
                ctx.output.section(&format!("Stack {} ({})", name, change));
                if change != StackChange::Unchanged {
                    let old_name = ctx.outdir().join(file);
                    print!(
                        "{}",
                        differ.diff(
                            old.as_deref().unwrap_or_default(),
                            new,
                            &old_name.display().to_string(),
                            "synthesized",
                        )
                    );
                }
            }

            diffs.push(StackDiff {
                stack: name.clone(),
                change,
                summary,
            });
        }

        let changed = diffs
            .iter()
            .filter(|d| d.change != StackChange::Unchanged)
            .count();

        if ctx.output.is_json() {
            ctx.output.json(&diffs);
        } else {
            ctx.output.plain(&format!(
                "\n{} of {} stack(s) differ",
                changed,
                diffs.len()
            ));
        }

        Ok(if self.fail && changed > 0 { 1 } else { 0 })
    }
}
