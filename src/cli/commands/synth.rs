//! Synth command - render the cloud assembly
//!
//! Writes one template per selected stack plus `manifest.json` to the output
//! directory.

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use devstation::app::SynthOptions;
use devstation::assembly::TemplateFormat;
use devstation::Error;
use serde_json::json;
use tracing::info;

/// Arguments for the synth command
#[derive(Parser, Debug, Clone)]
pub struct SynthArgs {
    /// Stack names or glob patterns (default: all stacks)
    pub stacks: Vec<String>,

    /// Template format (json or yaml)
    #[arg(long, short = 'f')]
    pub format: Option<TemplateFormat>,

    /// Write templates even when context lookups are missing
    #[arg(long)]
    pub allow_missing_context: bool,

    /// Print the template of a single stack instead of writing files
    #[arg(long)]
    pub stdout: bool,
}

impl SynthArgs {
    /// Execute the synth command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let app = ctx.app()?;
        let options = SynthOptions {
            patterns: self.stacks.clone(),
            format: self.format.unwrap_or(ctx.config.defaults.format),
            allow_missing_context: self.allow_missing_context,
        };

        let assembly = match app.synth(&options) {
            Ok(assembly) => assembly,
            Err(Error::MissingContext { keys }) => {
                for key in &keys {
                    ctx.output.error(&format!("Missing context: {}", key));
                }
                ctx.output.hint(
                    "Run 'devstation context refresh' or pass --allow-missing-context to use placeholders",
                );
                return Ok(Error::MissingContext { keys }.exit_code());
            }
            Err(e) => return Err(e.into()),
        };

        for missing in &assembly.manifest().missing {
            ctx.output
                .warning(&format!("Using placeholder for missing context: {}", missing.key));
        }

        if self.stdout {
            let names: Vec<&String> = assembly.manifest().artifacts.keys().collect();
            if names.len() != 1 {
                ctx.output.error(&format!(
                    "--stdout needs exactly one stack, selection has {}",
                    names.len()
                ));
                return Ok(1);
            }
            if let Some(text) = assembly.template_text(names[0]) {
                print!("{}", text);
            }
            return Ok(0);
        }

        let written = assembly.write(ctx.outdir())?;
        info!(files = written.len(), "Synthesized");

        if ctx.output.is_json() {
            ctx.output.json(&json!({
                "outdir": ctx.outdir(),
                "stacks": assembly.manifest().artifacts.keys().collect::<Vec<_>>(),
                "files": written,
                "missing": assembly.manifest().missing,
            }));
        } else {
            for name in assembly.manifest().artifacts.keys() {
                ctx.output.success(name);
            }
            ctx.output.plain(&format!(
                "Wrote {} file(s) to {}",
                written.len(),
                ctx.outdir().display()
            ));
        }

        Ok(0)
    }
}
