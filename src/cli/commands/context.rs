//! Context command - manage cached lookups
//!
//! Lookups performed during synthesis (VPC by id, newest image by name) are
//! cached in the context file so that synthesis stays deterministic and
//! offline.

use super::CommandContext;
use anyhow::Result;
use clap::{Parser, Subcommand};
use devstation::context::MissingContext;
use serde_json::{json, Value};

/// Arguments for the context command
#[derive(Parser, Debug, Clone)]
pub struct ContextArgs {
    #[command(subcommand)]
    pub action: ContextAction,
}

/// Context operations
#[derive(Subcommand, Debug, Clone)]
pub enum ContextAction {
    /// Show cached values and lookups still missing
    Show,

    /// Store a value (JSON, or a plain string)
    Set {
        /// Context key, e.g. ami:account=...:region=...:name=...
        key: String,
        /// Value to store
        value: String,
    },

    /// Remove one key, or every key when none is given
    Clear {
        /// Key to remove
        key: Option<String>,
    },

    /// Resolve missing lookups against the cloud account
    Refresh {
        /// Re-resolve every lookup, not only missing ones
        #[arg(long)]
        reset: bool,
    },
}

impl ContextArgs {
    /// Execute the context command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        match &self.action {
            ContextAction::Show => show(ctx),
            ContextAction::Set { key, value } => {
                let mut store = ctx.context_store()?;
                let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.clone()));
                store.set(key.clone(), value);
                store.save()?;
                ctx.output.success(&format!("Set {}", key));
                Ok(0)
            }
            ContextAction::Clear { key } => {
                let mut store = ctx.context_store()?;
                match key {
                    Some(key) => {
                        if !store.remove(key) {
                            ctx.output.warning(&format!("No cached value for {}", key));
                            return Ok(1);
                        }
                        ctx.output.success(&format!("Removed {}", key));
                    }
                    None => {
                        let count = store.len();
                        store.clear();
                        ctx.output.success(&format!("Removed {} value(s)", count));
                    }
                }
                store.save()?;
                Ok(0)
            }
            ContextAction::Refresh { reset } => refresh(ctx, *reset),
        }
    }
}

/// Lookups the current stacks need and the store does not answer
fn missing_lookups(ctx: &CommandContext) -> Result<Vec<MissingContext>> {
    let app = ctx.app()?;
    let stacks = app.select(&[])?;
    Ok(app.missing_context(&stacks))
}

fn show(ctx: &mut CommandContext) -> Result<i32> {
    let store = ctx.context_store()?;
    let missing = missing_lookups(ctx)?;

    if ctx.output.is_json() {
        let values: serde_json::Map<String, Value> = store
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ctx.output.json(&json!({
            "file": ctx.context_path,
            "values": values,
            "missing": missing,
        }));
        return Ok(0);
    }

    ctx.output.section(&format!("Context ({})", ctx.context_path.display()));
    if store.is_empty() {
        ctx.output.plain("No cached values");
    }
    for (key, value) in store.iter() {
        ctx.output.plain(&format!("{} = {}", key, value));
    }
    if !missing.is_empty() {
        let keys: Vec<String> = missing.iter().map(|m| m.key.clone()).collect();
        ctx.output.list("Missing", &keys);
    }
    Ok(0)
}

#[cfg(feature = "aws")]
fn refresh(ctx: &mut CommandContext, reset: bool) -> Result<i32> {
    let mut store = ctx.context_store()?;
    if reset {
        store.clear();
    }
    // Lookups are computed against the (possibly cleared) store
    let app = devstation::app::App::from_parameters(&ctx.parameters()?, &store)?;
    let stacks = app.select(&[])?;
    let missing = app.missing_context(&stacks);
    if missing.is_empty() {
        ctx.output.success("Context is complete");
        return Ok(0);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let resolved = runtime.block_on(devstation::context::aws::refresh(&mut store, &missing))?;
    store.save()?;
    ctx.output.success(&format!("Resolved {} lookup(s)", resolved));
    Ok(0)
}

#[cfg(not(feature = "aws"))]
fn refresh(ctx: &mut CommandContext, _reset: bool) -> Result<i32> {
    let missing = missing_lookups(ctx)?;
    ctx.output
        .error("This build cannot reach the cloud; rebuild with --features aws");
    if !missing.is_empty() {
        ctx.output.hint(&format!(
            "Set values by hand with 'devstation context set <key> <value>' (store: {})",
            ctx.context_path.display()
        ));
        let keys: Vec<String> = missing.into_iter().map(|m| m.key).collect();
        ctx.output.list("Missing", &keys);
    }
    Ok(1)
}
