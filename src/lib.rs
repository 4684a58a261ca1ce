//! # devstation - Development Workstation Infrastructure as Code
//!
//! devstation declares the cloud infrastructure behind a personal development
//! workstation and synthesizes it into deterministic CloudFormation templates.
//! A single properties file drives five stacks:
//!
//! - **Storage** (`s3ops`): the bucket holding image build components
//! - **Image pipeline**: an Image Builder recipe, infrastructure and pipeline
//!   with its own isolated network
//! - **Deployment pipeline**: CodePipeline/CodeBuild wired to the workstation
//!   repository
//! - **Development environment**: a VPC with one public subnet per zone
//! - **Workstation**: one instance launched from the newest pipeline image
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │ parameters.properties│     │ devstation.context   │
//! │  (INI, %(key)s)      │     │  (cached lookups)    │
//! └──────────┬───────────┘     └──────────┬───────────┘
//!            ▼                            ▼
//! ┌─────────────────────────────────────────────────────┐
//! │            App: stacks + dependency graph            │
//! │     (typed resources -> Template, logical ids)       │
//! └──────────────────────────┬──────────────────────────┘
//!            ┌───────────────┼────────────────┐
//!            ▼               ▼                ▼
//!      ┌──────────┐   ┌─────────────┐   ┌──────────┐
//!      │  synth   │   │  validate   │   │   diff   │
//!      │ stack.out│   │   (lint)    │   │          │
//!      └──────────┘   └─────────────┘   └──────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use devstation::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let parameters = Parameters::load("parameters.properties", &[])?;
//!     let context = ContextStore::load("devstation.context.json")?;
//!     let app = App::from_parameters(&parameters, &context)?;
//!
//!     let assembly = app.synth(&SynthOptions::default())?;
//!     assembly.write("stack.out")?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::app::{App, SynthOptions};
    pub use crate::assembly::{Assembly, Manifest, TemplateFormat};
    pub use crate::context::{ContextStore, LookupRequest, MissingContext};
    pub use crate::error::{Error, ErrorContext, Result};
    pub use crate::lint::{LintConfig, LintResult, Linter};
    pub use crate::parameters::{Parameters, PropertiesFile};
    pub use crate::stacks::{Environment, Stack, StackBuilder};
    pub use crate::template::{Expr, Template};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases.
pub mod error;

/// Tool settings merged from files and environment.
pub mod config;

/// Parameter file parsing, interpolation and typed parameters.
pub mod parameters;

/// IPv4 CIDR arithmetic.
pub mod network;

// ============================================================================
// Template Model
// ============================================================================

/// CloudFormation template model, intrinsic expressions and logical ids.
pub mod template;

/// Typed resource property structs.
pub mod resources;

/// Stacks and the builders that declare them.
pub mod stacks;

/// Cached results of synthesis-time lookups.
pub mod context;

// ============================================================================
// Synthesis
// ============================================================================

/// Named dependency graphs with stable ordering.
pub mod graph;

/// The application: every stack and its synthesis.
pub mod app;

/// Cloud assembly output.
pub mod assembly;

/// Static checks over synthesized templates.
pub mod lint;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

/// Returns the current version of devstation.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
