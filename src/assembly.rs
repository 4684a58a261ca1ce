//! Cloud assembly: rendered templates plus a manifest.
//!
//! The output directory holds one `<stack>.template.json` (or `.yaml`) per
//! stack and a `manifest.json` listing each stack's environment, template
//! file and stack dependencies, together with any context lookups that were
//! missing at synthesis time.

use crate::context::MissingContext;
use crate::error::{Error, ErrorContext, Result};
use crate::stacks::Stack;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Default output directory
pub const DEFAULT_OUTDIR: &str = "stack.out";

/// Manifest file name inside the output directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Manifest schema version
pub const MANIFEST_VERSION: &str = "1.0.0";

/// Artifact type of a CloudFormation stack
pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Template serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    #[default]
    Json,
    Yaml,
}

impl TemplateFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TemplateFormat::Json => "json",
            TemplateFormat::Yaml => "yaml",
        }
    }

    /// File name of a stack's template
    pub fn template_file(&self, stack_name: &str) -> String {
        format!("{}.template.{}", stack_name, self.extension())
    }

    fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        let mut text = match self {
            TemplateFormat::Json => serde_json::to_string_pretty(value)?,
            TemplateFormat::Yaml => serde_yaml::to_string(value)?,
        };
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }
}

impl FromStr for TemplateFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(TemplateFormat::Json),
            "yaml" | "yml" => Ok(TemplateFormat::Yaml),
            other => Err(Error::Config(format!("unknown template format '{}'", other))),
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackProperties {
    pub template_file: String,
}

/// One stack entry of the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackArtifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: StackProperties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// `manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub artifacts: IndexMap<String, StackArtifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<MissingContext>,
}

impl Manifest {
    /// Read a manifest from an output directory
    pub fn load<P: AsRef<Path>>(outdir: P) -> Result<Self> {
        let path = outdir.as_ref().join(MANIFEST_FILE);
        if !path.exists() {
            return Err(Error::FileNotFound(path));
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest '{}'", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Synthesized output, held in memory until written
#[derive(Debug, Clone)]
pub struct Assembly {
    manifest: Manifest,
    /// template file name -> rendered template
    templates: IndexMap<String, String>,
}

impl Assembly {
    /// Render stacks, given in deployment order
    pub fn render(stacks: &[&Stack], format: TemplateFormat) -> Result<Self> {
        let mut artifacts = IndexMap::new();
        let mut templates = IndexMap::new();
        let mut missing: Vec<MissingContext> = Vec::new();

        for stack in stacks {
            let file = format.template_file(stack.name());
            templates.insert(file.clone(), format.render(stack.template())?);
            artifacts.insert(
                stack.name().to_string(),
                StackArtifact {
                    artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                    environment: stack.environment().to_string(),
                    properties: StackProperties {
                        template_file: file,
                    },
                    dependencies: stack.dependencies().to_vec(),
                },
            );
            for entry in stack.missing_context() {
                if !missing.iter().any(|m| m.key == entry.key) {
                    missing.push(entry.clone());
                }
            }
            debug!(stack = %stack.name(), resources = stack.template().resources.len(), "Rendered template");
        }

        Ok(Self {
            manifest: Manifest {
                version: MANIFEST_VERSION.to_string(),
                artifacts,
                missing,
            },
            templates,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Rendered template of a stack
    pub fn template_text(&self, stack_name: &str) -> Option<&str> {
        let artifact = self.manifest.artifacts.get(stack_name)?;
        self.templates
            .get(&artifact.properties.template_file)
            .map(String::as_str)
    }

    /// Rendered manifest
    pub fn manifest_text(&self) -> Result<String> {
        TemplateFormat::Json.render(&self.manifest)
    }

    /// Write templates and manifest; returns the written paths
    pub fn write<P: AsRef<Path>>(&self, outdir: P) -> Result<Vec<PathBuf>> {
        let outdir = outdir.as_ref();
        std::fs::create_dir_all(outdir).with_context(|| {
            format!("Failed to create output directory '{}'", outdir.display())
        })?;

        let mut written = Vec::with_capacity(self.templates.len() + 1);
        for (file, text) in &self.templates {
            let path = outdir.join(file);
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write template '{}'", path.display()))?;
            written.push(path);
        }
        let manifest_path = outdir.join(MANIFEST_FILE);
        std::fs::write(&manifest_path, self.manifest_text()?)
            .with_context(|| format!("Failed to write manifest '{}'", manifest_path.display()))?;
        written.push(manifest_path);

        info!(outdir = %outdir.display(), stacks = self.manifest.artifacts.len(), "Wrote cloud assembly");
        Ok(written)
    }
}

/// Previously written template of a stack, if any
pub fn read_template<P: AsRef<Path>>(outdir: P, file: &str) -> Result<Option<String>> {
    let path = outdir.as_ref().join(file);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read template '{}'", path.display()))?;
    Ok(Some(content))
}
