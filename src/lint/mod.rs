//! Template linting and validation.
//!
//! Static checks run against synthesized templates, either straight from the
//! declared stacks or from a cloud assembly previously written to disk:
//!
//! - Address ranges of VPCs, subnets, routes and security group rules
//! - Security group protocols, port ranges and exposure
//! - `Ref`, `Fn::GetAtt` and `DependsOn` integrity
//! - Image Builder recipes and infrastructure
//!
//! # Example
//!
//! ```rust,ignore
//! use devstation::lint::{LintConfig, Linter};
//!
//! let linter = Linter::new(LintConfig::default());
//! let result = linter.check_stacks(&app.stacks().collect::<Vec<_>>());
//!
//! for issue in &result.issues {
//!     println!("{}", issue);
//! }
//! ```

mod imagebuilder;
mod network;
mod references;
mod security;
mod types;

pub use imagebuilder::ImageBuilderChecker;
pub use network::NetworkChecker;
pub use references::ReferenceChecker;
pub use security::SecurityChecker;
pub use types::{
    LintConfig, LintError, LintIssue, LintOpResult, LintResult, Location, RuleCategory, Severity,
};

use crate::assembly::{Manifest, MANIFEST_FILE};
use crate::stacks::Stack;
use crate::template::{ResourceEntry, Template};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Direction of a security group rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleDirection {
    Ingress,
    Egress,
}

/// A security group rule, inline or standalone
#[derive(Debug, Clone)]
pub(crate) struct RuleEntry<'a> {
    pub direction: RuleDirection,
    pub value: &'a Value,
    /// Property holding the rule, e.g. `SecurityGroupIngress[0]`; none for standalone rules
    pub prefix: Option<String>,
}

impl RuleEntry<'_> {
    pub fn property_path(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}.{}", prefix, name),
            None => name.to_string(),
        }
    }
}

/// Security group rules declared by a resource
pub(crate) fn rule_entries(entry: &ResourceEntry) -> Vec<RuleEntry<'_>> {
    match entry.resource_type.as_str() {
        "AWS::EC2::SecurityGroupIngress" => vec![RuleEntry {
            direction: RuleDirection::Ingress,
            value: &entry.properties,
            prefix: None,
        }],
        "AWS::EC2::SecurityGroupEgress" => vec![RuleEntry {
            direction: RuleDirection::Egress,
            value: &entry.properties,
            prefix: None,
        }],
        "AWS::EC2::SecurityGroup" => {
            let mut rules = Vec::new();
            for (property, direction) in [
                ("SecurityGroupIngress", RuleDirection::Ingress),
                ("SecurityGroupEgress", RuleDirection::Egress),
            ] {
                if let Some(items) = entry.property(property).and_then(Value::as_array) {
                    for (idx, value) in items.iter().enumerate() {
                        rules.push(RuleEntry {
                            direction,
                            value,
                            prefix: Some(format!("{}[{}]", property, idx)),
                        });
                    }
                }
            }
            rules
        }
        _ => Vec::new(),
    }
}

/// Runs every checker over templates.
#[derive(Debug, Default)]
pub struct Linter {
    config: LintConfig,
    network: NetworkChecker,
    security: SecurityChecker,
    references: ReferenceChecker,
    image_builder: ImageBuilderChecker,
}

impl Linter {
    pub fn new(config: LintConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    /// Lint one template.
    pub fn check_template(&self, stack: &str, template: &Template) -> LintResult {
        let mut result = LintResult::new();
        result.stacks_analyzed.push(stack.to_string());
        result.resources_analyzed = template.resources.len();

        result.merge(self.network.check_template(stack, template, &self.config));
        result.merge(self.security.check_template(stack, template, &self.config));
        result.merge(self.references.check_template(stack, template, &self.config));
        result.merge(self.image_builder.check_template(stack, template, &self.config));

        for issue in &mut result.issues {
            issue.severity = self.config.effective_severity(issue.severity);
        }

        debug!(stack = %stack, issues = result.issues.len(), "Linted template");
        result
    }

    /// Lint declared stacks.
    pub fn check_stacks(&self, stacks: &[&Stack]) -> LintResult {
        let mut result = LintResult::new();
        for stack in stacks {
            result.merge(self.check_template(stack.name(), stack.template()));
        }
        result
    }

    /// Lint the templates of a cloud assembly on disk.
    pub fn check_assembly(&self, outdir: impl AsRef<Path>) -> LintOpResult<LintResult> {
        let outdir = outdir.as_ref();
        let manifest = Manifest::load(outdir).map_err(|e| LintError::FileRead {
            path: outdir.join(MANIFEST_FILE),
            message: e.to_string(),
        })?;

        let mut result = LintResult::new();
        for (name, artifact) in &manifest.artifacts {
            let path = outdir.join(&artifact.properties.template_file);
            let content = std::fs::read_to_string(&path).map_err(|e| LintError::FileRead {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let template = parse_template(&path, &content)?;
            result.merge(self.check_template(name, &template));
        }
        Ok(result)
    }
}

/// Parse a template by its file extension
fn parse_template(path: &Path, content: &str) -> LintOpResult<Template> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed = if is_yaml {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(content).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| LintError::InvalidTemplate {
        path: path.to_path_buf(),
        message,
    })
}
