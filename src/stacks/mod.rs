//! Stacks and the builders that declare their resources.
//!
//! A [`Stack`] is a named, independently deployable set of resources with a
//! deployment target. Builders implementing [`StackBuilder`] declare
//! resources into a stack through typed property structs; the stack derives
//! logical ids from construct paths and rejects collisions.

pub mod code_pipeline;
pub mod dev_environment;
pub mod image_pipeline;
pub mod storage;
pub mod workstation;

pub use code_pipeline::CodePipelineStack;
pub use dev_environment::DevEnvironmentStack;
pub use image_pipeline::ImagePipelineStack;
pub use storage::StorageStack;
pub use workstation::WorkstationStack;

use crate::context::{ContextStore, MissingContext};
use crate::error::{Error, Result};
use crate::resources::ResourceProperties;
use crate::template::{logical_id, Expr, Output, ResourceEntry, ResourceHandle, Template};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

static STACK_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").expect("Invalid stack name regex"));

/// Account and region a stack deploys into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    pub account: String,
    pub region: String,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aws://{}/{}", self.account, self.region)
    }
}

/// A stack under construction or fully declared
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    environment: Environment,
    template: Template,
    /// logical id -> construct path
    paths: IndexMap<String, String>,
    dependencies: Vec<String>,
    missing_context: Vec<MissingContext>,
}

impl Stack {
    /// Create an empty stack; names must be valid CloudFormation stack names
    pub fn new(name: impl Into<String>, environment: Environment) -> Result<Self> {
        let name = name.into();
        if !STACK_NAME_RE.is_match(&name) {
            return Err(Error::invalid_id(
                name,
                "stack names start with a letter and contain only letters, digits and '-' (max 128)",
            ));
        }
        Ok(Self {
            name,
            environment,
            template: Template::new(),
            paths: IndexMap::new(),
            dependencies: Vec::new(),
            missing_context: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Names of stacks that must deploy before this one
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn missing_context(&self) -> &[MissingContext] {
        &self.missing_context
    }

    /// Construct path a logical id was derived from
    pub fn construct_path(&self, logical_id: &str) -> Option<&str> {
        self.paths.get(logical_id).map(String::as_str)
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.template.description = Some(description.into());
    }

    /// Declare a top-level resource
    pub fn add<P: ResourceProperties>(&mut self, id: &str, properties: &P) -> Result<ResourceHandle> {
        self.add_at(&[id], properties)
    }

    /// Declare a resource at a nested construct path
    pub fn add_at<P: ResourceProperties>(
        &mut self,
        path: &[&str],
        properties: &P,
    ) -> Result<ResourceHandle> {
        let id = logical_id(path)?;
        let construct_path = path.join("/");
        if self.template.resources.contains_key(&id) {
            return Err(Error::DuplicateLogicalId {
                stack: self.name.clone(),
                logical_id: id,
                path: construct_path,
            });
        }

        let mut value = serde_json::to_value(properties)?;
        if value.as_object().map(|o| o.is_empty()).unwrap_or(false) {
            value = serde_json::Value::Null;
        }

        trace!(stack = %self.name, logical_id = %id, resource_type = P::RESOURCE_TYPE, "Declared resource");
        self.template.resources.insert(
            id.clone(),
            ResourceEntry {
                resource_type: P::RESOURCE_TYPE.to_string(),
                properties: value,
                depends_on: Vec::new(),
            },
        );
        self.paths.insert(id.clone(), construct_path);
        Ok(ResourceHandle::new(id, P::RESOURCE_TYPE))
    }

    /// Make `resource` wait for `target` (`DependsOn`)
    pub fn add_depends_on(&mut self, resource: &ResourceHandle, target: &ResourceHandle) -> Result<()> {
        if !self.template.resources.contains_key(target.logical_id()) {
            return Err(Error::ResourceNotFound {
                stack: self.name.clone(),
                logical_id: target.logical_id().to_string(),
            });
        }
        let entry = self
            .template
            .resources
            .get_mut(resource.logical_id())
            .ok_or_else(|| Error::ResourceNotFound {
                stack: self.name.clone(),
                logical_id: resource.logical_id().to_string(),
            })?;
        let target = target.logical_id().to_string();
        if !entry.depends_on.contains(&target) {
            entry.depends_on.push(target);
        }
        Ok(())
    }

    /// Declare a stack output
    pub fn add_output(&mut self, name: &str, value: Expr, description: Option<&str>) -> Result<()> {
        let id = logical_id(&[name])?;
        if self.template.outputs.contains_key(&id) {
            return Err(Error::DuplicateLogicalId {
                stack: self.name.clone(),
                logical_id: id,
                path: format!("Outputs/{}", name),
            });
        }
        self.template.outputs.insert(
            id,
            Output {
                value: serde_json::to_value(value)?,
                description: description.map(str::to_string),
            },
        );
        Ok(())
    }

    /// Require another stack to deploy first
    pub fn add_dependency(&mut self, stack_name: &str) {
        if stack_name != self.name && !self.dependencies.iter().any(|d| d == stack_name) {
            self.dependencies.push(stack_name.to_string());
        }
    }

    /// Record a lookup that had no cached value
    pub fn report_missing(&mut self, missing: MissingContext) {
        if !self.missing_context.iter().any(|m| m.key == missing.key) {
            self.missing_context.push(missing);
        }
    }
}

/// Declares the resources of one stack
pub trait StackBuilder {
    /// Name of the stack this builder produces
    fn stack_name(&self) -> String;

    /// Template description
    fn description(&self) -> Option<String> {
        None
    }

    /// Declare resources into `stack`, reading lookups from `context`
    fn declare(&self, stack: &mut Stack, context: &ContextStore) -> Result<()>;

    /// Create the stack and declare into it
    fn build(&self, environment: &Environment, context: &ContextStore) -> Result<Stack> {
        let mut stack = Stack::new(self.stack_name(), environment.clone())?;
        if let Some(description) = self.description() {
            stack.set_description(description);
        }
        self.declare(&mut stack, context)?;
        Ok(stack)
    }
}
