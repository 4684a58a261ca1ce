//! CloudFormation template model.
//!
//! A [`Template`] holds resources in declaration order so that rendering is
//! deterministic: the same declarations always produce byte-identical output.
//! Resource properties are stored as JSON values produced from the typed
//! property structs in [`crate::resources`].

pub mod expr;
pub mod logical_id;

pub use expr::{Expr, PseudoParameter, Tag};
pub use logical_id::logical_id;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Template format version written into every template
pub const FORMAT_VERSION: &str = "2010-09-09";

/// A synthesized CloudFormation template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub resources: IndexMap<String, ResourceEntry>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Output>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: None,
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a resource by logical id
    pub fn resource(&self, logical_id: &str) -> Option<&ResourceEntry> {
        self.resources.get(logical_id)
    }

    /// Iterate over resources of one type, in declaration order
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a ResourceEntry)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    /// Number of resources of one type
    pub fn count_of_type(&self, resource_type: &str) -> usize {
        self.resources_of_type(resource_type).count()
    }
}

/// One entry of the template's `Resources` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceEntry {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub properties: serde_json::Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl ResourceEntry {
    /// Get a top-level property
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }

    /// Get a top-level property as a string literal
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(serde_json::Value::as_str)
    }
}

/// An entry of the template's `Outputs` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Reference to a declared resource, used to wire properties together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    logical_id: String,
    resource_type: &'static str,
}

impl ResourceHandle {
    pub(crate) fn new(logical_id: String, resource_type: &'static str) -> Self {
        Self {
            logical_id,
            resource_type,
        }
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    /// `{"Ref": logical_id}`
    pub fn reference(&self) -> Expr {
        Expr::Ref(self.logical_id.clone())
    }

    /// `{"Fn::GetAtt": [logical_id, attribute]}`
    pub fn get_att(&self, attribute: &str) -> Expr {
        Expr::GetAtt {
            logical_id: self.logical_id.clone(),
            attribute: attribute.to_string(),
        }
    }

    /// Shorthand for the `Arn` attribute
    pub fn arn(&self) -> Expr {
        self.get_att("Arn")
    }
}
