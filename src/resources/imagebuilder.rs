//! EC2 Image Builder resources.
//!
//! A pipeline binds one image recipe (ordered build components on top of a
//! parent image) to one infrastructure configuration (where the build runs).

use super::ResourceProperties;
use crate::template::Expr;
use serde::Serialize;

/// `AWS::ImageBuilder::Component`
///
/// `version` is bumped by hand whenever the document behind `uri` changes;
/// Image Builder refuses to overwrite an existing version.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Component {
    pub name: String,
    pub platform: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceProperties for Component {
    const RESOURCE_TYPE: &'static str = "AWS::ImageBuilder::Component";
}

/// A component reference inside a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComponentConfiguration {
    pub component_arn: Expr,
}

impl From<Expr> for ComponentConfiguration {
    fn from(component_arn: Expr) -> Self {
        Self { component_arn }
    }
}

/// `AWS::ImageBuilder::ImageRecipe`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageRecipe {
    pub components: Vec<ComponentConfiguration>,
    pub name: String,
    pub parent_image: String,
    pub version: String,
}

impl ResourceProperties for ImageRecipe {
    const RESOURCE_TYPE: &'static str = "AWS::ImageBuilder::ImageRecipe";
}

/// `AWS::ImageBuilder::InfrastructureConfiguration`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InfrastructureConfiguration {
    pub instance_profile_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instance_types: Vec<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<Expr>,
    /// Always written, so a `false` keeps failed build instances for inspection
    pub terminate_instance_on_failure: bool,
}

impl ResourceProperties for InfrastructureConfiguration {
    const RESOURCE_TYPE: &'static str = "AWS::ImageBuilder::InfrastructureConfiguration";
}

/// `AWS::ImageBuilder::ImagePipeline`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImagePipeline {
    pub image_recipe_arn: Expr,
    pub infrastructure_configuration_arn: Expr,
    pub name: String,
}

impl ResourceProperties for ImagePipeline {
    const RESOURCE_TYPE: &'static str = "AWS::ImageBuilder::ImagePipeline";
}
