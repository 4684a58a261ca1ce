//! CodeBuild projects and CodePipeline pipelines.

use super::ResourceProperties;
use crate::template::Expr;
use indexmap::IndexMap;
use serde::Serialize;

/// Source/artifact type for projects driven by a pipeline
pub const CODEPIPELINE: &str = "CODEPIPELINE";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectSource {
    #[serde(rename = "Type")]
    pub source_type: String,
    /// `None` means the buildspec checked into the source repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_spec: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectArtifacts {
    #[serde(rename = "Type")]
    pub artifacts_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectEnvironment {
    pub compute_type: String,
    pub image: String,
    pub privileged_mode: bool,
    #[serde(rename = "Type")]
    pub environment_type: String,
}

impl Default for ProjectEnvironment {
    fn default() -> Self {
        Self {
            compute_type: "BUILD_GENERAL1_SMALL".to_string(),
            image: "aws/codebuild/standard:7.0".to_string(),
            privileged_mode: false,
            environment_type: "LINUX_CONTAINER".to_string(),
        }
    }
}

/// `AWS::CodeBuild::Project`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
    pub artifacts: ProjectArtifacts,
    pub environment: ProjectEnvironment,
    pub service_role: Expr,
    pub source: ProjectSource,
}

impl Project {
    /// A project fed by a pipeline, running the repository's own buildspec
    pub fn for_pipeline(service_role: Expr) -> Self {
        Self {
            artifacts: ProjectArtifacts {
                artifacts_type: CODEPIPELINE.to_string(),
            },
            environment: ProjectEnvironment::default(),
            service_role,
            source: ProjectSource {
                source_type: CODEPIPELINE.to_string(),
                build_spec: None,
            },
        }
    }
}

impl ResourceProperties for Project {
    const RESOURCE_TYPE: &'static str = "AWS::CodeBuild::Project";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArtifactStore {
    pub location: Expr,
    #[serde(rename = "Type")]
    pub store_type: String,
}

impl ArtifactStore {
    pub fn s3(bucket: Expr) -> Self {
        Self {
            location: bucket,
            store_type: "S3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionTypeId {
    pub category: String,
    pub owner: String,
    pub provider: String,
    pub version: String,
}

impl ActionTypeId {
    pub fn aws(category: &str, provider: &str) -> Self {
        Self {
            category: category.to_string(),
            owner: "AWS".to_string(),
            provider: provider.to_string(),
            version: "1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Artifact {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Action {
    pub action_type_id: ActionTypeId,
    pub configuration: IndexMap<String, Expr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub input_artifacts: Vec<Artifact>,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_artifacts: Vec<Artifact>,
    pub run_order: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stage {
    pub actions: Vec<Action>,
    pub name: String,
}

/// `AWS::CodePipeline::Pipeline`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pipeline {
    pub artifact_store: ArtifactStore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub restart_execution_on_update: bool,
    pub role_arn: Expr,
    pub stages: Vec<Stage>,
}

impl ResourceProperties for Pipeline {
    const RESOURCE_TYPE: &'static str = "AWS::CodePipeline::Pipeline";
}
