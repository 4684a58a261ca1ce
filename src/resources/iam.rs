//! IAM roles, instance profiles and policy documents.

use super::ResourceProperties;
use crate::template::{Expr, Tag};
use serde::Serialize;

/// Policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// An IAM policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }

    /// Trust policy letting an AWS service assume the role
    pub fn assume_role(service: &str) -> Self {
        Self::new(vec![PolicyStatement {
            effect: Effect::Allow,
            principal: Some(Principal {
                service: service.to_string(),
            }),
            action: vec!["sts:AssumeRole".to_string()],
            resource: Vec::new(),
        }])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Principal {
    pub service: String,
}

/// One statement of a policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<Expr>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: Vec<Expr>) -> Self {
        Self {
            effect: Effect::Allow,
            principal: None,
            action: actions.iter().map(|a| (*a).to_string()).collect(),
            resource: resources,
        }
    }
}

/// An inline policy attached to a role
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
}

/// `AWS::IAM::Role`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<Expr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<InlinePolicy>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl Role {
    /// A role assumable by `service` with the given AWS managed policies
    pub fn for_service(service: &str, managed_policies: &[&str]) -> Self {
        Self {
            assume_role_policy_document: PolicyDocument::assume_role(service),
            managed_policy_arns: managed_policies
                .iter()
                .map(|name| Expr::managed_policy_arn(name))
                .collect(),
            policies: Vec::new(),
            tags: Vec::new(),
        }
    }
}

impl ResourceProperties for Role {
    const RESOURCE_TYPE: &'static str = "AWS::IAM::Role";
}

/// `AWS::IAM::InstanceProfile`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_profile_name: Option<String>,
    pub roles: Vec<Expr>,
}

impl ResourceProperties for InstanceProfile {
    const RESOURCE_TYPE: &'static str = "AWS::IAM::InstanceProfile";
}
