//! EC2 networking and compute resources.
//!
//! Covers the pieces a self-contained network needs (VPC, subnets, route
//! tables, gateways, elastic IPs), security groups in both inline and
//! standalone-rule form, and instances.

use super::ResourceProperties;
use crate::template::{Expr, Tag};
use serde::Serialize;

/// `AWS::EC2::VPC`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vpc {
    pub cidr_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_dns_hostnames: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_dns_support: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl Vpc {
    /// A VPC with DNS support and DNS hostnames enabled
    pub fn with_dns(cidr_block: impl Into<String>) -> Self {
        Self {
            cidr_block: cidr_block.into(),
            enable_dns_hostnames: Some(true),
            enable_dns_support: Some(true),
            tags: Vec::new(),
        }
    }
}

impl ResourceProperties for Vpc {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::VPC";
}

/// `AWS::EC2::Subnet`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subnet {
    pub vpc_id: Expr,
    pub cidr_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_public_ip_on_launch: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl Subnet {
    /// A subnet that assigns public IPs to instances launched in it
    pub fn public(vpc_id: Expr, cidr_block: impl Into<String>, availability_zone: &str) -> Self {
        Self {
            vpc_id,
            cidr_block: cidr_block.into(),
            availability_zone: Some(availability_zone.to_string()),
            map_public_ip_on_launch: Some(true),
            tags: Vec::new(),
        }
    }
}

impl ResourceProperties for Subnet {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::Subnet";
}

/// `AWS::EC2::RouteTable`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteTable {
    pub vpc_id: Expr,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl ResourceProperties for RouteTable {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::RouteTable";
}

/// `AWS::EC2::SubnetRouteTableAssociation`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetRouteTableAssociation {
    pub route_table_id: Expr,
    pub subnet_id: Expr,
}

impl ResourceProperties for SubnetRouteTableAssociation {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::SubnetRouteTableAssociation";
}

/// `AWS::EC2::Route`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Route {
    pub route_table_id: Expr,
    pub destination_cidr_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id: Option<Expr>,
}

impl ResourceProperties for Route {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::Route";
}

/// `AWS::EC2::InternetGateway`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InternetGateway {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl ResourceProperties for InternetGateway {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::InternetGateway";
}

/// `AWS::EC2::VPCGatewayAttachment`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcGatewayAttachment {
    pub vpc_id: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_gateway_id: Option<Expr>,
}

impl ResourceProperties for VpcGatewayAttachment {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::VPCGatewayAttachment";
}

/// `AWS::EC2::NatGateway`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NatGateway {
    pub allocation_id: Expr,
    pub subnet_id: Expr,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl ResourceProperties for NatGateway {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::NatGateway";
}

/// `AWS::EC2::EIP`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Eip {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl ResourceProperties for Eip {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::EIP";
}

/// An ingress rule, used inline in a security group or standalone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngressRule {
    pub ip_protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_port: Option<i32>,
}

impl IngressRule {
    /// Allow a single TCP port from a CIDR block
    pub fn tcp(port: u16, cidr_ip: &str) -> Self {
        Self {
            ip_protocol: "tcp".to_string(),
            cidr_ip: Some(cidr_ip.to_string()),
            description: None,
            from_port: Some(i32::from(port)),
            to_port: Some(i32::from(port)),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An egress rule inlined in a security group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EgressRule {
    pub ip_protocol: String,
    pub cidr_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EgressRule {
    /// Allow all outbound IPv4 traffic
    pub fn allow_all() -> Self {
        Self {
            ip_protocol: "-1".to_string(),
            cidr_ip: "0.0.0.0/0".to_string(),
            description: Some("Allow all outbound traffic by default".to_string()),
        }
    }
}

/// `AWS::EC2::SecurityGroup`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroup {
    pub group_description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_egress: Vec<EgressRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ingress: Vec<IngressRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<Expr>,
}

impl SecurityGroup {
    pub fn new(group_description: impl Into<String>, vpc_id: Expr) -> Self {
        Self {
            group_description: group_description.into(),
            security_group_egress: Vec::new(),
            security_group_ingress: Vec::new(),
            tags: Vec::new(),
            vpc_id: Some(vpc_id),
        }
    }
}

impl ResourceProperties for SecurityGroup {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::SecurityGroup";
}

/// `AWS::EC2::SecurityGroupIngress`, a rule declared as its own resource
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupIngress {
    pub group_id: Expr,
    #[serde(flatten)]
    pub rule: IngressRule,
}

impl ResourceProperties for SecurityGroupIngress {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::SecurityGroupIngress";
}

/// `AWS::EC2::Instance`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iam_instance_profile: Option<Expr>,
    pub image_id: Expr,
    pub instance_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<Expr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Expr>,
}

impl ResourceProperties for Instance {
    const RESOURCE_TYPE: &'static str = "AWS::EC2::Instance";
}
