//! EC2 Image Builder pipeline producing the workstation image.
//!
//! The pipeline builds in its own small network: one public subnet routed
//! through an internet gateway, with a NAT gateway on an elastic IP. The
//! recipe layers five custom components, hosted as documents in the
//! component bucket, on top of four AWS-published ones.

use super::{Stack, StackBuilder};
use crate::context::ContextStore;
use crate::error::Result;
use crate::parameters::Parameters;
use crate::resources::ec2::{
    Eip, IngressRule, InternetGateway, NatGateway, Route, RouteTable, SecurityGroup,
    SecurityGroupIngress, Subnet, SubnetRouteTableAssociation, Vpc, VpcGatewayAttachment,
};
use crate::resources::iam::{InstanceProfile, Role};
use crate::resources::imagebuilder::{
    Component, ComponentConfiguration, ImagePipeline, ImageRecipe, InfrastructureConfiguration,
};
use crate::template::{Expr, Tag};
use tracing::debug;

/// Common prefix of the pipeline's named resources
pub const RESOURCE_PREFIX: &str = "AmazonLinux2-x86-Development-Workstation";

/// Name of the image recipe; produced images carry it as a name prefix
pub const RECIPE_NAME: &str = "AmazonLinux2-x86-Development-Workstation-Recipe";

/// Recipe version, bumped by hand when the component list changes
pub const RECIPE_VERSION: &str = "1.0.1";

/// Name of the builder instance profile
pub const INSTANCE_PROFILE_NAME: &str = "AmazonLinux2-x86-Development-Workstation-InstanceProfile";

/// Name of the infrastructure configuration
pub const INFRASTRUCTURE_NAME: &str = "AmazonLinux2-x86-Development-Workstation-InfrastructureConfig";

const PIPELINE_VPC_CIDR: &str = "10.0.0.0/16";
const PIPELINE_SUBNET_CIDR: &str = "10.0.0.0/24";
const PIPELINE_ZONE_LETTER: &str = "e";
const ANYWHERE: &str = "0.0.0.0/0";

/// Managed policies attached to the builder role
pub const BUILDER_MANAGED_POLICIES: &[&str] = &[
    "AmazonSSMManagedInstanceCore",
    "EC2InstanceProfileForImageBuilder",
];

/// A custom build component backed by a document in the component bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSpec {
    /// Construct id inside the stack
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    /// Document file name under the components prefix
    pub document: &'static str,
}

/// Custom components, in declaration order
pub const LOCAL_COMPONENTS: &[ComponentSpec] = &[
    ComponentSpec {
        id: "common-tools",
        name: "Common Tools",
        version: "1.0.1",
        document: "common-tools.yml",
    },
    ComponentSpec {
        id: "cdk",
        name: "AWS CDK",
        version: "1.0.0",
        document: "cdk.yml",
    },
    ComponentSpec {
        id: "Ruby - rbenv",
        name: "rbenv",
        version: "1.0.0",
        document: "ruby.yml",
    },
    ComponentSpec {
        id: "Docker",
        name: "docker",
        version: "1.0.0",
        document: "docker-compose.yml",
    },
    ComponentSpec {
        id: "SAM",
        name: "sam",
        version: "1.0.1",
        document: "sam.yml",
    },
];

/// Order of the custom components inside the recipe, by construct id
pub const RECIPE_LOCAL_ORDER: &[&str] = &["common-tools", "Ruby - rbenv", "cdk", "Docker", "SAM"];

/// AWS-published components (name, version) placed first in the recipe
pub const EXTERNAL_COMPONENTS: &[(&str, &str)] = &[
    ("chrony-time-configuration-test", "1.0.0"),
    ("amazon-cloudwatch-agent-linux", "1.0.0"),
    ("python-3-linux", "1.0.2"),
    ("nodejs-12-lts-linux", "1.0.1"),
];

/// ARN of an AWS-published component in `region`
pub fn external_component_arn(region: &str, name: &str, version: &str) -> String {
    format!("arn:aws:imagebuilder:{}:aws:component/{}/{}", region, name, version)
}

/// Name of the image pipeline stack
pub fn stack_name(parameters: &Parameters) -> String {
    format!("{}-image-builder-pipeline", parameters.stack_prefix())
}

/// Declares components, recipe, builder network and the image pipeline
pub struct ImagePipelineStack<'a> {
    parameters: &'a Parameters,
}

impl<'a> ImagePipelineStack<'a> {
    pub fn new(parameters: &'a Parameters) -> Self {
        Self { parameters }
    }
}

impl StackBuilder for ImagePipelineStack<'_> {
    fn stack_name(&self) -> String {
        stack_name(self.parameters)
    }

    fn description(&self) -> Option<String> {
        Some("Image Builder pipeline for the development workstation image".to_string())
    }

    fn declare(&self, stack: &mut Stack, _context: &ContextStore) -> Result<()> {
        let params = self.parameters;

        // Components
        let mut local = Vec::with_capacity(LOCAL_COMPONENTS.len());
        for spec in LOCAL_COMPONENTS {
            let handle = stack.add(
                spec.id,
                &Component {
                    name: spec.name.to_string(),
                    platform: "Linux".to_string(),
                    version: spec.version.to_string(),
                    uri: Some(params.component_uri(spec.document)),
                    description: None,
                },
            )?;
            local.push((spec.id, handle));
        }

        let mut components: Vec<ComponentConfiguration> = EXTERNAL_COMPONENTS
            .iter()
            .map(|(name, version)| {
                Expr::from(external_component_arn(&params.aws_region, name, version)).into()
            })
            .collect();
        for id in RECIPE_LOCAL_ORDER {
            if let Some((_, handle)) = local.iter().find(|(local_id, _)| local_id == id) {
                components.push(handle.arn().into());
            }
        }
        debug!(components = components.len(), "Declaring image recipe");

        let recipe = stack.add(
            RECIPE_NAME,
            &ImageRecipe {
                components,
                name: RECIPE_NAME.to_string(),
                parent_image: params.base_image_arn.clone(),
                version: RECIPE_VERSION.to_string(),
            },
        )?;

        // Builder identity
        let role_id = format!("{}-Role", RESOURCE_PREFIX);
        let role = stack.add_at(
            &[role_id.as_str(), "Resource"],
            &Role::for_service("ec2.amazonaws.com", BUILDER_MANAGED_POLICIES),
        )?;
        let profile = stack.add(
            INSTANCE_PROFILE_NAME,
            &InstanceProfile {
                instance_profile_name: Some(INSTANCE_PROFILE_NAME.to_string()),
                roles: vec![role.reference()],
            },
        )?;

        // Builder network
        let vpc = stack.add(
            &format!("{}-VPC", RESOURCE_PREFIX),
            &Vpc::with_dns(PIPELINE_VPC_CIDR),
        )?;
        let route_table = stack.add(
            &format!("{}-RouteTable", RESOURCE_PREFIX),
            &RouteTable {
                vpc_id: vpc.reference(),
                tags: Vec::new(),
            },
        )?;
        let subnet = stack.add(
            &format!("{}-Subnet", RESOURCE_PREFIX),
            &Subnet::public(
                vpc.reference(),
                PIPELINE_SUBNET_CIDR,
                &format!("{}{}", params.aws_region, PIPELINE_ZONE_LETTER),
            ),
        )?;
        let eip = stack.add(
            &format!("{}-ElasticIP", RESOURCE_PREFIX),
            &Eip {
                domain: Some("vpc".to_string()),
                tags: Vec::new(),
            },
        )?;
        // The address is allocated before the VPC is created
        stack.add_depends_on(&vpc, &eip)?;

        let gateway = stack.add(
            "rds-igw",
            &InternetGateway {
                tags: vec![Tag::name("rds-igw")],
            },
        )?;
        stack.add(
            "igw-attachment",
            &VpcGatewayAttachment {
                vpc_id: vpc.reference(),
                internet_gateway_id: Some(gateway.reference()),
            },
        )?;
        stack.add(
            "natgateway",
            &NatGateway {
                allocation_id: eip.get_att("AllocationId"),
                subnet_id: subnet.reference(),
                tags: Vec::new(),
            },
        )?;
        stack.add(
            "rtb-assoc-public",
            &SubnetRouteTableAssociation {
                route_table_id: route_table.reference(),
                subnet_id: subnet.reference(),
            },
        )?;
        stack.add(
            "public-route",
            &Route {
                route_table_id: route_table.reference(),
                destination_cidr_block: ANYWHERE.to_string(),
                gateway_id: Some(gateway.reference()),
                nat_gateway_id: None,
            },
        )?;

        let mut group = SecurityGroup::new("development workstation security group", vpc.reference());
        group.tags.push(Tag::name("sg-amazon-linux-2-development-workstation"));
        let security_group = stack.add("development-workstation-security-group", &group)?;
        for (id, port) in [
            ("sec-group-ssh-ingress", 22),
            ("sec-group-http-ingress", 80),
            ("sec-group-https-ingress", 443),
        ] {
            stack.add(
                id,
                &SecurityGroupIngress {
                    group_id: security_group.reference(),
                    rule: IngressRule::tcp(port, ANYWHERE),
                },
            )?;
        }

        // Build infrastructure and pipeline
        let infrastructure = stack.add(
            INFRASTRUCTURE_NAME,
            &InfrastructureConfiguration {
                instance_profile_name: INSTANCE_PROFILE_NAME.to_string(),
                instance_types: vec![params.build_instance_type.clone()],
                name: INFRASTRUCTURE_NAME.to_string(),
                security_group_ids: vec![security_group.reference()],
                subnet_id: Some(subnet.reference()),
                terminate_instance_on_failure: false,
            },
        )?;
        // The profile is referenced by name, so the ordering must be explicit
        stack.add_depends_on(&infrastructure, &profile)?;

        let pipeline = stack.add(
            &format!("{}-ImagePipeline", RESOURCE_PREFIX),
            &ImagePipeline {
                image_recipe_arn: recipe.arn(),
                infrastructure_configuration_arn: infrastructure.arn(),
                name: params.image_pipeline_name.clone(),
            },
        )?;
        stack.add_depends_on(&pipeline, &infrastructure)?;

        stack.add_output("ImagePipelineArn", pipeline.arn(), Some("Image pipeline"))?;
        stack.add_output("ImageRecipeArn", recipe.arn(), Some("Workstation image recipe"))?;
        Ok(())
    }
}
