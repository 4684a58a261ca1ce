//! The development workstation instance.
//!
//! The workstation lives in an existing VPC and boots from the newest image
//! the image pipeline produced. Both are synth-time lookups answered from the
//! context store; while either is missing, placeholders are declared and the
//! lookup is recorded on the stack.

use super::{Stack, StackBuilder};
use crate::context::{ContextStore, LookupRequest, MissingContext, VpcContext, PLACEHOLDER_IMAGE_ID};
use crate::error::{Error, Result};
use crate::parameters::Parameters;
use crate::resources::ec2::{EgressRule, IngressRule, Instance, SecurityGroup};
use crate::resources::iam::{InstanceProfile, PolicyDocument, Role};
use crate::template::{Expr, Tag};
use tracing::{debug, warn};

const SECURITY_GROUP_ID: &str = "sec-group-allow-ssh";
const INSTANCE_ID: &str = "ec2-instance";

/// Script run on first boot
pub const USER_DATA: &str = "#!/bin/bash";

/// Name of the workstation stack
pub fn stack_name(parameters: &Parameters) -> String {
    format!("{}-workstation", parameters.stack_prefix())
}

/// Declares the workstation instance and its security group
pub struct WorkstationStack<'a> {
    parameters: &'a Parameters,
}

impl<'a> WorkstationStack<'a> {
    pub fn new(parameters: &'a Parameters) -> Self {
        Self { parameters }
    }

    /// Lookup for the VPC the workstation joins
    pub fn vpc_request(&self) -> LookupRequest {
        LookupRequest::Vpc {
            account: self.parameters.aws_account.clone(),
            region: self.parameters.aws_region.clone(),
            vpc_id: self.parameters.workstation.vpc_id.clone(),
        }
    }

    /// Lookup for the image the workstation boots from
    pub fn image_request(&self) -> LookupRequest {
        LookupRequest::Image {
            account: self.parameters.aws_account.clone(),
            region: self.parameters.aws_region.clone(),
            name: self.parameters.workstation.image_name.clone(),
        }
    }
}

impl StackBuilder for WorkstationStack<'_> {
    fn stack_name(&self) -> String {
        stack_name(self.parameters)
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "Development workstation {}",
            self.parameters.workstation.instance_name
        ))
    }

    fn declare(&self, stack: &mut Stack, context: &ContextStore) -> Result<()> {
        let settings = &self.parameters.workstation;
        let zone = settings.availability_zone.as_str();

        let vpc_request = self.vpc_request();
        let vpc = match context.lookup_vpc(&vpc_request)? {
            Some(vpc) => vpc,
            None => {
                warn!(key = %vpc_request, "VPC lookup not in context, using placeholder");
                stack.report_missing(MissingContext::from(vpc_request.clone()));
                VpcContext::placeholder(&[zone])
            }
        };
        let subnet = vpc.subnet_in_zone(zone).ok_or_else(|| Error::InvalidContext {
            key: vpc_request.key(),
            message: format!("VPC {} has no subnet in {}", vpc.vpc_id, zone),
        })?;
        debug!(vpc_id = %vpc.vpc_id, subnet_id = %subnet.subnet_id, "Placing workstation");

        let image_request = self.image_request();
        let image_id = match context.lookup_image(&image_request)? {
            Some(id) => id,
            None => {
                warn!(key = %image_request, "Image lookup not in context, using placeholder");
                stack.report_missing(MissingContext::from(image_request));
                PLACEHOLDER_IMAGE_ID.to_string()
            }
        };

        let mut group = SecurityGroup::new(
            format!("{}/{}", stack.name(), SECURITY_GROUP_ID),
            Expr::from(vpc.vpc_id.as_str()),
        );
        group.security_group_egress.push(EgressRule::allow_all());
        group
            .security_group_ingress
            .push(IngressRule::tcp(22, "0.0.0.0/0").with_description("Allow SSH connection"));
        let security_group = stack.add_at(&[SECURITY_GROUP_ID, "Resource"], &group)?;

        let name_tag = Tag::name(settings.instance_name.as_str());
        let role = stack.add_at(
            &[INSTANCE_ID, "InstanceRole"],
            &Role {
                assume_role_policy_document: PolicyDocument::assume_role("ec2.amazonaws.com"),
                managed_policy_arns: Vec::new(),
                policies: Vec::new(),
                tags: vec![name_tag.clone()],
            },
        )?;
        let profile = stack.add_at(
            &[INSTANCE_ID, "InstanceProfile"],
            &InstanceProfile {
                instance_profile_name: None,
                roles: vec![role.reference()],
            },
        )?;

        let instance = stack.add_at(
            &[INSTANCE_ID, "Resource"],
            &Instance {
                availability_zone: Some(zone.to_string()),
                iam_instance_profile: Some(profile.reference()),
                image_id: Expr::from(image_id),
                instance_type: self.parameters.development_instance_type.clone(),
                security_group_ids: vec![security_group.get_att("GroupId")],
                subnet_id: Some(Expr::from(subnet.subnet_id.as_str())),
                tags: vec![name_tag],
                user_data: Some(Expr::base64(Expr::from(USER_DATA))),
            },
        )?;
        // The role must exist before the profile is attached at launch
        stack.add_depends_on(&instance, &role)?;

        stack.add_output("InstanceId", instance.reference(), Some("Workstation instance"))?;
        stack.add_output(
            "PublicDnsName",
            instance.get_att("PublicDnsName"),
            Some("Workstation public DNS name"),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_parameters;
    use serde_json::json;

    #[test]
    fn test_missing_lookups_use_placeholders() {
        let params = sample_parameters();
        let stack = WorkstationStack::new(&params)
            .build(&params.environment(), &ContextStore::new())
            .unwrap();
        assert_eq!(stack.missing_context().len(), 2);

        let (_, instance) = stack
            .template()
            .resources_of_type("AWS::EC2::Instance")
            .next()
            .unwrap();
        assert_eq!(instance.property_str("ImageId"), Some(PLACEHOLDER_IMAGE_ID));
        assert_eq!(instance.property_str("AvailabilityZone"), Some("us-east-1e"));
        assert_eq!(instance.property_str("InstanceType"), Some("t3.medium"));
        assert_eq!(instance.property("UserData"), Some(&json!({"Fn::Base64": "#!/bin/bash"})));
    }

    #[test]
    fn test_cached_lookups_are_used() {
        let params = sample_parameters();
        let builder = WorkstationStack::new(&params);
        let mut context = ContextStore::new();
        context.set(
            builder.vpc_request().key(),
            json!({
                "vpcId": params.workstation.vpc_id,
                "subnets": [{"subnetId": "subnet-0e", "availabilityZone": "us-east-1e", "public": true}]
            }),
        );
        context.set(builder.image_request().key(), json!("ami-0abc"));

        let stack = builder.build(&params.environment(), &context).unwrap();
        assert!(stack.missing_context().is_empty());

        let template = stack.template();
        let (_, instance) = template.resources_of_type("AWS::EC2::Instance").next().unwrap();
        assert_eq!(instance.property_str("ImageId"), Some("ami-0abc"));
        assert_eq!(instance.property_str("SubnetId"), Some("subnet-0e"));
        assert_eq!(instance.depends_on.len(), 1);

        let (_, group) = template.resources_of_type("AWS::EC2::SecurityGroup").next().unwrap();
        assert_eq!(group.property_str("VpcId"), Some(params.workstation.vpc_id.as_str()));
        assert_eq!(
            group.property("SecurityGroupIngress").unwrap()[0]["Description"],
            json!("Allow SSH connection")
        );
    }

    #[test]
    fn test_vpc_without_subnet_in_zone() {
        let params = sample_parameters();
        let builder = WorkstationStack::new(&params);
        let mut context = ContextStore::new();
        context.set(
            builder.vpc_request().key(),
            json!({"vpcId": "vpc-1", "subnets": [{"subnetId": "subnet-a", "availabilityZone": "us-east-1a"}]}),
        );
        let err = builder.build(&params.environment(), &context).unwrap_err();
        assert!(matches!(err, Error::InvalidContext { .. }));
    }
}
