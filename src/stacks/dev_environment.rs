//! Per-person development network.
//!
//! One VPC with a public subnet in every configured availability zone, all
//! sharing a single route table, plus a security group open for SSH, HTTP
//! and HTTPS.

use super::{Stack, StackBuilder};
use crate::context::ContextStore;
use crate::error::{Error, Result};
use crate::parameters::Parameters;
use crate::resources::ec2::{
    IngressRule, RouteTable, SecurityGroup, SecurityGroupIngress, Subnet,
    SubnetRouteTableAssociation, Vpc,
};
use crate::template::Tag;
use tracing::debug;

/// Prefix length of each generated subnet
pub const SUBNET_PREFIX_LEN: u8 = 24;

/// Ingress rules of the shared security group: (construct id, port)
pub const INGRESS_PORTS: &[(&str, u16)] = &[
    ("sec-group-ssh-ingress", 22),
    ("sec-group-http-ingress", 80),
    ("sec-group-https-ingress", 443),
];

/// Name of the development environment stack
pub fn stack_name(parameters: &Parameters) -> String {
    format!("{}-VPC", parameters.stack_prefix())
}

/// Suffix identifying a zone in construct ids (`us-east-1b` -> `B`)
pub fn zone_suffix(region: &str, zone: &str) -> String {
    zone.strip_prefix(region).unwrap_or(zone).to_uppercase()
}

/// Declares the development VPC
pub struct DevEnvironmentStack<'a> {
    parameters: &'a Parameters,
}

impl<'a> DevEnvironmentStack<'a> {
    pub fn new(parameters: &'a Parameters) -> Self {
        Self { parameters }
    }
}

impl StackBuilder for DevEnvironmentStack<'_> {
    fn stack_name(&self) -> String {
        stack_name(self.parameters)
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "Development network for {}",
            self.parameters.personal_name
        ))
    }

    fn declare(&self, stack: &mut Stack, _context: &ContextStore) -> Result<()> {
        let params = self.parameters;
        let prefix = params.name_prefix();
        let vpc_cidr = params.development_vpc_cidr;

        let vpc_name = format!("{}-VPC", prefix);
        let mut vpc_props = Vpc::with_dns(vpc_cidr.to_string());
        vpc_props.tags.push(Tag::name(vpc_name.as_str()));
        let vpc = stack.add(&vpc_name, &vpc_props)?;

        let route_table = stack.add(
            &format!("{}-RouteTable", prefix),
            &RouteTable {
                vpc_id: vpc.reference(),
                tags: Vec::new(),
            },
        )?;

        // Index 0 of the range stays free
        for (index, zone) in params.development_availability_zones.iter().enumerate() {
            let cidr = vpc_cidr
                .subnet(SUBNET_PREFIX_LEN, index as u32 + 1)
                .map_err(|e| Error::invalid_parameter("developmentVpcCidr", e.to_string()))?;
            let suffix = zone_suffix(&params.aws_region, zone);
            debug!(zone = %zone, cidr = %cidr, "Declaring development subnet");

            let subnet = stack.add(
                &format!("{}-Subnet-{}", prefix, suffix),
                &Subnet::public(vpc.reference(), cidr.to_string(), zone),
            )?;
            stack.add(
                &format!("{}-Route-Table-Association-public-{}", prefix, suffix),
                &SubnetRouteTableAssociation {
                    route_table_id: route_table.reference(),
                    subnet_id: subnet.reference(),
                },
            )?;
        }

        let mut group = SecurityGroup::new("development workstation security group", vpc.reference());
        group.tags.push(Tag::name("sg-amazon-linux-2-development-workstation"));
        let security_group = stack.add("development-workstation-security-group", &group)?;
        for (id, port) in INGRESS_PORTS {
            stack.add(
                id,
                &SecurityGroupIngress {
                    group_id: security_group.reference(),
                    rule: IngressRule::tcp(*port, "0.0.0.0/0"),
                },
            )?;
        }

        stack.add_output("VpcId", vpc.reference(), Some("Development VPC"))?;
        stack.add_output(
            "SecurityGroupId",
            security_group.get_att("GroupId"),
            Some("Shared development security group"),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_parameters;

    fn build(params: &Parameters) -> Result<Stack> {
        DevEnvironmentStack::new(params).build(&params.environment(), &ContextStore::new())
    }

    #[test]
    fn test_subnet_per_zone() {
        let params = sample_parameters();
        let stack = build(&params).unwrap();
        let template = stack.template();
        assert_eq!(template.count_of_type("AWS::EC2::Subnet"), 5);
        assert_eq!(
            template.count_of_type("AWS::EC2::SubnetRouteTableAssociation"),
            5
        );

        let subnet_b = template
            .resource("DevelopmentEnvironmentjdoeSubnetB")
            .unwrap();
        assert_eq!(subnet_b.property_str("CidrBlock"), Some("10.0.1.0/24"));
        assert_eq!(subnet_b.property_str("AvailabilityZone"), Some("us-east-1b"));

        let subnet_f = template
            .resource("DevelopmentEnvironmentjdoeSubnetF")
            .unwrap();
        assert_eq!(subnet_f.property_str("CidrBlock"), Some("10.0.5.0/24"));
        assert!(template
            .resource("DevelopmentEnvironmentjdoeRouteTableAssociationpublicF")
            .is_some());
    }

    #[test]
    fn test_zone_list_drives_subnets() {
        let mut params = sample_parameters();
        params.development_availability_zones =
            vec!["us-east-1a".to_string(), "us-east-1c".to_string()];
        let stack = build(&params).unwrap();
        let template = stack.template();
        assert_eq!(template.count_of_type("AWS::EC2::Subnet"), 2);
        assert_eq!(
            template
                .resource("DevelopmentEnvironmentjdoeSubnetC")
                .unwrap()
                .property_str("CidrBlock"),
            Some("10.0.2.0/24")
        );
    }

    #[test]
    fn test_vpc_too_small_for_zones() {
        let mut params = sample_parameters();
        params.development_vpc_cidr = "10.0.0.0/23".parse().unwrap();
        let err = build(&params).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_zone_suffix() {
        assert_eq!(zone_suffix("us-east-1", "us-east-1b"), "B");
        assert_eq!(zone_suffix("us-east-1", "use1-az4"), "USE1-AZ4");
    }
}
