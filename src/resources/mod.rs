//! Typed resource property structs.
//!
//! Each struct mirrors the `Properties` block of one CloudFormation resource
//! type and serializes to it directly (PascalCase keys, unset optionals
//! omitted). Stacks declare resources through these types so that property
//! names are checked at compile time rather than discovered at deploy time.

pub mod ec2;
pub mod events;
pub mod iam;
pub mod imagebuilder;
pub mod pipeline;
pub mod s3;

use serde::Serialize;

/// A value that can be declared as a CloudFormation resource
pub trait ResourceProperties: Serialize {
    /// The `AWS::Service::Type` name
    const RESOURCE_TYPE: &'static str;
}

/// `Fn::GetAtt` attributes documented for the resource types this crate emits.
///
/// Returns `None` for types the crate does not know, in which case callers
/// should not second-guess the attribute name.
pub fn known_attributes(resource_type: &str) -> Option<&'static [&'static str]> {
    let attrs: &'static [&'static str] = match resource_type {
        "AWS::EC2::VPC" => &[
            "CidrBlock",
            "CidrBlockAssociations",
            "DefaultNetworkAcl",
            "DefaultSecurityGroup",
            "Ipv6CidrBlocks",
            "VpcId",
        ],
        "AWS::EC2::Subnet" => &[
            "AvailabilityZone",
            "AvailabilityZoneId",
            "CidrBlock",
            "NetworkAclAssociationId",
            "SubnetId",
            "VpcId",
        ],
        "AWS::EC2::EIP" => &["AllocationId", "PublicIp"],
        "AWS::EC2::SecurityGroup" => &["GroupId", "VpcId"],
        "AWS::EC2::InternetGateway" => &["InternetGatewayId"],
        "AWS::EC2::NatGateway" => &["NatGatewayId"],
        "AWS::EC2::RouteTable" => &["RouteTableId"],
        "AWS::EC2::Instance" => &[
            "AvailabilityZone",
            "InstanceId",
            "PrivateDnsName",
            "PrivateIp",
            "PublicDnsName",
            "PublicIp",
        ],
        "AWS::IAM::Role" => &["Arn", "RoleId"],
        "AWS::IAM::InstanceProfile" => &["Arn"],
        "AWS::ImageBuilder::Component" => &["Arn", "Encrypted", "Name", "Type"],
        "AWS::ImageBuilder::ImageRecipe" => &["Arn", "Name"],
        "AWS::ImageBuilder::InfrastructureConfiguration" => &["Arn", "Name"],
        "AWS::ImageBuilder::ImagePipeline" => &["Arn", "Name"],
        "AWS::S3::Bucket" => &[
            "Arn",
            "DomainName",
            "DualStackDomainName",
            "RegionalDomainName",
            "WebsiteURL",
        ],
        "AWS::CodeBuild::Project" => &["Arn"],
        "AWS::CodePipeline::Pipeline" => &["Version"],
        "AWS::Events::Rule" => &["Arn"],
        _ => return None,
    };
    Some(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_attributes() {
        assert!(known_attributes("AWS::EC2::EIP")
            .unwrap()
            .contains(&"AllocationId"));
        assert!(known_attributes("AWS::ImageBuilder::ImageRecipe")
            .unwrap()
            .contains(&"Arn"));
        assert!(known_attributes("Custom::Thing").is_none());
    }
}
