//! Address-range checks.
//!
//! - N001 invalid-cidr: a literal CIDR that does not parse
//! - N002 subnet-outside-vpc: subnet range not inside its VPC's range
//! - N003 overlapping-subnets: two subnets of one VPC share addresses
//! - N004 misaligned-cidr: a CIDR with host bits set

use super::types::{LintConfig, LintIssue, LintResult, Location, RuleCategory, Severity};
use super::rule_entries;
use crate::network::Ipv4Cidr;
use crate::template::{ResourceEntry, Template};
use serde_json::Value;

const VPC: &str = "AWS::EC2::VPC";
const SUBNET: &str = "AWS::EC2::Subnet";
const ROUTE: &str = "AWS::EC2::Route";

/// Checker for CIDR blocks of VPCs, subnets, routes and security group rules.
#[derive(Debug, Default)]
pub struct NetworkChecker;

impl NetworkChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check every address range in a template.
    pub fn check_template(&self, stack: &str, template: &Template, config: &LintConfig) -> LintResult {
        let mut result = LintResult::new();

        for (logical_id, entry) in &template.resources {
            for (property, text) in literal_cidrs(entry) {
                let location = Location::stack(stack)
                    .with_resource(logical_id)
                    .with_property(property);
                self.check_cidr(text, location, config, &mut result);
            }
        }

        self.check_subnets(stack, template, config, &mut result);
        result
    }

    fn check_cidr(&self, text: &str, location: Location, config: &LintConfig, result: &mut LintResult) {
        match text.parse::<Ipv4Cidr>() {
            Err(e) => {
                if config.should_run_rule("N001", RuleCategory::Network, Severity::Error) {
                    result.add_issue(
                        LintIssue::new(
                            "N001",
                            "invalid-cidr",
                            Severity::Error,
                            RuleCategory::Network,
                            e.to_string(),
                            location,
                        )
                        .with_suggestion("Use dotted-quad notation with a prefix, e.g. 10.0.0.0/16"),
                    );
                }
            }
            Ok(cidr) if !cidr.is_aligned() => {
                if config.should_run_rule("N004", RuleCategory::Network, Severity::Warning) {
                    result.add_issue(
                        LintIssue::new(
                            "N004",
                            "misaligned-cidr",
                            Severity::Warning,
                            RuleCategory::Network,
                            format!("CIDR '{}' has host bits set", text),
                            location,
                        )
                        .with_suggestion(format!(
                            "Use the network address: {}/{}",
                            cidr.network(),
                            cidr.prefix_len()
                        )),
                    );
                }
            }
            Ok(_) => {}
        }
    }

    /// Subnet containment and overlap, for subnets whose VPC is in the same template.
    fn check_subnets(&self, stack: &str, template: &Template, config: &LintConfig, result: &mut LintResult) {
        // (vpc key, subnet id, range) in declaration order
        let mut seen: Vec<(String, &str, Ipv4Cidr)> = Vec::new();

        for (logical_id, entry) in template.resources_of_type(SUBNET) {
            let Some(cidr) = entry.property_str("CidrBlock").and_then(|s| s.parse().ok()) else {
                continue;
            };
            let Some(vpc) = entry.property("VpcId") else {
                continue;
            };

            if let Some(vpc_cidr) = referenced_vpc_cidr(template, vpc) {
                if !vpc_cidr.contains(&cidr)
                    && config.should_run_rule("N002", RuleCategory::Network, Severity::Error)
                {
                    result.add_issue(
                        LintIssue::new(
                            "N002",
                            "subnet-outside-vpc",
                            Severity::Error,
                            RuleCategory::Network,
                            format!("Subnet range {} is not inside VPC range {}", cidr, vpc_cidr),
                            Location::stack(stack)
                                .with_resource(logical_id)
                                .with_property("CidrBlock"),
                        )
                        .with_suggestion(format!("Carve the subnet out of {}", vpc_cidr)),
                    );
                }
            }

            let vpc_key = vpc.to_string();
            for (other_vpc, other_id, other_cidr) in &seen {
                if *other_vpc == vpc_key
                    && other_cidr.overlaps(&cidr)
                    && config.should_run_rule("N003", RuleCategory::Network, Severity::Error)
                {
                    result.add_issue(LintIssue::new(
                        "N003",
                        "overlapping-subnets",
                        Severity::Error,
                        RuleCategory::Network,
                        format!(
                            "Subnet range {} overlaps {} of subnet '{}'",
                            cidr, other_cidr, other_id
                        ),
                        Location::stack(stack)
                            .with_resource(logical_id)
                            .with_property("CidrBlock"),
                    ));
                }
            }
            seen.push((vpc_key, logical_id.as_str(), cidr));
        }
    }
}

/// Literal CIDR strings of a resource with their property paths
fn literal_cidrs(entry: &ResourceEntry) -> Vec<(String, &str)> {
    let mut found = Vec::new();
    let direct = match entry.resource_type.as_str() {
        VPC | SUBNET => Some("CidrBlock"),
        ROUTE => Some("DestinationCidrBlock"),
        _ => None,
    };
    if let Some(name) = direct {
        if let Some(text) = entry.property_str(name) {
            found.push((name.to_string(), text));
        }
    }

    for rule in rule_entries(entry) {
        if let Some(text) = rule.value.get("CidrIp").and_then(Value::as_str) {
            found.push((rule.property_path("CidrIp"), text));
        }
    }
    found
}

/// Range of the VPC a `{"Ref": ...}` points at, if declared here with a literal block
fn referenced_vpc_cidr(template: &Template, vpc: &Value) -> Option<Ipv4Cidr> {
    let id = vpc.get("Ref")?.as_str()?;
    let entry = template.resource(id)?;
    if entry.resource_type != VPC {
        return None;
    }
    entry.property_str("CidrBlock")?.parse().ok()
}
