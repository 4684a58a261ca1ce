//! Security group rule checks.
//!
//! - SG001 empty-protocol: a rule without an `IpProtocol`
//! - SG002 invalid-port-range: tcp/udp ports outside 0-65535 or reversed
//! - SG003 world-open-ssh: port 22 reachable from anywhere

use super::types::{LintConfig, LintIssue, LintResult, Location, RuleCategory, Severity};
use super::{rule_entries, RuleDirection, RuleEntry};
use crate::template::Template;
use serde_json::Value;

const SSH_PORT: i64 = 22;
const MAX_PORT: i64 = 65535;

/// Checker for security group ingress and egress rules.
#[derive(Debug, Default)]
pub struct SecurityChecker;

impl SecurityChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check every security group rule in a template.
    pub fn check_template(&self, stack: &str, template: &Template, config: &LintConfig) -> LintResult {
        let mut result = LintResult::new();
        for (logical_id, entry) in &template.resources {
            for rule in rule_entries(entry) {
                let location = Location::stack(stack).with_resource(logical_id);
                self.check_rule(&rule, location, config, &mut result);
            }
        }
        result
    }

    fn check_rule(&self, rule: &RuleEntry<'_>, location: Location, config: &LintConfig, result: &mut LintResult) {
        let protocol = rule
            .value
            .get("IpProtocol")
            .map(|p| match p {
                Value::String(s) => s.trim().to_lowercase(),
                Value::Number(n) => n.to_string(),
                _ => String::new(),
            })
            .unwrap_or_default();

        if protocol.is_empty() {
            if config.should_run_rule("SG001", RuleCategory::Security, Severity::Error) {
                result.add_issue(
                    LintIssue::new(
                        "SG001",
                        "empty-protocol",
                        Severity::Error,
                        RuleCategory::Security,
                        "Security group rule has no IP protocol",
                        location.with_property(rule.property_path("IpProtocol")),
                    )
                    .with_suggestion("Set IpProtocol to tcp, udp, icmp or -1"),
                );
            }
            return;
        }

        let from = rule.value.get("FromPort").and_then(Value::as_i64);
        let to = rule.value.get("ToPort").and_then(Value::as_i64);

        if matches!(protocol.as_str(), "tcp" | "udp" | "6" | "17") {
            let problem = match (from, to) {
                (Some(from), Some(to)) if !(0..=MAX_PORT).contains(&from) || !(0..=MAX_PORT).contains(&to) => {
                    Some(format!("Port range {}-{} is outside 0-{}", from, to, MAX_PORT))
                }
                (Some(from), Some(to)) if from > to => {
                    Some(format!("Port range {}-{} starts after it ends", from, to))
                }
                (Some(_), Some(_)) => None,
                _ => Some(format!("Protocol '{}' requires FromPort and ToPort", protocol)),
            };
            if let Some(message) = problem {
                if config.should_run_rule("SG002", RuleCategory::Security, Severity::Error) {
                    result.add_issue(
                        LintIssue::new(
                            "SG002",
                            "invalid-port-range",
                            Severity::Error,
                            RuleCategory::Security,
                            message,
                            location.clone().with_property(rule.property_path("FromPort")),
                        )
                        .with_suggestion("Use ports within 0-65535 with FromPort <= ToPort"),
                    );
                }
            }
        }

        if rule.direction == RuleDirection::Ingress
            && matches!(protocol.as_str(), "tcp" | "6" | "-1")
            && covers_ssh(&protocol, from, to)
            && is_world_open(rule.value)
            && config.should_run_rule("SG003", RuleCategory::Security, Severity::Warning)
        {
            result.add_issue(
                LintIssue::new(
                    "SG003",
                    "world-open-ssh",
                    Severity::Warning,
                    RuleCategory::Security,
                    "SSH is reachable from any address",
                    location.with_property(rule.property_path("CidrIp")),
                )
                .with_suggestion("Restrict the source range to known addresses"),
            );
        }
    }
}

fn covers_ssh(protocol: &str, from: Option<i64>, to: Option<i64>) -> bool {
    if protocol == "-1" {
        return true;
    }
    matches!((from, to), (Some(from), Some(to)) if from <= SSH_PORT && SSH_PORT <= to)
}

fn is_world_open(rule: &Value) -> bool {
    rule.get("CidrIp").and_then(Value::as_str) == Some("0.0.0.0/0")
        || rule.get("CidrIpv6").and_then(Value::as_str) == Some("::/0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group(ingress: Value) -> Template {
        serde_json::from_value(json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": {
                "Sg": {"Type": "AWS::EC2::SecurityGroup", "Properties": {
                    "GroupDescription": "test",
                    "SecurityGroupIngress": ingress,
                    "SecurityGroupEgress": [{"IpProtocol": "-1", "CidrIp": "0.0.0.0/0"}]
                }}
            }
        }))
        .unwrap()
    }

    fn rule_ids(result: &LintResult) -> Vec<&str> {
        result.issues.iter().map(|i| i.rule_id.as_str()).collect()
    }

    #[test]
    fn test_valid_rules_are_clean() {
        let t = group(json!([
            {"IpProtocol": "tcp", "FromPort": 443, "ToPort": 443, "CidrIp": "0.0.0.0/0"},
            {"IpProtocol": "icmp", "FromPort": -1, "ToPort": -1, "CidrIp": "10.0.0.0/8"}
        ]));
        let result = SecurityChecker::new().check_template("s", &t, &LintConfig::new());
        assert!(result.issues.is_empty(), "{:?}", result.issues);
    }

    #[test]
    fn test_empty_protocol() {
        let t = group(json!([{"IpProtocol": "", "FromPort": 80, "ToPort": 80, "CidrIp": "10.0.0.0/8"}]));
        let result = SecurityChecker::new().check_template("s", &t, &LintConfig::new());
        assert_eq!(rule_ids(&result), vec!["SG001"]);
    }

    #[test]
    fn test_port_ranges() {
        let t = group(json!([
            {"IpProtocol": "tcp", "FromPort": 0, "ToPort": 70000, "CidrIp": "10.0.0.0/8"},
            {"IpProtocol": "udp", "FromPort": 90, "ToPort": 80, "CidrIp": "10.0.0.0/8"},
            {"IpProtocol": "tcp", "CidrIp": "10.0.0.0/8"}
        ]));
        let result = SecurityChecker::new().check_template("s", &t, &LintConfig::new());
        assert_eq!(rule_ids(&result), vec!["SG002", "SG002", "SG002"]);
        assert!(result.issues[1].message.contains("starts after it ends"));
    }

    #[test]
    fn test_world_open_ssh() {
        let t = group(json!([{"IpProtocol": "tcp", "FromPort": 22, "ToPort": 22, "CidrIp": "0.0.0.0/0"}]));
        let result = SecurityChecker::new().check_template("s", &t, &LintConfig::new());
        assert_eq!(rule_ids(&result), vec!["SG003"]);
        assert_eq!(result.issues[0].severity, Severity::Warning);

        let mut config = LintConfig::new();
        config.skip_rules.push("SG003".to_string());
        assert!(SecurityChecker::new().check_template("s", &t, &config).issues.is_empty());
    }

    #[test]
    fn test_standalone_ingress_resource() {
        let t: Template = serde_json::from_value(json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": {
                "Rule": {"Type": "AWS::EC2::SecurityGroupIngress", "Properties": {
                    "GroupId": {"Ref": "Sg"}, "IpProtocol": "tcp", "FromPort": 22, "ToPort": 22, "CidrIp": "0.0.0.0/0"
                }}
            }
        }))
        .unwrap();
        let result = SecurityChecker::new().check_template("s", &t, &LintConfig::new());
        assert_eq!(rule_ids(&result), vec!["SG003"]);
        assert_eq!(result.issues[0].location.to_string(), "s/Rule.CidrIp");
    }
}
