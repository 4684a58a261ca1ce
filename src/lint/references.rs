//! Reference integrity checks.
//!
//! - R001 unknown-ref: `Ref` to a logical id that is not declared
//! - R002 unknown-getatt: `Fn::GetAtt` on a logical id that is not declared
//! - R003 unknown-attribute: `Fn::GetAtt` of an attribute the type does not have
//! - R004 unknown-depends-on: `DependsOn` naming an undeclared resource
//! - R005 dependency-cycle: resources that depend on each other

use super::types::{LintConfig, LintIssue, LintResult, Location, RuleCategory, Severity};
use crate::graph::DependencyGraph;
use crate::resources::known_attributes;
use crate::template::Template;
use serde_json::Value;

/// An intrinsic pointing at another resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reference {
    Ref(String),
    GetAtt { logical_id: String, attribute: String },
}

impl Reference {
    pub(crate) fn target(&self) -> &str {
        match self {
            Reference::Ref(id) => id,
            Reference::GetAtt { logical_id, .. } => logical_id,
        }
    }
}

/// Every `Ref` and `Fn::GetAtt` inside a value, depth first
pub(crate) fn collect_references(value: &Value, found: &mut Vec<Reference>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(id)) = map.get("Ref") {
                    found.push(Reference::Ref(id.clone()));
                    return;
                }
                if let Some(target) = map.get("Fn::GetAtt") {
                    if let Some(reference) = parse_get_att(target) {
                        found.push(reference);
                        return;
                    }
                }
            }
            for nested in map.values() {
                collect_references(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, found);
            }
        }
        _ => {}
    }
}

fn parse_get_att(target: &Value) -> Option<Reference> {
    let (logical_id, attribute) = match target {
        Value::Array(parts) if parts.len() == 2 => {
            (parts[0].as_str()?.to_string(), parts[1].as_str()?.to_string())
        }
        Value::String(dotted) => {
            let (id, attr) = dotted.split_once('.')?;
            (id.to_string(), attr.to_string())
        }
        _ => return None,
    };
    Some(Reference::GetAtt {
        logical_id,
        attribute,
    })
}

/// Checker for references between resources of one template.
#[derive(Debug, Default)]
pub struct ReferenceChecker;

impl ReferenceChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check references, `DependsOn` targets and dependency cycles.
    pub fn check_template(&self, stack: &str, template: &Template, config: &LintConfig) -> LintResult {
        let mut result = LintResult::new();
        let mut graph = DependencyGraph::new();
        for logical_id in template.resources.keys() {
            graph.add_node(logical_id);
        }

        for (logical_id, entry) in &template.resources {
            let location = Location::stack(stack).with_resource(logical_id);

            let mut references = Vec::new();
            collect_references(&entry.properties, &mut references);
            for reference in &references {
                self.check_reference(reference, template, location.clone(), config, &mut result);
                if template.resource(reference.target()).is_some() {
                    // Both nodes exist, so this cannot fail
                    let _ = graph.add_dependency(logical_id, reference.target());
                }
            }

            for target in &entry.depends_on {
                if template.resource(target).is_none() {
                    if config.should_run_rule("R004", RuleCategory::References, Severity::Error) {
                        result.add_issue(
                            LintIssue::new(
                                "R004",
                                "unknown-depends-on",
                                Severity::Error,
                                RuleCategory::References,
                                format!("DependsOn names undeclared resource '{}'", target),
                                location.clone().with_property("DependsOn"),
                            )
                            .with_suggestion("Remove the entry or declare the resource"),
                        );
                    }
                } else {
                    let _ = graph.add_dependency(logical_id, target);
                }
            }
        }

        for (name, output) in &template.outputs {
            let mut references = Vec::new();
            collect_references(&output.value, &mut references);
            for reference in &references {
                let location = Location::stack(stack).with_property(format!("Outputs.{}", name));
                self.check_reference(reference, template, location, config, &mut result);
            }
        }

        if config.should_run_rule("R005", RuleCategory::References, Severity::Error) {
            for cycle in graph.cycles() {
                result.add_issue(LintIssue::new(
                    "R005",
                    "dependency-cycle",
                    Severity::Error,
                    RuleCategory::References,
                    format!("Resources depend on each other: {}", cycle.join(", ")),
                    Location::stack(stack).with_resource(cycle[0].clone()),
                ));
            }
        }

        result
    }

    fn check_reference(
        &self,
        reference: &Reference,
        template: &Template,
        location: Location,
        config: &LintConfig,
        result: &mut LintResult,
    ) {
        match reference {
            Reference::Ref(id) => {
                // Pseudo parameters such as AWS::Region
                if id.starts_with("AWS::") || template.resource(id).is_some() {
                    return;
                }
                if config.should_run_rule("R001", RuleCategory::References, Severity::Error) {
                    result.add_issue(LintIssue::new(
                        "R001",
                        "unknown-ref",
                        Severity::Error,
                        RuleCategory::References,
                        format!("Ref to undeclared resource '{}'", id),
                        location,
                    ));
                }
            }
            Reference::GetAtt {
                logical_id,
                attribute,
            } => match template.resource(logical_id) {
                None => {
                    if config.should_run_rule("R002", RuleCategory::References, Severity::Error) {
                        result.add_issue(LintIssue::new(
                            "R002",
                            "unknown-getatt",
                            Severity::Error,
                            RuleCategory::References,
                            format!("Fn::GetAtt on undeclared resource '{}'", logical_id),
                            location,
                        ));
                    }
                }
                Some(entry) => {
                    let Some(attributes) = known_attributes(&entry.resource_type) else {
                        return;
                    };
                    if !attributes.contains(&attribute.as_str())
                        && config.should_run_rule("R003", RuleCategory::References, Severity::Warning)
                    {
                        result.add_issue(
                            LintIssue::new(
                                "R003",
                                "unknown-attribute",
                                Severity::Warning,
                                RuleCategory::References,
                                format!(
                                    "{} has no attribute '{}'",
                                    entry.resource_type, attribute
                                ),
                                location,
                            )
                            .with_suggestion(format!("Known attributes: {}", attributes.join(", "))),
                        );
                    }
                }
            },
        }
    }
}
