//! Image Builder checks.
//!
//! - IB001 empty-recipe: an image recipe without components
//! - IB002 keep-failed-instances: build instances survive a failed build

use super::types::{LintConfig, LintIssue, LintResult, Location, RuleCategory, Severity};
use crate::template::Template;
use serde_json::Value;

const RECIPE: &str = "AWS::ImageBuilder::ImageRecipe";
const INFRASTRUCTURE: &str = "AWS::ImageBuilder::InfrastructureConfiguration";

/// Checker for recipes and infrastructure configurations.
#[derive(Debug, Default)]
pub struct ImageBuilderChecker;

impl ImageBuilderChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check_template(&self, stack: &str, template: &Template, config: &LintConfig) -> LintResult {
        let mut result = LintResult::new();

        for (logical_id, entry) in template.resources_of_type(RECIPE) {
            let empty = entry
                .property("Components")
                .and_then(Value::as_array)
                .map_or(true, Vec::is_empty);
            if empty && config.should_run_rule("IB001", RuleCategory::ImageBuilder, Severity::Error) {
                result.add_issue(
                    LintIssue::new(
                        "IB001",
                        "empty-recipe",
                        Severity::Error,
                        RuleCategory::ImageBuilder,
                        "Image recipe has no components",
                        Location::stack(stack)
                            .with_resource(logical_id)
                            .with_property("Components"),
                    )
                    .with_suggestion("Add at least one build component"),
                );
            }
        }

        for (logical_id, entry) in template.resources_of_type(INFRASTRUCTURE) {
            let keeps = entry.property("TerminateInstanceOnFailure") == Some(&Value::Bool(false));
            if keeps && config.should_run_rule("IB002", RuleCategory::ImageBuilder, Severity::Hint) {
                result.add_issue(
                    LintIssue::new(
                        "IB002",
                        "keep-failed-instances",
                        Severity::Hint,
                        RuleCategory::ImageBuilder,
                        "Build instances are kept running after a failed build",
                        Location::stack(stack)
                            .with_resource(logical_id)
                            .with_property("TerminateInstanceOnFailure"),
                    )
                    .with_suggestion("Terminate failed instances once builds are stable"),
                );
            }
        }

        result
    }
}
