//! Linter types and error definitions.
//!
//! This module defines the core types used throughout the linting system,
//! including severity levels, lint results, and issue representations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Severity level for lint issues.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational hint, not a problem.
    Hint,
    /// Potential issue that should be reviewed.
    #[default]
    Warning,
    /// Definite problem; the stack will fail to deploy or misbehave.
    Error,
    /// Severe security or correctness issue.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Hint => write!(f, "hint"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Category of lint rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Address ranges, subnets and routes.
    Network,
    /// Security group exposure and rule validity.
    Security,
    /// `Ref`, `Fn::GetAtt` and `DependsOn` targets.
    References,
    /// Image Builder recipes and infrastructure.
    ImageBuilder,
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleCategory::Network => write!(f, "network"),
            RuleCategory::Security => write!(f, "security"),
            RuleCategory::References => write!(f, "references"),
            RuleCategory::ImageBuilder => write!(f, "image-builder"),
        }
    }
}

/// Where in the assembly an issue was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Stack name.
    pub stack: String,
    /// Logical id of the resource, if the issue concerns one.
    pub logical_id: Option<String>,
    /// Property path inside the resource.
    pub property: Option<String>,
}

impl Location {
    /// A location covering a whole stack.
    pub fn stack(name: impl Into<String>) -> Self {
        Self {
            stack: name.into(),
            logical_id: None,
            property: None,
        }
    }

    /// Narrow to a resource.
    pub fn with_resource(mut self, logical_id: impl Into<String>) -> Self {
        self.logical_id = Some(logical_id.into());
        self
    }

    /// Narrow to a property.
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Format as `stack/LogicalId.Property`.
    pub fn to_location_string(&self) -> String {
        let mut s = self.stack.clone();
        if let Some(ref id) = self.logical_id {
            s.push('/');
            s.push_str(id);
            if let Some(ref property) = self.property {
                s.push('.');
                s.push_str(property);
            }
        }
        s
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_location_string())
    }
}

/// A single lint issue found during analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintIssue {
    /// Unique rule identifier (e.g., "N001", "SG003").
    pub rule_id: String,
    /// Human-readable rule name.
    pub rule_name: String,
    /// Severity level.
    pub severity: Severity,
    /// Category of the rule.
    pub category: RuleCategory,
    /// Description of the issue.
    pub message: String,
    /// Location where the issue was found.
    pub location: Location,
    /// Suggested fix or improvement.
    pub suggestion: Option<String>,
}

impl LintIssue {
    /// Create a new lint issue.
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        severity: Severity,
        category: RuleCategory,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            severity,
            category,
            message: message.into(),
            location,
            suggestion: None,
        }
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Check if this is an error or critical issue.
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error | Severity::Critical)
    }
}

impl std::fmt::Display for LintIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: [{}] {} - {}",
            self.location, self.rule_id, self.severity, self.message
        )?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

/// Result of linting one or more templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintResult {
    /// List of issues found.
    pub issues: Vec<LintIssue>,
    /// Stacks that were analyzed.
    pub stacks_analyzed: Vec<String>,
    /// Total number of resources analyzed.
    pub resources_analyzed: usize,
}

impl LintResult {
    /// Create a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue.
    pub fn add_issue(&mut self, issue: LintIssue) {
        self.issues.push(issue);
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: LintResult) {
        self.issues.extend(other.issues);
        for stack in other.stacks_analyzed {
            if !self.stacks_analyzed.contains(&stack) {
                self.stacks_analyzed.push(stack);
            }
        }
        self.resources_analyzed += other.resources_analyzed;
    }

    /// Get issues filtered by severity.
    pub fn issues_by_severity(&self, severity: Severity) -> Vec<&LintIssue> {
        self.issues.iter().filter(|i| i.severity == severity).collect()
    }

    /// Get issues filtered by category.
    pub fn issues_by_category(&self, category: RuleCategory) -> Vec<&LintIssue> {
        self.issues.iter().filter(|i| i.category == category).collect()
    }

    /// Issues raised by one rule.
    pub fn issues_for_rule(&self, rule_id: &str) -> Vec<&LintIssue> {
        self.issues.iter().filter(|i| i.rule_id == rule_id).collect()
    }

    /// Check if there are any errors or critical issues.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.is_error())
    }

    /// Get count of issues by severity.
    pub fn count_by_severity(&self) -> std::collections::HashMap<Severity, usize> {
        let mut counts = std::collections::HashMap::new();
        for issue in &self.issues {
            *counts.entry(issue.severity).or_insert(0) += 1;
        }
        counts
    }

    /// Exit code: 0 clean or hints only, 1 warnings, 2 errors, 3 critical.
    pub fn exit_code(&self) -> i32 {
        if self.issues.iter().any(|i| matches!(i.severity, Severity::Critical)) {
            3
        } else if self.issues.iter().any(|i| matches!(i.severity, Severity::Error)) {
            2
        } else if self.issues.iter().any(|i| matches!(i.severity, Severity::Warning)) {
            1
        } else {
            0
        }
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        let counts = self.count_by_severity();
        let critical = counts.get(&Severity::Critical).copied().unwrap_or(0);
        let errors = counts.get(&Severity::Error).copied().unwrap_or(0);
        let warnings = counts.get(&Severity::Warning).copied().unwrap_or(0);
        let hints = counts.get(&Severity::Hint).copied().unwrap_or(0);

        format!(
            "Analyzed {} stack(s), {} resource(s): {} critical, {} error(s), {} warning(s), {} hint(s)",
            self.stacks_analyzed.len(),
            self.resources_analyzed,
            critical,
            errors,
            warnings,
            hints
        )
    }
}

/// Error type for linter operations.
#[derive(Error, Debug)]
pub enum LintError {
    /// Error reading a file.
    #[error("Failed to read file '{path}': {message}")]
    FileRead { path: PathBuf, message: String },

    /// A template on disk could not be parsed.
    #[error("Invalid template '{path}': {message}")]
    InvalidTemplate { path: PathBuf, message: String },

    /// Rule configuration error.
    #[error("Rule configuration error: {0}")]
    RuleConfig(String),
}

/// Result type for linter operations.
pub type LintOpResult<T> = Result<T, LintError>;

/// Configuration for the linter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintConfig {
    /// Rules to skip (by rule ID).
    #[serde(default)]
    pub skip_rules: Vec<String>,
    /// Only run these rules (by rule ID). Empty means run all.
    #[serde(default)]
    pub only_rules: Vec<String>,
    /// Categories to skip.
    #[serde(default)]
    pub skip_categories: Vec<RuleCategory>,
    /// Minimum severity to report.
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
    /// Whether to treat warnings as errors.
    #[serde(default)]
    pub warnings_as_errors: bool,
}

fn default_min_severity() -> Severity {
    Severity::Hint
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            skip_rules: Vec::new(),
            only_rules: Vec::new(),
            skip_categories: Vec::new(),
            min_severity: default_min_severity(),
            warnings_as_errors: false,
        }
    }
}

impl LintConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a rule should be run.
    pub fn should_run_rule(&self, rule_id: &str, category: RuleCategory, severity: Severity) -> bool {
        if self.skip_rules.iter().any(|r| r == rule_id) {
            return false;
        }

        if !self.only_rules.is_empty() && !self.only_rules.iter().any(|r| r == rule_id) {
            return false;
        }

        if self.skip_categories.contains(&category) {
            return false;
        }

        severity >= self.min_severity
    }

    /// Severity an issue is reported with.
    pub fn effective_severity(&self, severity: Severity) -> Severity {
        if self.warnings_as_errors && severity == Severity::Warning {
            Severity::Error
        } else {
            severity
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> LintOpResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| LintError::FileRead {
            path: path.as_ref().to_path_buf(),
            message: e.to_string(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| LintError::RuleConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Hint);
    }

    #[test]
    fn test_location_formatting() {
        let loc = Location::stack("s3ops")
            .with_resource("Bucket")
            .with_property("BucketName");
        assert_eq!(loc.to_location_string(), "s3ops/Bucket.BucketName");
        assert_eq!(Location::stack("s3ops").to_string(), "s3ops");
    }

    #[test]
    fn test_lint_result_exit_code() {
        let mut result = LintResult::new();
        result.stacks_analyzed.push("s3ops".to_string());
        result.resources_analyzed = 1;
        assert_eq!(result.exit_code(), 0);

        result.add_issue(LintIssue::new(
            "IB002",
            "keep-failed-instances",
            Severity::Hint,
            RuleCategory::ImageBuilder,
            "hint",
            Location::stack("s3ops"),
        ));
        assert_eq!(result.exit_code(), 0);

        result.add_issue(LintIssue::new(
            "N001",
            "invalid-cidr",
            Severity::Error,
            RuleCategory::Network,
            "Test error",
            Location::stack("s3ops"),
        ));
        assert!(result.has_errors());
        assert_eq!(result.exit_code(), 2);
        assert!(result.summary().contains("1 error(s)"));
    }

    #[test]
    fn test_config_should_run_rule() {
        let config = LintConfig::new();
        assert!(config.should_run_rule("N001", RuleCategory::Network, Severity::Error));
        assert!(config.should_run_rule("IB002", RuleCategory::ImageBuilder, Severity::Hint));

        let mut config_skip = LintConfig::new();
        config_skip.skip_rules.push("N001".to_string());
        config_skip.skip_categories.push(RuleCategory::Security);
        assert!(!config_skip.should_run_rule("N001", RuleCategory::Network, Severity::Error));
        assert!(!config_skip.should_run_rule("SG003", RuleCategory::Security, Severity::Warning));
    }

    #[test]
    fn test_warnings_as_errors() {
        let config = LintConfig {
            warnings_as_errors: true,
            ..LintConfig::new()
        };
        assert_eq!(config.effective_severity(Severity::Warning), Severity::Error);
        assert_eq!(config.effective_severity(Severity::Hint), Severity::Hint);
    }
}
