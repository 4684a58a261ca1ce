//! EventBridge rules.

use super::ResourceProperties;
use crate::template::Expr;
use serde::Serialize;

/// A rule target
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Target {
    pub arn: Expr,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<Expr>,
}

/// `AWS::Events::Rule`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    /// Event patterns use the event's own lowercase keys
    pub event_pattern: serde_json::Value,
    pub state: String,
    pub targets: Vec<Target>,
}

impl ResourceProperties for Rule {
    const RESOURCE_TYPE: &'static str = "AWS::Events::Rule";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_pattern_is_untouched() {
        let rule = Rule {
            event_pattern: json!({"source": ["aws.codecommit"], "detail-type": ["CodeCommit Repository State Change"]}),
            state: "ENABLED".to_string(),
            targets: vec![Target {
                arn: Expr::from("arn:pipeline"),
                id: "Target0".to_string(),
                role_arn: None,
            }],
        };
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["EventPattern"]["source"], json!(["aws.codecommit"]));
        assert!(value["Targets"][0].get("RoleArn").is_none());
    }
}
