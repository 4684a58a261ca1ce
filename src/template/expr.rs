//! Property values and CloudFormation intrinsic functions.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Pseudo parameters resolved by CloudFormation at deploy time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoParameter {
    AccountId,
    Partition,
    Region,
    StackName,
    UrlSuffix,
}

impl PseudoParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PseudoParameter::AccountId => "AWS::AccountId",
            PseudoParameter::Partition => "AWS::Partition",
            PseudoParameter::Region => "AWS::Region",
            PseudoParameter::StackName => "AWS::StackName",
            PseudoParameter::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// A property value: either a literal string or an intrinsic function
///
/// Numbers and booleans are plain Rust fields on the typed property structs;
/// `Expr` is used wherever a value may be resolved at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A literal string
    Literal(String),
    /// `{"Ref": "LogicalId"}`
    Ref(String),
    /// `{"Fn::GetAtt": ["LogicalId", "Attribute"]}`
    GetAtt {
        logical_id: String,
        attribute: String,
    },
    /// `{"Fn::Join": ["delimiter", [parts...]]}`
    Join { delimiter: String, parts: Vec<Expr> },
    /// `{"Fn::Base64": value}`
    Base64(Box<Expr>),
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn pseudo(parameter: PseudoParameter) -> Self {
        Expr::Ref(parameter.as_str().to_string())
    }

    pub fn join(delimiter: impl Into<String>, parts: Vec<Expr>) -> Self {
        Expr::Join {
            delimiter: delimiter.into(),
            parts,
        }
    }

    pub fn base64(value: Expr) -> Self {
        Expr::Base64(Box::new(value))
    }

    /// ARN of an AWS managed IAM policy, partition-aware
    pub fn managed_policy_arn(policy_name: &str) -> Self {
        Expr::join(
            "",
            vec![
                Expr::literal("arn:"),
                Expr::pseudo(PseudoParameter::Partition),
                Expr::literal(format!(":iam::aws:policy/{}", policy_name)),
            ],
        )
    }

    /// The literal string, if this is not an intrinsic
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Expr::Literal(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Literal(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::Literal(value)
    }
}

impl From<&String> for Expr {
    fn from(value: &String) -> Self {
        Expr::Literal(value.clone())
    }
}

struct JoinArgs<'a>(&'a str, &'a [Expr]);

impl Serialize for JoinArgs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(self.0)?;
        seq.serialize_element(self.1)?;
        seq.end()
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Expr::Literal(s) => serializer.serialize_str(s),
            Expr::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Expr::GetAtt {
                logical_id,
                attribute,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[logical_id, attribute])?;
                map.end()
            }
            Expr::Join { delimiter, parts } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &JoinArgs(delimiter, parts))?;
                map.end()
            }
            Expr::Base64(inner) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Base64", inner.as_ref())?;
                map.end()
            }
        }
    }
}

/// A resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: Expr,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<Expr>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The conventional `Name` tag
    pub fn name(value: impl Into<Expr>) -> Self {
        Self::new("Name", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_serializes_as_string() {
        let value = serde_json::to_value(Expr::from("t3.large")).unwrap();
        assert_eq!(value, json!("t3.large"));
    }

    #[test]
    fn test_intrinsics() {
        assert_eq!(
            serde_json::to_value(Expr::Ref("Vpc".into())).unwrap(),
            json!({"Ref": "Vpc"})
        );
        assert_eq!(
            serde_json::to_value(Expr::GetAtt {
                logical_id: "Eip".into(),
                attribute: "AllocationId".into()
            })
            .unwrap(),
            json!({"Fn::GetAtt": ["Eip", "AllocationId"]})
        );
        assert_eq!(
            serde_json::to_value(Expr::base64(Expr::from("#!/bin/bash"))).unwrap(),
            json!({"Fn::Base64": "#!/bin/bash"})
        );
    }

    #[test]
    fn test_managed_policy_arn() {
        let value = serde_json::to_value(Expr::managed_policy_arn("ReadOnlyAccess")).unwrap();
        assert_eq!(
            value,
            json!({"Fn::Join": ["", ["arn:", {"Ref": "AWS::Partition"}, ":iam::aws:policy/ReadOnlyAccess"]]})
        );
    }

    #[test]
    fn test_tag() {
        let value = serde_json::to_value(Tag::name("rds-igw")).unwrap();
        assert_eq!(value, json!({"Key": "Name", "Value": "rds-igw"}));
    }
}
