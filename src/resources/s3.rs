//! S3 buckets.

use super::ResourceProperties;
use serde::Serialize;

/// `AWS::S3::Bucket`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bucket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
}

impl Bucket {
    pub fn named(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: Some(bucket_name.into()),
        }
    }
}

impl ResourceProperties for Bucket {
    const RESOURCE_TYPE: &'static str = "AWS::S3::Bucket";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unnamed_bucket_has_no_properties() {
        let value = serde_json::to_value(Bucket::default()).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }
}
