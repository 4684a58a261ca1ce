//! Synth-time context lookups.
//!
//! Some declarations depend on facts about the account that already exist
//! (an existing VPC and its subnets, the newest image produced by the image
//! pipeline). Those facts are cached in a JSON context file keyed by the
//! lookup's parameters. A stack asking for a key that is not cached gets a
//! placeholder value and records the key as missing; synthesis refuses to
//! write an assembly built on placeholders unless told otherwise.

#[cfg(feature = "aws")]
pub mod aws;

use crate::error::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default context file name
pub const DEFAULT_CONTEXT_FILE: &str = "devstation.context.json";

/// Image id returned while an image lookup is missing
pub const PLACEHOLDER_IMAGE_ID: &str = "ami-1234";

/// VPC id returned while a VPC lookup is missing
pub const PLACEHOLDER_VPC_ID: &str = "vpc-12345";

/// A lookup a stack needs answered before synthesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "kebab-case")]
pub enum LookupRequest {
    /// An existing VPC and its subnets
    #[serde(rename_all = "camelCase")]
    Vpc {
        account: String,
        region: String,
        vpc_id: String,
    },
    /// The newest image whose name matches a wildcard pattern
    #[serde(rename_all = "camelCase")]
    Image {
        account: String,
        region: String,
        name: String,
    },
}

impl LookupRequest {
    /// Cache key of the lookup
    pub fn key(&self) -> String {
        match self {
            LookupRequest::Vpc {
                account,
                region,
                vpc_id,
            } => format!("vpc:account={}:region={}:vpcId={}", account, region, vpc_id),
            LookupRequest::Image {
                account,
                region,
                name,
            } => format!("ami:account={}:region={}:name={}", account, region, name),
        }
    }

    pub fn account(&self) -> &str {
        match self {
            LookupRequest::Vpc { account, .. } | LookupRequest::Image { account, .. } => account,
        }
    }

    pub fn region(&self) -> &str {
        match self {
            LookupRequest::Vpc { region, .. } | LookupRequest::Image { region, .. } => region,
        }
    }
}

impl fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A lookup without a cached value, as recorded in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingContext {
    pub key: String,
    #[serde(flatten)]
    pub request: LookupRequest,
}

impl From<LookupRequest> for MissingContext {
    fn from(request: LookupRequest) -> Self {
        Self {
            key: request.key(),
            request,
        }
    }
}

/// Cached result of a VPC lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcContext {
    pub vpc_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_cidr_block: Option<String>,
    #[serde(default)]
    pub subnets: Vec<SubnetContext>,
}

/// One subnet of a looked-up VPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetContext {
    pub subnet_id: String,
    pub availability_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(default)]
    pub public: bool,
}

impl VpcContext {
    /// Stand-in used while the lookup is missing: one public and one private
    /// subnet in each requested zone
    pub fn placeholder(zones: &[&str]) -> Self {
        let subnets = zones
            .iter()
            .enumerate()
            .flat_map(|(i, zone)| {
                [
                    SubnetContext {
                        subnet_id: format!("p-{:05}", 12345 + i),
                        availability_zone: (*zone).to_string(),
                        cidr: None,
                        public: true,
                    },
                    SubnetContext {
                        subnet_id: format!("s-{:05}", 12345 + i),
                        availability_zone: (*zone).to_string(),
                        cidr: None,
                        public: false,
                    },
                ]
            })
            .collect();
        Self {
            vpc_id: PLACEHOLDER_VPC_ID.to_string(),
            vpc_cidr_block: None,
            subnets,
        }
    }

    /// Subnet an instance in `zone` is placed in: private first, then public
    pub fn subnet_in_zone(&self, zone: &str) -> Option<&SubnetContext> {
        let in_zone = || self.subnets.iter().filter(move |s| s.availability_zone == zone);
        in_zone().find(|s| !s.public).or_else(|| in_zone().next())
    }
}

/// The context file
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, serde_json::Value>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the context file; a file that does not exist yields an empty store
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let values = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read context file '{}'", path.display()))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    Error::Config(format!("invalid context file '{}': {}", path.display(), e))
                })?
            }
        } else {
            debug!(path = %path.display(), "No context file, starting empty");
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            values,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the store back to the file it was loaded from
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Err(Error::Config("context store has no file path".to_string())),
        }
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut content = serde_json::to_string_pretty(&self.values)?;
        content.push('\n');
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write context file '{}'", path.display()))?;
        info!(path = %path.display(), entries = self.values.len(), "Saved context");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.values.insert(key.into(), value);
    }

    /// Remove one key; returns whether it was present
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.values.iter()
    }

    /// Cached VPC for a `Vpc` request
    pub fn lookup_vpc(&self, request: &LookupRequest) -> Result<Option<VpcContext>> {
        self.decode(request)
    }

    /// Cached image id for an `Image` request
    pub fn lookup_image(&self, request: &LookupRequest) -> Result<Option<String>> {
        self.decode(request)
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, request: &LookupRequest) -> Result<Option<T>> {
        let key = request.key();
        match self.values.get(&key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| Error::InvalidContext {
                    key,
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }
}
