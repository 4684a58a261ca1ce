//! Parameter loading.
//!
//! Parameters come from an INI-style properties file, by default
//! `parameters.properties` with every key under `[DEFAULT]`:
//!
//! ```ini
//! [DEFAULT]
//! awsAccount = 123456789012
//! awsRegion = us-east-1
//! componentBucketName = my-components
//! personalName = jdoe
//! imagePipelineName = %(personalName)s-workstation-images
//! ```
//!
//! Keys are case-insensitive. Values may reference other keys of the same
//! section (or `[DEFAULT]`) with `%(key)s`; a literal `%` is written `%%`.
//! Command-line overrides replace file values before interpolation.

use crate::error::{Error, ErrorContext, Result};
use crate::network::Ipv4Cidr;
use crate::stacks::Environment;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default parameter file name
pub const DEFAULT_PARAMETERS_FILE: &str = "parameters.properties";

/// Section holding the parameters, and the fallback for every other section
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Key prefix under which build component documents live in the bucket
pub const COMPONENTS_PREFIX: &str = "components";

/// Zone letters used when `developmentAvailabilityZones` is not set
pub const DEFAULT_ZONE_LETTERS: &[&str] = &["b", "c", "d", "e", "f"];

/// VPC range of the development environment when `developmentVpcCidr` is not set
pub const DEFAULT_DEVELOPMENT_VPC_CIDR: &str = "10.0.0.0/16";

/// VPC looked up by the workstation stack when `workstationVpcId` is not set
pub const DEFAULT_WORKSTATION_VPC_ID: &str = "vpc-0da4018aa2f868eff";

/// Image name pattern matching images produced by the image pipeline
pub const DEFAULT_WORKSTATION_IMAGE_NAME: &str =
    "AmazonLinux2-x86-Development-Workstation-Recipe*";

const MAX_INTERPOLATION_DEPTH: usize = 10;

static INTERPOLATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\(([^)]+)\)s").expect("valid interpolation regex"));
static ACCOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{12}$").expect("valid account regex"));
static REGION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-\d$").expect("valid region regex")
});
static BUCKET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("valid bucket regex")
});
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]*$").expect("valid name regex"));

/// A parsed properties file
///
/// Sections and keys keep file order. Keys are stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct PropertiesFile {
    path: Option<PathBuf>,
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl PropertiesFile {
    /// Create an empty file with only the `[DEFAULT]` section
    pub fn new() -> Self {
        let mut sections = IndexMap::new();
        sections.insert(DEFAULT_SECTION.to_string(), IndexMap::new());
        Self {
            path: None,
            sections,
        }
    }

    /// Load and parse a properties file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters file '{}'", path.display()))?;
        let mut file = Self::parse(&content, path)?;
        file.path = Some(path.to_path_buf());
        debug!(path = %path.display(), keys = file.keys(DEFAULT_SECTION).len(), "Loaded parameters");
        Ok(file)
    }

    /// Parse properties from a string; `path` is used in error messages only
    pub fn parse(content: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = Self::new();
        let mut current_section: Option<String> = None;
        let mut last_key: Option<String> = None;

        for (index, raw_line) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                last_key = None;
                continue;
            }

            // Indented lines continue the previous value
            if raw_line.starts_with(char::is_whitespace) {
                if let (Some(section), Some(key)) = (&current_section, &last_key) {
                    if let Some(value) = file
                        .sections
                        .get_mut(section)
                        .and_then(|entries| entries.get_mut(key))
                    {
                        value.push('\n');
                        value.push_str(line);
                        continue;
                    }
                }
            }

            // Check for section header
            if line.starts_with('[') {
                if !line.ends_with(']') || line.len() < 3 {
                    return Err(Error::parameter_parse(path, line_no, "malformed section header"));
                }
                let section = line[1..line.len() - 1].trim().to_string();
                file.sections.entry(section.clone()).or_default();
                current_section = Some(section);
                last_key = None;
                continue;
            }

            let section = current_section.as_ref().ok_or_else(|| {
                Error::parameter_parse(path, line_no, "key/value pair before any section header")
            })?;

            let (key, value) = split_entry(line).ok_or_else(|| {
                Error::parameter_parse(path, line_no, format!("expected 'key = value', found '{}'", line))
            })?;
            if key.is_empty() {
                return Err(Error::parameter_parse(path, line_no, "empty key"));
            }

            let key = key.to_lowercase();
            let entries = file.sections.entry(section.clone()).or_default();
            if entries.contains_key(&key) {
                return Err(Error::parameter_parse(
                    path,
                    line_no,
                    format!("duplicate key '{}' in section [{}]", key, section),
                ));
            }
            entries.insert(key.clone(), value.to_string());
            last_key = Some(key);
        }

        Ok(file)
    }

    /// Path the file was loaded from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set a value, replacing any existing one
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_lowercase(), value.into());
    }

    /// Keys visible in a section, including those inherited from `[DEFAULT]`
    pub fn keys(&self, section: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for name in [section, DEFAULT_SECTION] {
            if let Some(entries) = self.sections.get(name) {
                for key in entries.keys() {
                    if !keys.contains(&key.as_str()) {
                        keys.push(key);
                    }
                }
            }
        }
        keys
    }

    /// Uninterpolated value
    pub fn raw(&self, section: &str, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.sections
            .get(section)
            .and_then(|entries| entries.get(&key))
            .or_else(|| {
                self.sections
                    .get(DEFAULT_SECTION)
                    .and_then(|entries| entries.get(&key))
            })
            .map(String::as_str)
    }

    /// Interpolated value, or `None` if the key is absent
    pub fn get(&self, section: &str, key: &str) -> Result<Option<String>> {
        match self.raw(section, key) {
            Some(raw) => self.interpolate(section, key, raw, 0).map(Some),
            None => Ok(None),
        }
    }

    /// Interpolated value of a key that must be present
    pub fn require(&self, section: &str, key: &str) -> Result<String> {
        self.get(section, key)?
            .ok_or_else(|| Error::MissingParameter {
                key: key.to_string(),
                section: section.to_string(),
            })
    }

    fn interpolate(&self, section: &str, key: &str, raw: &str, depth: usize) -> Result<String> {
        if depth > MAX_INTERPOLATION_DEPTH {
            return Err(Error::invalid_parameter(
                key,
                "interpolation nested too deeply (recursive reference?)",
            ));
        }

        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];
            if let Some(stripped) = rest.strip_prefix("%%") {
                out.push('%');
                rest = stripped;
                continue;
            }
            let captures = INTERPOLATION_RE
                .captures(rest)
                .filter(|c| c.get(0).map(|m| m.start()) == Some(0))
                .ok_or_else(|| {
                    Error::invalid_parameter(
                        key,
                        format!("'%' must be followed by '%' or '(name)s', found '{}'", rest),
                    )
                })?;
            let whole = captures.get(0).map(|m| m.end()).unwrap_or(0);
            let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let referenced = self.raw(section, name).ok_or_else(|| {
                Error::invalid_parameter(key, format!("references unknown key '{}'", name))
            })?;
            out.push_str(&self.interpolate(section, name, referenced, depth + 1)?);
            rest = &rest[whole..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Split `key = value` or `key: value` on the first separator
fn split_entry(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(['=', ':'])?;
    Some((line[..pos].trim(), line[pos + 1..].trim()))
}

/// Parse a `key=value` override given on the command line
pub fn parse_override(text: &str) -> Result<(String, String)> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| Error::invalid_parameter(text, "override must look like 'key=value'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::invalid_parameter(text, "override has an empty key"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Settings of the development-workstation stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkstationParameters {
    pub vpc_id: String,
    pub instance_name: String,
    pub availability_zone: String,
    pub image_name: String,
}

/// Typed parameters shared by all stacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub aws_account: String,
    pub aws_region: String,
    pub component_bucket_name: String,
    pub base_image_arn: String,
    pub code_commit_repo_name: String,
    pub image_pipeline_name: String,
    pub personal_name: String,
    pub code_repo_branch_name: String,
    pub build_instance_type: String,
    pub development_instance_type: String,
    /// Full availability zone names, in subnet order
    pub development_availability_zones: Vec<String>,
    pub development_vpc_cidr: Ipv4Cidr,
    pub workstation: WorkstationParameters,
}

impl Parameters {
    /// Load parameters from a file, applying overrides first
    pub fn load<P: AsRef<Path>>(path: P, overrides: &[(String, String)]) -> Result<Self> {
        let mut file = PropertiesFile::load(path)?;
        for (key, value) in overrides {
            debug!(key = %key, "Applying parameter override");
            file.set(DEFAULT_SECTION, key, value.clone());
        }
        Self::from_properties(&file)
    }

    /// Build typed parameters from the `[DEFAULT]` section
    pub fn from_properties(file: &PropertiesFile) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            let value = file.require(DEFAULT_SECTION, key)?;
            if value.is_empty() {
                return Err(Error::invalid_parameter(key, "value is empty"));
            }
            Ok(value)
        };
        let optional = |key: &str| -> Result<Option<String>> {
            Ok(file
                .get(DEFAULT_SECTION, key)?
                .filter(|value| !value.is_empty()))
        };

        let aws_account = required("awsAccount")?;
        let aws_region = required("awsRegion")?;
        let personal_name = required("personalName")?;

        let development_availability_zones = match optional("developmentAvailabilityZones")? {
            Some(list) => parse_zones(&aws_region, &list)?,
            None => DEFAULT_ZONE_LETTERS
                .iter()
                .map(|letter| format!("{}{}", aws_region, letter))
                .collect(),
        };

        let development_vpc_cidr = optional("developmentVpcCidr")?
            .unwrap_or_else(|| DEFAULT_DEVELOPMENT_VPC_CIDR.to_string())
            .parse::<Ipv4Cidr>()
            .map_err(|e| Error::invalid_parameter("developmentVpcCidr", e.to_string()))?;

        let workstation = WorkstationParameters {
            vpc_id: match optional("workstationVpcId")? {
                Some(id) => id,
                None => {
                    warn!(
                        vpc_id = DEFAULT_WORKSTATION_VPC_ID,
                        "workstationVpcId not set, using the built-in default VPC id"
                    );
                    DEFAULT_WORKSTATION_VPC_ID.to_string()
                }
            },
            instance_name: optional("workstationInstanceName")?
                .unwrap_or_else(|| format!("development-workstation-{}", personal_name)),
            availability_zone: match optional("workstationAvailabilityZone")? {
                Some(zone) => zone_in_region(&aws_region, &zone, "workstationAvailabilityZone")?,
                None => format!("{}e", aws_region),
            },
            image_name: optional("workstationImageName")?
                .unwrap_or_else(|| DEFAULT_WORKSTATION_IMAGE_NAME.to_string()),
        };

        let parameters = Self {
            aws_account,
            aws_region,
            component_bucket_name: required("componentBucketName")?,
            base_image_arn: required("baseImageArn")?,
            code_commit_repo_name: required("codeCommitRepoName")?,
            image_pipeline_name: required("imagePipelineName")?,
            personal_name,
            code_repo_branch_name: required("codeRepoBranchName")?,
            build_instance_type: required("buildInstanceType")?,
            development_instance_type: required("developmentInstanceType")?,
            development_availability_zones,
            development_vpc_cidr,
            workstation,
        };
        parameters.validate()?;
        Ok(parameters)
    }

    /// Check value formats
    pub fn validate(&self) -> Result<()> {
        if !ACCOUNT_RE.is_match(&self.aws_account) {
            return Err(Error::invalid_parameter("awsAccount", "must be a 12-digit account id"));
        }
        if !REGION_RE.is_match(&self.aws_region) {
            return Err(Error::invalid_parameter(
                "awsRegion",
                format!("'{}' is not a region name", self.aws_region),
            ));
        }
        if !BUCKET_RE.is_match(&self.component_bucket_name) || self.component_bucket_name.contains("..") {
            return Err(Error::invalid_parameter(
                "componentBucketName",
                format!("'{}' is not a valid bucket name", self.component_bucket_name),
            ));
        }
        if !NAME_RE.is_match(&self.personal_name) {
            return Err(Error::invalid_parameter(
                "personalName",
                "may only contain letters, digits and '-', and must start with a letter or digit",
            ));
        }
        if !self.workstation.vpc_id.starts_with("vpc-") {
            return Err(Error::invalid_parameter(
                "workstationVpcId",
                format!("'{}' is not a VPC id", self.workstation.vpc_id),
            ));
        }
        if self.development_availability_zones.is_empty() {
            return Err(Error::invalid_parameter(
                "developmentAvailabilityZones",
                "at least one zone is required",
            ));
        }
        Ok(())
    }

    /// Deployment target of every stack
    pub fn environment(&self) -> Environment {
        Environment::new(&self.aws_account, &self.aws_region)
    }

    /// Prefix of named resources in the development environment
    pub fn name_prefix(&self) -> String {
        format!("Development-Environment-{}", self.personal_name)
    }

    /// Prefix of the per-person stack names
    pub fn stack_prefix(&self) -> String {
        format!("development-environment-{}", self.personal_name)
    }

    /// `s3://<bucket>/components`
    pub fn components_uri(&self) -> String {
        format!("s3://{}/{}", self.component_bucket_name, COMPONENTS_PREFIX)
    }

    /// URI of one component document
    pub fn component_uri(&self, document: &str) -> String {
        format!("{}/{}", self.components_uri(), document)
    }
}

/// Parse a comma-separated zone list; single letters are appended to the region
fn parse_zones(region: &str, list: &str) -> Result<Vec<String>> {
    let mut zones = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let zone = zone_in_region(region, entry, "developmentAvailabilityZones")?;
        if zones.contains(&zone) {
            return Err(Error::invalid_parameter(
                "developmentAvailabilityZones",
                format!("zone '{}' listed twice", zone),
            ));
        }
        zones.push(zone);
    }
    Ok(zones)
}

/// Expand a zone and reject one outside `region`
fn zone_in_region(region: &str, zone: &str, key: &str) -> Result<String> {
    let zone = expand_zone(region, zone);
    if !zone.starts_with(region) {
        return Err(Error::invalid_parameter(
            key,
            format!("zone '{}' is not in region '{}'", zone, region),
        ));
    }
    Ok(zone)
}

fn expand_zone(region: &str, zone: &str) -> String {
    if zone.len() == 1 && zone.chars().all(|c| c.is_ascii_lowercase()) {
        format!("{}{}", region, zone)
    } else {
        zone.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[DEFAULT]
awsAccount = 123456789012
awsRegion = us-east-1
componentBucketName = demo-bucket
baseImageArn = arn:aws:imagebuilder:us-east-1:aws:image/amazon-linux-2-x86/x.x.x
codeCommitRepoName = workstation
imagePipelineName = %(personalName)s-images
personalName = jdoe
codeRepoBranchName = main
buildInstanceType = t3.large
developmentInstanceType = t3.medium
"#;

    fn parse(content: &str) -> Result<PropertiesFile> {
        PropertiesFile::parse(content, "parameters.properties")
    }

    #[test]
    fn test_parse_sample() {
        let params = Parameters::from_properties(&parse(SAMPLE).unwrap()).unwrap();
        assert_eq!(params.aws_account, "123456789012");
        assert_eq!(params.image_pipeline_name, "jdoe-images");
        assert_eq!(params.development_availability_zones.len(), 5);
        assert_eq!(params.development_availability_zones[0], "us-east-1b");
        assert_eq!(params.workstation.availability_zone, "us-east-1e");
        assert_eq!(params.workstation.instance_name, "development-workstation-jdoe");
        assert_eq!(
            params.component_uri("common-tools.yml"),
            "s3://demo-bucket/components/common-tools.yml"
        );
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let file = parse("[DEFAULT]\nAWSRegion: eu-west-1\n").unwrap();
        assert_eq!(file.raw(DEFAULT_SECTION, "awsregion"), Some("eu-west-1"));
        assert_eq!(file.raw(DEFAULT_SECTION, "awsRegion"), Some("eu-west-1"));
    }

    #[test]
    fn test_key_before_section_is_error() {
        let err = parse("awsRegion = us-east-1\n").unwrap_err();
        assert!(matches!(err, Error::ParameterParse { line: 1, .. }));
    }

    #[test]
    fn test_duplicate_key_is_error() {
        let err = parse("[DEFAULT]\na = 1\n# comment\nA = 2\n").unwrap_err();
        match err {
            Error::ParameterParse { line, message, .. } => {
                assert_eq!(line, 4);
                assert!(message.contains("duplicate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_required_key() {
        let content = SAMPLE.replace("codeRepoBranchName = main\n", "");
        let err = Parameters::from_properties(&parse(&content).unwrap()).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { ref key, .. } if key == "codeRepoBranchName"));
    }

    #[test]
    fn test_interpolation_escape_and_errors() {
        let file = parse("[DEFAULT]\na = 50%%\nb = %(a)s off\nc = %(missing)s\nd = 5%\n").unwrap();
        assert_eq!(file.get(DEFAULT_SECTION, "b").unwrap().unwrap(), "50% off");
        assert!(file.get(DEFAULT_SECTION, "c").is_err());
        assert!(file.get(DEFAULT_SECTION, "d").is_err());
    }

    #[test]
    fn test_recursive_interpolation_is_error() {
        let file = parse("[DEFAULT]\na = %(b)s\nb = %(a)s\n").unwrap();
        assert!(file.get(DEFAULT_SECTION, "a").is_err());
    }

    #[test]
    fn test_section_falls_back_to_default() {
        let file = parse("[DEFAULT]\nregion = us-east-1\n[other]\nzone = %(region)se\n").unwrap();
        assert_eq!(file.get("other", "zone").unwrap().unwrap(), "us-east-1e");
        assert_eq!(file.keys("other"), vec!["zone", "region"]);
    }

    #[test]
    fn test_continuation_lines() {
        let file = parse("[DEFAULT]\nzones = b,\n  c\n").unwrap();
        assert_eq!(file.raw(DEFAULT_SECTION, "zones"), Some("b,\nc"));
    }

    #[test]
    fn test_zone_list() {
        let content = format!("{}developmentAvailabilityZones = a, us-east-1c\n", SAMPLE);
        let params = Parameters::from_properties(&parse(&content).unwrap()).unwrap();
        assert_eq!(
            params.development_availability_zones,
            vec!["us-east-1a".to_string(), "us-east-1c".to_string()]
        );

        let content = format!("{}developmentAvailabilityZones = eu-west-1a\n", SAMPLE);
        assert!(Parameters::from_properties(&parse(&content).unwrap()).is_err());
    }

    #[test]
    fn test_workstation_zone_must_match_region() {
        let content = format!("{}workstationAvailabilityZone = b\n", SAMPLE);
        let params = Parameters::from_properties(&parse(&content).unwrap()).unwrap();
        assert_eq!(params.workstation.availability_zone, "us-east-1b");

        let content = format!("{}workstationAvailabilityZone = eu-west-1a\n", SAMPLE);
        let err = Parameters::from_properties(&parse(&content).unwrap()).unwrap_err();
        match &err {
            Error::InvalidParameter { key, message } => {
                assert_eq!(key, "workstationAvailabilityZone");
                assert!(message.contains("not in region 'us-east-1'"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_invalid_values() {
        for (from, to) in [
            ("awsAccount = 123456789012", "awsAccount = 1234"),
            ("awsRegion = us-east-1", "awsRegion = Virginia"),
            ("componentBucketName = demo-bucket", "componentBucketName = Demo_Bucket"),
            ("personalName = jdoe", "personalName = j doe"),
        ] {
            let content = SAMPLE.replace(from, to);
            let err = Parameters::from_properties(&parse(&content).unwrap()).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { .. }), "{to}: {err}");
        }
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("personalName=alice").unwrap(),
            ("personalName".to_string(), "alice".to_string())
        );
        assert!(parse_override("personalName").is_err());
        assert!(parse_override("=x").is_err());
    }
}
