//! Logical ID derivation from construct paths.
//!
//! A declaration's construct path (`["Role", "Resource"]`) maps to a stable
//! CloudFormation logical ID. Top-level declarations keep their id with
//! non-alphanumeric characters stripped; nested declarations get a readable
//! prefix plus an 8-character hash of the full path so that renaming a parent
//! never collides with a sibling.

use crate::error::{Error, Result};

/// Path component dropped entirely
const HIDDEN_ID: &str = "Default";
/// Path component kept in the hash but hidden from the readable prefix
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

const PATH_SEP: &str = "/";
const HASH_LEN: usize = 8;
const MAX_HUMAN_LEN: usize = 240;
const MAX_ID_LEN: usize = 255;

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn path_hash(components: &[&str]) -> String {
    let digest = md5::compute(components.join(PATH_SEP).as_bytes());
    let hex = format!("{:X}", digest);
    hex[..HASH_LEN].to_string()
}

/// Derive the logical ID for a construct path
pub fn logical_id(path: &[&str]) -> Result<String> {
    let components: Vec<&str> = path.iter().copied().filter(|c| *c != HIDDEN_ID).collect();

    if components.is_empty() {
        return Err(Error::invalid_id(
            path.join(PATH_SEP),
            "construct path must have at least one non-default component",
        ));
    }

    if components.len() == 1 {
        let candidate = remove_non_alphanumeric(components[0]);
        if candidate.is_empty() {
            return Err(Error::invalid_id(
                components[0],
                "logical id would be empty after removing non-alphanumeric characters",
            ));
        }
        if candidate.len() <= MAX_ID_LEN {
            return Ok(candidate);
        }
    }

    let hash = path_hash(&components);

    let mut human = String::new();
    let mut previous: Option<&str> = None;
    for component in &components {
        if *component == HIDDEN_FROM_HUMAN_ID || previous == Some(*component) {
            previous = Some(component);
            continue;
        }
        human.push_str(&remove_non_alphanumeric(component));
        previous = Some(component);
    }
    human.truncate(MAX_HUMAN_LEN);

    Ok(format!("{}{}", human, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_strips_punctuation() {
        assert_eq!(logical_id(&["common-tools"]).unwrap(), "commontools");
        assert_eq!(logical_id(&["Ruby - rbenv"]).unwrap(), "Rubyrbenv");
        assert_eq!(
            logical_id(&["AmazonLinux2-x86-Development-Workstation-VPC"]).unwrap(),
            "AmazonLinux2x86DevelopmentWorkstationVPC"
        );
    }

    #[test]
    fn test_nested_path_gets_hash() {
        let id = logical_id(&["ec2-instance", "InstanceRole", "Resource"]).unwrap();
        assert!(id.starts_with("ec2instanceInstanceRole"));
        assert_eq!(id.len(), "ec2instanceInstanceRole".len() + HASH_LEN);
        assert!(id[id.len() - HASH_LEN..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_resource_component_still_affects_hash() {
        let with = logical_id(&["Role", "Resource"]).unwrap();
        let other = logical_id(&["Role", "Policy"]).unwrap();
        assert!(with.starts_with("Role"));
        assert_ne!(with[4..], other[10..]);
    }

    #[test]
    fn test_default_components_are_dropped() {
        assert_eq!(logical_id(&["Default", "bucket"]).unwrap(), "bucket");
        assert!(logical_id(&["Default"]).is_err());
        assert!(logical_id(&[]).is_err());
    }

    #[test]
    fn test_empty_after_sanitizing_is_rejected() {
        assert!(logical_id(&["---"]).is_err());
    }

    #[test]
    fn test_stable() {
        assert_eq!(
            logical_id(&["sec-group-allow-ssh", "Resource"]).unwrap(),
            logical_id(&["sec-group-allow-ssh", "Resource"]).unwrap()
        );
    }
}
