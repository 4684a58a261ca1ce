//! Property-based tests for address arithmetic, logical ids and parameter
//! parsing.

mod common;

use proptest::prelude::*;
use std::net::Ipv4Addr;

use devstation::app::{App, SynthOptions};
use devstation::context::ContextStore;
use devstation::network::Ipv4Cidr;
use devstation::parameters::{Parameters, PropertiesFile};
use devstation::template::logical_id;

// ============================================================================
// Strategies
// ============================================================================

fn cidr() -> impl Strategy<Value = Ipv4Cidr> {
    (any::<u32>(), 0u8..=32).prop_map(|(addr, prefix)| {
        let block = Ipv4Cidr::new(Ipv4Addr::from(addr), prefix).unwrap();
        Ipv4Cidr::new(block.network(), prefix).unwrap()
    })
}

fn construct_id() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9][A-Za-z0-9 _./-]{0,40}").unwrap()
}

fn personal_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}").unwrap()
}

// ============================================================================
// CIDR blocks
// ============================================================================

proptest! {
    #[test]
    fn cidr_text_is_stable(block in cidr()) {
        let parsed: Ipv4Cidr = block.to_string().parse().unwrap();
        prop_assert_eq!(parsed, block);
        prop_assert!(parsed.is_aligned());
    }

    #[test]
    fn subnets_stay_inside_parent(block in cidr(), extra in 0u8..8, index in any::<u32>()) {
        let new_prefix = block.prefix_len().saturating_add(extra).min(32);
        let count = 1u64 << (new_prefix - block.prefix_len());
        let index = (u64::from(index) % count) as u32;

        let subnet = block.subnet(new_prefix, index).unwrap();
        prop_assert!(block.contains(&subnet));
        prop_assert!(subnet.is_aligned());
        prop_assert_eq!(subnet.prefix_len(), new_prefix);

        if u64::from(index) + 1 < count {
            let next = block.subnet(new_prefix, index + 1).unwrap();
            prop_assert!(!subnet.overlaps(&next));
        }
        prop_assert!(block.subnet(new_prefix, count as u32).is_err());
    }

    #[test]
    fn overlap_is_symmetric(a in cidr(), b in cidr()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        prop_assert!(Ipv4Cidr::ANY.contains(&a));
    }
}

// ============================================================================
// Logical ids
// ============================================================================

proptest! {
    #[test]
    fn logical_ids_are_alphanumeric(path in prop::collection::vec(construct_id(), 1..4)) {
        let parts: Vec<&str> = path.iter().map(String::as_str).collect();
        if let Ok(id) = logical_id(&parts) {
            prop_assert!(!id.is_empty());
            prop_assert!(id.len() <= 255);
            prop_assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
            prop_assert_eq!(logical_id(&parts).unwrap(), id);
        }
    }
}

// ============================================================================
// Parameters
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn properties_parser_never_panics(content in "\\PC{0,200}") {
        let _ = PropertiesFile::parse(&content, "fuzz.properties");
    }

    #[test]
    fn any_personal_name_synthesizes(name in personal_name()) {
        let content = common::SAMPLE_PROPERTIES.replace("personalName = jdoe", &format!("personalName = {}", name));
        let file = PropertiesFile::parse(&content, "parameters.properties").unwrap();
        let params = Parameters::from_properties(&file).unwrap();
        prop_assert_eq!(&params.image_pipeline_name, &format!("{}-images", name));

        let app = App::from_parameters(&params, &ContextStore::new()).unwrap();
        prop_assert_eq!(app.len(), 5);
        let options = SynthOptions { allow_missing_context: true, ..SynthOptions::default() };
        prop_assert!(app.synth(&options).is_ok());
    }
}
