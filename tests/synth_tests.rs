//! End-to-end synthesis tests: parameters in, cloud assembly out.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::Value;

use devstation::app::{App, SynthOptions};
use devstation::assembly::{Manifest, TemplateFormat};
use devstation::context::{ContextStore, PLACEHOLDER_IMAGE_ID};
use devstation::Error;

const IMAGE_STACK: &str = "development-environment-jdoe-image-builder-pipeline";
const PIPELINE_STACK: &str = "development-environment-jdoe-deployment-pipeline";
const VPC_STACK: &str = "development-environment-jdoe-VPC";
const WORKSTATION_STACK: &str = "development-environment-jdoe-workstation";

fn template_json(app: &App, stack: &str) -> Value {
    let assembly = app.synth(&SynthOptions::default()).unwrap();
    serde_json::from_str(assembly.template_text(stack).unwrap()).unwrap()
}

#[test]
fn test_synth_is_deterministic() {
    let first = sample_app().synth(&SynthOptions::default()).unwrap();
    let second = sample_app().synth(&SynthOptions::default()).unwrap();

    assert_eq!(first.manifest(), second.manifest());
    for name in first.manifest().artifacts.keys() {
        assert_eq!(first.template_text(name), second.template_text(name));
    }
}

#[test]
fn test_written_assembly_lists_every_stack() {
    let project = Project::new();
    let assembly = sample_app().synth(&SynthOptions::default()).unwrap();
    let written = assembly.write(project.outdir()).unwrap();
    assert_eq!(written.len(), 6);

    let manifest = Manifest::load(project.outdir()).unwrap();
    let names: Vec<&str> = manifest.artifacts.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec!["s3ops", IMAGE_STACK, PIPELINE_STACK, VPC_STACK, WORKSTATION_STACK]
    );
    assert!(manifest.missing.is_empty());
    assert_eq!(manifest.artifacts[IMAGE_STACK].dependencies, vec!["s3ops"]);
    assert_eq!(
        manifest.artifacts["s3ops"].environment,
        "aws://123456789012/us-east-1"
    );

    for artifact in manifest.artifacts.values() {
        let path = project.outdir().join(&artifact.properties.template_file);
        let template: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
    }
}

#[test]
fn test_yaml_templates() {
    let options = SynthOptions {
        format: TemplateFormat::Yaml,
        ..SynthOptions::default()
    };
    let assembly = sample_app().synth(&options).unwrap();
    let artifact = &assembly.manifest().artifacts["s3ops"];
    assert_eq!(artifact.properties.template_file, "s3ops.template.yaml");

    let template: Value = serde_yaml::from_str(assembly.template_text("s3ops").unwrap()).unwrap();
    assert_eq!(
        template["Resources"]["componentsbucket"]["Properties"]["BucketName"],
        "demo-bucket"
    );
}

#[test]
fn test_personal_name_only_touches_personal_stacks() {
    let renamed = SAMPLE_PROPERTIES.replace("personalName = jdoe", "personalName = asmith");
    let other_params = parameters_from(&renamed);
    let other = App::from_parameters(&other_params, &complete_context(&other_params)).unwrap();
    let app = sample_app();

    assert_eq!(template_json(&app, "s3ops"), template_json(&other, "s3ops"));

    let renamed_vpc = template_json(&other, "development-environment-asmith-VPC");
    let original_vpc = template_json(&app, VPC_STACK);
    let prefixed = |template: &Value, name: &str| -> Vec<String> {
        template["Resources"]
            .as_object()
            .unwrap()
            .keys()
            .filter(|id| id.contains(name))
            .cloned()
            .collect()
    };
    let before = prefixed(&original_vpc, "jdoe");
    let after = prefixed(&renamed_vpc, "asmith");
    assert!(!before.is_empty());
    assert_eq!(
        before,
        after.iter().map(|id| id.replace("asmith", "jdoe")).collect::<Vec<_>>()
    );

    let pipeline = template_json(
        &other,
        "development-environment-asmith-image-builder-pipeline",
    );
    assert_eq!(
        pipeline["Resources"]["AmazonLinux2x86DevelopmentWorkstationImagePipeline"]["Properties"]
            ["Name"],
        "asmith-images"
    );
}

#[test]
fn test_component_documents_come_from_the_bucket() {
    let template = template_json(&sample_app(), IMAGE_STACK);
    let uris: Vec<&str> = template["Resources"]
        .as_object()
        .unwrap()
        .values()
        .filter(|r| r["Type"] == "AWS::ImageBuilder::Component")
        .filter_map(|r| r["Properties"]["Uri"].as_str())
        .collect();
    assert_eq!(uris.len(), 5);
    assert!(uris.contains(&"s3://demo-bucket/components/common-tools.yml"));
    assert!(uris.iter().all(|u| u.starts_with("s3://demo-bucket/components/")));

    let recipe = &template["Resources"]["AmazonLinux2x86DevelopmentWorkstationRecipe"];
    assert_eq!(recipe["Properties"]["Components"].as_array().unwrap().len(), 9);
}

#[test]
fn test_infrastructure_waits_for_instance_profile() {
    let template = template_json(&sample_app(), IMAGE_STACK);
    let infra = &template["Resources"]["AmazonLinux2x86DevelopmentWorkstationInfrastructureConfig"];
    assert_eq!(
        infra["DependsOn"],
        serde_json::json!(["AmazonLinux2x86DevelopmentWorkstationInstanceProfile"])
    );
}

#[test]
fn test_workstation_uses_cached_lookups() {
    let template = template_json(&sample_app(), WORKSTATION_STACK);
    let instance = template["Resources"]
        .as_object()
        .unwrap()
        .values()
        .find(|r| r["Type"] == "AWS::EC2::Instance")
        .unwrap();
    assert_eq!(instance["Properties"]["ImageId"], SAMPLE_IMAGE_ID);
    // Private subnet in the workstation zone wins over the public one
    assert_eq!(instance["Properties"]["SubnetId"], "subnet-0eef");
}

#[test]
fn test_missing_context_blocks_synth() {
    let params = sample_parameters();
    let app = App::from_parameters(&params, &ContextStore::new()).unwrap();

    let err = app.synth(&SynthOptions::default()).unwrap_err();
    match &err {
        Error::MissingContext { keys } => assert_eq!(keys.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 6);

    let options = SynthOptions {
        allow_missing_context: true,
        ..SynthOptions::default()
    };
    let assembly = app.synth(&options).unwrap();
    assert_eq!(assembly.manifest().missing.len(), 2);
    assert!(assembly
        .template_text(WORKSTATION_STACK)
        .unwrap()
        .contains(PLACEHOLDER_IMAGE_ID));
}

#[test]
fn test_selecting_a_stack_pulls_in_dependencies() {
    let options = SynthOptions {
        patterns: vec!["*image-builder*".to_string()],
        ..SynthOptions::default()
    };
    let assembly = sample_app().synth(&options).unwrap();
    let names: Vec<&str> = assembly
        .manifest()
        .artifacts
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(names, vec!["s3ops", IMAGE_STACK]);
}

#[test]
fn test_unknown_stack_pattern() {
    let options = SynthOptions {
        patterns: vec!["nope-*".to_string()],
        ..SynthOptions::default()
    };
    let err = sample_app().synth(&options).unwrap_err();
    assert!(matches!(err, Error::StackNotFound(_)));
    assert_eq!(err.exit_code(), 7);
}
