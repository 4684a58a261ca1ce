//! CLI tests for devstation
//!
//! Runs the binary against a temporary project directory holding a
//! parameters file and, where needed, a populated context file.

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use serde_json::Value;

// Helper to get a command running inside a project, isolated from user config
fn devstation_cmd(project: &Project) -> Command {
    let mut cmd = Command::cargo_bin("devstation").unwrap();
    cmd.current_dir(project.path())
        .env("HOME", project.path())
        .env("XDG_CONFIG_HOME", project.path().join(".config"))
        .env_remove("DEVSTATION_CONFIG")
        .env_remove("DEVSTATION_PARAMETERS")
        .env_remove("DEVSTATION_CONTEXT")
        .env_remove("DEVSTATION_OUTDIR")
        .env_remove("DEVSTATION_FORMAT")
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

// ============================================================================
// Help and version
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let project = Project::new();
    devstation_cmd(&project)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("context"));
}

#[test]
fn test_version() {
    let project = Project::new();
    devstation_cmd(&project)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_subcommand() {
    let project = Project::new();
    devstation_cmd(&project).arg("deploy").assert().failure();
}

// ============================================================================
// synth
// ============================================================================

#[test]
fn test_synth_writes_assembly() {
    let project = Project::new();
    project.write_context();

    devstation_cmd(&project)
        .arg("synth")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 6 file(s)"));

    let outdir = project.outdir();
    assert!(outdir.join("manifest.json").exists());
    assert!(outdir.join("s3ops.template.json").exists());
    assert!(outdir
        .join("development-environment-jdoe-workstation.template.json")
        .exists());
}

#[test]
fn test_synth_refuses_missing_context() {
    let project = Project::new();

    devstation_cmd(&project)
        .arg("synth")
        .assert()
        .code(6)
        .stderr(predicate::str::contains("Missing context: vpc:account=123456789012"))
        .stderr(predicate::str::contains("ami:account=123456789012"));
    assert!(!project.outdir().exists());

    devstation_cmd(&project)
        .args(["synth", "--allow-missing-context"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Using placeholder"));

    let manifest: Value = serde_json::from_str(
        &std::fs::read_to_string(project.outdir().join("manifest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["missing"].as_array().unwrap().len(), 2);
}

#[test]
fn test_synth_single_stack_to_stdout() {
    let project = Project::new();

    let output = devstation_cmd(&project)
        .args(["synth", "s3ops", "--stdout"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let template: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        template["Resources"]["componentsbucket"]["Type"],
        "AWS::S3::Bucket"
    );
}

#[test]
fn test_synth_parameter_override() {
    let project = Project::new();

    let output = devstation_cmd(&project)
        .args(["synth", "s3ops", "--stdout", "--param", "componentBucketName=other-bucket"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("other-bucket"));
}

#[test]
fn test_synth_yaml_to_custom_outdir() {
    let project = Project::new();
    project.write_context();

    devstation_cmd(&project)
        .args(["synth", "--format", "yaml", "-o", "cdk.out"])
        .assert()
        .success();
    assert!(project.path().join("cdk.out/s3ops.template.yaml").exists());
}

#[test]
fn test_synth_unknown_stack() {
    let project = Project::new();
    devstation_cmd(&project)
        .args(["synth", "no-such-stack"])
        .assert()
        .code(7);
}

// ============================================================================
// Parameter errors
// ============================================================================

#[test]
fn test_missing_parameters_file() {
    let project = Project::new();
    devstation_cmd(&project)
        .args(["-p", "nope.properties", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.properties"));
}

#[test]
fn test_missing_required_parameter() {
    let project = Project::with_properties(
        &SAMPLE_PROPERTIES.replace("awsAccount = 123456789012\n", ""),
    );
    devstation_cmd(&project)
        .arg("list")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("awsAccount").or(predicate::str::contains("awsaccount")));
}

#[test]
fn test_malformed_override() {
    let project = Project::new();
    devstation_cmd(&project)
        .args(["list", "--param", "no-equals-sign"])
        .assert()
        .code(4);
}

// ============================================================================
// list
// ============================================================================

#[test]
fn test_list_in_deploy_order() {
    let project = Project::new();
    devstation_cmd(&project)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("s3ops\n"))
        .stdout(predicate::str::contains(
            "development-environment-jdoe-image-builder-pipeline",
        ));
}

#[test]
fn test_list_json() {
    let project = Project::new();
    let output = devstation_cmd(&project)
        .args(["list", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stacks: Value = serde_json::from_slice(&output.stdout).unwrap();
    let stacks = stacks.as_array().unwrap();
    assert_eq!(stacks.len(), 5);
    assert_eq!(stacks[0]["name"], "s3ops");
    assert_eq!(stacks[1]["dependencies"], serde_json::json!(["s3ops"]));
}

#[test]
fn test_list_dot() {
    let project = Project::new();
    devstation_cmd(&project)
        .args(["list", "--dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph"));
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn test_validate_reports_warnings() {
    let project = Project::new();
    devstation_cmd(&project)
        .arg("validate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("SG003"));
}

#[test]
fn test_validate_skip_and_strict() {
    let project = Project::new();
    devstation_cmd(&project)
        .args(["validate", "--skip-category", "security", "--min-severity", "warning"])
        .assert()
        .success();

    devstation_cmd(&project)
        .args(["validate", "--strict"])
        .assert()
        .code(2);
}

#[test]
fn test_validate_written_assembly() {
    let project = Project::new();
    project.write_context();
    devstation_cmd(&project).arg("synth").assert().success();

    let output = devstation_cmd(&project)
        .args(["validate", "--assembly", "--output", "json"])
        .output()
        .unwrap();
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["stacks_analyzed"].as_array().unwrap().len(), 5);
}

// ============================================================================
// diff
// ============================================================================

#[test]
fn test_diff_against_fresh_assembly() {
    let project = Project::new();
    project.write_context();

    devstation_cmd(&project)
        .args(["diff", "--fail"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("5 of 5 stack(s) differ"));

    devstation_cmd(&project).arg("synth").assert().success();

    devstation_cmd(&project)
        .args(["diff", "--fail"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 of 5 stack(s) differ"));
}

// ============================================================================
// context
// ============================================================================

#[test]
fn test_context_set_show_clear() {
    let project = Project::new();

    devstation_cmd(&project)
        .args(["context", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached values"))
        .stdout(predicate::str::contains("Missing"));

    let key = "ami:account=123456789012:region=us-east-1:name=test";
    devstation_cmd(&project)
        .args(["context", "set", key, "ami-0abc"])
        .assert()
        .success();

    let stored: Value =
        serde_json::from_str(&std::fs::read_to_string(project.context_path()).unwrap()).unwrap();
    assert_eq!(stored[key], "ami-0abc");

    devstation_cmd(&project)
        .args(["context", "clear", key])
        .assert()
        .success();
    devstation_cmd(&project)
        .args(["context", "clear", key])
        .assert()
        .code(1);
}

#[test]
fn test_context_complete_show() {
    let project = Project::new();
    project.write_context();

    let output = devstation_cmd(&project)
        .args(["context", "show", "--output", "json"])
        .output()
        .unwrap();
    let shown: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["values"].as_object().unwrap().len(), 2);
    assert!(shown["missing"].as_array().unwrap().is_empty());
}

// ============================================================================
// completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let project = Project::new();
    devstation_cmd(&project)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("devstation"));
}
